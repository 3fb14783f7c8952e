use crate::domain::models::booking::BookingDetail;
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike};

/// Generates an iCalendar (.ics) document for a booked event.
pub fn generate_ics(detail: &BookingDetail, site_name: &str) -> String {
    let mut calendar = Calendar::new();
    calendar.name(site_name);

    let description = format!(
        "Booking {} - {} ticket(s)\n\n{}",
        detail.booking.reference(),
        detail.booking.quantity,
        detail.event_description
    );

    let ical_event = IcalEvent::new()
        .summary(&detail.event_title)
        .description(&description)
        .location(&detail.event_location)
        .starts(detail.event_start_at)
        .ends(detail.event_end_at)
        .uid(&format!("{}@eventhub", detail.booking.id))
        .done();

    calendar.push(ical_event);
    calendar.to_string()
}
