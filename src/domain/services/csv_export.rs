use chrono_tz::Tz;

use crate::domain::models::booking::BookingDetail;
use crate::domain::services::money::format_decimal;
use crate::error::AppError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const BOOKING_EXPORT_HEADERS: [&str; 10] = [
    "Booking ID",
    "Event",
    "Event Date",
    "Customer Name",
    "Customer Email",
    "Quantity",
    "Total Amount",
    "Status",
    "Payment Status",
    "Booking Date",
];

/// Writes a CSV document prefixed with a UTF-8 byte order mark so spreadsheet apps detect the encoding.
pub fn to_csv<H: AsRef<str>>(headers: &[H], rows: &[Vec<String>]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer
        .write_record(headers.iter().map(|h| h.as_ref()))
        .map_err(|e| AppError::InternalWithMsg(format!("CSV write error: {}", e)))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::InternalWithMsg(format!("CSV write error: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::InternalWithMsg(format!("CSV flush error: {}", e)))
}

pub fn booking_export_rows(bookings: &[BookingDetail], tz: Tz) -> Vec<Vec<String>> {
    let fmt = |dt: chrono::DateTime<chrono::Utc>| dt.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string();
    bookings
        .iter()
        .map(|b| {
            vec![
                b.booking.reference(),
                b.event_title.clone(),
                fmt(b.event_start_at),
                b.customer_name(),
                b.customer_email.clone(),
                b.booking.quantity.to_string(),
                format_decimal(b.booking.total_cents),
                b.booking.status.label().to_string(),
                b.booking.payment_status.to_string(),
                fmt(b.booking.created_at),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_bom_and_quotes_fields() {
        let bytes = to_csv(&["Name", "Note"], &[vec!["Ana".into(), "likes, commas".into()]]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text, "Name,Note\nAna,\"likes, commas\"\n");
    }
}
