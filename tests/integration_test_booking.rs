mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{booking_id_from, body_text, flash, location, TestApp, USER_PASSWORD};
use eventhub::background::{expire_stale_bookings, EXPIRED_ACTION};
use eventhub::domain::models::booking::{BookingStatus, PaymentStatus};
use tower::ServiceExt;

async fn jobs_of_type(app: &TestApp, job_type: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE job_type = ?")
        .bind(job_type)
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_anonymous_booking_redirects_to_login() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 50, 2500, Duration::days(3)).await;

    let res = app.post_form(&format!("/events/{}/book", event.id), None, &[("quantity", "2")]).await;

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/login?next=%2Fevents%2F{}", event.id));
    assert_eq!(flash(&res), Some(("info".to_string(), "Please login to book tickets".to_string())));
    assert_eq!(app.state.booking_repo.count_for_event(&event.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_book_pay_and_confirm() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 50, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;

    let res = app.book(&session, &event.id, 2).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let booking_id = booking_id_from(&res);

    let booking = app.state.booking_repo.find_by_id(&booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.quantity, 2);
    assert_eq!(booking.total_cents, 5000);
    assert_eq!(app.state.booking_repo.held_seats(&event.id).await.unwrap(), 2);

    let page = app.get(&format!("/bookings/{}/checkout", booking_id), Some(&session)).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("Jazz Night"));

    let res = app.pay(&session, &booking_id).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/bookings/{}/confirmation", booking_id));
    assert_eq!(
        flash(&res),
        Some(("success".to_string(), "Payment successful! Your booking is confirmed.".to_string()))
    );

    let booking = app.state.booking_repo.find_by_id(&booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Completed);
    assert!(booking.payment_date.is_some());
    assert_eq!(jobs_of_type(&app, "BOOKING_CONFIRMED").await, 1);

    let logs = app.state.booking_repo.list_logs(&booking_id).await.unwrap();
    let actions: Vec<&str> = logs.iter().map(|l| l.action.as_str()).collect();
    assert!(actions.contains(&"Booking created"));
    assert!(actions.contains(&"Payment completed"));

    let page = app.get(&format!("/bookings/{}/confirmation", booking_id), Some(&session)).await;
    assert_eq!(page.status(), StatusCode::OK);

    // A confirmed booking skips the payment form.
    let page = app.get(&format!("/bookings/{}/checkout", booking_id), Some(&session)).await;
    assert_eq!(location(&page), format!("/bookings/{}/confirmation", booking_id));
}

#[tokio::test]
async fn test_no_confirmation_email_when_notifications_disabled() {
    let app = TestApp::new().await;
    app.set_setting("email_notifications", "0").await;
    let event = app.create_event("Quiet Recital", 10, 1000, Duration::days(2)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;

    let booking_id = booking_id_from(&app.book(&session, &event.id, 1).await);
    let res = app.pay(&session, &booking_id).await;

    assert_eq!(location(&res), format!("/bookings/{}/confirmation", booking_id));
    assert_eq!(jobs_of_type(&app, "BOOKING_CONFIRMED").await, 0);
}

#[tokio::test]
async fn test_invalid_card_rerenders_checkout() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 50, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;
    let booking_id = booking_id_from(&app.book(&session, &event.id, 1).await);

    let res = app.post_csrf(&format!("/bookings/{}/checkout", booking_id), &session, &[
        ("cardholder_name", "Test User"),
        ("card_number", "1234"),
        ("expiry", "01/20"),
        ("cvv", "1"),
    ]).await;

    assert_eq!(res.status(), StatusCode::OK);
    let booking = app.state.booking_repo.find_by_id(&booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(jobs_of_type(&app, "BOOKING_CONFIRMED").await, 0);
}

#[tokio::test]
async fn test_quantity_rules() {
    let app = TestApp::new().await;
    let event = app.create_event("Small Room", 3, 1000, Duration::days(1)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;
    let event_url = format!("/events/{}", event.id);

    let res = app.book(&session, &event.id, 0).await;
    assert_eq!(location(&res), event_url);
    assert_eq!(flash(&res).unwrap().1, "Please select at least one ticket");

    let res = app.book(&session, &event.id, 11).await;
    assert_eq!(flash(&res).unwrap().1, "You can book at most 10 tickets at a time");

    let res = app.book(&session, &event.id, 4).await;
    assert_eq!(flash(&res).unwrap().1, "Not enough tickets available");

    assert_eq!(app.state.booking_repo.count_for_event(&event.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_pending_bookings_hold_seats() {
    let app = TestApp::new().await;
    let event = app.create_event("Small Room", 3, 1000, Duration::days(1)).await;
    app.create_user("first@example.com").await;
    app.create_user("second@example.com").await;
    let first = app.login("first@example.com", USER_PASSWORD).await;
    let second = app.login("second@example.com", USER_PASSWORD).await;

    let res = app.book(&first, &event.id, 2).await;
    booking_id_from(&res);

    let res = app.book(&second, &event.id, 2).await;
    assert_eq!(location(&res), format!("/events/{}", event.id));
    assert_eq!(flash(&res).unwrap().1, "Not enough tickets available");

    let res = app.book(&second, &event.id, 1).await;
    booking_id_from(&res);
    assert_eq!(app.state.booking_repo.held_seats(&event.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_concurrent_bookings_never_oversell() {
    let app = TestApp::new().await;
    let event = app.create_event("Hot Ticket", 5, 1000, Duration::days(1)).await;

    let mut sessions = Vec::new();
    for i in 0..6 {
        let email = format!("racer{}@example.com", i);
        app.create_user(&email).await;
        sessions.push(app.login(&email, USER_PASSWORD).await);
    }

    let mut handles = Vec::new();
    for session in sessions {
        let router = app.router.clone();
        let uri = format!("/events/{}/book", event.id);
        let body = format!("csrf_token={}&quantity=2", urlencoding::encode(&session.csrf_token));
        handles.push(tokio::spawn(async move {
            let req = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::COOKIE, session.cookie)
                .body(Body::from(body))
                .unwrap();
            router.oneshot(req).await.unwrap()
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        let res = handle.await.unwrap();
        if location(&res).ends_with("/checkout") {
            succeeded += 1;
        }
    }

    assert!(succeeded >= 1);
    assert!(succeeded <= 2, "at most two bookings of two fit into five seats, got {}", succeeded);
    assert!(app.state.booking_repo.held_seats(&event.id).await.unwrap() <= 5);
}

#[tokio::test]
async fn test_cannot_book_draft_or_past_events() {
    let app = TestApp::new().await;
    let draft = app.create_event_with(
        "Secret Show", 10, 1000, Utc::now() + Duration::days(2),
        eventhub::domain::models::event::EventStatus::Draft,
    ).await;
    let past = app.create_event("Yesterday", 10, 1000, Duration::days(-2)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;

    for id in [&draft.id, &past.id] {
        let res = app.book(&session, id, 1).await;
        assert_eq!(location(&res), "/events");
        assert_eq!(flash(&res).unwrap().1, "Event not found");
    }
}

#[tokio::test]
async fn test_cannot_pay_someone_elses_booking() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 50, 2500, Duration::days(3)).await;
    app.create_user("owner@example.com").await;
    app.create_user("intruder@example.com").await;
    let owner = app.login("owner@example.com", USER_PASSWORD).await;
    let intruder = app.login("intruder@example.com", USER_PASSWORD).await;
    let booking_id = booking_id_from(&app.book(&owner, &event.id, 1).await);

    let res = app.pay(&intruder, &booking_id).await;
    assert_eq!(flash(&res).unwrap().1, "Booking not found");

    let res = app.get(&format!("/user/bookings/{}/ticket", booking_id), Some(&intruder)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let booking = app.state.booking_repo.find_by_id(&booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
}

#[tokio::test]
async fn test_owner_cancels_confirmed_booking() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 4, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;
    let booking_id = booking_id_from(&app.book(&session, &event.id, 4).await);
    app.pay(&session, &booking_id).await;

    let res = app.post_csrf(&format!("/bookings/{}/cancel", booking_id), &session, &[]).await;
    assert_eq!(location(&res), "/user/bookings");
    assert_eq!(flash(&res), Some(("success".to_string(), "Booking cancelled successfully".to_string())));

    let booking = app.state.booking_repo.find_by_id(&booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.payment_status, PaymentStatus::Refunded);
    assert_eq!(app.state.booking_repo.held_seats(&event.id).await.unwrap(), 0);

    // Cancelling twice is refused.
    let res = app.post_csrf(&format!("/bookings/{}/cancel", booking_id), &session, &[]).await;
    assert_eq!(flash(&res).unwrap().0, "danger");
}

#[tokio::test]
async fn test_cancel_pending_marks_payment_failed() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 4, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;
    let booking_id = booking_id_from(&app.book(&session, &event.id, 1).await);

    app.post_csrf(&format!("/bookings/{}/cancel", booking_id), &session, &[]).await;

    let booking = app.state.booking_repo.find_by_id(&booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(booking.payment_status, PaymentStatus::Failed);
}

#[tokio::test]
async fn test_cancel_refused_when_cancellations_disabled() {
    let app = TestApp::new().await;
    app.set_setting("allow_cancellations", "0").await;
    let event = app.create_event("Jazz Night", 4, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;
    let booking_id = booking_id_from(&app.book(&session, &event.id, 1).await);
    app.pay(&session, &booking_id).await;

    let res = app.post_csrf(&format!("/bookings/{}/cancel", booking_id), &session, &[]).await;
    assert_eq!(
        flash(&res),
        Some(("danger".to_string(), "Cancellations are currently not allowed".to_string()))
    );
    let booking = app.state.booking_repo.find_by_id(&booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_stale_pending_bookings_expire() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 4, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;
    let stale_id = booking_id_from(&app.book(&session, &event.id, 2).await);
    let fresh_id = booking_id_from(&app.book(&session, &event.id, 1).await);

    sqlx::query("UPDATE bookings SET created_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::hours(2))
        .bind(&stale_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let expired = expire_stale_bookings(&app.state).await.unwrap();
    assert_eq!(expired, 1);

    let stale = app.state.booking_repo.find_by_id(&stale_id).await.unwrap().unwrap();
    assert_eq!(stale.status, BookingStatus::Cancelled);
    assert_eq!(stale.payment_status, PaymentStatus::Failed);
    let logs = app.state.booking_repo.list_logs(&stale_id).await.unwrap();
    assert!(logs.iter().any(|l| l.action == EXPIRED_ACTION));

    let fresh = app.state.booking_repo.find_by_id(&fresh_id).await.unwrap().unwrap();
    assert_eq!(fresh.status, BookingStatus::Pending);
    assert_eq!(app.state.booking_repo.held_seats(&event.id).await.unwrap(), 1);

    // The owner can no longer pay for the expired booking.
    let res = app.pay(&session, &stale_id).await;
    assert_eq!(location(&res), "/user/bookings");
}

#[tokio::test]
async fn test_expiry_survives_oversized_stored_time_limit() {
    let app = TestApp::new().await;
    app.set_setting("booking_time_limit", "1000000000000").await;
    let event = app.create_event("Jazz Night", 4, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;
    let stale_id = booking_id_from(&app.book(&session, &event.id, 1).await);

    sqlx::query("UPDATE bookings SET created_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::hours(2))
        .bind(&stale_id)
        .execute(&app.pool)
        .await
        .unwrap();

    // The stored value is out of range, so the default window applies.
    assert_eq!(expire_stale_bookings(&app.state).await.unwrap(), 1);
    let stale = app.state.booking_repo.find_by_id(&stale_id).await.unwrap().unwrap();
    assert_eq!(stale.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_checkout_refused_once_event_is_cancelled() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 4, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;
    let booking_id = booking_id_from(&app.book(&session, &event.id, 1).await);

    let mut cancelled = app.state.event_repo.find_by_id(&event.id).await.unwrap().unwrap();
    cancelled.status = eventhub::domain::models::event::EventStatus::Cancelled;
    app.state.event_repo.update(&cancelled).await.unwrap();

    let res = app.get(&format!("/bookings/{}/checkout", booking_id), Some(&session)).await;
    assert_eq!(location(&res), "/user/bookings");

    let res = app.pay(&session, &booking_id).await;
    assert_eq!(location(&res), "/user/bookings");
    assert_eq!(
        flash(&res),
        Some(("danger".to_string(), "This event is no longer available for booking".to_string()))
    );

    let booking = app.state.booking_repo.find_by_id(&booking_id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(jobs_of_type(&app, "BOOKING_CONFIRMED").await, 0);
}

#[tokio::test]
async fn test_user_area_lists_bookings() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 4, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let session = app.login("fan@example.com", USER_PASSWORD).await;
    let booking_id = booking_id_from(&app.book(&session, &event.id, 2).await);
    app.pay(&session, &booking_id).await;

    let res = app.get("/user/dashboard", Some(&session)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Jazz Night"));

    let res = app.get("/user/bookings?status=confirmed", Some(&session)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Jazz Night"));

    let res = app.get(&format!("/user/bookings/{}/ticket", booking_id), Some(&session)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.get(&format!("/user/bookings/{}/calendar.ics", booking_id), Some(&session)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/calendar; charset=utf-8");
    let ics = body_text(res).await;
    assert!(ics.contains("BEGIN:VCALENDAR"));
    assert!(ics.contains("Jazz Night"));
}
