mod common;

use chrono::{Duration, Utc};
use common::{booking_id_from, flash, TestApp, MUSIC_CATEGORY, USER_PASSWORD};
use eventhub::background::process_pending_jobs;
use eventhub::domain::models::job::{Job, BOOKING_CONFIRMED};

async fn job_statuses(app: &TestApp) -> Vec<(String, String)> {
    sqlx::query_as("SELECT job_type, status FROM jobs ORDER BY job_type")
        .fetch_all(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_confirmation_email_carries_calendar_attachment() {
    let app = TestApp::new().await;
    let event = app.create_event("Jazz Night", 10, 2500, Duration::days(3)).await;
    app.create_user("fan@example.com").await;
    let fan = app.login("fan@example.com", USER_PASSWORD).await;
    let booking_id = booking_id_from(&app.book(&fan, &event.id, 2).await);
    app.pay(&fan, &booking_id).await;

    assert!(app.sent_emails().is_empty());
    let claimed = process_pending_jobs(&app.state).await.unwrap();
    assert_eq!(claimed, 1);

    let sent = app.sent_emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "fan@example.com");
    assert!(sent[0].subject.starts_with("Your tickets for Jazz Night"));
    assert!(sent[0].html_body.contains("Jazz Night"));
    assert_eq!(sent[0].attachment_name.as_deref(), Some("ticket.ics"));

    assert_eq!(job_statuses(&app).await, vec![(BOOKING_CONFIRMED.to_string(), "COMPLETED".to_string())]);

    // Completed jobs are not picked up again.
    assert_eq!(process_pending_jobs(&app.state).await.unwrap(), 0);
    assert_eq!(app.sent_emails().len(), 1);
}

#[tokio::test]
async fn test_future_jobs_wait_and_broken_jobs_fail() {
    let app = TestApp::new().await;
    app.state.job_repo
        .create(&Job::new(BOOKING_CONFIRMED, "missing-booking".to_string(), Utc::now()))
        .await
        .unwrap();
    app.state.job_repo
        .create(&Job::new(BOOKING_CONFIRMED, "later-booking".to_string(), Utc::now() + Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(process_pending_jobs(&app.state).await.unwrap(), 1);
    assert!(app.sent_emails().is_empty());

    let mut statuses: Vec<String> = job_statuses(&app).await.into_iter().map(|(_, s)| s).collect();
    statuses.sort();
    assert_eq!(statuses, vec!["FAILED".to_string(), "PENDING".to_string()]);
}

#[tokio::test]
async fn test_cancelling_an_event_notifies_confirmed_customers() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let event = app.create_event("Outdoor Movie", 10, 800, Duration::days(3)).await;

    app.create_user("paid@example.com").await;
    app.create_user("unpaid@example.com").await;
    let paid = app.login("paid@example.com", USER_PASSWORD).await;
    let unpaid = app.login("unpaid@example.com", USER_PASSWORD).await;
    let paid_booking = booking_id_from(&app.book(&paid, &event.id, 1).await);
    app.pay(&paid, &paid_booking).await;
    booking_id_from(&app.book(&unpaid, &event.id, 1).await);
    process_pending_jobs(&app.state).await.unwrap();

    let start = event.start_at.format("%Y-%m-%d").to_string();
    let start_time = event.start_at.format("%H:%M").to_string();
    let end = event.end_at.format("%Y-%m-%d").to_string();
    let end_time = event.end_at.format("%H:%M").to_string();
    let res = app.post_multipart(&format!("/admin/events/{}/edit", event.id), &admin, &[
        ("title", "Outdoor Movie"),
        ("description", "Rained out"),
        ("category_id", MUSIC_CATEGORY),
        ("start_date", start.as_str()),
        ("start_time", start_time.as_str()),
        ("end_date", end.as_str()),
        ("end_time", end_time.as_str()),
        ("location", "Park"),
        ("capacity", "10"),
        ("price", "8.00"),
        ("status", "cancelled"),
    ], None).await;
    assert_eq!(flash(&res).unwrap().0, "success");

    assert_eq!(process_pending_jobs(&app.state).await.unwrap(), 1);
    let sent = app.sent_emails();
    let notice = sent.last().unwrap();
    assert_eq!(notice.recipient, "paid@example.com");
    assert_eq!(notice.subject, "Event cancelled: Outdoor Movie");
    assert!(notice.attachment_name.is_none());
    assert!(!sent.iter().any(|e| e.recipient == "unpaid@example.com"));
}
