mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_text, flash, location, TestApp};
use eventhub::domain::models::event::EventStatus;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let res = app.get("/health", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "OK");
}

#[tokio::test]
async fn test_home_shows_upcoming_published_events() {
    let app = TestApp::new().await;
    app.create_event("Spring Concert", 100, 3000, Duration::days(4)).await;
    app.create_event_with("Hidden Draft", 100, 3000, Utc::now() + Duration::days(4), EventStatus::Draft).await;

    let res = app.get("/", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Spring Concert"));
    assert!(!html.contains("Hidden Draft"));
}

#[tokio::test]
async fn test_event_list_hides_drafts_and_ended_events() {
    let app = TestApp::new().await;
    app.create_event("Upcoming Gig", 50, 2000, Duration::days(2)).await;
    app.create_event("Finished Gig", 50, 2000, Duration::days(-3)).await;
    app.create_event_with("Cancelled Gig", 50, 2000, Utc::now() + Duration::days(2), EventStatus::Cancelled).await;

    let html = body_text(app.get("/events", None).await).await;
    assert!(html.contains("Upcoming Gig"));
    assert!(!html.contains("Finished Gig"));
    assert!(!html.contains("Cancelled Gig"));
}

#[tokio::test]
async fn test_event_list_filters() {
    let app = TestApp::new().await;
    app.create_event("Free Picnic", 50, 0, Duration::days(2)).await;
    app.create_event("Gala Dinner", 50, 15000, Duration::days(2)).await;

    let html = body_text(app.get("/events?price=free", None).await).await;
    assert!(html.contains("Free Picnic"));
    assert!(!html.contains("Gala Dinner"));

    let html = body_text(app.get("/events?price=100-plus", None).await).await;
    assert!(!html.contains("Free Picnic"));
    assert!(html.contains("Gala Dinner"));

    let html = body_text(app.get("/events?search=gala", None).await).await;
    assert!(!html.contains("Free Picnic"));
    assert!(html.contains("Gala Dinner"));

    // Sports has no events.
    let html = body_text(app.get("/events?category=0b6c1d0e-4c7a-4f1e-9a55-1f6f2d0c0002", None).await).await;
    assert!(!html.contains("Free Picnic"));
    assert!(!html.contains("Gala Dinner"));

    // Unknown filter values are ignored.
    let res = app.get("/events?date=someday&price=cheap&sort=random", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Free Picnic"));
    assert!(html.contains("Gala Dinner"));
}

#[tokio::test]
async fn test_view_event() {
    let app = TestApp::new().await;
    let event = app.create_event("Poetry <Slam>", 20, 1200, Duration::days(2)).await;

    let res = app.get(&format!("/events/{}", event.id), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Poetry &lt;Slam&gt;"));
    assert!(!html.contains("Poetry <Slam>"));
}

#[tokio::test]
async fn test_view_missing_or_draft_event_redirects() {
    let app = TestApp::new().await;
    let draft = app.create_event_with("Draft", 20, 1200, Utc::now() + Duration::days(2), EventStatus::Draft).await;

    for id in ["does-not-exist", draft.id.as_str()] {
        let res = app.get(&format!("/events/{}", id), None).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/events");
        assert_eq!(flash(&res), Some(("danger".to_string(), "Event not found".to_string())));
    }
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new().await;
    let res = app.get("/no-such-page", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
