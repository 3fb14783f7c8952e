#![allow(dead_code)]

use eventhub::{
    api::{router::create_router, views::build_templates},
    config::Config,
    domain::models::event::{Event, EventDraft, EventStatus},
    domain::models::user::{NewUserParams, User, UserRole, UserStatus},
    domain::ports::EmailService,
    domain::services::auth_service::{hash_password, AuthService},
    error::AppError,
    infra::factory::ensure_admin,
    infra::repositories::{
        sqlite_auth_repo::SqliteAuthRepo,
        sqlite_booking_repo::SqliteBookingRepo,
        sqlite_category_repo::SqliteCategoryRepo,
        sqlite_event_repo::SqliteEventRepo,
        sqlite_job_repo::SqliteJobRepo,
        sqlite_setting_repo::SqliteSettingRepo,
        sqlite_user_repo::SqliteUserRepo,
    },
    infra::storage::local_image_store::LocalImageStore,
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@test.local";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const USER_PASSWORD: &str = "password123";
pub const MUSIC_CATEGORY: &str = "0b6c1d0e-4c7a-4f1e-9a55-1f6f2d0c0001";

const BOUNDARY: &str = "eventhub-test-boundary";

/// A file field of a multipart form, always sent under the name `image`.
pub struct FilePart<'a> {
    pub name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub attachment_name: Option<String>,
}

#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<SentEmail>>,
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachment_name: Option<&str>,
        _attachment_data: Option<&[u8]>
    ) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
            attachment_name: attachment_name.map(str::to_string),
        });
        Ok(())
    }
}

/// Cookies and CSRF token of a logged-in browser.
#[derive(Debug, Clone)]
pub struct Session {
    pub cookie: String,
    pub csrf_token: String,
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub upload_dir: PathBuf,
    pub state: Arc<AppState>,
    pub emails: Arc<MockEmailService>,
    pub admin: User,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let upload_dir = std::env::temp_dir().join(format!("eventhub_uploads_{}", Uuid::new_v4()));

        let priv_key_pem = include_str!("../tests/keys/test_private.pem");
        let pub_key_pem = include_str!("../tests/keys/test_public.pem");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            jwt_secret_key: priv_key_pem.to_string(),
            jwt_public_key: pub_key_pem.to_string(),
            auth_issuer: "test-issuer".to_string(),
            upload_dir: upload_dir.to_string_lossy().to_string(),
            timezone: "UTC".to_string(),
            session_timeout_minutes: 30,
            cookie_secure: false,
            admin_email: ADMIN_EMAIL.to_string(),
            admin_password: Some(ADMIN_PASSWORD.to_string()),
        };

        let auth_repo = Arc::new(SqliteAuthRepo::new(pool.clone()));
        let auth_service = Arc::new(AuthService::new(auth_repo.clone(), config.clone()));
        let emails = Arc::new(MockEmailService::default());

        let state = Arc::new(AppState {
            config: config.clone(),
            user_repo: Arc::new(SqliteUserRepo::new(pool.clone())),
            category_repo: Arc::new(SqliteCategoryRepo::new(pool.clone())),
            event_repo: Arc::new(SqliteEventRepo::new(pool.clone())),
            booking_repo: Arc::new(SqliteBookingRepo::new(pool.clone())),
            setting_repo: Arc::new(SqliteSettingRepo::new(pool.clone())),
            auth_repo,
            job_repo: Arc::new(SqliteJobRepo::new(pool.clone())),
            auth_service,
            email_service: emails.clone(),
            image_store: Arc::new(LocalImageStore::new(&config.upload_dir)),
            templates: Arc::new(build_templates(config.tz()).expect("templates")),
        });

        let admin = ensure_admin(state.user_repo.as_ref(), &config)
            .await
            .unwrap()
            .expect("admin should be created on an empty database");

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            upload_dir,
            state,
            emails,
            admin,
        }
    }

    pub async fn create_user(&self, email: &str) -> User {
        let user = User::new(NewUserParams {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: hash_password(USER_PASSWORD).unwrap(),
            role: UserRole::User,
            status: UserStatus::Active,
            created_by: None,
        });
        self.state.user_repo.create(&user).await.unwrap()
    }

    /// Inserts a published event starting `starts_in` from now and lasting two hours.
    pub async fn create_event(&self, title: &str, capacity: i32, price_cents: i64, starts_in: Duration) -> Event {
        self.create_event_with(title, capacity, price_cents, Utc::now() + starts_in, EventStatus::Published).await
    }

    pub async fn create_event_with(&self, title: &str, capacity: i32, price_cents: i64, start_at: DateTime<Utc>, status: EventStatus) -> Event {
        let draft = EventDraft {
            title: title.to_string(),
            description: format!("{} description", title),
            category_id: MUSIC_CATEGORY.to_string(),
            start_at,
            end_at: start_at + Duration::hours(2),
            location: "Main Hall".to_string(),
            capacity,
            price_cents,
            status,
        };
        let event = Event::new(draft, None, self.admin.id.clone());
        self.state.event_repo.create(&event).await.unwrap()
    }

    pub async fn login(&self, email: &str, password: &str) -> Session {
        let response = self.post_form("/login", None, &[("email", email), ("password", password)]).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login should redirect");

        let pairs: Vec<String> = set_cookies(&response)
            .into_iter()
            .filter(|(name, _)| name == "access_token" || name == "refresh_token")
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        let access = pairs.iter()
            .find_map(|p| p.strip_prefix("access_token="))
            .expect("No access_token cookie returned")
            .to_string();
        let claims = self.state.auth_service.verify_access(&access).unwrap();

        Session { cookie: pairs.join("; "), csrf_token: claims.csrf_token }
    }

    pub async fn login_admin(&self) -> Session {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn get(&self, uri: &str, session: Option<&Session>) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(s) = session {
            builder = builder.header(header::COOKIE, &s.cookie);
        }
        self.router.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    pub async fn post_form(&self, uri: &str, session: Option<&Session>, fields: &[(&str, &str)]) -> Response {
        let body = fields.iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(s) = session {
            builder = builder.header(header::COOKIE, &s.cookie);
        }
        self.router.clone().oneshot(builder.body(Body::from(body)).unwrap()).await.unwrap()
    }

    /// Posts a form with the session's CSRF token added.
    pub async fn post_csrf(&self, uri: &str, session: &Session, fields: &[(&str, &str)]) -> Response {
        let mut all = vec![("csrf_token", session.csrf_token.as_str())];
        all.extend_from_slice(fields);
        self.post_form(uri, Some(session), &all).await
    }

    /// Posts a multipart form with the session's CSRF token added.
    pub async fn post_multipart(&self, uri: &str, session: &Session, fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Response {
        let mut body = Vec::new();
        let mut all = vec![("csrf_token", session.csrf_token.as_str())];
        all.extend_from_slice(fields);
        for (name, value) in all {
            body.extend_from_slice(format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            ).as_bytes());
        }
        if let Some(file) = file {
            body.extend_from_slice(format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file.name, file.content_type
            ).as_bytes());
            body.extend_from_slice(file.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .header(header::COOKIE, &session.cookie)
            .body(Body::from(body))
            .unwrap();
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn book(&self, session: &Session, event_id: &str, quantity: u32) -> Response {
        let quantity = quantity.to_string();
        self.post_csrf(&format!("/events/{}/book", event_id), session, &[("quantity", &quantity)]).await
    }

    pub async fn pay(&self, session: &Session, booking_id: &str) -> Response {
        self.post_csrf(&format!("/bookings/{}/checkout", booking_id), session, &[
            ("cardholder_name", "Test User"),
            ("card_number", "4242 4242 4242 4242"),
            ("expiry", "12/39"),
            ("cvv", "123"),
            ("accept_terms", "1"),
        ]).await
    }

    pub async fn set_setting(&self, key: &str, value: &str) {
        self.state.setting_repo
            .upsert_many(&[(key.to_string(), value.to_string())], &self.admin.id)
            .await
            .unwrap();
    }

    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.emails.sent.lock().unwrap().clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

/// Name/value pairs of every Set-Cookie header.
pub fn set_cookies(response: &Response) -> Vec<(String, String)> {
    response.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .filter_map(|c| {
            let pair = c.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

pub fn location(response: &Response) -> String {
    response.headers()
        .get(header::LOCATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// The flash message set by a response, as (kind, message).
pub fn flash(response: &Response) -> Option<(String, String)> {
    let (_, raw) = set_cookies(response).into_iter().find(|(name, value)| name == "flash" && !value.is_empty())?;
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    let json: Value = serde_json::from_slice(&bytes).ok()?;
    Some((json["kind"].as_str()?.to_string(), json["message"].as_str()?.to_string()))
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

/// Booking id from a `/bookings/{id}/checkout` redirect.
pub fn booking_id_from(response: &Response) -> String {
    let target = location(response);
    target
        .strip_prefix("/bookings/")
        .and_then(|rest| rest.strip_suffix("/checkout"))
        .unwrap_or_else(|| panic!("unexpected redirect target {}", target))
        .to_string()
}
