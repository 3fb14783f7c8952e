use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::{info, warn};
use tracing::log::LevelFilter;

use crate::api::views::build_templates;
use crate::config::Config;
use crate::state::AppState;
use crate::error::AppError;
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::storage::local_image_store::LocalImageStore;
use crate::domain::models::user::{NewUserParams, User, UserRole, UserStatus};
use crate::domain::ports::UserRepository;
use crate::domain::services::auth_service::{hash_password, random_token, AuthService};
use crate::infra::repositories::{
    postgres_auth_repo::PostgresAuthRepo, postgres_booking_repo::PostgresBookingRepo,
    postgres_category_repo::PostgresCategoryRepo, postgres_event_repo::PostgresEventRepo,
    postgres_job_repo::PostgresJobRepo, postgres_setting_repo::PostgresSettingRepo,
    postgres_user_repo::PostgresUserRepo,
    sqlite_auth_repo::SqliteAuthRepo, sqlite_booking_repo::SqliteBookingRepo,
    sqlite_category_repo::SqliteCategoryRepo, sqlite_event_repo::SqliteEventRepo,
    sqlite_job_repo::SqliteJobRepo, sqlite_setting_repo::SqliteSettingRepo,
    sqlite_user_repo::SqliteUserRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;
    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));
    let image_store = Arc::new(LocalImageStore::new(&config.upload_dir));
    let templates = Arc::new(build_templates(config.tz()).expect("Failed to load templates"));

    let state = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        let auth_repo = Arc::new(PostgresAuthRepo::new(pool.clone()));
        let auth_service = Arc::new(AuthService::new(auth_repo.clone(), config.clone()));

        AppState {
            config: config.clone(),
            user_repo: Arc::new(PostgresUserRepo::new(pool.clone())),
            category_repo: Arc::new(PostgresCategoryRepo::new(pool.clone())),
            event_repo: Arc::new(PostgresEventRepo::new(pool.clone())),
            booking_repo: Arc::new(PostgresBookingRepo::new(pool.clone())),
            setting_repo: Arc::new(PostgresSettingRepo::new(pool.clone())),
            auth_repo,
            job_repo: Arc::new(PostgresJobRepo::new(pool.clone())),
            auth_service,
            email_service,
            image_store,
            templates,
        }
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        let auth_repo = Arc::new(SqliteAuthRepo::new(pool.clone()));
        let auth_service = Arc::new(AuthService::new(auth_repo.clone(), config.clone()));

        AppState {
            config: config.clone(),
            user_repo: Arc::new(SqliteUserRepo::new(pool.clone())),
            category_repo: Arc::new(SqliteCategoryRepo::new(pool.clone())),
            event_repo: Arc::new(SqliteEventRepo::new(pool.clone())),
            booking_repo: Arc::new(SqliteBookingRepo::new(pool.clone())),
            setting_repo: Arc::new(SqliteSettingRepo::new(pool.clone())),
            auth_repo,
            job_repo: Arc::new(SqliteJobRepo::new(pool.clone())),
            auth_service,
            email_service,
            image_store,
            templates,
        }
    };

    ensure_admin(state.user_repo.as_ref(), config).await
        .expect("Failed to bootstrap admin account");

    state
}

/// Creates the first admin account when none exists yet.
pub async fn ensure_admin(user_repo: &dyn UserRepository, config: &Config) -> Result<Option<User>, AppError> {
    if user_repo.count_by_role(UserRole::Admin).await? > 0 {
        return Ok(None);
    }

    let password = match &config.admin_password {
        Some(p) => p.clone(),
        None => {
            let generated = random_token(16);
            warn!(email = %config.admin_email, password = %generated, "No ADMIN_PASSWORD set; generated a one-time admin password");
            generated
        }
    };

    let admin = User::new(NewUserParams {
        first_name: "Site".to_string(),
        last_name: "Admin".to_string(),
        email: config.admin_email.clone(),
        phone: None,
        password_hash: hash_password(&password)?,
        role: UserRole::Admin,
        status: UserStatus::Active,
        created_by: None,
    });
    let created = user_repo.create(&admin).await?;
    info!("Bootstrapped admin account {}", created.email);
    Ok(Some(created))
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
