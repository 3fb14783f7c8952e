use std::sync::Arc;
use crate::domain::ports::{
    AuthRepository, BookingRepository, CategoryRepository, EmailService, EventRepository,
    ImageStore, JobRepository, SettingRepository, UserRepository,
};
use crate::domain::models::setting::SiteSettings;
use crate::domain::services::auth_service::AuthService;
use crate::config::Config;
use crate::error::AppError;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub user_repo: Arc<dyn UserRepository>,
    pub category_repo: Arc<dyn CategoryRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub setting_repo: Arc<dyn SettingRepository>,
    pub auth_repo: Arc<dyn AuthRepository>,
    pub job_repo: Arc<dyn JobRepository>,
    pub auth_service: Arc<AuthService>,
    pub email_service: Arc<dyn EmailService>,
    pub image_store: Arc<dyn ImageStore>,
    pub templates: Arc<Tera>,
}

impl AppState {
    /// Current site settings with defaults filled in.
    pub async fn settings(&self) -> Result<SiteSettings, AppError> {
        Ok(SiteSettings::from_rows(self.setting_repo.all().await?))
    }
}
