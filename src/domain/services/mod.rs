pub mod auth_service;
pub mod calendar;
pub mod checkout;
pub mod csv_export;
pub mod money;
pub mod notifications;
pub mod periods;
pub mod reports;
pub mod validation;
