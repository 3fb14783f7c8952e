pub mod account;
pub mod admin_booking;
pub mod admin_dashboard;
pub mod admin_event;
pub mod admin_user;
pub mod auth;
pub mod booking;
pub mod category;
pub mod event;
pub mod health;
pub mod home;
pub mod report;
pub mod setting;
