use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, warn, info_span, Instrument};
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::models::booking::{Actor, BookingStatus, StatusChange};
use crate::domain::models::job::{Job, BOOKING_CONFIRMED, EVENT_CANCELLED};
use crate::domain::services::calendar::generate_ics;
use crate::domain::services::notifications;

const BATCH_SIZE: i32 = 10;
pub const EXPIRED_ACTION: &str = "Expired: payment not completed";

pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting background job worker...");

    loop {
        if let Err(e) = process_pending_jobs(&state).await {
            error!("Failed to fetch pending jobs: {:?}", e);
        }
        if let Err(e) = expire_stale_bookings(&state).await {
            error!("Failed to expire stale bookings: {:?}", e);
        }
        sleep(Duration::from_secs(5)).await;
    }
}

/// Claims and runs one batch of due jobs. Returns how many were claimed.
pub async fn process_pending_jobs(state: &Arc<AppState>) -> Result<usize, AppError> {
    let jobs = state.job_repo.find_pending(BATCH_SIZE).await?;
    let claimed = jobs.len();

    for job in jobs {
        let span = info_span!(
            "background_job",
            job_id = %job.id,
            job_type = %job.job_type,
            booking_id = %job.payload.booking_id
        );

        async {
            info!("Processing job: {}", job.job_type);
            match process_job(state, &job).await {
                Ok(_) => {
                    info!("Job completed successfully");
                    if let Err(e) = state.job_repo.update_status(&job.id, "COMPLETED", None).await {
                        error!("Failed to mark job as completed: {:?}", e);
                    }
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    error!("Job failed with error: {}", err_msg);
                    if let Err(up_err) = state.job_repo.update_status(&job.id, "FAILED", Some(err_msg)).await {
                        error!("Failed to mark job as failed: {:?}", up_err);
                    }
                }
            }
        }
            .instrument(span)
            .await;
    }

    Ok(claimed)
}

async fn process_job(state: &Arc<AppState>, job: &Job) -> Result<(), AppError> {
    let booking_id = &job.payload.booking_id;
    let detail = state.booking_repo.find_detail(booking_id).await?
        .ok_or(AppError::NotFound(format!("Booking {} not found", booking_id)))?;
    let settings = state.settings().await?;
    let tz = state.config.tz();

    match job.job_type.as_str() {
        BOOKING_CONFIRMED => {
            let email = notifications::booking_confirmed(&state.templates, &detail, &settings, &state.config.base_url, tz)?;
            let ics = generate_ics(&detail, &settings.site_name);
            state.email_service.send(
                &detail.customer_email,
                &email.subject,
                &email.html_body,
                Some("ticket.ics"),
                Some(ics.as_bytes()),
            ).await
        }
        EVENT_CANCELLED => {
            let email = notifications::event_cancelled(&state.templates, &detail, &settings, &state.config.base_url, tz)?;
            state.email_service.send(&detail.customer_email, &email.subject, &email.html_body, None, None).await
        }
        other => Err(AppError::InternalWithMsg(format!("Unknown job type {}", other))),
    }
}

/// Cancels pending bookings whose payment window has passed. Returns how many were expired.
pub async fn expire_stale_bookings(state: &Arc<AppState>) -> Result<usize, AppError> {
    let settings = state.settings().await?;
    let cutoff = chrono::TimeDelta::try_minutes(settings.booking_time_limit)
        .and_then(|limit| Utc::now().checked_sub_signed(limit))
        .ok_or_else(|| AppError::InternalWithMsg(format!("Booking time limit {} is out of range", settings.booking_time_limit)))?;
    let stale = state.booking_repo.list_stale_pending(cutoff).await?;

    let mut expired = 0;
    for booking in stale {
        let change = match StatusChange::new(&booking, BookingStatus::Cancelled, Actor::System, None, EXPIRED_ACTION) {
            Ok(change) => change,
            Err(msg) => {
                warn!(booking_id = %booking.id, "Skipping expiry: {}", msg);
                continue;
            }
        };
        match state.booking_repo.apply_status_change(&change).await {
            Ok(_) => {
                info!(booking_id = %booking.id, "Expired unpaid booking");
                expired += 1;
            }
            // Paid or cancelled between the scan and the update.
            Err(AppError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(expired)
}
