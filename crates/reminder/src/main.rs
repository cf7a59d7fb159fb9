//! Scheduled deadline reminder for a university course platform.
//!
//! Each cycle logs in as every enrolled student, pulls the current
//! semester's homework, classifies it by urgency, and emails students
//! whose actionable deadlines changed since the previous poll.

mod config;
mod deadline;
mod logging;
mod mailer;
mod portal;
mod recovery;
mod store;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::{error, info, warn};

use config::AppConfig;
use deadline::DecisionEngine;
use mailer::Mailer;
use portal::{LoginOutcome, PortalClient};
use store::{RosterStore, SnapshotStore, UserRecord};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let app_config = AppConfig::load_default()?;
    let mailer = Mailer::new(app_config.mailer_config());
    let snapshots = SnapshotStore::new(&app_config.snapshot_dir)
        .with_context(|| format!("failed to prepare snapshot dir {}", app_config.snapshot_dir))?;

    info!(
        roster = %app_config.roster_path,
        poll_interval_secs = app_config.poll_interval_secs,
        "Reminder service starting"
    );

    loop {
        let pause = match run_cycle(&app_config, &mailer, &snapshots).await {
            Ok(processed) => {
                info!(processed, "Cycle complete");
                Duration::from_secs(app_config.poll_interval_secs)
            }
            Err(err) => {
                error!(error = %err, "Cycle failed");
                logging::append_error_log(Path::new(&app_config.error_log_path), "cycle", &err);
                Duration::from_secs(app_config.cycle_retry_delay_secs)
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                return Ok(());
            }
        }
    }
}

/// One full pass over the roster. Per-student failures are logged and
/// skipped; only roster-level problems abort the cycle.
async fn run_cycle(
    config: &AppConfig,
    mailer: &Mailer,
    snapshots: &SnapshotStore,
) -> Result<usize> {
    let roster = RosterStore::new(&config.roster_path);
    let mut users = roster.load_all()?;
    let mut processed = 0;

    for user in &mut users {
        match process_user(config, mailer, snapshots, user).await {
            Ok(()) => processed += 1,
            Err(err) => {
                warn!(student_id = %user.student_id, error = %err, "Skipping user this cycle");
                logging::append_error_log(
                    Path::new(&config.error_log_path),
                    &format!("user {}", user.student_id),
                    &err,
                );
            }
        }
    }

    roster.write_back(&users)?;
    Ok(processed)
}

async fn process_user(
    config: &AppConfig,
    mailer: &Mailer,
    snapshots: &SnapshotStore,
    user: &mut UserRecord,
) -> Result<()> {
    let thresholds = user.thresholds()?;

    // Sessions are per-student; a fresh client keeps cookie jars isolated.
    let client = PortalClient::new(config.portal_config())?;
    client.initialize_session().await?;

    match client.login(&user.student_id, &user.portal_password()).await? {
        LoginOutcome::Success => {
            if user.password_confirmed == 0 {
                user.password_confirmed = 1;
                user.password_notified = 0;
            }
        }
        outcome if outcome.is_auth_failure() => {
            handle_auth_failure(config, mailer, user, outcome).await;
            return Ok(());
        }
        _ => bail!("portal unreachable during login"),
    }

    let semester = client.fetch_current_semester().await?;
    let user_info = client.fetch_user_info().await?;
    info!(
        student_id = %user.student_id,
        name = user_info.name.as_deref().unwrap_or("?"),
        semester = %semester.name,
        "Logged in"
    );

    let courses = client.fetch_course_list(&semester.code).await?;
    let records = client.fetch_assignments(&courses).await?;

    let now = Local::now().naive_local();
    let engine = DecisionEngine::new(snapshots, mailer, config.report_dropped_records);
    engine
        .process(&user.student_id, &user.email, &records, thresholds, now)
        .await?;

    user.last_notified = Some(now);
    Ok(())
}

/// Marks the credential unconfirmed and sends the recovery email at most
/// once until the password is confirmed again. The notified flag is only
/// set after a successful send, so a failed send retries next poll.
async fn handle_auth_failure(
    config: &AppConfig,
    mailer: &Mailer,
    user: &mut UserRecord,
    outcome: LoginOutcome,
) {
    warn!(student_id = %user.student_id, ?outcome, "Login rejected");
    user.password_confirmed = 0;

    if user.password_notified != 0 {
        return;
    }

    let link = match recovery::recovery_link(&config.recovery_link_base, &user.student_id) {
        Ok(link) => link,
        Err(err) => {
            error!(student_id = %user.student_id, error = %err, "Cannot build recovery link");
            return;
        }
    };

    match mailer.send_recovery(&user.email, &link).await {
        Ok(()) => user.password_notified = 1,
        Err(err) => {
            warn!(student_id = %user.student_id, error = %err, "Recovery email failed; will retry");
        }
    }
}
