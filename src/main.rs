use std::time::Duration;

use chrono::Local;
use tokio::sync::broadcast::error::RecvError;

use mentalcare::config::Config;
use mentalcare::db::Table;
use mentalcare::reminder::{ReminderScheduler, TokioAlarmClock, TracingNotifier};
use mentalcare::AppState;

/// Settings written by another process never reach this process's change
/// feed, so the alarm is also re-synced on a timer.
const RESYNC_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mentalcare=debug,sqlx=warn".into());
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env()?;
    let state = AppState::open(config).await?;
    tracing::info!("Store ready");

    let (alarm, mut fires) = TokioAlarmClock::new();
    let scheduler = ReminderScheduler::new(state.settings.clone(), alarm, TracingNotifier);
    let mut changes = state.settings.subscribe();
    let mut resync = tokio::time::interval(RESYNC_INTERVAL);

    scheduler.sync(Local::now().naive_local()).await?;

    loop {
        tokio::select! {
            Some(fired_at) = fires.recv() => {
                tracing::debug!(fired_at = %fired_at, "Reminder alarm fired");
                if let Err(e) = scheduler.handle_fire(Local::now().naive_local()).await {
                    tracing::error!(error = %e, "Reminder fire handling failed");
                }
            }
            change = changes.recv() => {
                match change {
                    Ok(Table::Settings) | Err(RecvError::Lagged(_)) => {}
                    Ok(_) => continue,
                    Err(RecvError::Closed) => break,
                }
                if let Err(e) = scheduler.sync(Local::now().naive_local()).await {
                    tracing::error!(error = %e, "Reminder sync failed");
                }
            }
            _ = resync.tick() => {
                if let Err(e) = scheduler.sync(Local::now().naive_local()).await {
                    tracing::error!(error = %e, "Reminder sync failed");
                }
                let purged = state.limiter.cleanup().await;
                if purged > 0 {
                    tracing::debug!(purged, "Expired attempt counters dropped");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
