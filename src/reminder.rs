//! Daily reminder scheduling.
//!
//! The chain is driven by one idempotent operation, [`ReminderScheduler::sync`]:
//! read the persisted reminder settings, then arm the alarm for the next
//! occurrence or cancel it. It runs whenever the settings change and again
//! each time the alarm fires, so the next day's alarm never depends on data
//! carried by the fire event.

use std::sync::Mutex;

use anyhow::anyhow;
use chrono::{Duration, Local, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};
use crate::quotes::daily_quote;
use crate::settings::Settings;

pub const REMINDER_TITLE: &str = "MentalCare 🌟";
pub const REMINDER_BODY: &str = "Time to log how you are feeling today.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 20,
            minute: 0,
        }
    }
}

impl ReminderSettings {
    pub fn validate(&self) -> AppResult<()> {
        self.time().map(|_| ())
    }

    pub fn time(&self) -> AppResult<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).ok_or_else(|| {
            AppError::Validation(format!(
                "Reminder time {:02}:{:02} is not a valid time of day",
                self.hour, self.minute
            ))
        })
    }
}

/// Next wall-clock occurrence of `hour:minute`: today if still strictly in
/// the future, otherwise tomorrow.
pub fn next_fire_time(now: NaiveDateTime, hour: u32, minute: u32) -> AppResult<NaiveDateTime> {
    let time = ReminderSettings {
        enabled: true,
        hour,
        minute,
    }
    .time()?;

    let today = now.date().and_time(time);
    if today > now {
        Ok(today)
    } else {
        Ok(today + Duration::days(1))
    }
}

/// One-shot wake-up. Arming replaces any pending wake-up.
pub trait AlarmClock: Send + Sync {
    fn arm(&self, at: NaiveDateTime) -> anyhow::Result<()>;
    fn cancel(&self) -> anyhow::Result<()>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> anyhow::Result<()>;
}

/// Writes reminders to the log instead of a platform notification centre.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(title = %title, body = %body, "Reminder notification");
        Ok(())
    }
}

pub struct ReminderScheduler<A, N> {
    settings: Settings,
    alarm: A,
    notifier: N,
}

impl<A: AlarmClock, N: Notifier> ReminderScheduler<A, N> {
    pub fn new(settings: Settings, alarm: A, notifier: N) -> Self {
        Self {
            settings,
            alarm,
            notifier,
        }
    }

    pub fn alarm(&self) -> &A {
        &self.alarm
    }

    /// Arms the next occurrence or cancels, per the stored settings. Returns
    /// the armed time. Alarm failures are logged, not returned.
    pub async fn sync(&self, now: NaiveDateTime) -> AppResult<Option<NaiveDateTime>> {
        let reminder = self.settings.reminder().await?;

        if !reminder.enabled {
            if let Err(e) = self.alarm.cancel() {
                tracing::error!(error = %e, "Failed to cancel reminder");
            }
            tracing::debug!("Reminder disabled, alarm cancelled");
            return Ok(None);
        }

        let at = next_fire_time(now, reminder.hour, reminder.minute)?;
        match self.alarm.arm(at) {
            Ok(()) => {
                tracing::info!(fire_at = %at, "Reminder armed");
                Ok(Some(at))
            }
            Err(e) => {
                tracing::error!(error = %e, fire_at = %at, "Failed to arm reminder");
                Ok(None)
            }
        }
    }

    /// Persist new settings and re-arm.
    pub async fn update(
        &self,
        reminder: ReminderSettings,
        now: NaiveDateTime,
    ) -> AppResult<Option<NaiveDateTime>> {
        self.settings.set_reminder(reminder).await?;
        self.sync(now).await
    }

    /// The alarm went off: show the notification if reminders are still on,
    /// then arm the next occurrence.
    pub async fn handle_fire(&self, now: NaiveDateTime) -> AppResult<Option<NaiveDateTime>> {
        let reminder = self.settings.reminder().await?;

        if reminder.enabled {
            let body = format!("{REMINDER_BODY}\n{}", daily_quote(now.date()));
            if let Err(e) = self.notifier.notify(REMINDER_TITLE, &body) {
                tracing::error!(error = %e, "Failed to show reminder notification");
            }
        }

        self.sync(now).await
    }
}

/// [`AlarmClock`] backed by a tokio sleep task. When the task wakes it sends
/// the time it was armed for on the channel returned by [`TokioAlarmClock::new`].
pub struct TokioAlarmClock {
    pending: Mutex<Option<(NaiveDateTime, JoinHandle<()>)>>,
    fire_tx: mpsc::UnboundedSender<NaiveDateTime>,
}

impl TokioAlarmClock {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NaiveDateTime>) {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        let clock = Self {
            pending: Mutex::new(None),
            fire_tx,
        };
        (clock, fire_rx)
    }

    pub fn armed_at(&self) -> Option<NaiveDateTime> {
        self.pending
            .lock()
            .ok()
            .and_then(|pending| pending.as_ref().map(|(at, _)| *at))
    }
}

impl AlarmClock for TokioAlarmClock {
    fn arm(&self, at: NaiveDateTime) -> anyhow::Result<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| anyhow!("alarm state poisoned"))?;

        if let Some((armed_at, handle)) = pending.as_ref() {
            if *armed_at == at && !handle.is_finished() {
                return Ok(());
            }
        }

        let delay = delay_until(at)?;
        let tx = self.fire_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(at);
        });

        if let Some((_, previous)) = pending.replace((at, handle)) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel(&self) -> anyhow::Result<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| anyhow!("alarm state poisoned"))?;
        if let Some((_, handle)) = pending.take() {
            handle.abort();
        }
        Ok(())
    }
}

/// Time left until a local wall-clock instant; zero if it already passed.
fn delay_until(at: NaiveDateTime) -> anyhow::Result<std::time::Duration> {
    // A time skipped by a DST jump fires one hour later.
    let target = Local
        .from_local_datetime(&at)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(at + Duration::hours(1))).earliest())
        .ok_or_else(|| anyhow!("{at} does not exist in the local time zone"))?;

    Ok((target - Local::now())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO))
}
