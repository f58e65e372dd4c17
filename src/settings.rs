//! Persisted key-value settings.
//!
//! Key namespace:
//! - global keys: [`DARK_MODE`], [`FONT_SCALE`], [`LAST_USERNAME`],
//!   [`LAST_IS_ADMIN`], [`NOTIFICATIONS_ENABLED`], [`NOTIFICATION_HOUR`],
//!   [`NOTIFICATION_MINUTE`]
//! - per-user keys: `security_pin_<username>` (argon2 hash of the unlock PIN)
//!   and `use_biometric_<username>`
//!
//! Values are stored as JSON text in the `settings` table. Every write is
//! published on the store change feed as [`Table::Settings`].

use std::ops::RangeInclusive;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::db::{Store, Table};
use crate::error::{AppError, AppResult};
use crate::models::UserSession;
use crate::reminder::ReminderSettings;

pub const DARK_MODE: &str = "dark_mode";
pub const FONT_SCALE: &str = "font_size_multiplier";
pub const LAST_USERNAME: &str = "last_username";
pub const LAST_IS_ADMIN: &str = "last_is_admin";
pub const NOTIFICATIONS_ENABLED: &str = "notifications_enabled";
pub const NOTIFICATION_HOUR: &str = "notification_hour";
pub const NOTIFICATION_MINUTE: &str = "notification_minute";

const PIN_PREFIX: &str = "security_pin_";
const BIOMETRIC_PREFIX: &str = "use_biometric_";

pub const FONT_SCALE_RANGE: RangeInclusive<f32> = 0.8..=1.5;
pub const DEFAULT_FONT_SCALE: f32 = 1.0;

pub fn pin_key(username: &str) -> String {
    format!("{PIN_PREFIX}{username}")
}

pub fn biometric_key(username: &str) -> String {
    format!("{BIOMETRIC_PREFIX}{username}")
}

#[derive(Clone)]
pub struct Settings {
    store: Store,
}

impl Settings {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Change feed; settings writes arrive as `Table::Settings`.
    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.store.subscribe()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let raw = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.store.pool())
            .await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        self.put_many(&[(key, serde_json::to_value(value)?)]).await
    }

    /// Writes several keys in one transaction.
    pub async fn put_many(&self, entries: &[(&str, Value)]) -> AppResult<()> {
        let mut tx = self.store.pool().begin().await?;
        for (key, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO settings (key, value) VALUES (?, ?)
                ON CONFLICT (key) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(*key)
            .bind(value.to_string())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.store.notify(Table::Settings);
        Ok(())
    }

    pub async fn remove(&self, keys: &[&str]) -> AppResult<()> {
        let mut tx = self.store.pool().begin().await?;
        for key in keys {
            sqlx::query("DELETE FROM settings WHERE key = ?")
                .bind(*key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.store.notify(Table::Settings);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Appearance
    // ------------------------------------------------------------------

    pub async fn dark_mode(&self) -> AppResult<bool> {
        Ok(self.get(DARK_MODE).await?.unwrap_or(false))
    }

    pub async fn set_dark_mode(&self, enabled: bool) -> AppResult<()> {
        self.put(DARK_MODE, &enabled).await
    }

    pub async fn font_scale(&self) -> AppResult<f32> {
        let scale: f32 = self.get(FONT_SCALE).await?.unwrap_or(DEFAULT_FONT_SCALE);
        // A value written by an older build may fall outside the slider range.
        Ok(scale.clamp(*FONT_SCALE_RANGE.start(), *FONT_SCALE_RANGE.end()))
    }

    pub async fn set_font_scale(&self, scale: f32) -> AppResult<()> {
        if !FONT_SCALE_RANGE.contains(&scale) {
            return Err(AppError::Validation(format!(
                "Font scale must be between {} and {}",
                FONT_SCALE_RANGE.start(),
                FONT_SCALE_RANGE.end()
            )));
        }
        self.put(FONT_SCALE, &scale).await
    }

    // ------------------------------------------------------------------
    // Remembered session
    // ------------------------------------------------------------------

    pub async fn last_session(&self) -> AppResult<Option<UserSession>> {
        let Some(username) = self.get::<String>(LAST_USERNAME).await? else {
            return Ok(None);
        };
        let is_admin = self.get(LAST_IS_ADMIN).await?.unwrap_or(false);
        Ok(Some(UserSession { username, is_admin }))
    }

    pub async fn remember_session(&self, session: &UserSession) -> AppResult<()> {
        self.put_many(&[
            (LAST_USERNAME, Value::from(session.username.as_str())),
            (LAST_IS_ADMIN, Value::from(session.is_admin)),
        ])
        .await
    }

    pub async fn forget_session(&self) -> AppResult<()> {
        self.remove(&[LAST_USERNAME, LAST_IS_ADMIN]).await
    }

    // ------------------------------------------------------------------
    // Daily reminder
    // ------------------------------------------------------------------

    pub async fn reminder(&self) -> AppResult<ReminderSettings> {
        let defaults = ReminderSettings::default();
        Ok(ReminderSettings {
            enabled: self
                .get(NOTIFICATIONS_ENABLED)
                .await?
                .unwrap_or(defaults.enabled),
            hour: self.get(NOTIFICATION_HOUR).await?.unwrap_or(defaults.hour),
            minute: self
                .get(NOTIFICATION_MINUTE)
                .await?
                .unwrap_or(defaults.minute),
        })
    }

    pub async fn set_reminder(&self, reminder: ReminderSettings) -> AppResult<()> {
        reminder.validate()?;
        self.put_many(&[
            (NOTIFICATIONS_ENABLED, Value::from(reminder.enabled)),
            (NOTIFICATION_HOUR, Value::from(reminder.hour)),
            (NOTIFICATION_MINUTE, Value::from(reminder.minute)),
        ])
        .await
    }

    // ------------------------------------------------------------------
    // Per-user unlock
    // ------------------------------------------------------------------

    pub async fn pin_hash(&self, username: &str) -> AppResult<Option<String>> {
        self.get(&pin_key(username)).await
    }

    pub async fn set_pin_hash(&self, username: &str, hash: &str) -> AppResult<()> {
        self.put(&pin_key(username), hash).await
    }

    pub async fn clear_pin(&self, username: &str) -> AppResult<()> {
        let key = pin_key(username);
        self.remove(&[key.as_str()]).await
    }

    pub async fn biometric_enabled(&self, username: &str) -> AppResult<bool> {
        Ok(self.get(&biometric_key(username)).await?.unwrap_or(false))
    }

    pub async fn set_biometric_enabled(&self, username: &str, enabled: bool) -> AppResult<()> {
        self.put(&biometric_key(username), &enabled).await
    }

    /// A user who turned on biometric unlock or set a PIN must pass a step-up
    /// check after the password.
    pub async fn step_up_required(&self, username: &str) -> AppResult<bool> {
        Ok(self.biometric_enabled(username).await? || self.pin_hash(username).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_store;

    async fn settings() -> Settings {
        Settings::new(test_store().await)
    }

    #[tokio::test]
    async fn test_defaults_when_nothing_stored() {
        let settings = settings().await;
        assert!(!settings.dark_mode().await.unwrap());
        assert_eq!(settings.font_scale().await.unwrap(), 1.0);
        assert!(settings.last_session().await.unwrap().is_none());
        assert_eq!(settings.reminder().await.unwrap(), ReminderSettings::default());
        assert!(!settings.step_up_required("maria").await.unwrap());
    }

    #[tokio::test]
    async fn test_font_scale_range_is_enforced() {
        let settings = settings().await;
        settings.set_font_scale(1.25).await.unwrap();
        assert_eq!(settings.font_scale().await.unwrap(), 1.25);

        assert!(matches!(
            settings.set_font_scale(2.0).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(settings.font_scale().await.unwrap(), 1.25);
    }

    #[tokio::test]
    async fn test_session_is_remembered_and_forgotten() {
        let settings = settings().await;
        let session = UserSession {
            username: "admin".into(),
            is_admin: true,
        };

        settings.remember_session(&session).await.unwrap();
        assert_eq!(settings.last_session().await.unwrap(), Some(session));

        settings.forget_session().await.unwrap();
        assert!(settings.last_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unlock_keys_are_per_user() {
        let settings = settings().await;
        settings.set_pin_hash("maria", "$argon2id$hash").await.unwrap();
        settings.set_biometric_enabled("pablo", true).await.unwrap();

        assert!(settings.step_up_required("maria").await.unwrap());
        assert!(settings.step_up_required("pablo").await.unwrap());
        assert!(!settings.step_up_required("lucia").await.unwrap());
        assert!(settings.pin_hash("pablo").await.unwrap().is_none());

        settings.clear_pin("maria").await.unwrap();
        assert!(!settings.step_up_required("maria").await.unwrap());
    }

    #[tokio::test]
    async fn test_writes_publish_settings_change() {
        let settings = settings().await;
        let mut changes = settings.subscribe();

        settings.set_dark_mode(true).await.unwrap();
        assert_eq!(changes.recv().await.unwrap(), Table::Settings);
        assert!(settings.dark_mode().await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_reminder_time_is_rejected() {
        let settings = settings().await;
        let bad = ReminderSettings {
            enabled: true,
            hour: 24,
            minute: 0,
        };
        assert!(matches!(
            settings.set_reminder(bad).await,
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_key_namespace() {
        assert_eq!(pin_key("maria"), "security_pin_maria");
        assert_eq!(biometric_key("maria"), "use_biometric_maria");
    }
}
