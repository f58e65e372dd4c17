//! MentalCare: local wellbeing journal.
//!
//! Daily mood, journal and habit checklist per user, long-term goals on a
//! calendar, an optional PIN or biometric unlock after login, and a daily
//! reminder. Everything lives in one embedded SQLite database.

pub mod auth;
pub mod calendar;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod models;
pub mod quotes;
pub mod reminder;
pub mod repository;
pub mod settings;

use std::sync::Arc;

use auth::{AttemptLimiter, SessionGate};
use config::Config;
use db::Store;
use error::AppResult;
use repository::{GoalRepository, RecordRepository, UserRepository};
use settings::Settings;

/// Handles shared by every screen. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub settings: Settings,
    pub config: Arc<Config>,
    /// Shared by every [`SessionGate`], so throttling survives a new gate.
    pub limiter: AttemptLimiter,
}

impl AppState {
    pub async fn open(config: Config) -> AppResult<Self> {
        let store = Store::open(&config).await?;
        let state = Self {
            settings: Settings::new(store.clone()),
            limiter: AttemptLimiter::from_config(&config),
            store,
            config: Arc::new(config),
        };

        if let Some(password) = &state.config.seed_admin_password {
            if state
                .users()
                .ensure_admin(&state.config.seed_admin_email, password)
                .await?
            {
                tracing::info!("Seeded admin account");
            }
        }

        Ok(state)
    }

    pub fn records(&self) -> RecordRepository {
        RecordRepository::new(self.store.clone())
    }

    pub fn goals(&self) -> GoalRepository {
        GoalRepository::new(self.store.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.store.clone())
    }

    pub fn session_gate(&self) -> SessionGate {
        SessionGate::new(
            self.users(),
            self.settings.clone(),
            self.limiter.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_open_seeds_admin_when_configured() {
        let config = Config {
            seed_admin_password: Some("correcthorse".into()),
            ..Config::in_memory()
        };
        let state = AppState::open(config).await.unwrap();

        let admin = state.users().find_by_username("admin").await.unwrap().unwrap();
        assert!(admin.is_admin);
    }

    #[tokio::test]
    async fn test_gates_share_attempt_limits() {
        let config = Config {
            auth_max_attempts: 2,
            ..Config::in_memory()
        };
        let state = AppState::open(config).await.unwrap();
        let wrong = || dto::LoginRequest {
            username: "maria".into(),
            password: "wrongpass".into(),
        };

        let mut first = state.session_gate();
        for _ in 0..2 {
            assert!(matches!(
                first.login(wrong()).await,
                Err(error::AppError::Unauthorized(_))
            ));
        }

        let mut second = state.session_gate();
        assert!(matches!(
            second.login(wrong()).await,
            Err(error::AppError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_first_day_flow() {
        let state = AppState::open(Config::in_memory()).await.unwrap();
        let mut gate = state.session_gate();
        gate.register(dto::RegisterRequest {
            username: "maria".into(),
            email: "maria@example.com".into(),
            password: "correcthorse".into(),
            confirm_password: "correcthorse".into(),
        })
        .await
        .unwrap();
        let session = gate
            .login(dto::LoginRequest {
                username: "maria".into(),
                password: "correcthorse".into(),
            })
            .await
            .unwrap();
        let user = session.user().unwrap().username.clone();

        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let record = state.records().open_day(&user, today).await.unwrap();
        let record = record.with_mood("😊").set_habit_done("Exercise", true);
        state.records().upsert_record(record).await.unwrap();

        let saved = state.records().find_record(&user, today).await.unwrap().unwrap();
        assert_eq!(saved.emoji, "😊");
        assert_eq!(saved.completed_habits, vec!["Exercise".to_string()]);
    }
}
