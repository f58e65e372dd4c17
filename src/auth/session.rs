//! Who is using the app right now, and which screens they may reach.
//!
//! ```text
//!   LoggedOut ──login──▶ PendingStepUp ──verify_pin / verify_biometric──▶ Authenticated
//!       ▲          └────────(no PIN, no biometric)──────────────────────────────▲
//!       └──────────────────────────── logout (from any state) ─────────────────┘
//! ```

use serde::Serialize;

use crate::auth::biometric::BiometricAuthenticator;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::rate_limit::AttemptLimiter;
use crate::dto::{is_valid_pin, LoginRequest, RegisterRequest, SetPinRequest};
use crate::error::{AppError, AppResult};
use crate::models::{UserProfile, UserSession};
use crate::repository::UserRepository;
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "session", rename_all = "snake_case")]
pub enum SessionState {
    LoggedOut,
    PendingStepUp(UserSession),
    Authenticated(UserSession),
}

impl SessionState {
    pub fn user(&self) -> Option<&UserSession> {
        match self {
            SessionState::LoggedOut => None,
            SessionState::PendingStepUp(s) | SessionState::Authenticated(s) => Some(s),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    StepUp,
    Home,
    Calendar,
    Goals,
    Settings,
    AdminPanel,
}

pub fn can_access(state: &SessionState, route: Route) -> bool {
    match (state, route) {
        (SessionState::LoggedOut, Route::Login) => true,
        (SessionState::PendingStepUp(_), Route::StepUp | Route::Login) => true,
        (SessionState::Authenticated(s), Route::AdminPanel) => s.is_admin,
        (
            SessionState::Authenticated(_),
            Route::Home | Route::Calendar | Route::Goals | Route::Settings,
        ) => true,
        _ => false,
    }
}

pub fn start_route(state: &SessionState) -> Route {
    match state {
        SessionState::LoggedOut => Route::Login,
        SessionState::PendingStepUp(_) => Route::StepUp,
        SessionState::Authenticated(_) => Route::Home,
    }
}

fn login_key(username: &str) -> String {
    format!("login:{username}")
}

fn step_up_key(username: &str) -> String {
    format!("stepup:{username}")
}

pub struct SessionGate {
    users: UserRepository,
    settings: Settings,
    limiter: AttemptLimiter,
    state: SessionState,
}

impl SessionGate {
    pub fn new(users: UserRepository, settings: Settings, limiter: AttemptLimiter) -> Self {
        Self {
            users,
            settings,
            limiter,
            state: SessionState::LoggedOut,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The signed-in user, once any step-up check has passed.
    pub fn current_user(&self) -> Option<&UserSession> {
        match &self.state {
            SessionState::Authenticated(s) => Some(s),
            _ => None,
        }
    }

    /// Picks up the identity remembered by the last login.
    pub async fn restore(&mut self) -> AppResult<SessionState> {
        let Some(session) = self.settings.last_session().await? else {
            self.state = SessionState::LoggedOut;
            return Ok(self.state.clone());
        };

        // The account may have gone with a wiped store.
        if self.users.find_by_username(&session.username).await?.is_none() {
            tracing::warn!(username = %session.username, "Remembered user no longer exists");
            self.settings.forget_session().await?;
            self.state = SessionState::LoggedOut;
            return Ok(self.state.clone());
        }

        self.state = self.after_password(session).await?;
        tracing::info!(state = ?self.state, "Session restored");
        Ok(self.state.clone())
    }

    pub async fn login(&mut self, req: LoginRequest) -> AppResult<SessionState> {
        if !matches!(self.state, SessionState::LoggedOut) {
            return Err(AppError::InvalidState("Already signed in".into()));
        }
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::Validation("Please fill in every field".into()));
        }

        let key = login_key(&req.username);
        self.limiter.check(&key).await?;

        let user = self.users.find_by_username(&req.username).await?;
        let verified = match &user {
            Some(user) => verify_password(&req.password, &user.password_hash)?,
            None => false,
        };
        let Some(user) = user.filter(|_| verified) else {
            let remaining = self.limiter.record_failure(&key).await;
            tracing::warn!(username = %req.username, remaining, "Login failed");
            return Err(AppError::Unauthorized("Wrong username or password".into()));
        };
        self.limiter.reset(&key).await;

        let session = UserSession::from(&user);
        self.settings.remember_session(&session).await?;
        self.state = self.after_password(session).await?;

        tracing::info!(username = %user.username, state = ?self.state, "User logged in");
        Ok(self.state.clone())
    }

    pub async fn verify_pin(&mut self, pin: &str) -> AppResult<SessionState> {
        let session = self.pending()?.clone();

        let Some(stored) = self.settings.pin_hash(&session.username).await? else {
            return Err(AppError::Unauthorized("PIN unlock is not enabled".into()));
        };
        if !is_valid_pin(pin) {
            return Err(AppError::Validation("PIN must be exactly 4 digits".into()));
        }

        let key = step_up_key(&session.username);
        self.limiter.check(&key).await?;

        if !verify_password(pin, &stored)? {
            let remaining = self.limiter.record_failure(&key).await;
            tracing::warn!(username = %session.username, remaining, "Wrong PIN");
            return Err(AppError::Unauthorized("Wrong PIN".into()));
        }

        self.complete_step_up(session, &key).await
    }

    pub async fn verify_biometric<B>(&mut self, authenticator: &B) -> AppResult<SessionState>
    where
        B: BiometricAuthenticator + ?Sized,
    {
        let session = self.pending()?.clone();

        if !self.settings.biometric_enabled(&session.username).await? {
            return Err(AppError::Unauthorized(
                "Biometric unlock is not enabled".into(),
            ));
        }

        let key = step_up_key(&session.username);
        self.limiter.check(&key).await?;

        if let Err(e) = authenticator.authenticate().await {
            if e.counts_as_attempt() {
                self.limiter.record_failure(&key).await;
            }
            tracing::warn!(username = %session.username, error = %e, "Biometric check failed");
            return Err(AppError::Unauthorized(e.to_string()));
        }

        self.complete_step_up(session, &key).await
    }

    pub async fn logout(&mut self) -> AppResult<SessionState> {
        self.settings.forget_session().await?;
        if let Some(user) = self.state.user() {
            tracing::info!(username = %user.username, "User logged out");
        }
        self.state = SessionState::LoggedOut;
        Ok(self.state.clone())
    }

    /// Creates an account. Does not sign it in.
    pub async fn register(&self, req: RegisterRequest) -> AppResult<UserProfile> {
        req.check()?;
        let hash = hash_password(&req.password)?;
        let user = self
            .users
            .register(req.username.trim(), req.email.trim(), &hash)
            .await?;
        Ok(UserProfile::from(user))
    }

    pub async fn set_pin(&self, req: SetPinRequest) -> AppResult<()> {
        let user = self.require_user()?;
        req.check()?;
        let hash = hash_password(&req.pin)?;
        self.settings.set_pin_hash(&user.username, &hash).await?;
        tracing::info!(username = %user.username, "Unlock PIN set");
        Ok(())
    }

    pub async fn clear_pin(&self) -> AppResult<()> {
        let user = self.require_user()?;
        self.settings.clear_pin(&user.username).await?;
        tracing::info!(username = %user.username, "Unlock PIN removed");
        Ok(())
    }

    pub async fn set_biometric_enabled(&self, enabled: bool) -> AppResult<()> {
        let user = self.require_user()?;
        self.settings
            .set_biometric_enabled(&user.username, enabled)
            .await
    }

    async fn after_password(&self, session: UserSession) -> AppResult<SessionState> {
        if self.settings.step_up_required(&session.username).await? {
            Ok(SessionState::PendingStepUp(session))
        } else {
            Ok(SessionState::Authenticated(session))
        }
    }

    async fn complete_step_up(&mut self, session: UserSession, key: &str) -> AppResult<SessionState> {
        self.limiter.reset(key).await;
        tracing::info!(username = %session.username, "Step-up check passed");
        self.state = SessionState::Authenticated(session);
        Ok(self.state.clone())
    }

    fn pending(&self) -> AppResult<&UserSession> {
        match &self.state {
            SessionState::PendingStepUp(s) => Ok(s),
            _ => Err(AppError::InvalidState("No unlock check is pending".into())),
        }
    }

    fn require_user(&self) -> AppResult<&UserSession> {
        self.current_user()
            .ok_or_else(|| AppError::Unauthorized("Please sign in first".into()))
    }
}
