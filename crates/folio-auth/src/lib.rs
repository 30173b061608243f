//! Shared-password gate and stateless sessions for folio.
//!
//! - [`password`]: SHA-256 credential check
//! - [`token`]: signed, self-describing session tokens
//! - [`SessionKeeper`]: issues and checks tokens under the running deployment

pub mod password;
pub mod token;

use folio_config::AuthSettings;
use folio_core::unix_now_secs;
use tracing::debug;

pub use token::{SessionToken, TokenError};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "auth-token";

/// Outcome of inspecting a session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    /// No cookie was presented.
    Missing,
    /// The cookie holds a current session.
    Valid(SessionToken),
    /// The cookie is present but unusable and should be cleared.
    Invalid(TokenError),
}

impl SessionCheck {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionCheck::Valid(_))
    }
}

/// Issues and validates sessions for one deployment.
#[derive(Debug, Clone)]
pub struct SessionKeeper {
    settings: AuthSettings,
}

impl SessionKeeper {
    pub fn new(settings: AuthSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Checks a candidate password against the stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        password::verify_password(password, &self.settings.password_hash)
    }

    /// Issues a signed token stamped with the current epoch and time.
    pub fn issue(&self) -> Result<String, TokenError> {
        self.issue_at(unix_now_secs())
    }

    pub fn issue_at(&self, now: u64) -> Result<String, TokenError> {
        SessionToken::issue(self.settings.deployment_epoch, now).encode(&self.settings.session_secret)
    }

    /// Classifies a cookie value. Never fails: bad input is [`SessionCheck::Invalid`].
    pub fn check(&self, cookie: Option<&str>) -> SessionCheck {
        self.check_at(cookie, unix_now_secs())
    }

    pub fn check_at(&self, cookie: Option<&str>, now: u64) -> SessionCheck {
        let Some(value) = cookie.filter(|v| !v.is_empty()) else {
            return SessionCheck::Missing;
        };

        let result = SessionToken::decode(value, &self.settings.session_secret).and_then(|token| {
            token
                .ensure_current(
                    self.settings.deployment_epoch,
                    now,
                    self.settings.session_ttl.as_secs(),
                )
                .map(|()| token)
        });

        match result {
            Ok(token) => SessionCheck::Valid(token),
            Err(e) => {
                debug!("Rejected session cookie: {}", e);
                SessionCheck::Invalid(e)
            }
        }
    }
}
