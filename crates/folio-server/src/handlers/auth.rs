//! Password gate: login, session check and logout.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use folio_auth::{SessionCheck, SESSION_COOKIE};
use folio_config::AuthSettings;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dto::{AuthResponse, SessionStatus};
use crate::error::AppError;
use crate::ServerState;

/// Verifies the shared password and sets a session cookie on success.
pub async fn login(
    State(state): State<Arc<ServerState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::internal(format!("unreadable auth body: {e}")))?;

    let password = payload
        .get("password")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Password is required".into()))?;

    if !state.sessions.verify_password(password) {
        let delay = state.sessions.settings().failure_delay;
        warn!("Rejected login attempt, replying after {} ms", delay.as_millis());
        tokio::time::sleep(delay).await;
        return Err(AppError::Unauthorized("Invalid password".into()));
    }

    let token = state.sessions.issue().map_err(AppError::internal)?;
    info!("Login succeeded, session issued");

    let jar = jar.add(session_cookie(token, state.sessions.settings()));
    Ok((jar, Json(AuthResponse { success: true, message: "Authentication successful" })))
}

/// Reports whether the request carries a current session. Clears unusable cookies.
pub async fn status(
    State(state): State<Arc<ServerState>>,
    jar: CookieJar,
) -> (CookieJar, Json<SessionStatus>) {
    let check = state.sessions.check(jar.get(SESSION_COOKIE).map(Cookie::value));
    let authenticated = check.is_authenticated();

    let jar = match check {
        SessionCheck::Invalid(reason) => {
            debug!("Clearing unusable session cookie: {}", reason);
            jar.add(removal_cookie())
        }
        _ => jar,
    };

    (jar, Json(SessionStatus { authenticated }))
}

/// Clears the session cookie. Succeeds whether or not a session existed.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<AuthResponse>) {
    info!("Logout requested");
    (jar.add(removal_cookie()), Json(AuthResponse { success: true, message: "Logged out successfully" }))
}

fn session_cookie(token: String, settings: &AuthSettings) -> Cookie<'static> {
    let max_age = i64::try_from(settings.session_ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(settings.secure_cookies)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(max_age))
        .path("/")
        .build()
}

// Added unconditionally so the browser drops the cookie even when the
// request did not present it.
fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(secure: bool) -> AuthSettings {
        AuthSettings {
            password_hash: [0; 32],
            deployment_epoch: 1,
            session_secret: vec![7; 32],
            session_ttl: Duration::from_secs(86_400),
            failure_delay: Duration::from_millis(1000),
            secure_cookies: secure,
        }
    }

    #[test]
    fn test_session_cookie_attributes() {
        let rendered = session_cookie("abc".into(), &settings(false)).to_string();
        assert!(rendered.starts_with("auth-token=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Max-Age=86400"));
        assert!(rendered.contains("Path=/"));
        assert!(!rendered.contains("Secure"));

        let secure = session_cookie("abc".into(), &settings(true)).to_string();
        assert!(secure.contains("Secure"));
    }

    #[test]
    fn test_removal_cookie_expires_now() {
        let rendered = removal_cookie().to_string();
        assert!(rendered.starts_with("auth-token=;"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("Path=/"));
    }
}
