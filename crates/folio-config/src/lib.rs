//! Server configuration for folio.
//!
//! Everything is read once at start-up from environment variables (after
//! `dotenvy` has merged any `.env` file) and is immutable afterwards.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use folio_core::{unix_now_secs, ModelConfig};
use rand::RngCore;
use tracing::{info, warn};

/// SHA-256 of the default password, `huhlo`.
pub const DEFAULT_PASSWORD_HASH: &str =
    "3ee0ef67e5441065fe9c8996436ba7b1e4a7c589662b35f07a41d435d3aae2cb";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_LOGIN_FAILURE_DELAY_MS: u64 = 1000;
pub const DEFAULT_ACKNOWLEDGMENT: &str = "I understand. I will only use the information about the site owner provided in the system prompt and respond in a kind and respectful manner.";

const DEFAULT_PERSONA: &str = include_str!("../prompts/persona.md");
const MIN_SECRET_LEN: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read persona prompt {path}: {source}")]
    Persona {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { key, reason: reason.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Structs
// ─────────────────────────────────────────────────────────────────────────────

/// Password gate and session cookie policy.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// SHA-256 digest of the single valid password.
    pub password_hash: [u8; 32],
    /// Marker embedded in every token; changing it revokes all sessions.
    pub deployment_epoch: u64,
    /// Key for the token signature.
    pub session_secret: Vec<u8>,
    pub session_ttl: Duration,
    /// Fixed delay applied before answering a wrong password.
    pub failure_delay: Duration,
    /// Adds `Secure` to the session cookie.
    pub secure_cookies: bool,
}

/// Persona and upstream model for the chat relay.
#[derive(Clone)]
pub struct ChatSettings {
    pub persona: String,
    pub acknowledgment: String,
    pub model: ModelConfig,
    pub api_key: String,
}

impl std::fmt::Debug for ChatSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSettings")
            .field("persona_len", &self.persona.len())
            .field("acknowledgment", &self.acknowledgment)
            .field("model", &self.model)
            .field("api_key_len", &self.api_key.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub auth: AuthSettings,
    pub chat: ChatSettings,
    /// Directory holding the static export of the site, if served here.
    pub static_dir: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────────────────

impl ServerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("FOLIO_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("FOLIO_BIND_ADDR", e.to_string()))?;

        let auth = AuthSettings {
            password_hash: parse_password_hash(
                get("FOLIO_PASSWORD_HASH").as_deref().unwrap_or(DEFAULT_PASSWORD_HASH),
            )?,
            deployment_epoch: match get("FOLIO_DEPLOYMENT_EPOCH") {
                Some(v) => parse_u64("FOLIO_DEPLOYMENT_EPOCH", &v)?,
                None => unix_now_secs(),
            },
            session_secret: match get("FOLIO_SESSION_SECRET") {
                Some(secret) if secret.len() < MIN_SECRET_LEN => {
                    return Err(ConfigError::invalid(
                        "FOLIO_SESSION_SECRET",
                        format!("must be at least {MIN_SECRET_LEN} bytes"),
                    ));
                }
                Some(secret) => secret.into_bytes(),
                None => {
                    warn!("FOLIO_SESSION_SECRET not set, sessions will not survive a restart");
                    random_secret()
                }
            },
            session_ttl: Duration::from_secs(match get("FOLIO_SESSION_TTL_SECS") {
                Some(v) => parse_u64("FOLIO_SESSION_TTL_SECS", &v)?,
                None => DEFAULT_SESSION_TTL_SECS,
            }),
            failure_delay: Duration::from_millis(match get("FOLIO_LOGIN_FAILURE_DELAY_MS") {
                Some(v) => parse_u64("FOLIO_LOGIN_FAILURE_DELAY_MS", &v)?,
                None => DEFAULT_LOGIN_FAILURE_DELAY_MS,
            }),
            secure_cookies: get("FOLIO_ENV")
                .or_else(|| get("NODE_ENV"))
                .is_some_and(|e| e.eq_ignore_ascii_case("production")),
        };

        let persona = match get("FOLIO_PERSONA_PATH") {
            Some(path) => {
                let path = PathBuf::from(path);
                let text = fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Persona { path: path.clone(), source })?;
                info!("Loaded persona prompt from {}", path.display());
                text
            }
            None => DEFAULT_PERSONA.to_string(),
        };

        let model = ModelConfig {
            model: get("FOLIO_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: get("FOLIO_LLM_API_BASE"),
        };

        let key_var = model.provider().api_key_var();
        let api_key = get(key_var).unwrap_or_default();
        if api_key.is_empty() {
            warn!("{} not configured, chat requests will fail upstream", key_var);
        }

        let chat = ChatSettings {
            persona: persona.trim().to_string(),
            acknowledgment: get("FOLIO_PERSONA_ACK")
                .unwrap_or_else(|| DEFAULT_ACKNOWLEDGMENT.to_string()),
            model,
            api_key,
        };

        Ok(Self {
            bind_addr,
            auth,
            chat,
            static_dir: get("FOLIO_STATIC_DIR").map(PathBuf::from),
        })
    }
}

fn parse_password_hash(hex_digest: &str) -> Result<[u8; 32], ConfigError> {
    let mut digest = [0u8; 32];
    hex::decode_to_slice(hex_digest.trim(), &mut digest)
        .map_err(|e| ConfigError::invalid("FOLIO_PASSWORD_HASH", format!("expected 64 hex chars: {e}")))?;
    Ok(digest)
}

fn parse_u64(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::invalid(key, e.to_string()))
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}
