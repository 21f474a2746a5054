//! Runtime configuration.

use std::{env, path::PathBuf};
use url::Url;

/// Environment variable which overrides the backend's base URL.
pub const BASE_URL_ENV_VAR: &str = "BEEHIVE_API_BASE_URL";
/// Environment variable which overrides where the session is persisted.
pub const SESSION_PATH_ENV_VAR: &str = "BEEHIVE_SESSION_PATH";

// The Android emulator reaches the host machine through 10.0.2.2
#[cfg(target_os = "android")]
const PLATFORM_BASE_URL: &str = "http://10.0.2.2:8000";
#[cfg(target_os = "ios")]
const PLATFORM_BASE_URL: &str = "http://localhost:8000";
#[cfg(not(any(target_os = "android", target_os = "ios")))]
const PLATFORM_BASE_URL: &str = "http://localhost:8000";

/// The base URL to use when nothing else was configured.
pub fn fallback_base_url() -> &'static str { PLATFORM_BASE_URL }

/// Pick a base URL, preferring an explicit value, then the environment, then
/// [`fallback_base_url()`]. Blank values are skipped.
pub fn resolve_base_url(
    explicit: Option<&str>,
    from_env: Option<&str>,
) -> Result<String, ConfigError> {
    let candidate = explicit
        .into_iter()
        .chain(from_env)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(PLATFORM_BASE_URL);

    Url::parse(candidate).map_err(|source| ConfigError::InvalidBaseUrl {
        url: candidate.to_string(),
        source,
    })?;

    // paths are appended verbatim, so avoid doubling up on slashes
    Ok(candidate.trim_end_matches('/').to_string())
}

/// Where the session is stored by default.
///
/// Priority:
/// 1. `$BEEHIVE_SESSION_PATH` if set
/// 2. `~/.beehive/session.json`
/// 3. `./.beehive/session.json`
pub fn default_session_path() -> PathBuf {
    env::var_os(SESSION_PATH_ENV_VAR)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".beehive")
                .join("session.json")
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub session_path: PathBuf,
    pub user_agent: String,
}

impl Config {
    /// Load the configuration from the environment, letting explicitly
    /// provided values win.
    pub fn from_env(
        base_url: Option<&str>,
        session_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let from_env = env::var(BASE_URL_ENV_VAR).ok();

        Ok(Config {
            base_url: resolve_base_url(base_url, from_env.as_deref())?,
            session_path: session_path.unwrap_or_else(default_session_path),
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("\"{}\" is not a valid base URL", url)]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
