use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use crate::retry::{ReconnectPolicy, BASE_DELAY_MS, MAX_DELAY_MS};
use crate::url::DEFAULT_BASE_URL;

pub const ENV_BASE_URL: &str = "AGUI_BASE_URL";
pub const ENV_PROJECT: &str = "AGUI_PROJECT";
pub const ENV_SESSION: &str = "AGUI_SESSION";
pub const ENV_ACCESS_TOKEN: &str = "AGUI_ACCESS_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "AGUI_TIMEOUT_SECS";
pub const ENV_RECONNECT_BASE_MS: &str = "AGUI_RECONNECT_BASE_MS";
pub const ENV_RECONNECT_CAP_MS: &str = "AGUI_RECONNECT_CAP_MS";

/// Transport configuration for one agentic session.
#[derive(Debug, Clone)]
pub struct AgUiConfig {
    /// Backend origin, e.g. `https://ambient.example.com`.
    pub base_url: String,
    /// Project (namespace) owning the session.
    pub project: String,
    /// Session name; doubles as the thread id for new conversations.
    pub session: String,
    /// Optional bearer token passed to `Authorization`.
    pub access_token: Option<String>,
    /// Additional headers merged into every request.
    pub extra_headers: BTreeMap<String, String>,
    /// Timeout for command requests. Never applied to the push channel.
    pub timeout: Option<Duration>,
    /// Base delay for push-channel reconnects.
    pub reconnect_base: Duration,
    /// Cap for push-channel reconnect delays.
    pub reconnect_cap: Duration,
}

impl Default for AgUiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            project: String::new(),
            session: String::new(),
            access_token: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
            reconnect_base: Duration::from_millis(BASE_DELAY_MS),
            reconnect_cap: Duration::from_millis(MAX_DELAY_MS),
        }
    }
}

impl AgUiConfig {
    pub fn new(project: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            session: session.into(),
            ..Self::default()
        }
    }

    /// Reads the `AGUI_*` environment variables. Empty values count as unset.
    pub fn from_env() -> Self {
        let mut config = Self::new(
            env_string_opt(ENV_PROJECT).unwrap_or_default(),
            env_string_opt(ENV_SESSION).unwrap_or_default(),
        );
        if let Some(base_url) = env_string_opt(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        config.access_token = env_string_opt(ENV_ACCESS_TOKEN);
        config.timeout = env_u64_opt(ENV_TIMEOUT_SECS)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        if let Some(base_ms) = env_u64_opt(ENV_RECONNECT_BASE_MS) {
            config.reconnect_base = Duration::from_millis(base_ms);
        }
        if let Some(cap_ms) = env_u64_opt(ENV_RECONNECT_CAP_MS) {
            config.reconnect_cap = Duration::from_millis(cap_ms);
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_reconnect(mut self, base: Duration, cap: Duration) -> Self {
        self.reconnect_base = base;
        self.reconnect_cap = cap;
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.reconnect_base, self.reconnect_cap)
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u64_opt(key: &str) -> Option<u64> {
    env_string_opt(key).and_then(|value| value.parse().ok())
}
