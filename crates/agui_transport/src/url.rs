/// Default backend origin for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Resolved endpoint URLs for one agentic session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEndpoints {
    pub events: String,
    pub run: String,
    pub interrupt: String,
    pub export: String,
}

/// Build the session-scoped API prefix.
///
/// Normalization rules:
/// 1) blank base URLs fall back to [`DEFAULT_BASE_URL`]
/// 2) trailing slashes and a trailing `/api` are dropped before re-appending `/api`
pub fn session_base_url(base_url: &str, project: &str, session: &str) -> String {
    let base = if base_url.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        base_url.trim()
    };
    let trimmed = base.trim_end_matches('/');
    let origin = trimmed.strip_suffix("/api").unwrap_or(trimmed);
    format!(
        "{origin}/api/projects/{}/agentic-sessions/{}",
        project.trim(),
        session.trim()
    )
}

pub fn session_endpoints(base_url: &str, project: &str, session: &str) -> SessionEndpoints {
    let prefix = session_base_url(base_url, project, session);
    SessionEndpoints {
        events: format!("{prefix}/agui/events"),
        run: format!("{prefix}/agui/run"),
        interrupt: format!("{prefix}/agui/interrupt"),
        export: format!("{prefix}/export"),
    }
}
