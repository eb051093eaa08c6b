use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, warn};

use event_log::SessionExport;

use crate::config::AgUiConfig;
use crate::error::{parse_error_message, CommandError, TransportError};
use crate::headers::{build_headers, ACCEPT_EVENT_STREAM, ACCEPT_JSON};
use crate::payload::{InterruptRequest, RunMetadata, StartRunRequest};
use crate::url::{session_endpoints, SessionEndpoints};

/// HTTP client for one agentic session's AG-UI endpoints.
#[derive(Debug, Clone)]
pub struct AgUiClient {
    http: Client,
    config: AgUiConfig,
    endpoints: SessionEndpoints,
}

impl AgUiClient {
    pub fn new(config: AgUiConfig) -> Result<Self, TransportError> {
        // No client-wide timeout: it would also cut the long-lived event stream.
        let http = Client::builder().build()?;
        let endpoints = session_endpoints(&config.base_url, &config.project, &config.session);
        Ok(Self {
            http,
            config,
            endpoints,
        })
    }

    pub fn config(&self) -> &AgUiConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &SessionEndpoints {
        &self.endpoints
    }

    /// Thread id used for start-run commands. The session name is the thread.
    pub fn thread_id(&self) -> &str {
        &self.config.session
    }

    pub fn build_headers(&self, accept: &str) -> Result<HeaderMap, String> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config, accept) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| format!("invalid header key: {key}"))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| format!("invalid header value for {key}"))?,
            );
        }
        Ok(out)
    }

    /// Request for the push channel, optionally scoped to one run's replay.
    pub fn build_events_request(
        &self,
        resume_run_id: Option<&str>,
    ) -> Result<RequestBuilder, TransportError> {
        let headers = self
            .build_headers(ACCEPT_EVENT_STREAM)
            .map_err(TransportError::InvalidHeader)?;
        let mut request = self.http.get(&self.endpoints.events).headers(headers);
        if let Some(run_id) = resume_run_id.map(str::trim).filter(|id| !id.is_empty()) {
            request = request.query(&[("runId", run_id)]);
        }
        Ok(request)
    }

    /// Opens the push channel. Non-success statuses are reported as transport errors.
    pub async fn open_event_stream(
        &self,
        resume_run_id: Option<&str>,
    ) -> Result<Response, TransportError> {
        let response = self.build_events_request(resume_run_id)?.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status,
            message: parse_error_message(status, &body),
        })
    }

    pub async fn start_run(&self, request: &StartRunRequest) -> Result<RunMetadata, CommandError> {
        let response = self
            .command(self.http.post(&self.endpoints.run))?
            .json(request)
            .send()
            .await?;
        let body = checked_body(response).await?;
        let metadata =
            serde_json::from_str::<RunMetadata>(&body).map_err(CommandError::Decode)?;
        if metadata.run_id.trim().is_empty() {
            return Err(CommandError::MissingRunId);
        }
        debug!(run_id = %metadata.run_id, thread_id = %request.thread_id, "run accepted");
        Ok(metadata)
    }

    pub async fn interrupt_run(&self, run_id: &str) -> Result<(), CommandError> {
        let payload = InterruptRequest {
            run_id: run_id.to_owned(),
        };
        let response = self
            .command(self.http.post(&self.endpoints.interrupt))?
            .json(&payload)
            .send()
            .await?;
        checked_body(response).await?;
        debug!(run_id, "interrupt accepted");
        Ok(())
    }

    /// Downloads the persisted event history of the session.
    pub async fn fetch_export(&self) -> Result<SessionExport, CommandError> {
        let response = self
            .command(self.http.get(&self.endpoints.export))?
            .send()
            .await?;
        let body = checked_body(response).await?;
        Ok(SessionExport::from_json_str(&body)?)
    }

    fn command(&self, request: RequestBuilder) -> Result<RequestBuilder, CommandError> {
        let headers = self
            .build_headers(ACCEPT_JSON)
            .map_err(CommandError::InvalidHeader)?;
        let request = request.headers(headers);
        Ok(match self.config.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        })
    }
}

async fn checked_body(response: Response) -> Result<String, CommandError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    let message = parse_error_message(status, &body);
    warn!(%status, %message, "command rejected");
    Err(CommandError::Status { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_request_scopes_resume_run_id() {
        let client = AgUiClient::new(
            AgUiConfig::new("demo", "s1").with_base_url("http://localhost:9000/api/"),
        )
        .expect("client should build");

        let request = client
            .build_events_request(Some("run-7"))
            .expect("request should build")
            .build()
            .expect("request should be valid");

        assert_eq!(
            request.url().as_str(),
            "http://localhost:9000/api/projects/demo/agentic-sessions/s1/agui/events?runId=run-7"
        );
        assert_eq!(
            request.headers().get("accept").and_then(|v| v.to_str().ok()),
            Some("text/event-stream")
        );
    }

    #[test]
    fn blank_resume_id_requests_full_history() {
        let client = AgUiClient::new(AgUiConfig::new("demo", "s1")).expect("client should build");
        let request = client
            .build_events_request(Some("  "))
            .expect("request should build")
            .build()
            .expect("request should be valid");

        assert_eq!(request.url().query(), None);
    }

    #[test]
    fn invalid_header_value_is_rejected() {
        let client = AgUiClient::new(
            AgUiConfig::new("demo", "s1").insert_header("x-note", "line\nbreak"),
        )
        .expect("client should build");

        let error = client
            .build_events_request(None)
            .expect_err("newline in header value");
        assert!(matches!(error, TransportError::InvalidHeader(_)));
    }
}
