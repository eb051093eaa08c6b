use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::StreamExt;
use reqwest::Response;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use agui_events::{AgUiEvent, SseStreamParser};

use crate::client::AgUiClient;
use crate::error::TransportError;
use crate::retry::ReconnectPolicy;

/// Shared flag cleared when the caller tears a channel down.
pub type LivenessFlag = Arc<AtomicBool>;

/// Callbacks fired by the push channel. Never invoked after `disconnect()`.
pub trait ChannelHooks: Send + Sync + 'static {
    fn on_connected(&self) {}

    fn on_disconnected(&self, _reason: &str) {}

    fn on_error(&self, _error: &TransportError) {}

    fn on_event(&self, _event: AgUiEvent) {}
}

struct ActiveChannel {
    alive: LivenessFlag,
    open: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ActiveChannel {
    fn shutdown(self) {
        self.alive.store(false, Ordering::Release);
        self.open.store(false, Ordering::Release);
        self.task.abort();
    }
}

/// Owns the push-channel lifecycle: connect, reconnect with backoff, teardown.
pub struct ChannelManager {
    client: Arc<AgUiClient>,
    hooks: Arc<dyn ChannelHooks>,
    active: Mutex<Option<ActiveChannel>>,
}

impl ChannelManager {
    pub fn new(client: Arc<AgUiClient>, hooks: Arc<dyn ChannelHooks>) -> Self {
        Self {
            client,
            hooks,
            active: Mutex::new(None),
        }
    }

    /// Opens the push channel, replacing any existing connection.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self, resume_run_id: Option<String>) {
        let mut active = lock_unpoisoned(&self.active);
        if let Some(previous) = active.take() {
            previous.shutdown();
        }

        let alive: LivenessFlag = Arc::new(AtomicBool::new(true));
        let open = Arc::new(AtomicBool::new(false));
        let policy = self.client.config().reconnect_policy();
        let task = tokio::spawn(run_channel(
            Arc::clone(&self.client),
            Arc::clone(&self.hooks),
            Arc::clone(&alive),
            Arc::clone(&open),
            resume_run_id,
            policy,
        ));
        *active = Some(ActiveChannel { alive, open, task });
    }

    /// Cancels any pending reconnect and closes the open connection. Idempotent.
    pub fn disconnect(&self) {
        if let Some(active) = lock_unpoisoned(&self.active).take() {
            debug!("closing push channel");
            active.shutdown();
        }
    }

    /// True while a connection is open, as opposed to connecting or backing off.
    pub fn is_open(&self) -> bool {
        lock_unpoisoned(&self.active)
            .as_ref()
            .is_some_and(|active| active.open.load(Ordering::Acquire))
    }

    /// True while the channel is connected or trying to reconnect.
    pub fn is_active(&self) -> bool {
        lock_unpoisoned(&self.active).is_some()
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn run_channel(
    client: Arc<AgUiClient>,
    hooks: Arc<dyn ChannelHooks>,
    alive: LivenessFlag,
    open: Arc<AtomicBool>,
    resume_run_id: Option<String>,
    mut policy: ReconnectPolicy,
) {
    loop {
        if !is_alive(&alive) {
            return;
        }

        let error = match client.open_event_stream(resume_run_id.as_deref()).await {
            Ok(response) => {
                policy.on_open();
                open.store(true, Ordering::Release);
                if is_alive(&alive) {
                    hooks.on_connected();
                }
                pump_events(response, hooks.as_ref(), &alive).await
            }
            Err(error) => error,
        };
        open.store(false, Ordering::Release);

        if !is_alive(&alive) {
            return;
        }
        let reason = error.to_string();
        hooks.on_disconnected(&reason);
        hooks.on_error(&error);

        let delay = policy.on_error();
        warn!(
            attempt = policy.attempt(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            %reason,
            "push channel dropped, scheduling reconnect"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Forwards decoded events until the stream fails or ends.
async fn pump_events(
    response: Response,
    hooks: &dyn ChannelHooks,
    alive: &AtomicBool,
) -> TransportError {
    let mut bytes = response.bytes_stream();
    let mut parser = SseStreamParser::default();

    while let Some(chunk) = bytes.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => return TransportError::Request(error),
        };
        for event in parser.feed(&chunk) {
            if !is_alive(alive) {
                return TransportError::StreamEnded;
            }
            hooks.on_event(event);
        }
    }

    if !parser.is_empty_buffer() {
        debug!("discarding partial event frame at end of stream");
    }
    TransportError::StreamEnded
}

fn is_alive(alive: &AtomicBool) -> bool {
    alive.load(Ordering::Acquire)
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
