use std::future::Future;
use std::sync::{Arc, Mutex};

use agui_events::AgUiEvent;
use agui_transport::{
    AgUiClient, AgUiConfig, ChannelHooks, ChannelManager, CommandError, RunMetadata,
    StartRunRequest, TransportError,
};
use tracing::{debug, info};

use crate::conversation::{Conversation, ConversationObserver};
use crate::model::ConversationState;
use crate::run_controller::{
    lock_unpoisoned, ChannelHandle, RunCommands, RunControlError, RunController,
};

/// Push-channel status as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    /// The last attempt failed; a reconnect is scheduled.
    Error,
}

impl RunCommands for AgUiClient {
    fn default_thread_id(&self) -> String {
        self.thread_id().to_owned()
    }

    fn start_run(
        &self,
        request: StartRunRequest,
    ) -> impl Future<Output = Result<RunMetadata, CommandError>> + Send {
        async move { AgUiClient::start_run(self, &request).await }
    }

    fn interrupt_run(&self, run_id: &str) -> impl Future<Output = Result<(), CommandError>> + Send {
        AgUiClient::interrupt_run(self, run_id)
    }
}

/// Routes channel callbacks into the conversation and the status mirror.
struct SessionHooks {
    conversation: Arc<Mutex<Conversation>>,
    status: Arc<Mutex<ConnectionStatus>>,
}

impl ChannelHooks for SessionHooks {
    fn on_connected(&self) {
        *lock_unpoisoned(&self.status) = ConnectionStatus::Connected;
    }

    fn on_disconnected(&self, reason: &str) {
        debug!(%reason, "push channel disconnected");
        *lock_unpoisoned(&self.status) = ConnectionStatus::Error;
    }

    fn on_event(&self, event: AgUiEvent) {
        lock_unpoisoned(&self.conversation).apply_event(event);
    }
}

/// Channel handle that mirrors reconnects into the session status.
pub struct SessionChannel {
    manager: ChannelManager,
    status: Arc<Mutex<ConnectionStatus>>,
}

impl ChannelHandle for SessionChannel {
    fn is_open(&self) -> bool {
        self.manager.is_open()
    }

    fn connect(&self, resume_run_id: Option<String>) {
        *lock_unpoisoned(&self.status) = ConnectionStatus::Connecting;
        self.manager.connect(resume_run_id);
    }
}

/// A mounted agentic session: transport, push channel, run control and conversation.
///
/// Dropping the session closes the channel; no callback fires afterwards.
pub struct Session {
    client: Arc<AgUiClient>,
    channel: Arc<SessionChannel>,
    status: Arc<Mutex<ConnectionStatus>>,
    runs: RunController<AgUiClient, SessionChannel>,
}

impl Session {
    pub fn new(config: AgUiConfig) -> Result<Self, TransportError> {
        Self::build(config, Conversation::new())
    }

    pub fn with_observer(
        config: AgUiConfig,
        observer: Arc<dyn ConversationObserver>,
    ) -> Result<Self, TransportError> {
        Self::build(config, Conversation::with_observer(observer))
    }

    fn build(config: AgUiConfig, conversation: Conversation) -> Result<Self, TransportError> {
        let client = Arc::new(AgUiClient::new(config)?);
        let conversation = Arc::new(Mutex::new(conversation));
        let status = Arc::new(Mutex::new(ConnectionStatus::Idle));
        let hooks = Arc::new(SessionHooks {
            conversation: Arc::clone(&conversation),
            status: Arc::clone(&status),
        });
        let channel = Arc::new(SessionChannel {
            manager: ChannelManager::new(Arc::clone(&client), hooks),
            status: Arc::clone(&status),
        });
        let runs = RunController::new(Arc::clone(&client), Arc::clone(&channel), conversation);
        Ok(Self {
            client,
            channel,
            status,
            runs,
        })
    }

    /// Opens the push channel, optionally replaying only one run.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self, resume_run_id: Option<String>) {
        info!(session = %self.client.thread_id(), "connecting session");
        self.channel.connect(resume_run_id);
    }

    pub async fn send(&self, content: impl Into<String>) -> Result<RunMetadata, RunControlError> {
        self.runs.send(content).await
    }

    pub async fn send_hidden(
        &self,
        content: impl Into<String>,
    ) -> Result<RunMetadata, RunControlError> {
        self.runs.send_hidden(content).await
    }

    pub async fn interrupt(&self) -> Result<(), RunControlError> {
        self.runs.interrupt().await
    }

    /// Rebuilds the conversation from the persisted event history.
    /// Returns the number of events that changed state.
    pub async fn load_history(&self) -> Result<usize, CommandError> {
        let export = self.client.fetch_export().await?;
        let events = export.event_log().normalized();
        Ok(lock_unpoisoned(self.runs.conversation()).replay(events))
    }

    pub fn conversation(&self) -> Arc<Mutex<Conversation>> {
        Arc::clone(self.runs.conversation())
    }

    /// Copy of the current conversation state.
    pub fn snapshot(&self) -> ConversationState {
        lock_unpoisoned(self.runs.conversation()).state().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        *lock_unpoisoned(&self.status)
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_open()
    }

    pub fn client(&self) -> &AgUiClient {
        &self.client
    }

    /// Closes the push channel and cancels any pending reconnect. Idempotent.
    pub fn close(&self) {
        self.channel.manager.disconnect();
        *lock_unpoisoned(&self.status) = ConnectionStatus::Idle;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
