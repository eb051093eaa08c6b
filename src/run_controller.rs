use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use agui_transport::{CommandError, RunInputMessage, RunMetadata, StartRunRequest};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::model::Message;
use crate::reducer::Action;

/// Outbound run commands.
pub trait RunCommands: Send + Sync {
    /// Thread used when the conversation has not seen one yet.
    fn default_thread_id(&self) -> String;

    fn start_run(
        &self,
        request: StartRunRequest,
    ) -> impl Future<Output = Result<RunMetadata, CommandError>> + Send;

    fn interrupt_run(&self, run_id: &str) -> impl Future<Output = Result<(), CommandError>> + Send;
}

/// Live push-channel handle.
pub trait ChannelHandle: Send + Sync {
    fn is_open(&self) -> bool;

    fn connect(&self, resume_run_id: Option<String>);
}

#[derive(Debug, Error)]
pub enum RunControlError {
    #[error("run {run_id} is already active")]
    RunAlreadyActive { run_id: String },
    #[error("no active run to interrupt")]
    NoActiveRun,
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Issues start/interrupt commands against a shared conversation.
pub struct RunController<C, H> {
    commands: Arc<C>,
    channel: Arc<H>,
    conversation: Arc<Mutex<Conversation>>,
}

impl<C, H> RunController<C, H>
where
    C: RunCommands,
    H: ChannelHandle,
{
    pub fn new(commands: Arc<C>, channel: Arc<H>, conversation: Arc<Mutex<Conversation>>) -> Self {
        Self {
            commands,
            channel,
            conversation,
        }
    }

    pub fn conversation(&self) -> &Arc<Mutex<Conversation>> {
        &self.conversation
    }

    /// Inserts the user message optimistically, then starts a run for it.
    pub async fn send(&self, content: impl Into<String>) -> Result<RunMetadata, RunControlError> {
        self.send_message(content.into(), false).await
    }

    /// Starts a run for an auto-generated prompt that must never be rendered.
    pub async fn send_hidden(
        &self,
        content: impl Into<String>,
    ) -> Result<RunMetadata, RunControlError> {
        self.send_message(content.into(), true).await
    }

    async fn send_message(
        &self,
        content: String,
        hidden: bool,
    ) -> Result<RunMetadata, RunControlError> {
        let message = Message::user(Uuid::new_v4().to_string(), content).with_timestamp(now_rfc3339());

        let request = {
            let mut conversation = lock_unpoisoned(&self.conversation);
            if let Some(run_id) = conversation.active_run_id() {
                return Err(RunControlError::RunAlreadyActive {
                    run_id: run_id.to_owned(),
                });
            }
            if hidden {
                conversation.hide_message(message.id.clone());
            }
            let state = conversation.state();
            let request = StartRunRequest {
                thread_id: state
                    .thread_id
                    .clone()
                    .unwrap_or_else(|| self.commands.default_thread_id()),
                parent_run_id: state.run_id.clone(),
                messages: vec![RunInputMessage::user(&message.id, &message.content)],
            };
            conversation.dispatch(Action::OptimisticUserMessage(message));
            request
        };

        match self.commands.start_run(request).await {
            Ok(metadata) => {
                lock_unpoisoned(&self.conversation).dispatch(Action::RunAccepted {
                    run_id: metadata.run_id.clone(),
                    thread_id: metadata.thread_id.clone(),
                });
                if !self.channel.is_open() {
                    self.channel.connect(Some(metadata.run_id.clone()));
                }
                Ok(metadata)
            }
            Err(error) => {
                warn!(%error, "start run failed");
                lock_unpoisoned(&self.conversation).dispatch(Action::RunRejected {
                    error: error.to_string(),
                });
                Err(error.into())
            }
        }
    }

    /// Interrupts the active run and marks it inactive once the command succeeds.
    pub async fn interrupt(&self) -> Result<(), RunControlError> {
        let run_id = lock_unpoisoned(&self.conversation)
            .active_run_id()
            .map(str::to_owned)
            .ok_or(RunControlError::NoActiveRun)?;

        self.commands.interrupt_run(&run_id).await?;
        lock_unpoisoned(&self.conversation).dispatch(Action::RunInterrupted);
        Ok(())
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
