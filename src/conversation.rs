use std::sync::Arc;

use agui_events::AgUiEvent;

use crate::model::ConversationState;
use crate::reducer::{reduce, Action, ReducerContext};

/// Receives notifications after each transition.
///
/// Called while the owning [`Conversation`] is borrowed; implementations must not
/// dispatch back into it.
pub trait ConversationObserver: Send + Sync {
    fn on_change(&self, _state: &ConversationState) {}

    /// A trace identifier was observed on a raw event.
    fn on_trace_id(&self, _trace_id: &str) {}

    fn on_run_error(&self, _message: &str) {}
}

/// One conversation engine instance: state, hidden-message context and observer.
#[derive(Default)]
pub struct Conversation {
    state: ConversationState,
    context: ReducerContext,
    trace_id: Option<String>,
    observer: Option<Arc<dyn ConversationObserver>>,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("state", &self.state)
            .field("context", &self.context)
            .field("trace_id", &self.trace_id)
            .finish_non_exhaustive()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: Arc<dyn ConversationObserver>) -> Self {
        Self {
            observer: Some(observer),
            ..Self::default()
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn context(&self) -> &ReducerContext {
        &self.context
    }

    /// Last trace identifier seen on the stream.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn active_run_id(&self) -> Option<&str> {
        self.state.active_run_id()
    }

    /// Suppresses a message id from every later transition and snapshot.
    pub fn hide_message(&mut self, message_id: impl Into<String>) {
        self.context.hide(message_id);
    }

    /// Applies one action. Returns true when the state changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let next = reduce(&self.state, &action, &self.context);
        let changed = next != self.state;
        self.state = next;

        let observer = self.observer.clone();
        if let Action::Event(event) = &action {
            if let Some(trace_id) = event.trace_id() {
                if self.trace_id.as_deref() != Some(trace_id) {
                    self.trace_id = Some(trace_id.to_owned());
                    if let Some(observer) = &observer {
                        observer.on_trace_id(trace_id);
                    }
                }
            }
        }

        let Some(observer) = observer else {
            return changed;
        };
        match &action {
            Action::Event(AgUiEvent::RunError { message, .. }) => observer.on_run_error(message),
            Action::RunRejected { error } => observer.on_run_error(error),
            _ => {}
        }
        if changed {
            observer.on_change(&self.state);
        }
        changed
    }

    pub fn apply_event(&mut self, event: AgUiEvent) -> bool {
        self.dispatch(Action::Event(event))
    }

    /// Folds a recorded event sequence, e.g. a persisted event log.
    pub fn replay<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = AgUiEvent>,
    {
        events
            .into_iter()
            .map(|event| self.apply_event(event))
            .filter(|changed| *changed)
            .count()
    }
}
