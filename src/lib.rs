//! Client-side AG-UI conversation engine.
//!
//! Events from an agentic session's push channel are folded by a pure reducer into a
//! single [`ConversationState`]: committed messages with nested tool calls, an activity
//! timeline, free-form key/value state and feedback annotations.
//!
//! # Overview
//! - [`reduce`] is the transition function; [`Conversation`] owns one state and its
//!   hidden-message context and notifies a [`ConversationObserver`].
//! - Tool-call hierarchies (sub-agents) are resolved by id in [`hierarchy`]; transcript
//!   snapshots are merged by [`snapshot`] without reordering rendered messages.
//! - [`RunController`] performs the optimistic user insert and the start/interrupt
//!   commands; [`Session`] wires it to the HTTP transport and the push channel.

pub mod conversation;
pub mod hierarchy;
pub mod model;
pub mod patch;
pub mod reducer;
pub mod run_controller;
pub mod session;
pub mod snapshot;

pub use agui_events::{normalize_event, AgUiEvent, MalformedEvent, Role};
pub use agui_transport::{AgUiConfig, CommandError, TransportError};
pub use conversation::{Conversation, ConversationObserver};
pub use model::{
    ConversationState, Feedback, FeedbackKind, Message, PendingToolCall, RunStatus,
    StreamingMessage, ToolCall, ToolCallStatus,
};
pub use reducer::{reduce, Action, ReducerContext};
pub use run_controller::{ChannelHandle, RunCommands, RunControlError, RunController};
pub use session::{ConnectionStatus, Session, SessionChannel};
