//! Agent module for Aizen
//!
//! This module contains the turn pipeline: the capability assessor, the
//! response composer, the turn orchestrator that chooses between them, and
//! the conversation session that drives a turn per user message.

pub mod assessor;
pub mod composer;
pub mod conversation;
pub mod metrics;
pub mod orchestrator;
pub mod session;

pub use assessor::{CapabilityAssessment, CapabilityAssessor, ModelAssessor};
pub use composer::ResponseComposer;
pub use conversation::{ChatTurn, Conversation, HistoryMessage, TurnKind, TurnRole};
pub use orchestrator::{TurnBranch, TurnOrchestrator};
pub use session::ChatSession;
