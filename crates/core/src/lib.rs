//! Core data model and traits for the dialogue orchestration engine
//!
//! This crate provides foundational types shared by every other crate:
//! - The session/message/agent-profile data model
//! - Consensus and voting types used by the v2 dynamic router
//! - The `Executor`/`Retriever` traits pluggable backends implement
//! - The crate-wide error type

pub mod agent_profile;
pub mod consensus;
pub mod error;
pub mod message;
pub mod session;
pub mod stage;
pub mod traits;
pub mod voting;

pub use agent_profile::{
    AgentPriority, AgentProfile, AgentStyle, MemoryScope,
    FACILITATOR_AGENT_ID, SYSTEM_AGENT_ID, USER_AGENT_ID,
};
pub use consensus::{ConsensusIndicator, DialogueState};
pub use error::{Error, Result};
pub use message::{Message, MessageMetadata, MessageRole};
pub use session::{
    Conflict, ConflictSeverity, Session, SessionStatus, SpeakerPosition,
    StageHistoryEntry, StageSummary,
};
pub use stage::{DialogueStage, DynamicStage, Language, Version};
pub use voting::{FacilitatorAction, FacilitatorActionType, VotingBallot};

pub use traits::{
    ConversationContext, ConversationTurn, Document, ExecutionResult, Executor,
    FilterOp, MetadataFilter, Retriever, RetrieveOptions,
};
