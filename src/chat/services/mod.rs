//! Application services for the chat subsystem.
//!
//! Services orchestrate domain operations and coordinate between ports:
//! the message store reconciles optimistic and confirmed entries, the
//! engine reduces transport events to effects, the resolver tracks
//! identity transitions, the migrator replays guest history, the
//! orchestrator produces AI replies, and the session ties them together.

mod classify;
mod engine;
mod migration;
mod orchestrator;
mod resolver;
mod session;
mod store;

#[cfg(test)]
mod orchestrator_tests;
#[cfg(test)]
mod resolver_tests;
#[cfg(test)]
mod session_tests;

pub use classify::{MessageClass, canned_reply, classify};
pub use engine::{Effect, EngineState, PendingSends};
pub use migration::{MigrationReport, Migrator};
pub use orchestrator::{
    AiOrchestrator, AiReply, APOLOGY_TEXT, NO_PRODUCT_TEXT, PROVIDER_FALLBACK_TEXT, ReplyRequest,
    TOKEN_ERROR_TEXT,
};
pub use resolver::IdentityResolver;
pub use session::{ChatSession, SessionUpdate};
pub use store::{MessageStore, PendingSend};
