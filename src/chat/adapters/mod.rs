//! Concrete implementations of the chat ports.
//!
//! - [`memory`]: in-memory stores for tests and embedding
//! - [`catalog`]: the keyword catalog with synonym expansion
//! - [`channel`]: an in-process channel-backed transport pair
//! - [`http`]: `reqwest`-based REST, AI-provider, and ledger clients

pub mod catalog;
pub mod channel;
pub mod http;
pub mod memory;

pub use catalog::KeywordCatalog;
pub use channel::{ChannelTransport, ClientCommand, TransportHarness, channel_transport};
pub use http::{HttpAiProvider, HttpApiConfig, HttpConversationHistory, HttpTokenLedger};
pub use memory::{
    InMemoryHistory, InMemoryLocalStore, InMemoryTokenLedger, SavedBotMessage, ScriptedAiProvider,
};
