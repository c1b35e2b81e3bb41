//! Abstract trait interfaces for everything outside the chat core.
//!
//! Implementations live under [`crate::chat::adapters`]; services depend
//! only on these traits so every external collaborator (socket, client
//! storage, REST surface, AI provider, token ledger, catalog) can be
//! replaced in tests.

pub mod ai_provider;
pub mod catalog;
pub mod history;
pub mod local_store;
pub mod token_ledger;
pub mod transport;

pub use ai_provider::{AiCompletion, AiProvider, PromptMetadata};
pub use catalog::ProductCatalog;
pub use history::ConversationHistory;
pub use local_store::LocalStore;
pub use token_ledger::{TokenCheck, TokenLedger};
pub use transport::{ChatTransport, OutboundMessage, TransportEvent};
