//! Chat synchronization core for the storefront support conversation.
//!
//! The subsystem maintains an append-only, de-duplicated, time-ordered view
//! of one conversation under an unreliable asynchronous transport. Guests
//! chat locally (durable client storage plus direct AI calls); authenticated
//! users chat over a live connection with optimistic sends reconciled
//! against server acknowledgements. On login, guest-authored local messages
//! are replayed onto the server exactly once.
//!
//! # Architecture
//!
//! The module follows hexagonal architecture principles:
//!
//! - **Domain**: Pure types ([`domain::ChatMessage`], [`domain::Identity`],
//!   [`domain::SenderType`], link markup)
//! - **Ports**: Abstract trait interfaces ([`ports::ChatTransport`],
//!   [`ports::LocalStore`], [`ports::AiProvider`], [`ports::TokenLedger`])
//! - **Adapters**: Concrete implementations (in-memory stores, an
//!   in-process channel transport, HTTP clients)
//! - **Services**: The reconciling [`services::MessageStore`], the
//!   [`services::IdentityResolver`], the [`services::ChatSession`] engine,
//!   the [`services::Migrator`], and the [`services::AiOrchestrator`]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
