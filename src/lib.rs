//! Shopchat: client-resident chat synchronization core for a storefront.
//!
//! This crate keeps one live support/AI conversation correct across guest
//! and authenticated identities: optimistic sends are reconciled against
//! server acknowledgements, guest transcripts migrate onto the server at
//! login, and AI auto-replies are gated behind a tenant token budget.
//!
//! # Architecture
//!
//! Shopchat follows hexagonal architecture principles:
//!
//! - **Domain**: Pure message, identity, and markup types with no
//!   infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the transport, client
//!   storage, REST surface, AI provider, token ledger, and catalog
//! - **Adapters**: Concrete implementations of ports (in-memory, channel
//!   transport, HTTP)
//! - **Services**: The message store/reconciler, identity resolver,
//!   session engine, migration protocol, and AI orchestrator
//!
//! # Modules
//!
//! - [`chat`]: The chat synchronization subsystem

pub mod chat;
