//! Domain types for the chat subsystem.
//!
//! This module contains pure domain types with no infrastructure
//! dependencies. All types are serialisable via serde in the wire shapes
//! the messaging server expects.

mod identity;
mod ids;
mod markup;
mod message;
mod metadata;
mod product;
mod sender;
mod status;

pub use identity::{AuthState, AuthUser, Identity, IdentityChange};
pub use ids::{ConversationId, MessageId, SessionId, TempId, TenantId, UserId};
pub use markup::{MessageSegment, parse_segments};
pub use message::ChatMessage;
pub use metadata::{MessageMetadata, TokenUsage};
pub use product::{Product, format_vnd};
pub use sender::{ParseSenderTypeError, SenderType};
pub use status::{MessageStatus, ParseMessageStatusError};
