//! Session configuration: tenant scope, timing policy, and AI limits.

use std::time::Duration;

use super::domain::TenantId;

/// Tunable policy for one chat session.
///
/// Defaults mirror the production storefront: a 15 second ack watchdog, a
/// 3 second typing-flag decay, bounded reconnects at a fixed 1 second
/// delay, a 10-token pre-call estimate, and at most 2 product
/// recommendations drawn from at most 4 candidates.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The storefront tenant all traffic is scoped to.
    pub tenant_id: TenantId,

    /// Tenant-configured system prompt prefix for AI calls, if any.
    pub system_prompt: Option<String>,

    /// Bounded connection attempts before giving up.
    pub reconnect_attempts: u32,

    /// Fixed delay between connection attempts.
    pub reconnect_delay: Duration,

    /// How long an optimistic send may await acknowledgement before the
    /// watchdog force-resolves it to `sent`.
    pub ack_timeout: Duration,

    /// How long the "admin is typing" flag survives without a follow-up.
    pub typing_decay: Duration,

    /// Delay before triggering an AI reply after a confirmed user message.
    pub ai_reply_delay: Duration,

    /// Delay before triggering an AI reply to a guest-local message.
    pub guest_ai_reply_delay: Duration,

    /// Pause while the "thinking" placeholder is shown, authenticated.
    pub thinking_delay: Duration,

    /// Pause while the "thinking" placeholder is shown, guest.
    pub guest_thinking_delay: Duration,

    /// Settle delay between login and the migration replay, so identity
    /// changes do not race the connector's own reconnect.
    pub migration_settle_delay: Duration,

    /// Delay before the post-migration (and post-adoption) reload.
    pub reload_delay: Duration,

    /// Estimated token cost used for the pre-call budget check.
    pub tokens_per_call_estimate: u64,

    /// Maximum products recommended in one AI reply.
    pub max_recommendations: usize,

    /// Maximum candidate products handed to the AI prompt.
    pub max_candidates: usize,
}

impl ChatConfig {
    /// Creates a configuration with production defaults for a tenant.
    #[must_use]
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            system_prompt: None,
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
            ack_timeout: Duration::from_secs(15),
            typing_decay: Duration::from_secs(3),
            ai_reply_delay: Duration::from_millis(500),
            guest_ai_reply_delay: Duration::from_millis(300),
            thinking_delay: Duration::from_millis(300),
            guest_thinking_delay: Duration::from_millis(500),
            migration_settle_delay: Duration::from_secs(1),
            reload_delay: Duration::from_secs(1),
            tokens_per_call_estimate: 10,
            max_recommendations: 2,
            max_candidates: 4,
        }
    }

    /// Sets the tenant system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Overrides the ack watchdog window.
    #[must_use]
    pub const fn with_ack_timeout(mut self, window: Duration) -> Self {
        self.ack_timeout = window;
        self
    }

    /// Overrides the reconnect policy.
    #[must_use]
    pub const fn with_reconnect(mut self, attempts: u32, delay: Duration) -> Self {
        self.reconnect_attempts = attempts;
        self.reconnect_delay = delay;
        self
    }
}
