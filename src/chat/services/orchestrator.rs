//! AI reply orchestration.
//!
//! Produces the assistant's answer to a customer message: canned pools
//! for small talk, the FAQ table for short questions, and the paid
//! completion provider for everything substantive. Paid calls are gated
//! by the tenant token budget, grounded in a product candidate list, and
//! guarded against recommendations of products that do not exist.

use std::sync::Arc;

use minijinja::{Environment, context};
use tracing::{debug, warn};

use crate::chat::config::ChatConfig;
use crate::chat::domain::{ConversationId, MessageMetadata, Product, SessionId};
use crate::chat::error::{AiError, AiResult};
use crate::chat::ports::{
    AiProvider, ConversationHistory, ProductCatalog, PromptMetadata, TokenLedger,
};
use crate::chat::services::classify::{canned_reply, classify};

/// Apology shown when reply production fails for a non-budget reason.
pub const APOLOGY_TEXT: &str = "Xin lỗi, có lỗi xảy ra. Vui lòng thử lại sau.";

/// Substitute shown when the tenant's token budget is exhausted.
pub const TOKEN_ERROR_TEXT: &str =
    "🤖 AI hiện không thể phản hồi. Vui lòng thông cảm và liên hệ cửa hàng để được hỗ trợ thêm.";

/// Fixed answer when no catalog product matches the request.
pub const NO_PRODUCT_TEXT: &str = "Hiện chưa có sản phẩm phù hợp với yêu cầu của bạn. \
     Vui lòng thử từ khóa khác hoặc liên hệ nhân viên để được hỗ trợ thêm.";

/// What a provider returns when it has no text; never persisted.
pub const PROVIDER_FALLBACK_TEXT: &str = "Xin lỗi, tôi không thể trả lời ngay lúc này.";

// A completion admitting this phrase already declined to recommend, so
// the hallucination guard leaves it alone.
const NO_PRODUCT_MARKER: &str = "chưa có sản phẩm";

const GROUNDED_TEMPLATE: &str = "\
{{ system_prompt }}

DANH SÁCH SẢN PHẨM HIỆN CÓ TRONG CỬA HÀNG:
{{ product_list }}

QUY TẮC BẮT BUỘC TUYỆT ĐỐI:
1. CHỈ ĐƯỢC gợi ý sản phẩm CÓ TRONG DANH SÁCH TRÊN
2. TUYỆT ĐỐI KHÔNG được tạo ra, bịa đặt, hoặc gợi ý sản phẩm KHÔNG CÓ trong danh sách
3. Khi gợi ý sản phẩm, LUÔN đính kèm link theo định dạng: [Xem sản phẩm](san-pham/{slug})
4. Mỗi tin nhắn chỉ gợi ý tối đa {{ max_recommendations }} sản phẩm
5. Nếu không có sản phẩm phù hợp, hãy trả lời lịch sự và đề nghị họ thử từ khóa khác
6. Luôn đề cập đến giá cả và link sản phẩm khi giới thiệu
7. Nếu sản phẩm có khuyến mãi, hãy thông báo cho khách hàng
8. Luôn trả lời thân thiện, nhiệt tình

CÂU HỎI CỦA KHÁCH: \"{{ question }}\"

HÃY TƯ VẤN VÀ GỢI Ý SẢN PHẨM (CHỈ TRONG DANH SÁCH TRÊN):";

const UNGROUNDED_TEMPLATE: &str = "\
{{ system_prompt }}

QUY TẮC BẮT BUỘC:
- Nếu không tìm thấy sản phẩm phù hợp, hãy trả lời lịch sự: \"{{ no_product_text }}\"
- Luôn giữ thái độ thân thiện, nhiệt tình

CÂU HỎI CỦA KHÁCH: \"{{ question }}\"

TRẢ LỜI:";

const DEFAULT_SYSTEM_PROMPT: &str = "Bạn là nhân viên tư vấn bán hàng thân thiện và nhiệt tình. \
     CHỈ được gợi ý sản phẩm có trong danh sách được cung cấp. \
     TUYỆT ĐỐI KHÔNG được tạo ra sản phẩm mới.";

/// One AI reply request.
#[derive(Debug, Clone)]
pub struct ReplyRequest<'a> {
    /// The customer message being answered.
    pub message: &'a str,
    /// The target conversation, when one exists.
    pub conversation_id: Option<ConversationId>,
    /// The customer's session id, if any.
    pub session_id: Option<SessionId>,
    /// Whether the customer is a guest (guest replies are never persisted).
    pub is_guest: bool,
    /// Display name for personalised greetings.
    pub display_name: Option<&'a str>,
}

/// A finished AI reply, ready to resolve the placeholder entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AiReply {
    /// The final text.
    pub text: String,
    /// Token accounting or error flags to attach to the message.
    pub metadata: MessageMetadata,
    /// Whether the reply was written through the persistence side channel.
    pub persisted: bool,
}

/// Produces AI replies behind the token budget and grounding rules.
pub struct AiOrchestrator<P, L, H, C>
where
    P: AiProvider,
    L: TokenLedger,
    H: ConversationHistory,
    C: ProductCatalog,
{
    provider: Arc<P>,
    ledger: Arc<L>,
    history: Arc<H>,
    catalog: Arc<C>,
    config: Arc<ChatConfig>,
}

impl<P, L, H, C> AiOrchestrator<P, L, H, C>
where
    P: AiProvider,
    L: TokenLedger,
    H: ConversationHistory,
    C: ProductCatalog,
{
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        provider: Arc<P>,
        ledger: Arc<L>,
        history: Arc<H>,
        catalog: Arc<C>,
        config: Arc<ChatConfig>,
    ) -> Self {
        Self {
            provider,
            ledger,
            history,
            catalog,
            config,
        }
    }

    /// Produces the reply to a customer message.
    ///
    /// Never fails outward: provider and ledger errors downgrade to the
    /// apology text, token-budget failures to the token-exhaustion notice
    /// with its metadata flag. Persistence happens here when the customer
    /// is authenticated and a conversation exists; the provider fallback
    /// and the apology downgrade are shown but never written through the
    /// side channel, while the token notice is persisted for admin
    /// visibility.
    pub async fn reply(&self, request: &ReplyRequest<'_>) -> AiReply {
        let class = classify(request.message);
        if let Some(text) = canned_reply(&class, request.display_name, request.is_guest) {
            debug!(?class, "answering from canned pool");
            let persisted = self.persist(request, &text, None).await;
            return AiReply {
                text,
                metadata: MessageMetadata::empty(),
                persisted,
            };
        }

        let mut candidates = self.catalog.find_by_keyword(request.message).await;
        candidates.truncate(self.config.max_candidates);

        let (text, metadata, downgraded) = match self.call_provider(request, &candidates).await {
            Ok((completion_text, metadata)) => (
                self.guard_recommendations(completion_text, &candidates),
                metadata,
                false,
            ),
            Err(error) if error.is_token_error() => {
                warn!(%error, "AI reply blocked by token budget");
                (
                    TOKEN_ERROR_TEXT.to_owned(),
                    MessageMetadata::token_error(),
                    false,
                )
            }
            Err(error) => {
                warn!(%error, "AI reply failed");
                (APOLOGY_TEXT.to_owned(), MessageMetadata::empty(), true)
            }
        };

        let persisted = if downgraded || text == PROVIDER_FALLBACK_TEXT {
            false
        } else {
            self.persist(request, &text, Some(metadata.clone())).await
        };
        AiReply {
            text,
            metadata,
            persisted,
        }
    }

    async fn call_provider(
        &self,
        request: &ReplyRequest<'_>,
        candidates: &[Product],
    ) -> AiResult<(String, MessageMetadata)> {
        if self.ledger.balance().await? == 0 {
            return Err(AiError::NoTokens);
        }
        let estimate = self.config.tokens_per_call_estimate;
        let check = self.ledger.check(estimate).await?;
        if !check.has_enough_tokens {
            return Err(AiError::InsufficientTokens {
                current: check.current_tokens,
                needed: check.tokens_needed,
            });
        }

        let prompt = self.build_prompt(request.message, candidates)?;
        let prompt_metadata = PromptMetadata {
            is_guest: request.is_guest,
            session_id: request.session_id.clone(),
            has_products_context: !candidates.is_empty(),
            product_count: candidates.len(),
            product_links: candidates.iter().map(Product::link_path).collect(),
        };
        let completion = self.provider.complete(&prompt, prompt_metadata).await?;

        if completion.cached {
            debug!("cached completion, skipping deduction");
        } else {
            self.ledger.deduct(completion.usage.total_tokens).await?;
        }
        Ok((
            completion.text,
            MessageMetadata::with_usage(completion.usage, completion.cached),
        ))
    }

    fn build_prompt(&self, question: &str, candidates: &[Product]) -> AiResult<String> {
        let system_prompt = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let environment = Environment::new();
        let rendered = if candidates.is_empty() {
            environment.render_str(
                UNGROUNDED_TEMPLATE,
                context! {
                    system_prompt,
                    question,
                    no_product_text => NO_PRODUCT_TEXT,
                },
            )
        } else {
            environment.render_str(
                GROUNDED_TEMPLATE,
                context! {
                    system_prompt,
                    question,
                    product_list => product_list(candidates),
                    max_recommendations => self.config.max_recommendations,
                },
            )
        };
        rendered.map_err(|error| AiError::Provider(format!("prompt render failed: {error}")))
    }

    /// Replaces a completion that names products outside the candidate
    /// list with a safe recommendation built from the candidates
    /// themselves, and substitutes the fixed no-product answer when the
    /// catalog had nothing to offer.
    fn guard_recommendations(&self, text: String, candidates: &[Product]) -> String {
        if candidates.is_empty() {
            if text.contains(NO_PRODUCT_MARKER) {
                return text;
            }
            return NO_PRODUCT_TEXT.to_owned();
        }
        let mentions_unknown = candidates.iter().any(|p| !text.contains(&p.name));
        if !mentions_unknown || text.contains(NO_PRODUCT_MARKER) {
            return text;
        }
        let recommendations: Vec<String> = candidates
            .iter()
            .take(self.config.max_recommendations)
            .map(|product| {
                let description = product
                    .description
                    .as_deref()
                    .map(|d| format!(" - {d}"))
                    .unwrap_or_default();
                format!(
                    "- **{}** - Giá: {}đ [Xem sản phẩm]({}){description}",
                    product.name,
                    product.price_display(),
                    product.link_path(),
                )
            })
            .collect();
        format!(
            "Chào bạn! Dựa trên yêu cầu của bạn, mình gợi ý một số sản phẩm phù hợp:\n\n{}\n\n\
             Bạn có thể click vào link để xem chi tiết sản phẩm nhé!",
            recommendations.join("\n")
        )
    }

    async fn persist(
        &self,
        request: &ReplyRequest<'_>,
        text: &str,
        metadata: Option<MessageMetadata>,
    ) -> bool {
        if request.is_guest {
            return false;
        }
        let Some(conversation_id) = request.conversation_id else {
            return false;
        };
        match self
            .history
            .save_bot_message(conversation_id, text, metadata, request.session_id.as_ref())
            .await
        {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "bot message persistence failed");
                false
            }
        }
    }
}

fn product_list(candidates: &[Product]) -> String {
    candidates
        .iter()
        .map(|product| {
            let description = product
                .description
                .as_deref()
                .map(|d| format!(" - Mô tả: {d}"))
                .unwrap_or_default();
            let promotion = if product.on_promotion {
                " - ĐANG KHUYẾN MÃI"
            } else {
                ""
            };
            format!(
                "- {} (Giá: {}đ) - Link: {}{description}{promotion}",
                product.name,
                product.price_display(),
                product.link_path(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
