//! Keyword classification of customer messages.
//!
//! Greetings, thanks, goodbyes, and a short table of frequently asked
//! questions are answered from canned pools without spending AI tokens.
//! Everything else is substantive and goes to the paid completion path.

use rand::seq::IndexedRandom;

const GREETING_KEYWORDS: &[&str] = &["xin chào", "hello", "hi", "chào", "helo", "hi there"];
const THANKS_KEYWORDS: &[&str] = &["cảm ơn", "thanks", "thank you", "cám ơn", "thank"];
const GOODBYE_KEYWORDS: &[&str] = &["tạm biệt", "goodbye", "bye", "see you", "bai"];

/// A question both short (under 30 characters) and containing `?` is
/// matched against this table by substring.
const FAQ_TABLE: &[(&str, &str)] = &[
    ("giờ mở cửa", "Cửa hàng mở cửa từ 8:00 đến 22:00 hàng ngày."),
    (
        "địa chỉ",
        "Cửa hàng chúng tôi tại 123 Đường ABC, Quận XYZ, TP.HCM.",
    ),
    (
        "ship hàng",
        "Chúng tôi ship hàng toàn quốc, phí ship từ 20.000đ.",
    ),
    (
        "thanh toán",
        "Chấp nhận thanh toán tiền mặt, chuyển khoản, ví điện tử.",
    ),
    (
        "đổi trả",
        "Chính sách đổi trả trong 7 ngày với sản phẩm còn nguyên tem.",
    ),
    (
        "giá ship",
        "Phí ship nội thành 20.000đ, ngoại thành 30.000đ, toàn quốc từ 35.000đ.",
    ),
    (
        "khuyến mãi",
        "Hiện đang có nhiều chương trình khuyến mãi. Bạn có thể xem chi tiết trên website!",
    ),
];

const GUEST_GREETINGS: &[&str] = &[
    "Xin chào! 👋 Tôi là AI trợ lý của cửa hàng. Tôi có thể giúp gì cho bạn?",
    "Chào bạn! 😊 Rất vui được gặp bạn. Bạn cần tìm sản phẩm gì?",
    "Hello! Tôi ở đây để hỗ trợ bạn. Bạn đang tìm kiếm sản phẩm nào?",
    "Chào mừng bạn! 🎉 Tôi có thể giúp bạn tìm các sản phẩm phù hợp.",
];

const THANKS_REPLIES: &[&str] = &[
    "Không có gì! 😊 Rất vui được giúp đỡ bạn. Nếu cần thêm gì, cứ hỏi nhé!",
    "Cảm ơn bạn! 💖 Nếu bạn có thắc mắc gì khác, tôi luôn sẵn sàng hỗ trợ.",
    "Rất hân hạnh! 👍 Chúc bạn một ngày tốt lành!",
    "Không có chi! ✨ Tôi rất vui khi được hỗ trợ bạn.",
];

const GOODBYE_REPLIES: &[&str] = &[
    "Tạm biệt bạn! 👋 Hẹn gặp lại!",
    "Chúc bạn một ngày tốt lành! 🌟",
    "Tạm biệt! Cảm ơn bạn đã ghé thăm!",
    "Hẹn gặp lại bạn! 😊",
];

/// How a customer message should be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageClass {
    /// A greeting; answered from the greeting pool.
    Greeting,
    /// A thank-you; answered from the thanks pool.
    Thanks,
    /// A goodbye; answered from the goodbye pool.
    Goodbye,
    /// A short question matching the FAQ table; carries the fixed answer.
    SimpleFaq(&'static str),
    /// Everything else; goes to the AI completion path.
    Substantive,
}

/// Classifies a customer message by keyword.
///
/// Greeting, thanks, and goodbye keywords are checked in that order;
/// a short question (`?` present, under 30 characters) is then matched
/// against the FAQ table. Matching is case-insensitive substring search.
#[must_use]
pub fn classify(message: &str) -> MessageClass {
    let lower = message.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if contains_any(GREETING_KEYWORDS) {
        return MessageClass::Greeting;
    }
    if contains_any(THANKS_KEYWORDS) {
        return MessageClass::Thanks;
    }
    if contains_any(GOODBYE_KEYWORDS) {
        return MessageClass::Goodbye;
    }
    if lower.contains('?') && lower.chars().count() < 30 {
        for (question, answer) in FAQ_TABLE {
            if lower.contains(question) {
                return MessageClass::SimpleFaq(answer);
            }
        }
    }
    MessageClass::Substantive
}

fn pick(pool: &[&str]) -> String {
    let mut rng = rand::rng();
    pool.choose(&mut rng).map(|s| (*s).to_owned()).unwrap_or_default()
}

fn personalized_greeting(name: &str) -> String {
    let pool = [
        format!("Xin chào {name}! 👋 Tôi là AI trợ lý của cửa hàng. Tôi có thể giúp gì cho bạn?"),
        format!("Chào {name}! 😊 Rất vui được gặp bạn. Bạn cần tìm sản phẩm gì?"),
        format!("Hello {name}! Tôi ở đây để hỗ trợ bạn. Bạn đang tìm kiếm sản phẩm nào?"),
        format!("Chào mừng {name} trở lại! 🎉 Tôi có thể giúp bạn tìm các sản phẩm phù hợp."),
    ];
    let mut rng = rand::rng();
    pool.choose(&mut rng).cloned().unwrap_or_default()
}

/// Produces the canned reply for a classified message, or `None` when the
/// class is [`MessageClass::Substantive`].
///
/// Guests draw from the anonymous greeting pool; authenticated customers
/// get a greeting addressed by display name (falling back to "bạn").
#[must_use]
pub fn canned_reply(
    class: &MessageClass,
    display_name: Option<&str>,
    is_guest: bool,
) -> Option<String> {
    match class {
        MessageClass::Greeting => {
            if is_guest {
                Some(pick(GUEST_GREETINGS))
            } else {
                Some(personalized_greeting(display_name.unwrap_or("bạn")))
            }
        }
        MessageClass::Thanks => Some(pick(THANKS_REPLIES)),
        MessageClass::Goodbye => Some(pick(GOODBYE_REPLIES)),
        MessageClass::SimpleFaq(answer) => Some((*answer).to_owned()),
        MessageClass::Substantive => None,
    }
}
