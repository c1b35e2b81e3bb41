//! Link markup embedded in message bodies.
//!
//! AI replies reference products as `[label](path)` spans resolved to
//! in-app links. The parser splits a body into typed segments so the
//! presentation layer never interprets raw HTML.

/// One span of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSegment {
    /// Plain text.
    Text(String),
    /// An in-app link.
    Link {
        /// The visible label.
        label: String,
        /// The in-app path the link resolves to (relative, no scheme).
        path: String,
    },
}

/// Splits a message body into text and `[label](path)` link segments.
///
/// Unterminated or empty constructs are treated as plain text. The
/// concatenation of all segment source spans always reproduces the input.
///
/// # Examples
///
/// ```
/// use shopchat::chat::domain::{MessageSegment, parse_segments};
///
/// let segments = parse_segments("see [Xem sản phẩm](san-pham/ao-thun)!");
/// assert_eq!(segments.len(), 3);
/// assert!(matches!(&segments[1], MessageSegment::Link { .. }));
/// ```
#[must_use]
pub fn parse_segments(body: &str) -> Vec<MessageSegment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = body;

    while let Some(open) = rest.find('[') {
        let (before, candidate) = rest.split_at(open);
        match parse_link(candidate) {
            Some((label, path, remainder)) => {
                text.push_str(before);
                if !text.is_empty() {
                    segments.push(MessageSegment::Text(std::mem::take(&mut text)));
                }
                segments.push(MessageSegment::Link {
                    label: label.to_owned(),
                    path: path.to_owned(),
                });
                rest = remainder;
            }
            None => {
                // Not a link after all; keep the bracket literal and move on.
                text.push_str(before);
                let mut chars = candidate.chars();
                if let Some(bracket) = chars.next() {
                    text.push(bracket);
                }
                rest = chars.as_str();
            }
        }
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(MessageSegment::Text(text));
    }
    segments
}

/// Tries to read `[label](path)` from the head of `input` (which starts at
/// a `[`). Returns the label, path, and the remainder after the closing
/// parenthesis.
fn parse_link(input: &str) -> Option<(&str, &str, &str)> {
    let after_open = input.strip_prefix('[')?;
    let close = after_open.find(']')?;
    let (label, after_label) = after_open.split_at(close);
    let after_paren = after_label.strip_prefix("](")?;
    let end = after_paren.find(')')?;
    let (path, after_path) = after_paren.split_at(end);
    if label.is_empty() || path.is_empty() {
        return None;
    }
    Some((label, path, after_path.strip_prefix(')')?))
}
