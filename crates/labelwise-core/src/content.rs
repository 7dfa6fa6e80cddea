//! Think-block splitting for message content.
//!
//! Assistant messages may embed one reasoning segment delimited by
//! `<think>...</think>`. Reviewers edit the reasoning and the visible answer
//! separately; this module splits content into the two parts and joins them
//! back when saving.
//!
//! Only the first block is honored. Content with several or nested blocks
//! keeps the remaining tags inside the body.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{LineItemMessage, MessageRole, UpdateMessageRequest};

/// Opening delimiter of a think block.
pub const THINK_OPEN: &str = "<think>";

/// Closing delimiter of a think block.
pub const THINK_CLOSE: &str = "</think>";

// Non-greedy, dot matches newline.
static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("valid think regex"));

/// Content split into its reasoning and visible parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitContent {
    /// Trimmed interior of the first think block. `None` when there is no
    /// block or the block is blank.
    pub think: Option<String>,
    /// Content with that block removed.
    pub body: String,
}

/// Splits content at its first `<think>...</think>` block.
///
/// With a block, `body` is the remaining text trimmed. Without one, `body`
/// is the content unchanged.
///
/// # Examples
///
/// ```
/// use labelwise_core::content::split;
///
/// let parts = split("<think>reasoning</think>answer");
/// assert_eq!(parts.think.as_deref(), Some("reasoning"));
/// assert_eq!(parts.body, "answer");
/// ```
pub fn split(content: &str) -> SplitContent {
    match THINK_BLOCK.captures(content) {
        Some(caps) => {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let interior = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");

            let mut rest = String::with_capacity(content.len() - whole.len());
            rest.push_str(&content[..whole.start]);
            rest.push_str(&content[whole.end..]);

            SplitContent {
                think: if interior.is_empty() {
                    None
                } else {
                    Some(interior.to_string())
                },
                body: rest.trim().to_string(),
            }
        }
        None => SplitContent {
            think: None,
            body: content.to_string(),
        },
    }
}

/// Joins reasoning and body back into message content.
///
/// # Examples
///
/// ```
/// use labelwise_core::content::join;
///
/// assert_eq!(join(Some("reasoning"), "answer"), "<think>reasoning</think>\nanswer");
/// assert_eq!(join(Some("reasoning"), ""), "<think>reasoning</think>");
/// assert_eq!(join(None, "answer"), "answer");
/// ```
pub fn join(think: Option<&str>, body: &str) -> String {
    match think {
        Some(think) if !think.is_empty() => {
            let mut out = String::with_capacity(
                THINK_OPEN.len() + think.len() + THINK_CLOSE.len() + 1 + body.len(),
            );
            out.push_str(THINK_OPEN);
            out.push_str(think);
            out.push_str(THINK_CLOSE);
            if !body.is_empty() {
                out.push('\n');
                out.push_str(body);
            }
            out
        }
        _ => body.to_string(),
    }
}

/// `join(split(content))`: the form every message takes in a submitted
/// snapshot.
pub fn normalize_content(content: &str) -> String {
    let parts = split(content);
    join(parts.think.as_deref(), &parts.body)
}

/// Whether content carries a think block.
pub fn has_think_block(content: &str) -> bool {
    THINK_BLOCK.is_match(content)
}

/// Edit form for a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub message_id: i64,
    pub role: MessageRole,
    pub think: String,
    pub body: String,
}

impl MessageDraft {
    /// Prefills the form from an existing message.
    pub fn from_message(message: &LineItemMessage) -> Self {
        let parts = split(&message.content);
        Self {
            message_id: message.id,
            role: message.role.clone(),
            think: parts.think.unwrap_or_default(),
            body: parts.body,
        }
    }

    /// Content produced on save: both fields trimmed, then joined.
    pub fn content(&self) -> String {
        let think = self.think.trim();
        join(
            if think.is_empty() { None } else { Some(think) },
            self.body.trim(),
        )
    }

    /// Request body for the message update endpoint.
    pub fn to_request(&self) -> UpdateMessageRequest {
        UpdateMessageRequest {
            role: self.role.clone(),
            content: self.content(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn message(content: &str) -> LineItemMessage {
        let ts = NaiveDateTime::parse_from_str("2025-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        LineItemMessage {
            id: 7,
            line_message_index: 1,
            role: MessageRole::Assistant,
            content: content.to_string(),
            feedback: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_split_basic() {
        let parts = split("<think>reasoning</think>answer");
        assert_eq!(parts.think.as_deref(), Some("reasoning"));
        assert_eq!(parts.body, "answer");
    }

    #[test]
    fn test_split_trims_interior_and_body() {
        let parts = split("  <think>\n  step one\n  step two \n</think>\n\n  final  ");
        assert_eq!(parts.think.as_deref(), Some("step one\n  step two"));
        assert_eq!(parts.body, "final");
    }

    #[test]
    fn test_split_without_block_keeps_content_verbatim() {
        let parts = split("  plain answer \n");
        assert_eq!(parts.think, None);
        assert_eq!(parts.body, "  plain answer \n");
    }

    #[test]
    fn test_split_block_in_middle() {
        let parts = split("before <think>why</think> after");
        assert_eq!(parts.think.as_deref(), Some("why"));
        assert_eq!(parts.body, "before  after");
    }

    #[test]
    fn test_split_blank_block_is_none() {
        let parts = split("<think>   </think>answer");
        assert_eq!(parts.think, None);
        assert_eq!(parts.body, "answer");
    }

    #[test]
    fn test_split_unclosed_tag_is_not_a_block() {
        let parts = split("<think>never closed");
        assert_eq!(parts.think, None);
        assert_eq!(parts.body, "<think>never closed");
    }

    #[test]
    fn test_split_only_first_block_honored() {
        let parts = split("<think>a</think>x<think>b</think>y");
        assert_eq!(parts.think.as_deref(), Some("a"));
        assert_eq!(parts.body, "x<think>b</think>y");
    }

    #[test]
    fn test_join_variants() {
        assert_eq!(join(Some("r"), "a"), "<think>r</think>\na");
        assert_eq!(join(Some("r"), ""), "<think>r</think>");
        assert_eq!(join(Some(""), "a"), "a");
        assert_eq!(join(None, " a "), " a ");
    }

    #[test]
    fn test_split_join_split_is_stable() {
        let samples = [
            "<think>reasoning</think>answer",
            "no block at all",
            "  padded  ",
            "<think>only thinking</think>",
            "<think>\nmulti\nline\n</think>\n\nbody\nwith lines",
            "prefix <think>mid</think> suffix",
            "<think> </think>blank think",
            "",
        ];
        for content in samples {
            let first = split(content);
            let rejoined = join(first.think.as_deref(), &first.body);
            assert_eq!(split(&rejoined), first, "content: {:?}", content);
        }
    }

    #[test]
    fn test_normalize_content() {
        assert_eq!(
            normalize_content("<think> r </think>   a"),
            "<think>r</think>\na"
        );
        assert_eq!(normalize_content("plain"), "plain");
    }

    #[test]
    fn test_has_think_block() {
        assert!(has_think_block("<think>x</think>"));
        assert!(!has_think_block("<think>x"));
    }

    #[test]
    fn test_draft_round_trip() {
        let msg = message("<think>because</think>\nthe answer");
        let draft = MessageDraft::from_message(&msg);
        assert_eq!(draft.think, "because");
        assert_eq!(draft.body, "the answer");
        assert_eq!(draft.content(), "<think>because</think>\nthe answer");
    }

    #[test]
    fn test_draft_clearing_think_drops_block() {
        let msg = message("<think>because</think>answer");
        let mut draft = MessageDraft::from_message(&msg);
        draft.think = "   ".to_string();
        draft.body = " edited ".to_string();
        let req = draft.to_request();
        assert_eq!(req.content, "edited");
        assert_eq!(req.role, MessageRole::Assistant);
    }
}
