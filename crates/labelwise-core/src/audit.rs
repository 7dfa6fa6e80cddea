//! Diff rendering for audit log entries.

use serde_json::Value as JsonValue;
use similar::{ChangeTag, TextDiff};

use crate::models::{LineItemAuditLog, LineItemMessageAuditLog, LineItemStatus};

/// Kind of a diff segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Equal,
    Inserted,
    Removed,
}

/// Run of consecutive tokens with the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    pub kind: SegmentKind,
    pub text: String,
}

/// Change between an old and a new text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextChange {
    /// Neither side has a value.
    Empty,
    Created(String),
    Deleted(String),
    Changed(Vec<DiffSegment>),
}

/// Word-level diff. Empty strings count as absent.
pub fn text_change(old: Option<&str>, new: Option<&str>) -> TextChange {
    let old = old.filter(|s| !s.is_empty());
    let new = new.filter(|s| !s.is_empty());
    match (old, new) {
        (None, None) => TextChange::Empty,
        (None, Some(new)) => TextChange::Created(new.to_string()),
        (Some(old), None) => TextChange::Deleted(old.to_string()),
        (Some(old), Some(new)) => TextChange::Changed(word_diff(old, new)),
    }
}

/// Word-level diff segments with adjacent same-kind tokens merged.
pub fn word_diff(old: &str, new: &str) -> Vec<DiffSegment> {
    let diff = TextDiff::from_words(old, new);
    let mut segments: Vec<DiffSegment> = Vec::new();

    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => SegmentKind::Equal,
            ChangeTag::Insert => SegmentKind::Inserted,
            ChangeTag::Delete => SegmentKind::Removed,
        };
        match segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => segments.push(DiffSegment {
                kind,
                text: change.value().to_string(),
            }),
        }
    }

    segments
}

/// Inline rendering: removals as `[-text-]`, insertions as `{+text+}`.
pub fn render_text_change(change: &TextChange) -> String {
    match change {
        TextChange::Empty => String::new(),
        TextChange::Created(text) => format!("{{+{}+}}", text),
        TextChange::Deleted(text) => format!("[-{}-]", text),
        TextChange::Changed(segments) => {
            let mut out = String::new();
            for segment in segments {
                match segment.kind {
                    SegmentKind::Equal => out.push_str(&segment.text),
                    SegmentKind::Inserted => {
                        out.push_str("{+");
                        out.push_str(&segment.text);
                        out.push_str("+}");
                    }
                    SegmentKind::Removed => {
                        out.push_str("[-");
                        out.push_str(&segment.text);
                        out.push_str("-]");
                    }
                }
            }
            out
        }
    }
}

/// Old and new JSON values, pretty-printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonChange {
    Empty,
    Unchanged(String),
    Changed {
        old: Option<String>,
        new: Option<String>,
    },
}

pub fn json_change(old: Option<&JsonValue>, new: Option<&JsonValue>) -> JsonChange {
    let old = old.filter(|v| !v.is_null()).map(pretty_json);
    let new = new.filter(|v| !v.is_null()).map(pretty_json);
    match (old, new) {
        (None, None) => JsonChange::Empty,
        (Some(old), Some(new)) if old == new => JsonChange::Unchanged(new),
        (old, new) => JsonChange::Changed { old, new },
    }
}

fn pretty_json(value: &JsonValue) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// One-line summary of a line item log entry.
pub fn describe_line_item_log(log: &LineItemAuditLog) -> String {
    let actor = log
        .user_id
        .map(|id| format!("user {}", id))
        .unwrap_or_else(|| "system".to_string());
    let mut line = format!(
        "{} {} by {}",
        log.timestamp.format("%Y-%m-%d %H:%M:%S"),
        log.action.as_str(),
        actor
    );
    if log.old_status != log.new_status {
        let fmt_status = |s: Option<LineItemStatus>| {
            s.map(|s| s.as_str().to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        line.push_str(&format!(
            ": {} -> {}",
            fmt_status(log.old_status),
            fmt_status(log.new_status)
        ));
    }
    if let JsonChange::Changed { old, new } =
        json_change(log.old_tools.as_ref(), log.new_tools.as_ref())
    {
        line.push_str("\ntools changed");
        for (sign, side) in [("-", old), ("+", new)] {
            if let Some(text) = side {
                for row in text.lines() {
                    line.push('\n');
                    line.push_str(sign);
                    line.push(' ');
                    line.push_str(row);
                }
            }
        }
    }
    line
}

/// One-line header plus the content diff of a message log entry.
pub fn describe_message_log(log: &LineItemMessageAuditLog) -> String {
    let actor = log
        .user_id
        .map(|id| format!("user {}", id))
        .unwrap_or_else(|| "system".to_string());
    let mut out = format!(
        "{} {} message {} by {}",
        log.timestamp.format("%Y-%m-%d %H:%M:%S"),
        log.action.as_str(),
        log.line_item_message_id,
        actor
    );
    if log.old_role != log.new_role {
        out.push_str(&format!(
            " (role {} -> {})",
            log.old_role.as_deref().unwrap_or("-"),
            log.new_role.as_deref().unwrap_or("-")
        ));
    }
    let change = text_change(log.old_content.as_deref(), log.new_content.as_deref());
    if change != TextChange::Empty {
        out.push('\n');
        out.push_str(&render_text_change(&change));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuditAction;
    use chrono::NaiveDateTime;
    use serde_json::json;

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-02-03 04:05:06", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_word_diff_merges_runs() {
        let segments = word_diff("the quick brown fox", "the slow brown fox");
        let rendered = render_text_change(&TextChange::Changed(segments.clone()));
        assert_eq!(rendered, "the [-quick-]{+slow+} brown fox");
        assert!(segments.iter().any(|s| s.kind == SegmentKind::Removed && s.text == "quick"));
    }

    #[test]
    fn test_text_change_sides() {
        assert_eq!(text_change(None, Some("")), TextChange::Empty);
        assert_eq!(text_change(None, Some("hi")), TextChange::Created("hi".into()));
        assert_eq!(text_change(Some("hi"), None), TextChange::Deleted("hi".into()));
    }

    #[test]
    fn test_json_change() {
        let a = json!([{"name": "search"}]);
        let b = json!([{"name": "fetch"}]);
        assert_eq!(json_change(None, Some(&JsonValue::Null)), JsonChange::Empty);
        assert!(matches!(json_change(Some(&a), Some(&a)), JsonChange::Unchanged(_)));
        match json_change(Some(&a), Some(&b)) {
            JsonChange::Changed { old, new } => {
                assert!(old.unwrap().contains("\"search\""));
                assert!(new.unwrap().contains("\n"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_describe_status_change() {
        let log = LineItemAuditLog {
            id: 1,
            line_item_id: 9,
            project_id: 2,
            user_id: Some(5),
            action: AuditAction::StatusChange,
            old_status: Some(LineItemStatus::Unlabeled),
            new_status: Some(LineItemStatus::Confirmed),
            old_feedback: None,
            new_feedback: None,
            old_tools: None,
            new_tools: None,
            ip_address: None,
            user_agent: None,
            additional_data: None,
            timestamp: ts(),
        };
        assert_eq!(
            describe_line_item_log(&log),
            "2025-02-03 04:05:06 STATUS_CHANGE by user 5: UNLABELED -> CONFIRMED"
        );
    }

    #[test]
    fn test_describe_tools_change() {
        let log = LineItemAuditLog {
            id: 2,
            line_item_id: 9,
            project_id: 2,
            user_id: Some(1),
            action: AuditAction::Update,
            old_status: Some(LineItemStatus::Confirmed),
            new_status: Some(LineItemStatus::Confirmed),
            old_feedback: None,
            new_feedback: None,
            old_tools: Some(json!(["a"])),
            new_tools: Some(json!(["b"])),
            ip_address: None,
            user_agent: None,
            additional_data: None,
            timestamp: ts(),
        };
        let text = describe_line_item_log(&log);
        assert!(text.starts_with("2025-02-03 04:05:06 UPDATE by user 1\ntools changed\n"));
        assert!(text.contains("\n-   \"a\""));
        assert!(text.contains("\n+   \"b\""));
    }

    #[test]
    fn test_describe_message_update() {
        let log = LineItemMessageAuditLog {
            id: 1,
            line_item_message_id: 30,
            line_item_id: 9,
            project_id: 2,
            user_id: None,
            action: AuditAction::Update,
            old_role: Some("assistant".into()),
            new_role: Some("assistant".into()),
            old_content: Some("hello world".into()),
            new_content: Some("hello there".into()),
            old_feedback: None,
            new_feedback: None,
            ip_address: None,
            user_agent: None,
            additional_data: None,
            timestamp: ts(),
        };
        let text = describe_message_log(&log);
        assert!(text.starts_with("2025-02-03 04:05:06 UPDATE message 30 by system\n"));
        assert!(text.ends_with("hello [-world-]{+there+}"));
    }
}
