//! Message rendering
//!
//! Turns a [`UserRecord`] into the embed shown in the history channel.
//! Rendering is pure: equal records always produce equal content.

use crate::types::UserRecord;
use serde::{Deserialize, Serialize};

/// Embed colour used for every history message
pub const EMBED_COLOR: u32 = 0x0034_98DB;

/// Maximum embed title length accepted by the platform
pub const MAX_TITLE_CHARS: usize = 256;

/// Maximum embed field value length accepted by the platform
pub const MAX_FIELD_VALUE_CHARS: usize = 1024;

/// Placeholder shown when a member has no past names
pub const NO_PAST_NAMES: &str = "None";

const PAST_NAMES_SEPARATOR: &str = ", ";

/// One named field of an embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl EmbedField {
    fn block(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline: false,
        }
    }
}

/// Content of a history message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

impl MessageContent {
    /// Look up a field value by field name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// Render the history message for `record`
#[must_use]
pub fn render(record: &UserRecord) -> MessageContent {
    MessageContent {
        title: truncate_chars(
            &format!("Name History for {}", record.current_name),
            MAX_TITLE_CHARS,
        ),
        color: EMBED_COLOR,
        fields: vec![
            EmbedField::block("User ID", record.user_id.to_string()),
            EmbedField::block(
                "Current Name",
                truncate_chars(&record.current_name, MAX_FIELD_VALUE_CHARS),
            ),
            EmbedField::block("Past Names", past_names_value(&record.past_names)),
        ],
    }
}

/// Join past names in insertion order, keeping within the field limit.
///
/// When the full list does not fit, the earliest names that do are kept
/// and the rest are summarised as `… (+N more)`.
fn past_names_value(names: &[String]) -> String {
    if names.is_empty() {
        return NO_PAST_NAMES.to_string();
    }

    let joined = names.join(PAST_NAMES_SEPARATOR);
    if joined.chars().count() <= MAX_FIELD_VALUE_CHARS {
        return joined;
    }

    let mut kept = 0usize;
    let mut used = 0usize;
    for (idx, name) in names.iter().enumerate() {
        let piece = name.chars().count() + if idx == 0 { 0 } else { PAST_NAMES_SEPARATOR.len() };
        let rest = names.len() - idx - 1;
        let tail = if rest == 0 {
            0
        } else {
            PAST_NAMES_SEPARATOR.len() + more_suffix(rest).chars().count()
        };
        if used + piece + tail > MAX_FIELD_VALUE_CHARS {
            break;
        }
        used += piece;
        kept = idx + 1;
    }

    let suffix = more_suffix(names.len() - kept);
    if kept == 0 {
        return suffix;
    }
    let mut value = names[..kept].join(PAST_NAMES_SEPARATOR);
    value.push_str(PAST_NAMES_SEPARATOR);
    value.push_str(&suffix);
    value
}

fn more_suffix(count: usize) -> String {
    format!("… (+{count} more)")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_all_fields() {
        let record = UserRecord::new(UserId(42), "alicia").with_past_names(["alice", "ally"]);
        let content = render(&record);

        assert_eq!(content.title, "Name History for alicia");
        assert_eq!(content.color, EMBED_COLOR);
        assert_eq!(content.field("User ID"), Some("42"));
        assert_eq!(content.field("Current Name"), Some("alicia"));
        assert_eq!(content.field("Past Names"), Some("alice, ally"));
        assert!(content.fields.iter().all(|f| !f.inline));
    }

    #[test]
    fn empty_history_uses_placeholder() {
        let content = render(&UserRecord::new(UserId(1), "bob"));
        assert_eq!(content.field("Past Names"), Some(NO_PAST_NAMES));
    }

    #[test]
    fn rendering_is_deterministic() {
        let record = UserRecord::new(UserId(7), "x").with_past_names(["a", "b", "c"]);
        assert_eq!(render(&record), render(&record.clone()));
        assert_eq!(
            serde_json::to_vec(&render(&record)).unwrap(),
            serde_json::to_vec(&render(&record)).unwrap()
        );
    }

    #[test]
    fn long_history_is_summarised_within_limit() {
        let names: Vec<String> = (0..300).map(|i| format!("member-name-{i:03}")).collect();
        let record = UserRecord::new(UserId(1), "now").with_past_names(names);
        let content = render(&record);
        let value = content.field("Past Names").unwrap();

        assert!(value.chars().count() <= MAX_FIELD_VALUE_CHARS);
        assert!(value.starts_with("member-name-000, member-name-001"));
        assert!(value.ends_with("more)"));
    }

    #[test]
    fn history_exactly_at_limit_is_not_summarised() {
        let name = "n".repeat(MAX_FIELD_VALUE_CHARS);
        let record = UserRecord::new(UserId(1), "now").with_past_names([name.clone()]);
        assert_eq!(render(&record).field("Past Names"), Some(name.as_str()));
    }

    #[test]
    fn long_title_is_truncated() {
        let record = UserRecord::new(UserId(1), "z".repeat(400));
        let content = render(&record);
        assert_eq!(content.title.chars().count(), MAX_TITLE_CHARS);
        assert!(content.title.ends_with('…'));
    }
}
