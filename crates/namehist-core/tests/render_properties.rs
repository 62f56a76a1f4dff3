//! Property tests for history message rendering

use namehist_core::render::{MAX_FIELD_VALUE_CHARS, MAX_TITLE_CHARS};
use namehist_core::{render, UserId, UserRecord};
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = UserRecord> {
    (
        any::<u64>(),
        "\\PC{0,300}",
        proptest::collection::vec("\\PC{1,80}", 0..120),
    )
        .prop_map(|(id, current, past)| UserRecord::new(UserId(id), current).with_past_names(past))
}

proptest! {
    #[test]
    fn rendered_content_stays_within_limits(record in record_strategy()) {
        let content = render(&record);
        prop_assert!(content.title.chars().count() <= MAX_TITLE_CHARS);
        for field in &content.fields {
            prop_assert!(field.value.chars().count() <= MAX_FIELD_VALUE_CHARS);
        }
    }

    #[test]
    fn rendering_is_pure(record in record_strategy()) {
        prop_assert_eq!(render(&record), render(&record.clone()));
    }

    #[test]
    fn short_history_is_listed_in_full(
        past in proptest::collection::vec("[a-z]{1,12}", 1..20),
    ) {
        let record = UserRecord::new(UserId(1), "now").with_past_names(past);
        let content = render(&record);
        let expected = record.past_names.join(", ");
        prop_assert_eq!(content.field("Past Names"), Some(expected.as_str()));
    }

    #[test]
    fn truncated_history_reports_remainder(
        past in proptest::collection::vec("[a-z]{40,60}", 40..80),
    ) {
        let record = UserRecord::new(UserId(1), "now").with_past_names(past);
        let content = render(&record);
        let value = content.field("Past Names").unwrap_or_default();
        if record.past_names.join(", ").chars().count() > MAX_FIELD_VALUE_CHARS {
            prop_assert!(value.ends_with("more)"));
        }
    }
}
