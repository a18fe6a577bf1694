//! Oldest-first message selection for summarization.

use ember_types::{Message, MessageSelection};

/// Partition messages into a summarize prefix and a keep suffix.
///
/// Greedy oldest-first: summarizing the oldest `floor(len * target_fraction)`
/// messages preserves conversational recency for continuation while bounding
/// context growth. At least `min_keep` messages always survive unless the
/// session is already at or below that floor, in which case everything is
/// kept. Deterministic and idempotent for equal inputs.
#[must_use]
pub fn select_for_summarization(
    messages: &[Message],
    target_fraction: f64,
    min_keep: usize,
) -> MessageSelection {
    if messages.is_empty() || messages.len() <= min_keep {
        return MessageSelection::keep_all(messages);
    }

    let fraction = if target_fraction.is_finite() {
        target_fraction.max(0.0)
    } else {
        0.0
    };
    let target_count = (messages.len() as f64 * fraction).floor() as usize;
    let summarize_count = target_count.min(messages.len() - min_keep);

    if summarize_count == 0 {
        return MessageSelection::keep_all(messages);
    }

    MessageSelection {
        to_summarize: messages[..summarize_count].to_vec(),
        to_keep: messages[summarize_count..].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use ember_types::{MessageId, Role};

    use super::*;

    fn messages(count: u64) -> Vec<Message> {
        (0..count)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                Message::new(
                    MessageId::new(i),
                    role,
                    format!("message {i}"),
                    SystemTime::UNIX_EPOCH,
                )
            })
            .collect()
    }

    fn ids(selected: &[Message]) -> Vec<u64> {
        selected.iter().map(|m| m.id().value()).collect()
    }

    #[test]
    fn empty_input_yields_empty_partitions() {
        let selection = select_for_summarization(&[], 0.5, 4);
        assert!(selection.to_summarize.is_empty());
        assert!(selection.to_keep.is_empty());
    }

    #[test]
    fn at_or_below_floor_keeps_everything() {
        for count in 1..=4 {
            let input = messages(count);
            let selection = select_for_summarization(&input, 0.5, 4);
            assert!(selection.to_summarize.is_empty(), "count {count}");
            assert_eq!(ids(&selection.to_keep), ids(&input));
        }
    }

    #[test]
    fn ten_messages_half_target_summarizes_oldest_half() {
        let input = messages(10);
        let selection = select_for_summarization(&input, 0.5, 4);
        // floor(10 * 0.5) = 5, under the 10 - 4 = 6 clamp.
        assert_eq!(ids(&selection.to_summarize), vec![0, 1, 2, 3, 4]);
        assert_eq!(ids(&selection.to_keep), vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn clamp_preserves_min_keep() {
        let input = messages(10);
        let selection = select_for_summarization(&input, 0.9, 4);
        // floor(10 * 0.9) = 9, clamped to 10 - 4 = 6.
        assert_eq!(selection.to_summarize.len(), 6);
        assert_eq!(ids(&selection.to_keep), vec![6, 7, 8, 9]);
    }

    #[test]
    fn partition_is_exact_and_order_preserving() {
        for count in [5usize, 8, 13, 50] {
            for fraction in [0.1, 0.3, 0.5, 0.75, 1.0] {
                let input = messages(count as u64);
                let selection = select_for_summarization(&input, fraction, 4);
                assert_eq!(
                    selection.to_summarize.len() + selection.to_keep.len(),
                    count,
                    "count {count} fraction {fraction}"
                );
                let mut recombined = ids(&selection.to_summarize);
                recombined.extend(ids(&selection.to_keep));
                assert_eq!(recombined, ids(&input));
                if count > 4 && fraction > 0.0 {
                    assert!(selection.to_keep.len() >= 4);
                }
            }
        }
    }

    #[test]
    fn zero_fraction_keeps_everything() {
        let input = messages(10);
        let selection = select_for_summarization(&input, 0.0, 4);
        assert!(selection.to_summarize.is_empty());
        assert_eq!(selection.to_keep.len(), 10);
    }

    #[test]
    fn degenerate_fractions_are_treated_as_zero() {
        let input = messages(10);
        for fraction in [f64::NAN, f64::NEG_INFINITY, -0.5] {
            let selection = select_for_summarization(&input, fraction, 4);
            assert!(selection.to_summarize.is_empty());
        }
    }

    #[test]
    fn selection_is_idempotent_for_equal_inputs() {
        let input = messages(17);
        let first = select_for_summarization(&input, 0.5, 4);
        let second = select_for_summarization(&input, 0.5, 4);
        assert_eq!(ids(&first.to_summarize), ids(&second.to_summarize));
        assert_eq!(ids(&first.to_keep), ids(&second.to_keep));
    }
}
