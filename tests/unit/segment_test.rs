//! Segmentation properties over varied gap patterns

use chatlens::analyzer::Segmenter;
use chatlens::Message;

use crate::helpers::messages_with_gaps;

fn flatten(messages: &[Message], segmenter: &Segmenter) -> Vec<Message> {
    segmenter
        .segment(messages)
        .flat_map(|s| s.into_messages())
        .collect()
}

#[test]
fn sessions_partition_the_input_in_order() {
    let patterns: &[&[i64]] = &[
        &[],
        &[10, 20, 30],
        &[5000, 5000, 5000],
        &[1, 1800, 1801, 0, 7200, 60],
        &[3600, 1, 1, 1, 3600],
    ];
    let segmenter = Segmenter::default();

    for gaps in patterns {
        let messages = messages_with_gaps(gaps);
        assert_eq!(flatten(&messages, &segmenter), messages, "gaps {:?}", gaps);
    }
}

#[test]
fn every_session_is_non_empty() {
    let messages = messages_with_gaps(&[4000, 4000, 10, 4000]);
    for session in Segmenter::default().segment(&messages) {
        assert!(!session.is_empty());
    }
}

#[test]
fn gaps_inside_sessions_are_within_threshold() {
    let messages = messages_with_gaps(&[100, 1800, 2000, 50, 1799, 1801]);
    for session in Segmenter::new(1800).segment(&messages) {
        for pair in session.messages().windows(2) {
            assert!((pair[1].timestamp - pair[0].timestamp).num_seconds() <= 1800);
        }
    }
}

#[test]
fn threshold_boundary_merges_at_equal_and_splits_above() {
    let segmenter = Segmenter::new(1800);
    assert_eq!(segmenter.count(&messages_with_gaps(&[1800])), 1);
    assert_eq!(segmenter.count(&messages_with_gaps(&[1801])), 2);
}

#[test]
fn count_matches_iteration() {
    let messages = messages_with_gaps(&[1, 4000, 4000, 2, 3, 9000]);
    let segmenter = Segmenter::default();
    assert_eq!(segmenter.count(&messages), segmenter.segment(&messages).count());
    assert_eq!(segmenter.count(&messages), 4);
}

#[test]
fn empty_input_yields_no_sessions() {
    assert_eq!(Segmenter::default().segment(&[]).count(), 0);
}

#[test]
fn single_message_is_one_session() {
    let messages = messages_with_gaps(&[]);
    let sessions: Vec<_> = Segmenter::default().segment(&messages).collect();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].len(), 1);
}
