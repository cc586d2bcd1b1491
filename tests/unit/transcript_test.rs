//! Transcript parsing and response-time annotation on the sample fixture

use chatlens::analyzer::Segmenter;
use chatlens::transcript::{parse_transcript, response_times};

use crate::helpers::load_fixture;

#[test]
fn sample_transcript_parses_all_messages() {
    let messages = parse_transcript(&load_fixture("chat_sample.txt"), "Alice");

    assert_eq!(messages.len(), 11);
    assert_eq!(messages[0].content, "good morning! did you see the trip photos?");
    assert_eq!(messages[3].content, "definitely\nlet's plan it this weekend");
    assert_eq!(messages.iter().filter(|m| m.is_user).count(), 5);
}

#[test]
fn sample_transcript_segments_on_long_gaps() {
    let messages = parse_transcript(&load_fixture("chat_sample.txt"), "Alice");
    let sizes: Vec<usize> = Segmenter::default()
        .segment(&messages)
        .map(|s| s.len())
        .collect();

    assert_eq!(sizes, vec![4, 2, 4, 1]);
}

#[test]
fn response_times_follow_message_order() {
    let messages = parse_transcript(&load_fixture("chat_sample.txt"), "Alice");
    let times = response_times(&messages);

    assert_eq!(times.len(), messages.len());
    assert_eq!(times[0], None);
    assert_eq!(times[1], Some(41.0));
    assert_eq!(times[2], Some(89.0));
}
