//! Response-time annotation.

use crate::analyzer::types::Message;

/// Seconds between each message and the one before it.
///
/// The first message has no predecessor and gets `None`. Messages are
/// expected in timestamp order; an out-of-order pair yields a negative value.
pub fn response_times(messages: &[Message]) -> Vec<Option<f64>> {
    let mut times = Vec::with_capacity(messages.len());
    let mut previous = None;
    for message in messages {
        times.push(previous.map(|prev: &Message| {
            (message.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0
        }));
        previous = Some(message);
    }
    times
}
