use bytes::Bytes;
use std::time::Instant;

/// A generic message stamped with the instant it became available.
///
/// Every input to the playback controller carries its own `now`, so the
/// controller never reads the clock itself and can be driven
/// deterministically from tests or from a recorded stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMessage<T> {
    /// Arrival time
    pub now: Instant,
    /// Message body with generic type
    pub message: T,
}

impl<T> FrameMessage<T> {
    pub fn new(now: Instant, message: T) -> Self {
        Self { now, message }
    }
}

/// Bytes type message stamped with its arrival time
pub type TaggedBytes = FrameMessage<Bytes>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_message_keeps_arrival_time() {
        let now = Instant::now();
        let msg = TaggedBytes::new(now, Bytes::from_static(&[0, 0, 1, 0x65]));

        assert_eq!(msg.now, now);
        assert_eq!(msg.message.len(), 4);
    }
}
