use crate::player::{Buttons, Input};

use super::protocol::sequence_greater_than;

/// Sending half of the input channel. Publishes on every change and again
/// every keepalive interval so a dropped change is recovered. Every publish
/// carries a fresh sequence number.
#[derive(Debug, Clone)]
pub struct InputPublisher {
    next_seq: u32,
    last_sent: Option<Buttons>,
    last_sent_ms: f64,
    keepalive_ms: f64,
}

impl InputPublisher {
    pub fn new(keepalive_ms: f64) -> Self {
        Self {
            next_seq: 1,
            last_sent: None,
            last_sent_ms: 0.0,
            keepalive_ms,
        }
    }

    pub fn poll(&mut self, now_ms: f64, buttons: Buttons) -> Option<Input> {
        let changed = self.last_sent != Some(buttons);
        let keepalive_due = now_ms - self.last_sent_ms >= self.keepalive_ms;
        if !changed && !keepalive_due {
            return None;
        }

        let input = Input::new(buttons, self.next_seq);
        self.next_seq = self.next_seq.wrapping_add(1);
        self.last_sent = Some(buttons);
        self.last_sent_ms = now_ms;
        Some(input)
    }

    /// The sequence number the most recent publish used.
    pub fn last_seq(&self) -> u32 {
        self.next_seq.wrapping_sub(1)
    }
}

/// Receiving half: the latest input from one sender.
#[derive(Debug, Clone)]
pub struct InputLatch {
    latest: Option<(Input, f64)>,
    stale_ms: f64,
}

impl InputLatch {
    pub fn new(stale_ms: f64) -> Self {
        Self {
            latest: None,
            stale_ms,
        }
    }

    /// Stores `input` unless its sequence number is not newer than the one
    /// already held. Returns whether it was accepted.
    pub fn offer(&mut self, input: Input, now_ms: f64) -> bool {
        if let Some((held, _)) = self.latest {
            if !sequence_greater_than(input.seq, held.seq) {
                log::trace!("discarding input seq {} (holding {})", input.seq, held.seq);
                return false;
            }
        }
        self.latest = Some((input, now_ms));
        true
    }

    /// The input to simulate with. Neutral when nothing has arrived within
    /// the staleness window, never the last value frozen.
    pub fn current(&self, now_ms: f64) -> Input {
        match self.latest {
            Some((input, received_ms)) if now_ms - received_ms <= self.stale_ms => input,
            _ => Input::NEUTRAL,
        }
    }

    pub fn is_stale(&self, now_ms: f64) -> bool {
        self.latest
            .is_none_or(|(_, received_ms)| now_ms - received_ms > self.stale_ms)
    }

    pub fn last_seq(&self) -> Option<u32> {
        self.latest.map(|(input, _)| input.seq)
    }

    pub fn reset(&mut self) {
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_on_change_and_keepalive() {
        let mut publisher = InputPublisher::new(100.0);

        let first = publisher.poll(0.0, Buttons::RIGHT).unwrap();
        assert_eq!(first.seq, 1);
        assert!(publisher.poll(16.0, Buttons::RIGHT).is_none());

        let changed = publisher.poll(32.0, Buttons::RIGHT | Buttons::JUMP).unwrap();
        assert_eq!(changed.seq, 2);

        assert!(publisher.poll(100.0, Buttons::RIGHT | Buttons::JUMP).is_none());
        let keepalive = publisher.poll(132.0, Buttons::RIGHT | Buttons::JUMP).unwrap();
        assert_eq!(keepalive.seq, 3);
        assert_eq!(publisher.last_seq(), 3);
    }

    #[test]
    fn latch_rejects_old_and_duplicate_sequences() {
        let mut latch = InputLatch::new(500.0);

        assert!(latch.offer(Input::new(Buttons::RIGHT, 5), 0.0));
        assert!(!latch.offer(Input::new(Buttons::LEFT, 4), 1.0));
        assert!(!latch.offer(Input::new(Buttons::LEFT, 5), 1.0));
        assert_eq!(latch.current(2.0).buttons, Buttons::RIGHT);

        assert!(latch.offer(Input::new(Buttons::LEFT, 6), 3.0));
        assert_eq!(latch.current(3.0).buttons, Buttons::LEFT);
    }

    #[test]
    fn stale_input_falls_back_to_neutral() {
        let mut latch = InputLatch::new(500.0);
        assert!(latch.current(0.0).is_neutral());
        assert!(latch.is_stale(0.0));

        latch.offer(Input::new(Buttons::RIGHT, 1), 1000.0);
        assert!(latch.current(1500.0).right());
        assert!(latch.current(1500.1).is_neutral());
        assert!(latch.is_stale(1600.0));
    }
}
