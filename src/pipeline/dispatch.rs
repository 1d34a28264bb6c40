//! Duplicate-turn suppression for inbound assistant responses.

use std::time::{Duration, Instant};

use crate::pipeline::messages::AssistantTurn;

/// Tracks the most recently accepted turn identity.
///
/// The server occasionally delivers the same assistant turn twice in quick
/// succession; a repeated `(motion, text)` pair inside the trailing window
/// is treated as such a duplicate and suppressed. A legitimate identical
/// reply arriving after the window passes through.
pub struct TurnDeduper {
    window: Duration,
    last: Option<([u8; 32], Instant)>,
}

impl TurnDeduper {
    /// Create a deduper with the given trailing window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns `true` when the turn should be delivered. An accepted turn
    /// becomes the new reference identity for the window.
    pub fn accept(&mut self, turn: &AssistantTurn) -> bool {
        let key = turn.dedupe_key();
        if let Some((last_key, accepted_at)) = &self.last
            && *last_key == key
            && turn.received_at.duration_since(*accepted_at) < self.window
        {
            return false;
        }
        self.last = Some((key, turn.received_at));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn_at(text: &str, motion: Option<&str>, at: Instant) -> AssistantTurn {
        AssistantTurn {
            text: text.to_owned(),
            motion: motion.map(str::to_owned),
            received_at: at,
        }
    }

    #[test]
    fn duplicate_within_window_is_suppressed() {
        let mut deduper = TurnDeduper::new(Duration::from_secs(2));
        let base = Instant::now();

        assert!(deduper.accept(&turn_at("Hello", None, base)));
        assert!(!deduper.accept(&turn_at("Hello", None, base + Duration::from_millis(500))));
    }

    #[test]
    fn duplicate_after_window_is_accepted() {
        let mut deduper = TurnDeduper::new(Duration::from_secs(2));
        let base = Instant::now();

        assert!(deduper.accept(&turn_at("Hello", None, base)));
        assert!(deduper.accept(&turn_at("Hello", None, base + Duration::from_secs(3))));
    }

    #[test]
    fn different_text_is_accepted() {
        let mut deduper = TurnDeduper::new(Duration::from_secs(2));
        let base = Instant::now();

        assert!(deduper.accept(&turn_at("Hello", None, base)));
        assert!(deduper.accept(&turn_at("Goodbye", None, base + Duration::from_millis(10))));
    }

    #[test]
    fn different_motion_is_accepted() {
        let mut deduper = TurnDeduper::new(Duration::from_secs(2));
        let base = Instant::now();

        assert!(deduper.accept(&turn_at("Hello", Some("wave"), base)));
        assert!(deduper.accept(&turn_at("Hello", Some("nod"), base + Duration::from_millis(10))));
    }

    #[test]
    fn zero_window_accepts_repeats() {
        let mut deduper = TurnDeduper::new(Duration::ZERO);
        let base = Instant::now();

        assert!(deduper.accept(&turn_at("Hello", None, base)));
        assert!(deduper.accept(&turn_at("Hello", None, base)));
    }

    #[test]
    fn window_is_trailing_from_last_accepted() {
        let mut deduper = TurnDeduper::new(Duration::from_secs(2));
        let base = Instant::now();

        assert!(deduper.accept(&turn_at("Hello", None, base)));
        // Suppressed duplicates do not extend the window.
        assert!(!deduper.accept(&turn_at("Hello", None, base + Duration::from_secs(1))));
        assert!(deduper.accept(&turn_at("Hello", None, base + Duration::from_millis(2_500))));
    }
}
