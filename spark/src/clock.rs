use std::time::{Duration, Instant};

/// Turns successive frame timestamps into whole-millisecond tick deltas.
#[derive(Debug, Default)]
pub struct FrameClock {
    previous: Option<Instant>,
    carry: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds since the previous frame, or `None` on the first frame.
    ///
    /// A timestamp earlier than the previous one counts as zero. The
    /// sub-millisecond remainder is carried into the next frame.
    pub fn delta(&mut self, now: Instant) -> Option<u64> {
        let previous = self.previous.replace(now)?;
        let elapsed = now.saturating_duration_since(previous) + self.carry;
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.carry = elapsed.saturating_sub(Duration::from_millis(millis));
        Some(millis)
    }
}
