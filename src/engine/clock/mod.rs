/// Lifecycle state of a decode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Constructed, or a load attempt failed. Only `load` and `close` are legal.
    Unopened = 0,
    /// Engine and source are held; `read` and `seek` are legal.
    Opened = 1,
    /// Resources released. Terminal.
    Closed = 2,
}

/// The PositionClock is the millisecond bookkeeping of a session.
/// It converts produced byte counts into elapsed time using the output
/// format, and is overwritten directly by seeks.
#[derive(Debug, Clone)]
pub struct PositionClock {
    /// Current position in milliseconds.
    position_ms: f64,
    /// Output bytes that make up one millisecond of audio.
    bytes_per_ms: f64,
}

impl PositionClock {
    pub fn new(sample_rate: u32, channels: u16, bytes_per_sample: usize) -> Self {
        Self {
            position_ms: 0.0,
            bytes_per_ms: sample_rate as f64 * channels as f64 * bytes_per_sample as f64 / 1000.0,
        }
    }

    /// Returns the current position in milliseconds.
    pub fn position_ms(&self) -> f64 {
        self.position_ms
    }

    /// Sets the position in milliseconds (used for seeking).
    pub fn set_position_ms(&mut self, ms: f64) {
        self.position_ms = ms;
    }

    /// Advances the position by the duration of `bytes` of output audio.
    pub fn advance_bytes(&mut self, bytes: usize) {
        if self.bytes_per_ms > 0.0 {
            self.position_ms += bytes as f64 / self.bytes_per_ms;
        }
    }

    pub fn bytes_per_ms(&self) -> f64 {
        self.bytes_per_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cd_quality_is_176_4_bytes_per_ms() {
        let clock = PositionClock::new(44_100, 2, 2);
        assert_relative_eq!(clock.bytes_per_ms(), 176.4);
    }

    #[test]
    fn advance_and_set() {
        let mut clock = PositionClock::new(44_100, 2, 2);
        clock.advance_bytes(1764);
        assert_relative_eq!(clock.position_ms(), 10.0, epsilon = 1e-9);
        clock.set_position_ms(5000.0);
        assert_eq!(clock.position_ms(), 5000.0);
    }

    #[test]
    fn degenerate_format_never_advances() {
        let mut clock = PositionClock::new(0, 2, 2);
        clock.advance_bytes(4096);
        assert_eq!(clock.position_ms(), 0.0);
    }
}
