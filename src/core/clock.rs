//! Frame clock measuring wall time between updates

use std::time::Instant;

/// A monotonic tick counter and its rate.
pub trait TimeSource {
    /// Current value of the counter. Must never decrease.
    fn counter(&self) -> u64;

    /// Ticks per second.
    fn frequency(&self) -> u64;
}

/// Nanosecond ticks since the source was created.
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn counter(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn frequency(&self) -> u64 {
        1_000_000_000
    }
}

/// Tracks the time between consecutive frames, in milliseconds.
///
/// Call [`update`](Self::update) exactly once per frame before reading
/// [`delta`](Self::delta). The first update measures the time since the clock
/// was constructed.
pub struct Clock<S: TimeSource = MonotonicTime> {
    source: S,
    start: u64,
    now: u64,
    last: u64,
    delta_ms: f32,
    frames: u64,
}

impl Clock<MonotonicTime> {
    pub fn new() -> Self {
        Self::with_source(MonotonicTime::new())
    }
}

impl Default for Clock<MonotonicTime> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TimeSource> Clock<S> {
    pub fn with_source(source: S) -> Self {
        let now = source.counter();
        Self {
            source,
            start: now,
            now,
            last: now,
            delta_ms: 0.0,
            frames: 0,
        }
    }

    /// Samples the time source and recomputes the frame delta.
    pub fn update(&mut self) {
        self.last = self.now;
        self.now = self.source.counter();
        self.delta_ms = self.ticks_to_ms(self.now.saturating_sub(self.last));
        self.frames += 1;
    }

    /// Milliseconds between the last two updates, `0.0` before the first one.
    #[must_use]
    pub fn delta(&self) -> f32 {
        self.delta_ms
    }

    /// Number of times [`update`](Self::update) has been called.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Milliseconds from construction to the last update.
    #[must_use]
    pub fn elapsed_ms(&self) -> f32 {
        self.ticks_to_ms(self.now.saturating_sub(self.start))
    }

    fn ticks_to_ms(&self, ticks: u64) -> f32 {
        let frequency = self.source.frequency().max(1);
        (ticks as f64 * 1000.0 / frequency as f64) as f32
    }
}
