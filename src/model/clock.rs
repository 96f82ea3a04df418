/// Frame clock fed with monotonic timestamps in seconds.
///
/// `elapsed` is the sum of all reported deltas, so animation driven by it
/// stays in step with movement driven by the value `tick` returns.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<f64>,
    elapsed: f64,
    max_delta: Option<f32>,
}

impl FrameClock {
    pub fn new(max_delta: Option<f32>) -> Self {
        Self {
            last: None,
            elapsed: 0.0,
            max_delta,
        }
    }

    /// Advance to `now` and return the delta since the previous tick.
    /// The first tick only latches the timestamp and reports zero.
    pub fn tick(&mut self, now: f64) -> f32 {
        let raw = match self.last {
            Some(last) => (now - last).max(0.0),
            None => 0.0,
        };
        // A timestamp going backwards must not rewind the reference point.
        self.last = Some(self.last.map_or(now, |last| last.max(now)));

        let mut dt = raw as f32;
        if let Some(max) = self.max_delta {
            dt = dt.min(max);
        }
        self.elapsed += dt as f64;
        dt
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn set_max_delta(&mut self, max_delta: Option<f32>) {
        self.max_delta = max_delta;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Some(0.1))
    }
}
