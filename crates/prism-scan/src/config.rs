use {
    prism_base::Vec2,
    prism_camera::Facing,
    std::time::Duration,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    interval: Duration,
    threshold: f32,
    max_consecutive_failures: u32,
    facing: Facing,
    size_hint: Option<Vec2<usize>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            threshold: 0.7,
            max_consecutive_failures: 5,
            facing: Facing::Environment,
            size_hint: Some(Vec2::new(1280, 720)),
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time between captures.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Minimum confidence for a detection to be published, clamped to `[0, 1]`.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Failed ticks in a row tolerated before giving up. At least 1.
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max.max(1);
        self
    }

    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    pub fn with_size_hint(mut self, size_hint: Option<Vec2<usize>>) -> Self {
        self.size_hint = size_hint;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn max_consecutive_failures(&self) -> u32 {
        self.max_consecutive_failures
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn size_hint(&self) -> Option<Vec2<usize>> {
        self.size_hint
    }
}
