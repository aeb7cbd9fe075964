use {
    crate::{DetectionResult, ScanError},
    std::fmt,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ScanStatus {
    #[default]
    Idle,
    AcquiringDevice,
    Ready,
    Inferring,
    Failed(ScanError),
}

impl ScanStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, ScanStatus::Failed(_))
    }

    /// Camera held and scanning, with or without a detection in flight.
    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanStatus::Ready | ScanStatus::Inferring)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStatus::Idle => write!(f, "idle"),
            ScanStatus::AcquiringDevice => write!(f, "acquiring camera"),
            ScanStatus::Ready => write!(f, "ready"),
            ScanStatus::Inferring => write!(f, "scanning"),
            ScanStatus::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

/// What a result sink sees: the current status and the last published result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSnapshot {
    pub status: ScanStatus,
    pub result: Option<DetectionResult>,
}
