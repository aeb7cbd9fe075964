use {
    crate::{Facing, Negotiated},
    prism_base::Vec2,
};

/// What the platform allowed during acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// The device accepted size/frame-rate constraints along with facing.
    pub extended_constraints: bool,
    /// Acquisition only succeeded after retrying with facing alone.
    pub minimal_fallback: bool,
}

/// Token for a live camera session.
///
/// The device itself stays inside the [`FrameSource`](crate::FrameSource);
/// callers hold this token and pass it back to read frames or release.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    id: u64,
    facing: Facing,
    negotiated: Negotiated,
    capabilities: Capabilities,
}

impl CaptureSession {
    pub fn new(id: u64, facing: Facing, negotiated: Negotiated, capabilities: Capabilities) -> Self {
        Self {
            id,
            facing,
            negotiated,
            capabilities,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn resolution(&self) -> Vec2<usize> {
        self.negotiated.size
    }

    pub fn frame_rate(&self) -> f32 {
        self.negotiated.frame_rate
    }

    pub fn negotiated(&self) -> &Negotiated {
        &self.negotiated
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
