use std::{fmt, io};

/// Why a camera could not be acquired or kept running.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    PermissionDenied(String),
    NoDevice(String),
    NegotiationFailed(String),
    PlaybackFailed(String),
}

impl DeviceError {
    /// Errors that need a new user gesture and must not be retried silently.
    pub fn needs_user_action(&self) -> bool {
        matches!(self, DeviceError::PermissionDenied(_) | DeviceError::NoDevice(_))
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::PermissionDenied(msg) => write!(f, "camera permission denied: {msg}"),
            DeviceError::NoDevice(msg) => write!(f, "no camera device: {msg}"),
            DeviceError::NegotiationFailed(msg) => write!(f, "camera negotiation failed: {msg}"),
            DeviceError::PlaybackFailed(msg) => write!(f, "camera playback failed: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}

impl From<io::Error> for DeviceError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => DeviceError::PermissionDenied(err.to_string()),
            io::ErrorKind::NotFound => DeviceError::NoDevice(err.to_string()),
            _ => DeviceError::NegotiationFailed(err.to_string()),
        }
    }
}

/// Why `current_frame` had nothing to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The device is still warming up.
    NotReady,
    /// The session was released or replaced.
    Released,
    /// The capture worker stopped after a device error.
    Lost,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::NotReady => write!(f, "no frame available yet"),
            FrameError::Released => write!(f, "capture session already released"),
            FrameError::Lost => write!(f, "capture stream lost"),
        }
    }
}

impl std::error::Error for FrameError {}
