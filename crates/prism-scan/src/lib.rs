//! The scanning loop: state machine, scheduler and detectors.
//!
//! [`ScanController`] owns a [`FrameSource`](prism_camera::FrameSource) and a
//! [`Detector`]. On a fixed period it grabs the latest frame, runs at most one
//! detection at a time and publishes [`ScanSnapshot`]s through a `watch`
//! channel. A [`ScanHandle`] drives it from other tasks.

pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod local;
pub mod remote;
pub mod result;
pub mod status;

pub use config::ScanConfig;
pub use controller::{Completion, ScanCommand, ScanController, ScanHandle, TickOutcome};
pub use detector::{AnyDetector, Detector};
pub use error::{DetectError, ScanError};
pub use local::LocalDetector;
pub use remote::{RemoteConfig, RemoteDetector, ScanResponse, jpeg_data_url};
pub use result::{Detection, DetectionResult};
pub use status::{ScanSnapshot, ScanStatus};
