//! Camera acquisition for the prism scanner.
//!
//! A [`FrameSource`] hands out a [`CaptureSession`] token on `acquire`, serves
//! the latest decoded [`Frame`] without blocking, and stops the device on
//! `release`. [`CameraSource`] implements it on top of any
//! [`DeviceProvider`], running one capture worker thread per session.

pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod session;
pub mod source;

#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use config::{CameraConfig, Constraints, Facing};
pub use device::{CaptureDevice, DeviceProvider, Negotiated, RawFrame};
pub use error::{DeviceError, FrameError};
pub use frame::Frame;
pub use session::{Capabilities, CaptureSession};
pub use source::{CameraSource, FrameSource};

#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Provider;
