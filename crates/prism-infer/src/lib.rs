//! Model lifecycle and classification for the prism scanner.
//!
//! An [`InferenceEngine`] loads a model once through a [`Backend`], hands out
//! a cloneable [`ModelHandle`], runs `predict` on decoded images and disposes
//! of the session on `unload`. Every intermediate buffer created during a
//! predict is tracked by a [`BufferLedger`].

pub mod backend;
pub mod backends;
pub mod buffers;
pub mod classification;
pub mod device;
pub mod engine;
pub mod error;
pub mod handle;
pub mod labels;
pub mod modelsource;
pub mod preprocess;
pub mod session;

pub use backend::Backend;
pub use buffers::{BufferLedger, BufferStats, ScratchBuffer};
pub use classification::{Classification, rank};
pub use device::Device;
pub use engine::InferenceEngine;
pub use error::InferError;
pub use handle::ModelHandle;
pub use labels::LabelSet;
pub use modelsource::{LabelSource, ModelLocation, ModelSource};
pub use preprocess::{InputSpec, Layout, Normalization};
pub use session::Session;

#[cfg(feature = "onnx")]
pub use backends::OnnxBackend;
