//! Shared primitives for the prism scanning workspace.

pub mod epoch;
pub mod logging;
pub mod tensor;
pub mod vec2;

pub use epoch::Epoch;
pub use logging::{FileLogger, StdoutLogger, init_file_logger, init_stdout_logger, level_from_env};
pub use tensor::{Tensor, TensorError};
pub use vec2::Vec2;

// Re-export log crate so downstream crates can use prism_base::log::*
pub use log;
