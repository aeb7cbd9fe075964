use {crate::Device, std::fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum InferError {
    ModelLoad(String),
    Labels(String),
    HandleExpired,
    LabelMismatch { labels: usize, outputs: usize },
    ShapeMismatch { expected: String, got: String },
    InvalidInput { name: String, expected_names: Vec<String> },
    Backend(String),
    UnsupportedDevice(Device),
    Preprocess(String),
}

impl InferError {
    /// Errors that will repeat on every predict until the model is reloaded
    /// or reconfigured.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InferError::ModelLoad(_)
                | InferError::Labels(_)
                | InferError::HandleExpired
                | InferError::LabelMismatch { .. }
                | InferError::InvalidInput { .. }
                | InferError::UnsupportedDevice(_)
        )
    }
}

impl fmt::Display for InferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferError::ModelLoad(msg) => write!(f, "model load error: {msg}"),
            InferError::Labels(msg) => write!(f, "label error: {msg}"),
            InferError::HandleExpired => write!(f, "model handle has been unloaded"),
            InferError::LabelMismatch { labels, outputs } => {
                write!(f, "label set has {labels} entries but the model produced {outputs} outputs")
            }
            InferError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {expected}, got {got}")
            }
            InferError::InvalidInput {
                name,
                expected_names,
            } => write!(
                f,
                "invalid input name '{name}', expected one of: {}",
                expected_names.join(", ")
            ),
            InferError::Backend(msg) => write!(f, "backend error: {msg}"),
            InferError::UnsupportedDevice(device) => write!(f, "unsupported device: {device}"),
            InferError::Preprocess(msg) => write!(f, "preprocess error: {msg}"),
        }
    }
}

impl std::error::Error for InferError {}

impl From<prism_image::ImageError> for InferError {
    fn from(err: prism_image::ImageError) -> Self {
        InferError::Preprocess(err.to_string())
    }
}

impl From<prism_base::TensorError> for InferError {
    fn from(err: prism_base::TensorError) -> Self {
        InferError::Backend(err.to_string())
    }
}
