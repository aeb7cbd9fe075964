use {prism_camera::DeviceError, prism_infer::InferError, std::fmt};

/// Why a single detection produced no result.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    Inference(InferError),
    BackendUnavailable(String),
    InvalidResponse(String),
    Encode(String),
}

impl DetectError {
    /// Errors that will not go away by trying the next frame.
    pub fn is_fatal(&self) -> bool {
        match self {
            DetectError::Inference(err) => err.is_fatal(),
            _ => false,
        }
    }
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::Inference(err) => write!(f, "inference failed: {err}"),
            DetectError::BackendUnavailable(msg) => write!(f, "detection backend unavailable: {msg}"),
            DetectError::InvalidResponse(msg) => write!(f, "invalid detection response: {msg}"),
            DetectError::Encode(msg) => write!(f, "cannot encode frame: {msg}"),
        }
    }
}

impl std::error::Error for DetectError {}

impl From<InferError> for DetectError {
    fn from(err: InferError) -> Self {
        DetectError::Inference(err)
    }
}

impl From<prism_image::ImageError> for DetectError {
    fn from(err: prism_image::ImageError) -> Self {
        DetectError::Encode(err.to_string())
    }
}

impl From<reqwest::Error> for DetectError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DetectError::InvalidResponse(err.to_string())
        } else {
            DetectError::BackendUnavailable(err.to_string())
        }
    }
}

/// What put the controller into `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    Device(DeviceError),
    Detect(DetectError),
    TooManyFailures { count: u32, last: String },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Device(err) => write!(f, "{err}"),
            ScanError::Detect(err) => write!(f, "{err}"),
            ScanError::TooManyFailures { count, last } => {
                write!(f, "{count} scans in a row failed, last: {last}")
            }
        }
    }
}

impl std::error::Error for ScanError {}

impl From<DeviceError> for ScanError {
    fn from(err: DeviceError) -> Self {
        ScanError::Device(err)
    }
}

impl From<DetectError> for ScanError {
    fn from(err: DetectError) -> Self {
        ScanError::Detect(err)
    }
}
