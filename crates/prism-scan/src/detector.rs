use {
    crate::{DetectError, Detection, LocalDetector, RemoteDetector},
    prism_camera::Frame,
    std::future::Future,
};

/// Turns a frame into a best guess.
///
/// Implementations must be safe to call from a spawned task; the controller
/// never has more than one call outstanding.
pub trait Detector: Send + Sync + 'static {
    fn detect(&self, frame: Frame) -> impl Future<Output = Result<Detection, DetectError>> + Send;
}

/// Local or remote detection, chosen at runtime.
pub enum AnyDetector {
    Local(LocalDetector),
    Remote(RemoteDetector),
}

impl Detector for AnyDetector {
    fn detect(&self, frame: Frame) -> impl Future<Output = Result<Detection, DetectError>> + Send {
        async move {
            match self {
                AnyDetector::Local(detector) => detector.detect(frame).await,
                AnyDetector::Remote(detector) => detector.detect(frame).await,
            }
        }
    }
}

impl From<LocalDetector> for AnyDetector {
    fn from(detector: LocalDetector) -> Self {
        AnyDetector::Local(detector)
    }
}

impl From<RemoteDetector> for AnyDetector {
    fn from(detector: RemoteDetector) -> Self {
        AnyDetector::Remote(detector)
    }
}
