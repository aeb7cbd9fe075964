use {
    crate::{DetectError, Detection, Detector},
    prism_camera::Frame,
    prism_infer::{InferError, InferenceEngine, ModelHandle, ModelLocation},
    std::{future::Future, sync::Arc},
};

/// [`Detector`] running the classifier in-process.
///
/// The model is loaded through the engine on first use, so a failed load
/// surfaces as a fatal detection error and the next detect (after a retry)
/// loads it again. Predicts run on tokio's blocking pool. The top-ranked class
/// is the detection; its raw probability is the confidence.
pub struct LocalDetector {
    engine: Arc<InferenceEngine>,
    location: ModelLocation,
}

impl LocalDetector {
    pub fn new(engine: Arc<InferenceEngine>, location: ModelLocation) -> Self {
        Self { engine, location }
    }

    /// Start loading the model ahead of the first detection.
    pub async fn preload(&self) -> Result<ModelHandle, InferError> {
        self.engine.load(self.location.clone()).await
    }

    pub fn engine(&self) -> &Arc<InferenceEngine> {
        &self.engine
    }

    pub fn location(&self) -> &ModelLocation {
        &self.location
    }

    /// Free the model, if loaded. Waits for a predict in progress.
    pub async fn unload(&self) {
        let Some(handle) = self.engine.loaded() else {
            return;
        };
        let engine = Arc::clone(&self.engine);
        if let Err(error) = tokio::task::spawn_blocking(move || engine.unload(&handle)).await {
            log::error!("model unload task failed: {}", error);
        }
    }
}

impl Detector for LocalDetector {
    fn detect(&self, frame: Frame) -> impl Future<Output = Result<Detection, DetectError>> + Send {
        let engine = Arc::clone(&self.engine);
        let location = self.location.clone();
        async move {
            let handle = engine.load(location).await?;
            let ranked = tokio::task::spawn_blocking(move || engine.predict(&handle, &frame.image))
                .await
                .map_err(|e| InferError::Backend(format!("predict task failed: {e}")))??;
            let best = ranked
                .into_iter()
                .next()
                .ok_or_else(|| DetectError::InvalidResponse("model returned no classes".to_string()))?;
            if !(0.0..=1.0).contains(&best.probability) {
                return Err(DetectError::InvalidResponse(format!(
                    "model confidence {} for {} outside [0, 1]",
                    best.probability, best.label
                )));
            }
            Ok(Detection::new(best.label, best.probability))
        }
    }
}
