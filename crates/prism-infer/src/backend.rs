use crate::{InferError, ModelSource, Session};

/// Runtime able to turn a model file into a runnable [`Session`].
///
/// Loading is blocking; the engine calls it from tokio's blocking pool.
pub trait Backend: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn load_model(&self, model: &ModelSource) -> Result<Box<dyn Session>, InferError>;
}
