use {
    crate::{LabelSet, Session},
    std::sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub(crate) struct ModelInner {
    pub(crate) id: u64,
    pub(crate) labels: LabelSet,
    pub(crate) input_name: String,
    pub(crate) output_name: String,
    pub(crate) session: Mutex<Option<Box<dyn Session>>>,
}

impl Drop for ModelInner {
    fn drop(&mut self) {
        log::debug!("model {} dropped", self.id);
    }
}

/// Loaded model plus its label set.
///
/// Clones share one session. The session is freed by
/// [`InferenceEngine::unload`](crate::InferenceEngine::unload) or when the
/// last clone drops; a predict holding the session lock always finishes first.
#[derive(Clone)]
pub struct ModelHandle {
    pub(crate) inner: Arc<ModelInner>,
}

impl ModelHandle {
    pub(crate) fn new(
        id: u64,
        labels: LabelSet,
        input_name: String,
        output_name: String,
        session: Box<dyn Session>,
    ) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                id,
                labels,
                input_name,
                output_name,
                session: Mutex::new(Some(session)),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn labels(&self) -> &LabelSet {
        &self.inner.labels
    }

    pub fn input_name(&self) -> &str {
        &self.inner.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.inner.output_name
    }

    pub fn is_loaded(&self) -> bool {
        self.session().is_some()
    }

    pub fn same_model(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn session(&self) -> MutexGuard<'_, Option<Box<dyn Session>>> {
        // a panicking backend leaves the session usable
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("id", &self.inner.id)
            .field("labels", &self.inner.labels.len())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
