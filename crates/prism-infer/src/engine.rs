use {
    crate::{
        Backend, BufferLedger, BufferStats, Classification, InferError, InputSpec, LabelSet,
        ModelHandle, ModelLocation, preprocess, rank,
    },
    futures_util::future::{BoxFuture, FutureExt, Shared},
    prism_image::Image,
    std::sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

type LoadFuture = Shared<BoxFuture<'static, Result<ModelHandle, InferError>>>;

enum LoadState {
    Empty,
    Loading { generation: u64, future: LoadFuture },
    Loaded(ModelHandle),
}

/// Loads one classifier and runs predictions against it.
pub struct InferenceEngine {
    backend: Arc<dyn Backend>,
    spec: InputSpec,
    ledger: BufferLedger,
    state: Mutex<LoadState>,
    next_id: AtomicU64,
}

fn build_handle(
    backend: &dyn Backend,
    location: &ModelLocation,
    id: u64,
) -> Result<ModelHandle, InferError> {
    let labels = LabelSet::load(&location.labels)?;
    let session = backend.load_model(&location.model)?;
    let input_name = session
        .input_names()
        .first()
        .cloned()
        .ok_or_else(|| InferError::ModelLoad("model has no inputs".to_string()))?;
    let output_name = session
        .output_names()
        .first()
        .cloned()
        .ok_or_else(|| InferError::ModelLoad("model has no outputs".to_string()))?;
    Ok(ModelHandle::new(id, labels, input_name, output_name, session))
}

impl InferenceEngine {
    pub fn new(backend: impl Backend) -> Self {
        Self::with_backend(Arc::new(backend))
    }

    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            spec: InputSpec::default(),
            ledger: BufferLedger::new(),
            state: Mutex::new(LoadState::Empty),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_input_spec(mut self, spec: InputSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn input_spec(&self) -> &InputSpec {
        &self.spec
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn state(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the model at `location`, or return the one already loaded.
    ///
    /// Callers arriving while a load is in progress await that same load.
    /// A failed load leaves the engine empty so a later call can try again.
    pub async fn load(&self, location: ModelLocation) -> Result<ModelHandle, InferError> {
        let (generation, future) = {
            let mut state = self.state();
            match &*state {
                LoadState::Loaded(handle) => return Ok(handle.clone()),
                LoadState::Loading { generation, future } => (*generation, future.clone()),
                LoadState::Empty => {
                    let generation = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let backend = Arc::clone(&self.backend);
                    let future = async move {
                        log::info!("loading model {} with {}", generation, backend.name());
                        tokio::task::spawn_blocking(move || {
                            build_handle(backend.as_ref(), &location, generation)
                        })
                        .await
                        .map_err(|e| InferError::ModelLoad(format!("load task failed: {e}")))?
                    }
                    .boxed()
                    .shared();
                    *state = LoadState::Loading {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let result = future.await;

        let mut state = self.state();
        if matches!(&*state, LoadState::Loading { generation: g, .. } if *g == generation) {
            *state = match &result {
                Ok(handle) => {
                    log::info!(
                        "model {} loaded, {} labels",
                        handle.id(),
                        handle.labels().len()
                    );
                    LoadState::Loaded(handle.clone())
                }
                Err(error) => {
                    log::error!("model load failed: {}", error);
                    LoadState::Empty
                }
            };
        }
        result
    }

    /// Classify `image`, most probable label first.
    ///
    /// Blocking; async callers run it on the blocking pool. Scratch buffers
    /// are released before returning on every path.
    pub fn predict(
        &self,
        handle: &ModelHandle,
        image: &Image,
    ) -> Result<Vec<Classification>, InferError> {
        let mut guard = handle.session();
        let session = guard.as_mut().ok_or(InferError::HandleExpired)?;

        let input = preprocess::prepare(image, &self.spec, &self.ledger)?;
        let mut outputs = session.run(&[(handle.input_name(), &*input)])?;
        drop(input);

        let output = outputs.remove(handle.output_name()).ok_or_else(|| {
            InferError::Backend(format!("model produced no '{}' output", handle.output_name()))
        })?;
        drop(outputs);
        let output = self.ledger.scratch(output);

        rank(handle.labels(), &output.data)
    }

    /// Free the session behind `handle`.
    ///
    /// Waits for a predict in progress on the same handle. Predicts issued
    /// afterwards through any clone fail with [`InferError::HandleExpired`].
    pub fn unload(&self, handle: &ModelHandle) {
        let session = handle.session().take();
        if session.is_some() {
            log::info!("model {} unloaded", handle.id());
        }
        drop(session);

        let mut state = self.state();
        if let LoadState::Loaded(current) = &*state {
            if current.same_model(handle) {
                *state = LoadState::Empty;
            }
        }
    }

    /// The loaded handle, if any.
    pub fn loaded(&self) -> Option<ModelHandle> {
        match &*self.state() {
            LoadState::Loaded(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn buffer_stats(&self) -> BufferStats {
        self.ledger.stats()
    }
}
