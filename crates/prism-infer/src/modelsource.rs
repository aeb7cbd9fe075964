use std::{path::PathBuf, sync::Arc};

#[derive(Debug, Clone)]
pub enum ModelSource {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

#[derive(Debug, Clone)]
pub enum LabelSource {
    /// Newline-separated text, or JSON metadata with a `labels` array when the
    /// file ends in `.json`.
    File(PathBuf),
    Inline(Vec<String>),
}

/// Where a classifier and its labels come from.
#[derive(Debug, Clone)]
pub struct ModelLocation {
    pub model: ModelSource,
    pub labels: LabelSource,
}

impl ModelLocation {
    pub fn new(model: ModelSource, labels: LabelSource) -> Self {
        Self { model, labels }
    }

    pub fn files(model: impl Into<PathBuf>, labels: impl Into<PathBuf>) -> Self {
        Self {
            model: ModelSource::File(model.into()),
            labels: LabelSource::File(labels.into()),
        }
    }
}
