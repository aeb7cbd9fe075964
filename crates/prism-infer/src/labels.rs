use {
    crate::{InferError, LabelSource},
    serde::Deserialize,
    std::{path::Path, sync::Arc},
};

#[derive(Deserialize)]
struct LabelMetadata {
    labels: Vec<String>,
}

/// Class names, index-aligned with the model output.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet(Arc<[String]>);

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Result<Self, InferError> {
        if labels.is_empty() {
            return Err(InferError::Labels("label set is empty".to_string()));
        }
        Ok(Self(labels.into()))
    }

    /// One label per line; blank lines are skipped.
    ///
    /// Exported label files often prefix every line with its index
    /// (`0 bottle`). The prefix is stripped only when every line has it.
    pub fn parse_text(text: &str) -> Result<Self, InferError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let indexed = lines.iter().enumerate().all(|(i, line)| {
            line.split_once(char::is_whitespace)
                .is_some_and(|(index, rest)| index == i.to_string() && !rest.trim().is_empty())
        });

        let labels = lines
            .into_iter()
            .map(|line| match line.split_once(char::is_whitespace) {
                Some((_, rest)) if indexed => rest.trim().to_string(),
                _ => line.to_string(),
            })
            .collect();
        Self::new(labels)
    }

    /// JSON metadata with a `labels` array.
    pub fn parse_json(text: &str) -> Result<Self, InferError> {
        let metadata: LabelMetadata =
            serde_json::from_str(text).map_err(|e| InferError::Labels(e.to_string()))?;
        let labels = metadata
            .labels
            .into_iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        Self::new(labels)
    }

    pub fn from_file(path: &Path) -> Result<Self, InferError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| InferError::Labels(format!("{}: {}", path.display(), e)))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&text),
            _ => Self::parse_text(&text),
        }
    }

    pub fn load(source: &LabelSource) -> Result<Self, InferError> {
        match source {
            LabelSource::File(path) => Self::from_file(path),
            LabelSource::Inline(labels) => Self::new(labels.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}
