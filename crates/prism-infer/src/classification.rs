use crate::{InferError, LabelSet};

/// One label with the probability the model assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub probability: f32,
}

/// Pair `probabilities` with `labels` and sort by descending probability.
///
/// Values are taken as produced by the model. Ties keep model order.
pub fn rank(labels: &LabelSet, probabilities: &[f32]) -> Result<Vec<Classification>, InferError> {
    if labels.len() != probabilities.len() {
        return Err(InferError::LabelMismatch {
            labels: labels.len(),
            outputs: probabilities.len(),
        });
    }
    let mut ranked: Vec<Classification> = labels
        .iter()
        .zip(probabilities)
        .map(|(label, &probability)| Classification {
            label: label.clone(),
            probability,
        })
        .collect();
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    Ok(ranked)
}
