use std::time::SystemTime;

/// Best guess for one frame, as returned by a [`Detector`](crate::Detector).
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub product_id: Option<String>,
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            product_id: None,
            confidence,
        }
    }

    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }
}

/// A detection that cleared the confidence floor and was published.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub label: String,
    pub product_id: Option<String>,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub timestamp: SystemTime,
}

impl DetectionResult {
    pub fn new(detection: Detection) -> Self {
        Self {
            label: detection.label,
            product_id: detection.product_id,
            confidence: detection.confidence.clamp(0.0, 1.0),
            timestamp: SystemTime::now(),
        }
    }

    pub fn percent(&self) -> f32 {
        self.confidence * 100.0
    }
}
