use {
    crate::{DetectError, Detection, Detector},
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    prism_camera::Frame,
    prism_image::{Image, encode_jpeg_blocking},
    serde::{Deserialize, Serialize},
    std::{future::Future, time::Duration},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    endpoint: String,
    timeout: Duration,
    jpeg_quality: u8,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api".to_string(),
            timeout: Duration::from_secs(10),
            jpeg_quality: 80,
        }
    }
}

impl RemoteConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// JPEG quality of the uploaded still, 1-100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// `<endpoint>/scan`
    pub fn scan_url(&self) -> String {
        format!("{}/scan", self.endpoint.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    image: &'a str,
}

/// Body returned by the scan endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    #[serde(default)]
    pub product_id: Option<String>,
    pub name: String,
    pub confidence: f32,
}

impl ScanResponse {
    pub fn parse(body: &[u8]) -> Result<Self, DetectError> {
        serde_json::from_slice(body).map_err(|e| DetectError::InvalidResponse(e.to_string()))
    }

    pub fn into_detection(self) -> Result<Detection, DetectError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DetectError::InvalidResponse(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(Detection {
            label: self.name,
            product_id: self.product_id,
            confidence: self.confidence,
        })
    }
}

/// Encode `image` as a `data:image/jpeg;base64,` URL.
pub fn jpeg_data_url(image: &Image, quality: u8) -> Result<String, DetectError> {
    let jpeg = encode_jpeg_blocking(image, quality)?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg)))
}

/// [`Detector`] posting each frame to a remote scan endpoint.
pub struct RemoteDetector {
    config: RemoteConfig,
    http_client: reqwest::Client,
}

impl RemoteDetector {
    pub fn new(config: RemoteConfig) -> Result<Self, DetectError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DetectError::BackendUnavailable(format!("cannot create HTTP client: {e}")))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }
}

impl Detector for RemoteDetector {
    fn detect(&self, frame: Frame) -> impl Future<Output = Result<Detection, DetectError>> + Send {
        async move {
            let quality = self.config.jpeg_quality;
            let image = frame.image;
            let data_url = tokio::task::spawn_blocking(move || jpeg_data_url(&image, quality))
                .await
                .map_err(|e| DetectError::Encode(format!("encode task failed: {e}")))??;

            let url = self.config.scan_url();
            log::debug!("posting frame {} to {}", frame.sequence, url);
            let response = self
                .http_client
                .post(&url)
                .json(&ScanRequest { image: &data_url })
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(DetectError::BackendUnavailable(format!("{url} returned {status}")));
            }
            let body = response.bytes().await?;
            ScanResponse::parse(&body)?.into_detection()
        }
    }
}
