use {
    prism_base::Vec2,
    prism_image::Image,
    std::{sync::Arc, time::Instant},
};

/// One decoded RGB sample from a capture session.
///
/// Cloning is cheap: the pixels are shared.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Arc<Image>,
    pub sequence: u64,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: Image, sequence: u64) -> Self {
        Self {
            image: Arc::new(image),
            sequence,
            captured_at: Instant::now(),
        }
    }

    pub fn size(&self) -> Vec2<usize> {
        self.image.size()
    }
}
