use {
    crate::{Constraints, DeviceError, Facing},
    prism_base::{Tensor, Vec2},
    prism_image::{Image, ImageError, PixelFormat, decode_image_blocking, yuyv_to_rgb},
};

/// What the device actually agreed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Negotiated {
    pub size: Vec2<usize>,
    pub frame_rate: f32,
    pub format: PixelFormat,
}

/// One undecoded sample as the device delivered it.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub format: PixelFormat,
    pub size: Vec2<usize>,
    pub data: Vec<u8>,
}

impl RawFrame {
    pub fn new(format: PixelFormat, size: Vec2<usize>, data: Vec<u8>) -> Self {
        Self { format, size, data }
    }

    /// Convert to an RGB (or decoded JPEG) image.
    pub fn decode(self) -> Result<Image, ImageError> {
        match self.format {
            PixelFormat::Jpeg => decode_image_blocking(&self.data),
            PixelFormat::Yuyv => Ok(Image::U8(yuyv_to_rgb(&self.data, self.size)?)),
            PixelFormat::Rgb8 => Ok(Image::U8(Tensor::new(
                vec![self.size.y, self.size.x, 3],
                self.data,
            )?)),
        }
    }
}

/// A single physical camera, driven from the capture worker thread.
///
/// All methods run on the same OS thread, so implementations need not be
/// `Send`.
pub trait CaptureDevice {
    /// Open the device and negotiate `constraints`.
    fn open(&mut self, constraints: &Constraints) -> Result<Negotiated, DeviceError>;
    /// Start streaming. Failures here are playback failures.
    fn start(&mut self) -> Result<(), DeviceError>;
    /// Wait a bounded time for the next frame. `None` means nothing was
    /// ready in time; an error means the stream is gone.
    fn blocking_capture(&mut self) -> Result<Option<RawFrame>, DeviceError>;
    /// Stop streaming and close the device. Safe to call when not open.
    fn close(&mut self);
}

/// Creates devices for a requested facing.
pub trait DeviceProvider: Send + Sync + 'static {
    fn create(&self, facing: Facing) -> Result<Box<dyn CaptureDevice>, DeviceError>;
}
