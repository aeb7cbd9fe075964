use {prism_base::Vec2, prism_image::PixelFormat, std::path::PathBuf};

/// Which way the camera points relative to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Facing {
    /// Rear camera, pointing at the scene.
    #[default]
    Environment,
    /// Front camera, pointing at the user.
    User,
}

/// What `acquire` asks of a device. Everything except `facing` is a hint.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    pub facing: Facing,
    pub size: Option<Vec2<usize>>,
    pub frame_rate: Option<f32>,
}

impl Constraints {
    pub fn new(facing: Facing) -> Self {
        Self {
            facing,
            size: None,
            frame_rate: None,
        }
    }

    pub fn with_size(mut self, size: Option<Vec2<usize>>) -> Self {
        self.size = size;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: Option<f32>) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// True when more than the facing is requested.
    pub fn is_compound(&self) -> bool {
        self.size.is_some() || self.frame_rate.is_some()
    }

    /// Facing only, for devices that reject the full set.
    pub fn minimal(&self) -> Self {
        Self::new(self.facing)
    }
}

/// Configuration for V4L2-backed capture.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    environment_device: PathBuf,
    user_device: Option<PathBuf>,
    format: PixelFormat,
    buffer_count: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            environment_device: PathBuf::from("/dev/video0"),
            user_device: None,
            format: PixelFormat::Jpeg,
            buffer_count: 4,
        }
    }
}

impl CameraConfig {
    /// Device node for the rear camera (e.g. "/dev/video0").
    pub fn with_environment_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.environment_device = path.into();
        self
    }

    /// Device node for the front camera. Without one, every request falls
    /// back to the rear device.
    pub fn with_user_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_device = Some(path.into());
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    pub fn device_for(&self, facing: Facing) -> &PathBuf {
        match (facing, &self.user_device) {
            (Facing::User, Some(path)) => path,
            _ => &self.environment_device,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }
}
