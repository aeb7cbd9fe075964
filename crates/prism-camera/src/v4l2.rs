use {
    crate::*,
    prism_base::Vec2,
    prism_image::PixelFormat,
    std::{io, path::PathBuf, time::Duration},
    v4l::{
        Device, Format, FourCC, buffer::Type, io::mmap::Stream as MmapStream,
        io::traits::CaptureStream, video::Capture,
    },
};

// longest wait for one buffer before the worker gets to check for cancel
const FRAME_TIMEOUT: Duration = Duration::from_millis(500);

/// [`DeviceProvider`] backed by Video4Linux2 device nodes.
#[derive(Debug, Clone, Default)]
pub struct V4l2Provider {
    config: CameraConfig,
}

impl V4l2Provider {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

impl DeviceProvider for V4l2Provider {
    fn create(&self, facing: Facing) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        let path = self.config.device_for(facing).clone();
        if !path.exists() {
            return Err(DeviceError::NoDevice(format!("{} does not exist", path.display())));
        }
        Ok(Box::new(V4l2Device::new(
            path,
            self.config.format(),
            self.config.buffer_count(),
        )))
    }
}

struct V4l2Device {
    path: PathBuf,
    preferred: PixelFormat,
    buffer_count: u32,
    device: Option<Device>,
    stream: Option<MmapStream<'static>>,
    size: Vec2<usize>,
    format: PixelFormat,
}

impl V4l2Device {
    fn new(path: PathBuf, preferred: PixelFormat, buffer_count: u32) -> Self {
        Self {
            path,
            preferred,
            buffer_count,
            device: None,
            stream: None,
            size: Vec2::new(0, 0),
            format: preferred,
        }
    }
}

impl CaptureDevice for V4l2Device {
    fn open(&mut self, constraints: &Constraints) -> Result<Negotiated, DeviceError> {
        self.close();

        // permission and missing-node errors come through io::ErrorKind
        let device = Device::with_path(&self.path)?;
        let current = Capture::format(&device)?;

        let desired_size = constraints
            .size
            .unwrap_or(Vec2::new(current.width as usize, current.height as usize));
        let actual = Capture::set_format(
            &device,
            &Format::new(
                desired_size.x as u32,
                desired_size.y as u32,
                FourCC::new(&self.preferred.fourcc()),
            ),
        )
        .map_err(|e| DeviceError::NegotiationFailed(e.to_string()))?;

        let actual_size = Vec2::new(actual.width as usize, actual.height as usize);
        if constraints.size.is_some() && actual_size != desired_size {
            return Err(DeviceError::NegotiationFailed(format!(
                "requested {desired_size}, device offered {actual_size}"
            )));
        }

        let format = PixelFormat::from_fourcc(&actual.fourcc.repr).ok_or_else(|| {
            DeviceError::NegotiationFailed(format!("unsupported pixel format {}", actual.fourcc))
        })?;

        if let Some(fps) = constraints.frame_rate {
            Capture::set_params(&device, &v4l::video::capture::Parameters::with_fps(fps as u32))
                .map_err(|e| DeviceError::NegotiationFailed(e.to_string()))?;
        }
        let params = Capture::params(&device)?;
        let frame_rate = if params.interval.numerator == 0 {
            0.0
        } else {
            params.interval.denominator as f32 / params.interval.numerator as f32
        };

        self.size = actual_size;
        self.format = format;
        self.device = Some(device);
        Ok(Negotiated {
            size: actual_size,
            frame_rate,
            format,
        })
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| DeviceError::PlaybackFailed("device not open".to_string()))?;
        let mut stream = MmapStream::with_buffers(device, Type::VideoCapture, self.buffer_count)
            .map_err(|e| DeviceError::PlaybackFailed(e.to_string()))?;
        stream.set_timeout(FRAME_TIMEOUT);
        self.stream = Some(stream);
        Ok(())
    }

    fn blocking_capture(&mut self) -> Result<Option<RawFrame>, DeviceError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| DeviceError::PlaybackFailed("stream not started".to_string()))?;
        match CaptureStream::next(stream) {
            Ok((data, metadata)) => {
                // MJPEG buffers are padded past the payload
                let used = metadata.bytesused as usize;
                let data = if used > 0 && used <= data.len() { &data[..used] } else { data };
                Ok(Some(RawFrame::new(self.format, self.size, data.to_vec())))
            }
            Err(error) if error.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(error) => Err(DeviceError::PlaybackFailed(error.to_string())),
        }
    }

    fn close(&mut self) {
        self.stream.take();
        self.device.take();
    }
}
