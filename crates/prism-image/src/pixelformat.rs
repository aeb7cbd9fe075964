use {crate::ImageError, prism_base::{Tensor, Vec2}};

/// Pixel layouts a capture device can hand us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Yuyv,
    Jpeg,
}

impl PixelFormat {
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            PixelFormat::Rgb8 => *b"RGB3",
            PixelFormat::Yuyv => *b"YUYV",
            PixelFormat::Jpeg => *b"MJPG",
        }
    }

    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(PixelFormat::Rgb8),
            b"YUYV" => Some(PixelFormat::Yuyv),
            b"MJPG" => Some(PixelFormat::Jpeg),
            _ => None,
        }
    }
}

// BT.601 YUV-to-RGB conversion for a single pixel (fixed-point, shift 8)
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    let r = (y + ((359 * v) >> 8)).clamp(0, 255) as u8;
    let g = (y - ((88 * u + 183 * v) >> 8)).clamp(0, 255) as u8;
    let b = (y + ((454 * u) >> 8)).clamp(0, 255) as u8;
    [r, g, b]
}

/// Convert a packed YUYV 4:2:2 buffer into an RGB tensor.
pub fn yuyv_to_rgb(data: &[u8], size: Vec2<usize>) -> Result<Tensor<u8>, ImageError> {
    if size.x % 2 != 0 {
        return Err(ImageError::Decode(format!(
            "YUYV width must be even, got {}",
            size.x
        )));
    }
    let expected = size.area() * 2;
    if data.len() < expected {
        return Err(ImageError::Decode(format!(
            "YUYV buffer too small: expected {expected} bytes, got {}",
            data.len()
        )));
    }
    let mut rgb = Vec::with_capacity(size.area() * 3);
    for quad in data[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (quad[0], quad[1], quad[2], quad[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    Ok(Tensor::new(vec![size.y, size.x, 3], rgb)?)
}
