//! Image decoding and encoding for the prism workspace.
//!
//! Thin wrapper around the `image` crate that decodes into `Tensor`s from
//! `prism-base`. All images use HWC layout: `[height, width, channels]`.

pub mod error;
pub mod image;
pub mod pixelformat;

pub use error::ImageError;
pub use image::Image;
pub use pixelformat::{PixelFormat, yuyv_to_rgb};

use crates_image::{DynamicImage, ImageEncoder};
use prism_base::Tensor;

fn to_tensor<T>(width: u32, height: u32, channels: usize, data: Vec<T>) -> Result<Tensor<T>, ImageError> {
    Ok(Tensor::new(vec![height as usize, width as usize, channels], data)?)
}

/// Decode an encoded image (JPEG, PNG) on the current thread.
pub fn decode_image_blocking(data: &[u8]) -> Result<Image, ImageError> {
    let img = crates_image::load_from_memory(data)?;

    match img {
        DynamicImage::ImageLuma8(buf) => {
            let (w, h) = buf.dimensions();
            Ok(Image::U8(to_tensor(w, h, 1, buf.into_raw())?))
        }
        DynamicImage::ImageRgb8(buf) => {
            let (w, h) = buf.dimensions();
            Ok(Image::U8(to_tensor(w, h, 3, buf.into_raw())?))
        }
        DynamicImage::ImageRgba8(buf) => {
            let (w, h) = buf.dimensions();
            Ok(Image::U8(to_tensor(w, h, 4, buf.into_raw())?))
        }
        DynamicImage::ImageLuma16(buf) => {
            let (w, h) = buf.dimensions();
            Ok(Image::U16(to_tensor(w, h, 1, buf.into_raw())?))
        }
        DynamicImage::ImageRgb16(buf) => {
            let (w, h) = buf.dimensions();
            Ok(Image::U16(to_tensor(w, h, 3, buf.into_raw())?))
        }
        DynamicImage::ImageRgb32F(buf) => {
            let (w, h) = buf.dimensions();
            Ok(Image::F32(to_tensor(w, h, 3, buf.into_raw())?))
        }
        other => {
            let rgb = other.to_rgb8();
            let (w, h) = rgb.dimensions();
            Ok(Image::U8(to_tensor(w, h, 3, rgb.into_raw())?))
        }
    }
}

/// Encode an image as JPEG on the current thread.
///
/// `quality` is 1-100. Alpha is stripped and grayscale is kept as L8.
pub fn encode_jpeg_blocking(image: &Image, quality: u8) -> Result<Vec<u8>, ImageError> {
    let (width, height) = (image.width() as u32, image.height() as u32);
    let (pixels, color_type) = match image {
        Image::U8(t) if t.shape[2] == 1 => (t.data.clone(), crates_image::ExtendedColorType::L8),
        _ => (
            image.to_rgb8()?.into_data(),
            crates_image::ExtendedColorType::Rgb8,
        ),
    };

    let mut buffer = Vec::new();
    crates_image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(&pixels, width, height, color_type)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buffer)
}

