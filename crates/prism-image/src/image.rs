use {crate::ImageError, prism_base::{Tensor, Vec2}};

/// Decoded image in HWC layout, keeping the source precision.
#[derive(Debug, Clone, PartialEq)]
pub enum Image {
    U8(Tensor<u8>),
    U16(Tensor<u16>),
    F32(Tensor<f32>),
}

impl Image {
    pub fn shape(&self) -> &[usize] {
        match self {
            Image::U8(t) => &t.shape,
            Image::U16(t) => &t.shape,
            Image::F32(t) => &t.shape,
        }
    }

    pub fn height(&self) -> usize {
        self.shape()[0]
    }

    pub fn width(&self) -> usize {
        self.shape()[1]
    }

    pub fn channels(&self) -> usize {
        self.shape()[2]
    }

    pub fn size(&self) -> Vec2<usize> {
        Vec2::new(self.width(), self.height())
    }

    /// Convert to 8-bit RGB, dropping alpha and expanding grayscale.
    pub fn to_rgb8(&self) -> Result<Tensor<u8>, ImageError> {
        let (h, w, c) = (self.height(), self.width(), self.channels());
        let samples: Vec<u8> = match self {
            Image::U8(t) => t.data.clone(),
            Image::U16(t) => t.data.iter().map(|&v| (v >> 8) as u8).collect(),
            Image::F32(t) => t
                .data
                .iter()
                .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
                .collect(),
        };
        let rgb = match c {
            3 => samples,
            1 => samples.iter().flat_map(|&l| [l, l, l]).collect(),
            2 => samples.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0]]).collect(),
            4 => samples.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect(),
            _ => {
                return Err(ImageError::Decode(format!(
                    "unsupported channel count: {c}"
                )));
            }
        };
        Ok(Tensor::new(vec![h, w, 3], rgb)?)
    }
}
