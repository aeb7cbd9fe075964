use {
    crate::{BufferLedger, InferError, ScratchBuffer},
    prism_base::{Tensor, Vec2},
    prism_image::Image,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// `[1, 3, H, W]`
    #[default]
    Nchw,
    /// `[1, H, W, 3]`
    Nhwc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Normalization {
    /// `[0, 1]`
    UnitRange,
    /// `[-1, 1]`
    #[default]
    SignedUnit,
    /// `(x / 255 - mean) / std` per channel.
    MeanStd { mean: [f32; 3], std: [f32; 3] },
}

impl Normalization {
    pub const IMAGENET: Normalization = Normalization::MeanStd {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };

    #[inline]
    pub fn apply(&self, value: f32, channel: usize) -> f32 {
        match self {
            Normalization::UnitRange => value / 255.0,
            Normalization::SignedUnit => value / 127.5 - 1.0,
            Normalization::MeanStd { mean, std } => (value / 255.0 - mean[channel]) / std[channel],
        }
    }
}

/// Shape and value range a classifier expects.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    size: Vec2<usize>,
    layout: Layout,
    normalization: Normalization,
}

impl Default for InputSpec {
    fn default() -> Self {
        Self {
            size: Vec2::new(224, 224),
            layout: Layout::default(),
            normalization: Normalization::default(),
        }
    }
}

impl InputSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: Vec2<usize>) -> Self {
        self.size = size;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn size(&self) -> Vec2<usize> {
        self.size
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn shape(&self) -> Vec<usize> {
        match self.layout {
            Layout::Nchw => vec![1, 3, self.size.y, self.size.x],
            Layout::Nhwc => vec![1, self.size.y, self.size.x, 3],
        }
    }
}

/// Largest centered window of `source` with the aspect ratio of `target`.
///
/// Returns `(x, y, width, height)`.
pub fn center_crop(source: Vec2<usize>, target: Vec2<usize>) -> (usize, usize, usize, usize) {
    let target_aspect = target.x as f32 / target.y as f32;
    let source_aspect = source.x as f32 / source.y as f32;
    let (width, height) = if source_aspect > target_aspect {
        let width = ((source.y as f32 * target_aspect).round() as usize).clamp(1, source.x);
        (width, source.y)
    } else {
        let height = ((source.x as f32 / target_aspect).round() as usize).clamp(1, source.y);
        (source.x, height)
    };
    ((source.x - width) / 2, (source.y - height) / 2, width, height)
}

/// Center-crop, resize (bilinear) and normalize `image` into the model input.
///
/// The RGB conversion and the output are both registered in `ledger`.
pub fn prepare(
    image: &Image,
    spec: &InputSpec,
    ledger: &BufferLedger,
) -> Result<ScratchBuffer<f32>, InferError> {
    let (src_h, src_w) = (image.height(), image.width());
    if src_h == 0 || src_w == 0 {
        return Err(InferError::Preprocess(format!("empty image {src_w}x{src_h}")));
    }
    let (dst_w, dst_h) = (spec.size.x, spec.size.y);
    if dst_w == 0 || dst_h == 0 {
        return Err(InferError::Preprocess(format!("empty input size {}", spec.size)));
    }

    let rgb = ledger.scratch(image.to_rgb8()?);
    let (crop_x, crop_y, crop_w, crop_h) = center_crop(Vec2::new(src_w, src_h), spec.size);
    let scale_x = crop_w as f32 / dst_w as f32;
    let scale_y = crop_h as f32 / dst_h as f32;

    let mut output = ledger.scratch(Tensor::<f32>::zeros(spec.shape())?);
    let plane = dst_w * dst_h;

    for oy in 0..dst_h {
        let sy = ((oy as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (crop_h - 1) as f32);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(crop_h - 1);
        let fy = sy - y0 as f32;

        for ox in 0..dst_w {
            let sx = ((ox as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (crop_w - 1) as f32);
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(crop_w - 1);
            let fx = sx - x0 as f32;

            for ch in 0..3 {
                let sample = |x: usize, y: usize| {
                    rgb.data[((crop_y + y) * src_w + crop_x + x) * 3 + ch] as f32
                };
                let top = sample(x0, y0) * (1.0 - fx) + sample(x1, y0) * fx;
                let bottom = sample(x0, y1) * (1.0 - fx) + sample(x1, y1) * fx;
                let value = spec.normalization.apply(top * (1.0 - fy) + bottom * fy, ch);

                let index = match spec.layout {
                    Layout::Nchw => ch * plane + oy * dst_w + ox,
                    Layout::Nhwc => (oy * dst_w + ox) * 3 + ch,
                };
                output.data[index] = value;
            }
        }
    }

    Ok(output)
}
