//! Image to input tensor conversion
//!
//! Decodes the selected file, resizes it with nearest-neighbour sampling and
//! maps every channel value into `[-1, 1]` via `(p - 127.5) / 127.5`.

use crate::config::InputLayout;
use crate::error::PredictionError;
use image::RgbImage;

const OFFSET: f32 = 127.5;

/// Dense f32 tensor with a leading batch dimension of 1
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

impl ImageTensor {
    pub fn shape_i64(&self) -> Vec<i64> {
        self.shape.iter().map(|&d| d as i64).collect()
    }
}

/// Preprocessing settings for one model
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    size: u32,
    layout: InputLayout,
}

impl Preprocessor {
    pub fn new(size: u32, layout: InputLayout) -> Self {
        Self { size, layout }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decode `bytes` and build the model input tensor
    pub fn tensor_from_bytes(&self, bytes: &[u8]) -> Result<ImageTensor, PredictionError> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        Ok(self.tensor_from_rgb(&rgb))
    }

    pub fn tensor_from_rgb(&self, rgb: &RgbImage) -> ImageTensor {
        let resized = resize_nearest(rgb, self.size, self.size);
        let side = self.size as usize;

        match self.layout {
            InputLayout::Nhwc => {
                let data = resized.as_raw().iter().map(|&p| normalize(p)).collect();
                ImageTensor {
                    shape: [1, side, side, 3],
                    data,
                }
            }
            InputLayout::Nchw => {
                let plane = side * side;
                let mut data = vec![0.0; plane * 3];
                for (i, pixel) in resized.pixels().enumerate() {
                    for c in 0..3 {
                        data[c * plane + i] = normalize(pixel[c]);
                    }
                }
                ImageTensor {
                    shape: [1, 3, side, side],
                    data,
                }
            }
        }
    }
}

fn normalize(p: u8) -> f32 {
    (p as f32 - OFFSET) / OFFSET
}

/// Nearest-neighbour resize without corner alignment or half-pixel centres:
/// destination `d` samples source `floor(d * in / out)`.
pub fn resize_nearest(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = src.dimensions();
    if (src_w, src_h) == (width, height) {
        return src.clone();
    }

    let scale_x = src_w as f64 / width as f64;
    let scale_y = src_h as f64 / height as f64;

    RgbImage::from_fn(width, height, |x, y| {
        let sx = ((x as f64 * scale_x).floor() as u32).min(src_w.saturating_sub(1));
        let sy = ((y as f64 * scale_y).floor() as u32).min(src_h.saturating_sub(1));
        *src.get_pixel(sx, sy)
    })
}
