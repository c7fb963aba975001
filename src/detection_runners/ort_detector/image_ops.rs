//! Functions to preprocess images for the detector input.

use anyhow::{bail, Result};
use fast_image_resize::{FilterType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use crate::detection_runners::input_wrapper::X;

/// Geometry of one letterboxed input, needed to map boxes back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    pub width_src: u32,
    pub height_src: u32,
    pub width_resized: u32,
    pub height_resized: u32,
    /// Source-to-input scale factor; padding is bottom/right so there is no offset.
    pub ratio: f32,
}

/// Preprocessing recipe: longest-side rescale, bottom-right padding, channel order and scaling.
#[derive(Debug, Clone, Copy)]
pub struct ImageOps {
    pub input_size: u32,
    pub rescale_size: u32,
    pub pad_value: u8,
    pub reverse_channels: bool,
    pub normalize: bool,
}

impl ImageOps {
    /// Produces a `[1, 3, input_size, input_size]` tensor.
    pub fn apply(&self, image: &RgbImage) -> Result<(X, LetterboxInfo)> {
        let (w0, h0) = image.dimensions();
        if w0 == 0 || h0 == 0 {
            bail!("Cannot preprocess an empty image ({w0}x{h0})");
        }
        let info = self.letterbox_info(w0, h0);
        let resized = resize_image(image, info.width_resized, info.height_resized)?;
        let x = self.to_nchw(&resized)?;
        Ok((x, info))
    }

    pub fn letterbox_info(&self, w0: u32, h0: u32) -> LetterboxInfo {
        let ratio = (self.rescale_size as f32 / w0 as f32).min(self.rescale_size as f32 / h0 as f32);
        let new_w = ((w0 as f32 * ratio).round() as u32).clamp(1, self.input_size);
        let new_h = ((h0 as f32 * ratio).round() as u32).clamp(1, self.input_size);
        LetterboxInfo {
            width_src: w0,
            height_src: h0,
            width_resized: new_w,
            height_resized: new_h,
            ratio,
        }
    }

    fn to_nchw(&self, resized: &RgbImage) -> Result<X> {
        let target = self.input_size as usize;
        let hw = target * target;
        let (w, h) = (resized.width() as usize, resized.height() as usize);
        let buf = resized.as_raw();
        if buf.len() != w * h * 3 {
            bail!("Unexpected buffer size: got {}, expected {}", buf.len(), w * h * 3);
        }

        let divisor = if self.normalize { 255.0 } else { 1.0 };
        let mut out = vec![self.pad_value as f32 / divisor; 3 * hw];

        out.par_chunks_mut(hw)
            .enumerate()
            .for_each(|(c, plane)| {
                let src_c = if self.reverse_channels { 2 - c } else { c };
                for y in 0..h {
                    let row = &buf[y * w * 3..(y + 1) * w * 3];
                    let dst = &mut plane[y * target..y * target + w];
                    for (x, v) in dst.iter_mut().enumerate() {
                        *v = row[x * 3 + src_c] as f32 / divisor;
                    }
                }
            });

        X::from_shape_vec(&[1, 3, target, target], out)
    }
}

fn resize_image(image: &RgbImage, new_w: u32, new_h: u32) -> Result<RgbImage> {
    if image.dimensions() == (new_w, new_h) {
        return Ok(image.clone());
    }

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));

    let src = DynamicImage::ImageRgb8(image.clone());
    let mut dst = DynamicImage::new_rgb8(new_w, new_h);
    if let Err(err) = resizer.resize(&src, &mut dst, &options) {
        log::warn!("Failed to use `fast_image_resize` ({err:?}). Falling back.");
        return Ok(image::imageops::resize(image, new_w, new_h, image::imageops::FilterType::Triangle));
    }
    Ok(dst.into_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn ops() -> ImageOps {
        ImageOps {
            input_size: 640,
            rescale_size: 636,
            pad_value: 114,
            reverse_channels: true,
            normalize: true,
        }
    }

    #[test]
    fn longest_side_is_rescaled() {
        let info = ops().letterbox_info(1272, 636);
        assert_eq!(info.width_resized, 636);
        assert_eq!(info.height_resized, 318);
        assert!((info.ratio - 0.5).abs() < 1e-6);
    }

    #[test]
    fn padding_is_bottom_right_and_channels_reversed() {
        let image = RgbImage::from_pixel(636, 318, Rgb([255, 0, 0]));
        let (x, info) = ops().apply(&image).unwrap();
        assert_eq!(x.shape(), &[1, 3, 640, 640]);
        assert_eq!(info.ratio, 1.0);
        // red lands in the last channel after the RGB -> BGR swap
        assert_eq!(x[[0, 2, 0, 0]], 1.0);
        assert_eq!(x[[0, 0, 0, 0]], 0.0);
        // right and bottom padding
        let pad = 114.0 / 255.0;
        assert_eq!(x[[0, 0, 0, 639]], pad);
        assert_eq!(x[[0, 1, 639, 0]], pad);
    }
}
