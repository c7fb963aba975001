//! Annotated-image output: boxes and captions drawn on a copy of the source image.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use crate::common::{Detection, DetectionSet, SpotError, SpotResult};
use crate::rendering::colours::get_class_colour;

const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_HEIGHT: i32 = 18;
const LABEL_CHAR_WIDTH: f32 = 8.5;
const LABEL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 2;
const TEXT_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);

const SYSTEM_FONTS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Draws detections; holds the caption font for the lifetime of the process.
pub struct OverlayRenderer {
    font_data: Option<Vec<u8>>,
    font_source: Option<PathBuf>,
    scale: PxScale,
}

impl std::fmt::Debug for OverlayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRenderer")
            .field("font_source", &self.font_source)
            .field("scale", &self.scale)
            .finish()
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl OverlayRenderer {
    /// Uses `font_path` when it holds a valid font, else the first usable system font.
    ///
    /// Without any font, captions are reduced to their coloured tag and a
    /// warning is logged here, once.
    pub fn new(font_path: Option<&Path>) -> Self {
        let candidates = font_path
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            if FontRef::try_from_slice(&bytes).is_ok() {
                log::debug!("Overlay font: {}", path.display());
                return Self::with_font_data(Some(bytes), Some(path));
            }
            log::warn!("Ignoring invalid font file {}", path.display());
        }

        log::warn!("No usable TrueType font found; overlay captions will be drawn without text");
        Self::with_font_data(None, None)
    }

    fn with_font_data(font_data: Option<Vec<u8>>, font_source: Option<PathBuf>) -> Self {
        Self {
            font_data,
            font_source,
            scale: PxScale::from(LABEL_FONT_SIZE),
        }
    }

    /// Renderer that never draws text.
    pub fn without_text() -> Self {
        Self::with_font_data(None, None)
    }

    pub fn has_font(&self) -> bool {
        self.font_data.is_some()
    }

    /// Draws every detection on a copy of `source` and encodes it as PNG.
    ///
    /// `source` is left untouched; equal inputs give byte-identical output.
    pub fn render_overlay(&self, source: &RgbImage, detections: &DetectionSet) -> SpotResult<Vec<u8>> {
        let font = match &self.font_data {
            Some(bytes) => FontRef::try_from_slice(bytes).ok(),
            None => None,
        };

        let mut img = source.clone();
        for det in detections {
            self.draw_detection(&mut img, det, font.as_ref());
        }
        encode_png(img)
    }

    fn draw_detection(&self, img: &mut RgbImage, det: &Detection, font: Option<&FontRef>) {
        let colour = get_class_colour(&det.label_name);
        let (x, y, w, h) = det.bbox.as_xy_wh_i32();

        for t in 0..BOX_THICKNESS {
            let (w_t, h_t) = (w - 2 * t, h - 2 * t);
            if w_t <= 0 || h_t <= 0 {
                break;
            }
            let rect = Rect::at(x + t, y + t).of_size(w_t as u32, h_t as u32);
            draw_hollow_rect_mut(img, rect, colour);
        }

        let caption = det.caption();
        let tag_w = (caption.len() as f32 * LABEL_CHAR_WIDTH) as i32 + 2 * LABEL_PADDING;
        let tag_h = LABEL_TEXT_HEIGHT;
        // above the box, or inside its top edge when there is no room
        let tag_y = if y - tag_h >= 0 { y - tag_h } else { y };
        let tag_x = x.max(0);
        let tag_w = tag_w.min(img.width() as i32 - tag_x);
        if tag_w <= 0 {
            return;
        }

        draw_filled_rect_mut(img, Rect::at(tag_x, tag_y).of_size(tag_w as u32, tag_h as u32), colour);
        if let Some(font) = font {
            draw_text_mut(img, TEXT_COLOUR, tag_x + LABEL_PADDING, tag_y + 1, self.scale, font, &caption);
        }
    }
}

fn encode_png(img: RgbImage) -> SpotResult<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|err| SpotError::Render(format!("PNG encoding failed: {err}")))?;
    Ok(buf)
}

/// Writes an encoded overlay to `path`, creating parent directories.
pub fn save_overlay<P: AsRef<Path>>(png: &[u8], path: P) -> SpotResult<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| SpotError::Render(format!("cannot create {}: {err}", parent.display())))?;
    }
    std::fs::write(path, png)
        .map_err(|err| SpotError::Render(format!("cannot write {}: {err}", path.display())))?;
    Ok(path.to_path_buf())
}
