use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-image pixel coordinates.
///
/// Serialized as `[x1, y1, x2, y2]`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct SpotBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl From<[f32; 4]> for SpotBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<SpotBox> for [f32; 4] {
    fn from(b: SpotBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl SpotBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Builds a box from two corners given in any order, so that `x1 <= x2` and `y1 <= y2`.
    pub fn from_corners(xa: f32, ya: f32, xb: f32, yb: f32) -> Self {
        Self {
            x1: xa.min(xb),
            y1: ya.min(yb),
            x2: xa.max(xb),
            y2: ya.max(yb),
        }
    }

    /// Returns the width of the bounding box.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Returns the height of the bounding box.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Divides every coordinate by `ratio`, mapping model-input space back to the source image.
    pub fn unscale(self, ratio: f32) -> Self {
        Self::new(self.x1 / ratio, self.y1 / ratio, self.x2 / ratio, self.y2 / ratio)
    }

    /// Clamps the box into a `width` x `height` image.
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self::from_corners(
            self.x1.clamp(0., w),
            self.y1.clamp(0., h),
            self.x2.clamp(0., w),
            self.y2.clamp(0., h),
        )
    }

    /// Rounded pixel rectangle `(x, y, w, h)` for drawing.
    pub fn as_xy_wh_i32(&self) -> (i32, i32, i32, i32) {
        (self.x1.round() as i32,
         self.y1.round() as i32,
         self.width().round() as i32,
         self.height().round() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_reordered() {
        let b = SpotBox::from_corners(50., 60., 10., 20.);
        assert_eq!(b, SpotBox::new(10., 20., 50., 60.));
    }

    #[test]
    fn serializes_as_array() {
        let b = SpotBox::new(10., 10., 50., 50.);
        assert_eq!(serde_json::to_string(&b).unwrap(), "[10.0,10.0,50.0,50.0]");
        let back: SpotBox = serde_json::from_str("[1.5,2.0,3.0,4.0]").unwrap();
        assert_eq!(back, SpotBox::new(1.5, 2., 3., 4.));
    }

    #[test]
    fn clamp_keeps_box_inside_image() {
        let b = SpotBox::new(-5., 10., 700., 300.).clamp_to(640, 200);
        assert_eq!(b, SpotBox::new(0., 10., 640., 200.));
    }
}
