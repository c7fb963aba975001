use serde::{Deserialize, Serialize};
use crate::common::SpotBox;

/// One recognised parking space.
///
/// `label_name` is always `vocabulary[label_id]`; both are set together by the
/// postprocessor and never change afterwards.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label_id: usize,
    pub label_name: String,
    pub confidence: f32,
    pub bbox: SpotBox,
}

impl Detection {
    pub fn new(label_id: usize, label_name: &str, confidence: f32, bbox: SpotBox) -> Self {
        Self {
            label_id,
            label_name: label_name.to_string(),
            confidence,
            bbox,
        }
    }

    /// Sets the bounding box's coordinates using `(x1, y1, x2, y2)`.
    ///
    /// # Arguments
    ///
    /// * `x1` - The x-coordinate of the top-left corner.
    /// * `y1` - The y-coordinate of the top-left corner.
    /// * `x2` - The x-coordinate of the bottom-right corner.
    /// * `y2` - The y-coordinate of the bottom-right corner.
    ///
    /// # Returns
    ///
    /// A `Detection` instance with updated coordinates.
    pub fn with_x1y1_x2y2(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = SpotBox::new(x1, y1, x2, y2);
        self
    }

    /// Sets the confidence score of the detection.
    pub fn with_confidence(mut self, conf: f32) -> Self {
        self.confidence = conf;
        self
    }

    /// Sets the class id and its name.
    ///
    /// # Arguments
    ///
    /// * `label_id` - Index into the class vocabulary.
    /// * `label_name` - The vocabulary entry at `label_id`.
    ///
    /// # Returns
    ///
    /// A `Detection` instance with updated label.
    pub fn with_label(mut self, label_id: usize, label_name: &str) -> Self {
        self.label_id = label_id;
        self.label_name = label_name.to_string();
        self
    }

    /// Overlay caption, e.g. `free_parking_space 0.90`.
    pub fn caption(&self) -> String {
        format!("{} {:.2}", self.label_name, self.confidence)
    }
}

/// Detections of one inference call, in model emission order.
///
/// The order is not sorted by confidence; positions are the indices used as
/// keys in the structured output.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct DetectionSet(Vec<Detection>);

impl DetectionSet {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self(detections)
    }

    pub fn into_inner(self) -> Vec<Detection> {
        self.0
    }
}

impl std::ops::Deref for DetectionSet {
    type Target = [Detection];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Detection>> for DetectionSet {
    fn from(detections: Vec<Detection>) -> Self {
        Self(detections)
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_fields() {
        let det = Detection::default()
            .with_label(2, "partially_free_parking_space")
            .with_confidence(0.75)
            .with_x1y1_x2y2(1., 2., 3., 4.);
        assert_eq!(det.label_id, 2);
        assert_eq!(det.label_name, "partially_free_parking_space");
        assert_eq!(det.bbox, SpotBox::new(1., 2., 3., 4.));
        assert_eq!(det.caption(), "partially_free_parking_space 0.75");
    }
}
