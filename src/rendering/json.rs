//! Structured output: `{"0": {label_id, label_name, confidence, bbox}, "1": ...}`.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use crate::common::{Detection, DetectionSet, SpotBox};

/// One entry of the structured output. Field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub label_id: usize,
    pub label_name: String,
    pub confidence: f32,
    pub bbox: SpotBox,
}

impl From<&Detection> for DetectionRecord {
    fn from(det: &Detection) -> Self {
        Self {
            label_id: det.label_id,
            label_name: det.label_name.clone(),
            confidence: det.confidence,
            bbox: det.bbox,
        }
    }
}

/// Records keyed by their position in the detection set.
///
/// Keys are serialized as `"0"`, `"1"`, ... in ascending numeric order, which a
/// string-keyed sorted map would not preserve past ten entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionMap(Vec<DetectionRecord>);

impl DetectionMap {
    pub fn get(&self, index: usize) -> Option<&DetectionRecord> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(index, record)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DetectionRecord)> {
        self.0.iter().enumerate()
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl Serialize for DetectionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (i, record) in self.0.iter().enumerate() {
            map.serialize_entry(&i.to_string(), record)?;
        }
        map.end()
    }
}

/// Maps each detection's position to its record. Pure; equal inputs give equal maps.
pub fn to_json(detections: &DetectionSet) -> DetectionMap {
    DetectionMap(detections.iter().map(DetectionRecord::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn det(label_id: usize, name: &str, conf: f32) -> Detection {
        Detection::new(label_id, name, conf, SpotBox::new(10., 10., 50., 50.))
    }

    #[test]
    fn wire_format_matches() {
        let set = DetectionSet::new(vec![det(0, "free_parking_space", 0.9)]);
        let value = to_json(&set).to_json_value().unwrap();
        assert_eq!(
            value,
            json!({"0": {"label_id": 0, "label_name": "free_parking_space", "confidence": 0.9f32, "bbox": [10.0, 10.0, 50.0, 50.0]}})
        );
    }

    #[test]
    fn empty_set_is_an_empty_object() {
        assert_eq!(to_json(&DetectionSet::default()).to_json_string().unwrap(), "{}");
    }

    #[test]
    fn keys_stay_in_numeric_order_past_ten() {
        let set = DetectionSet::new((0..12).map(|i| det(i % 3, "x", 0.5)).collect());
        let text = to_json(&set).to_json_string().unwrap();
        let positions: Vec<usize> = (0..12)
            .map(|i| text.find(&format!("\"{i}\":")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
