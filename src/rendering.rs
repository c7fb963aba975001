pub mod colours;
pub mod json;
pub mod overlay;

pub use json::{to_json, DetectionMap, DetectionRecord};
pub use overlay::{save_overlay, OverlayRenderer};

/// Result of one request: exactly one of the two output representations.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Png(Vec<u8>),
    Json(DetectionMap),
}

impl Artifact {
    pub fn as_png(&self) -> Option<&[u8]> {
        match self {
            Artifact::Png(bytes) => Some(bytes),
            Artifact::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&DetectionMap> {
        match self {
            Artifact::Json(map) => Some(map),
            Artifact::Png(_) => None,
        }
    }

    /// MIME type a transport layer should advertise.
    pub fn content_type(&self) -> &'static str {
        match self {
            Artifact::Png(_) => "image/png",
            Artifact::Json(_) => "application/json",
        }
    }

    /// Body bytes: the PNG itself, or the serialized mapping.
    pub fn into_bytes(self) -> serde_json::Result<Vec<u8>> {
        match self {
            Artifact::Png(bytes) => Ok(bytes),
            Artifact::Json(map) => serde_json::to_vec(&map),
        }
    }
}
