use thiserror::Error;

/// Failure kinds surfaced by every stage of the detection pipeline.
///
/// `ModelLoad`, `VocabularyMismatch` and `Config` are configuration faults and
/// must stop the process before it serves anything. `ImageDecode` and
/// `Inference` are per-request and never affect other requests.
#[derive(Debug, Error)]
pub enum SpotError {
    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("image decode failed: {0}")]
    ImageDecode(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("class id {label_id} is outside the vocabulary of {vocabulary_len} classes")]
    VocabularyMismatch { label_id: i64, vocabulary_len: usize },

    #[error("overlay rendering failed: {0}")]
    Render(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SpotError {
    /// HTTP-style status the request layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            SpotError::ImageDecode(_) => 400,
            SpotError::Cancelled => 499,
            SpotError::ModelLoad(_)
            | SpotError::Inference(_)
            | SpotError::VocabularyMismatch { .. }
            | SpotError::Render(_)
            | SpotError::Config(_) => 500,
        }
    }

    /// True for faults that should block startup rather than be reported per request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SpotError::ModelLoad(_) | SpotError::VocabularyMismatch { .. } | SpotError::Config(_)
        )
    }

    pub(crate) fn model_load(err: impl std::fmt::Display) -> Self {
        SpotError::ModelLoad(err.to_string())
    }

    pub(crate) fn inference(err: impl std::fmt::Display) -> Self {
        SpotError::Inference(err.to_string())
    }
}

impl From<image::ImageError> for SpotError {
    fn from(err: image::ImageError) -> Self {
        SpotError::ImageDecode(err.to_string())
    }
}

pub type SpotResult<T> = std::result::Result<T, SpotError>;
