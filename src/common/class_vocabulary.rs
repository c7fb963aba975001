use std::path::Path;
use std::sync::Arc;
use crate::common::{SpotError, SpotResult};
use crate::utils;

/// Class names the parking checkpoint was trained with, in class-id order.
pub const PARKING_CLASSES: [&str; 3] = [
    "free_parking_space",
    "not_free_parking_space",
    "partially_free_parking_space",
];

/// Ordered, immutable list of class names. The position of a name is its class id.
///
/// Cloning is cheap; all clones share the same backing list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    names: Arc<[String]>,
}

impl Default for ClassVocabulary {
    fn default() -> Self {
        Self::parking()
    }
}

impl ClassVocabulary {
    pub fn new<S: AsRef<str>>(names: &[S]) -> SpotResult<Self> {
        if names.is_empty() {
            return Err(SpotError::Config("class vocabulary must not be empty".to_string()));
        }
        Ok(Self {
            names: names.iter().map(|x| x.as_ref().to_string()).collect(),
        })
    }

    /// The vocabulary shipped with the parking checkpoint.
    pub fn parking() -> Self {
        Self {
            names: PARKING_CLASSES.iter().map(|x| x.to_string()).collect(),
        }
    }

    /// Reads one class name per line, ignoring blank lines.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SpotResult<Self> {
        let lines = utils::file_to_vec(path.as_ref()).map_err(|err| {
            SpotError::Config(format!("cannot read labels file {:?}: {err}", path.as_ref()))
        })?;
        let names: Vec<String> = lines
            .into_iter()
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
            .collect();
        Self::new(&names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name for a class id, `None` when the id is out of range (including negative ids).
    pub fn name(&self, label_id: i64) -> Option<&str> {
        usize::try_from(label_id)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(|x| x.as_str())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parking_vocabulary_order_is_fixed() {
        let vocab = ClassVocabulary::parking();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.name(0), Some("free_parking_space"));
        assert_eq!(vocab.name(1), Some("not_free_parking_space"));
        assert_eq!(vocab.name(2), Some("partially_free_parking_space"));
    }

    #[test]
    fn out_of_range_ids_have_no_name() {
        let vocab = ClassVocabulary::parking();
        assert_eq!(vocab.name(3), None);
        assert_eq!(vocab.name(-1), None);
    }

    #[test]
    fn empty_vocabulary_is_rejected() {
        let names: [&str; 0] = [];
        assert!(matches!(ClassVocabulary::new(&names), Err(SpotError::Config(_))));
    }

    #[test]
    fn labels_file_skips_blank_lines() {
        let path = std::env::temp_dir().join(format!("spot_labels_{}.txt", std::process::id()));
        std::fs::write(&path, "free_parking_space\n\nnot_free_parking_space\n").unwrap();
        let vocab = ClassVocabulary::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(vocab.names(), &["free_parking_space", "not_free_parking_space"]);
    }
}
