use crate::common::{ClassVocabulary, Detection, DetectionSet, RawDetections, SpotError, SpotResult};

/// Keeps candidates whose confidence is strictly greater than `threshold`, preserving order.
///
/// A candidate scored exactly at the threshold is dropped.
pub fn filter_by_confidence(raw: RawDetections, threshold: f32) -> RawDetections {
    if raw.confidence().iter().all(|&c| c > threshold) {
        return raw;
    }
    raw.iter()
        .filter(|&(_, confidence, _)| confidence > threshold)
        .collect()
}

/// Zips the raw arrays into typed detections, resolving each class id through `vocabulary`.
///
/// One detection per raw row, in the same order. A class id outside the
/// vocabulary fails the whole call with `VocabularyMismatch`.
pub fn postprocess(raw: &RawDetections, vocabulary: &ClassVocabulary) -> SpotResult<DetectionSet> {
    let mut detections = Vec::with_capacity(raw.len());

    for (label, confidence, bbox) in raw.iter() {
        let label_name = vocabulary.name(label).ok_or(SpotError::VocabularyMismatch {
            label_id: label,
            vocabulary_len: vocabulary.len(),
        })?;
        detections.push(Detection::new(label as usize, label_name, confidence, bbox));
    }

    Ok(DetectionSet::new(detections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SpotBox;

    fn raw(rows: &[(i64, f32)]) -> RawDetections {
        rows.iter()
            .enumerate()
            .map(|(i, &(l, c))| (l, c, SpotBox::new(i as f32, i as f32, i as f32 + 10., i as f32 + 10.)))
            .collect()
    }

    #[test]
    fn threshold_is_strict() {
        let out = filter_by_confidence(raw(&[(0, 0.39), (1, 0.40), (2, 0.41)]), 0.4);
        assert_eq!(out.labels(), &[2]);
        assert_eq!(out.confidence(), &[0.41]);
    }

    #[test]
    fn postprocess_preserves_length_and_order() {
        let r = raw(&[(2, 0.5), (0, 0.9), (1, 0.7)]);
        let set = postprocess(&r, &ClassVocabulary::parking()).unwrap();
        assert_eq!(set.len(), r.len());
        let names: Vec<&str> = set.iter().map(|d| d.label_name.as_str()).collect();
        assert_eq!(names, vec!["partially_free_parking_space", "free_parking_space", "not_free_parking_space"]);
        assert_eq!(set[0].bbox, r.bboxes()[0]);
    }

    #[test]
    fn out_of_range_label_is_never_clamped() {
        let vocab = ClassVocabulary::parking();
        for bad in [3, 17, -1] {
            let err = postprocess(&raw(&[(0, 0.9), (bad, 0.8)]), &vocab).unwrap_err();
            match err {
                SpotError::VocabularyMismatch { label_id, vocabulary_len } => {
                    assert_eq!(label_id, bad);
                    assert_eq!(vocabulary_len, 3);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn empty_input_gives_empty_set() {
        let set = postprocess(&RawDetections::default(), &ClassVocabulary::parking()).unwrap();
        assert!(set.is_empty());
    }
}
