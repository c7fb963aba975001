use crate::common::{SpotBox, SpotError, SpotResult};

/// Parallel per-candidate arrays as produced by a forward pass, in model emission order.
///
/// Labels are kept as the raw integer the model emitted, so ids outside the
/// vocabulary (negative included) survive until the postprocessor rejects them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetections {
    labels: Vec<i64>,
    confidence: Vec<f32>,
    bboxes: Vec<SpotBox>,
}

impl RawDetections {
    pub fn new(labels: Vec<i64>, confidence: Vec<f32>, bboxes: Vec<SpotBox>) -> SpotResult<Self> {
        if labels.len() != confidence.len() || labels.len() != bboxes.len() {
            return Err(SpotError::Inference(format!(
                "raw output arrays differ in length: labels={}, confidence={}, bboxes={}",
                labels.len(),
                confidence.len(),
                bboxes.len()
            )));
        }
        Ok(Self {
            labels,
            confidence,
            bboxes,
        })
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            labels: Vec::with_capacity(n),
            confidence: Vec::with_capacity(n),
            bboxes: Vec::with_capacity(n),
        }
    }

    /// Appends one candidate to all three arrays.
    pub fn push(&mut self, label: i64, confidence: f32, bbox: SpotBox) {
        self.labels.push(label);
        self.confidence.push(confidence);
        self.bboxes.push(bbox);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn confidence(&self) -> &[f32] {
        &self.confidence
    }

    pub fn bboxes(&self) -> &[SpotBox] {
        &self.bboxes
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f32, SpotBox)> + '_ {
        self.labels
            .iter()
            .zip(self.confidence.iter())
            .zip(self.bboxes.iter())
            .map(|((&l, &c), &b)| (l, c, b))
    }
}

impl FromIterator<(i64, f32, SpotBox)> for RawDetections {
    fn from_iter<I: IntoIterator<Item = (i64, f32, SpotBox)>>(iter: I) -> Self {
        let mut raw = RawDetections::default();
        for (label, conf, bbox) in iter {
            raw.push(label, conf, bbox);
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = RawDetections::new(vec![0, 1], vec![0.5], vec![SpotBox::default(); 2]).unwrap_err();
        assert!(matches!(err, SpotError::Inference(_)));
    }

    #[test]
    fn iteration_keeps_emission_order() {
        let raw: RawDetections = vec![
            (2, 0.5, SpotBox::new(0., 0., 1., 1.)),
            (0, 0.9, SpotBox::new(1., 1., 2., 2.)),
        ]
        .into_iter()
        .collect();
        let labels: Vec<i64> = raw.iter().map(|(l, _, _)| l).collect();
        assert_eq!(labels, vec![2, 0]);
        assert_eq!(raw.confidence(), &[0.5, 0.9]);
    }
}
