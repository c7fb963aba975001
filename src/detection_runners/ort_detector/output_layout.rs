//! Decoding of YOLO-NAS export heads (NMS embedded) into raw candidates.

use anyhow::{bail, Result};
use crate::common::{RawDetections, SpotBox};
use crate::detection_runners::image_ops::LetterboxInfo;
use crate::detection_runners::input_wrapper::{Xs, X};

/// Output arrangement of an exported checkpoint, detected from the number of outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// `num_predictions [B,1]`, `pred_boxes [B,N,4]`, `pred_scores [B,N]`, `pred_classes [B,N]`.
    Batch,
    /// One `[N,7]` tensor of `(image_index, x1, y1, x2, y2, confidence, class_index)`.
    Flat,
}

impl OutputLayout {
    pub fn from_output_count(n: usize) -> Result<Self> {
        match n {
            4 => Ok(OutputLayout::Batch),
            1 => Ok(OutputLayout::Flat),
            n => bail!("Unsupported detector export: expected 1 (flat) or 4 (batch) outputs, found {n}"),
        }
    }

    /// Candidates of the first image in emission order, boxes mapped back to source pixels.
    pub fn decode(&self, xs: &Xs, info: &LetterboxInfo) -> Result<RawDetections> {
        let expected = match self {
            OutputLayout::Batch => 4,
            OutputLayout::Flat => 1,
        };
        if xs.len() != expected {
            bail!("{:?} layout expects {expected} outputs, got {}", self, xs.len());
        }
        match self {
            OutputLayout::Batch => decode_batch(&xs[0], &xs[1], &xs[2], &xs[3], info),
            OutputLayout::Flat => decode_flat(&xs[0], info),
        }
    }
}

fn decode_batch(num: &X, boxes: &X, scores: &X, classes: &X, info: &LetterboxInfo) -> Result<RawDetections> {
    if boxes.ndim() != 3 || boxes.shape()[2] != 4 {
        bail!("pred_boxes must be [B,N,4], got {:?}", boxes.shape());
    }
    if scores.ndim() != 2 || classes.ndim() != 2 {
        bail!("pred_scores/pred_classes must be [B,N], got {:?} and {:?}", scores.shape(), classes.shape());
    }
    let n_rows = boxes.shape()[1];
    if boxes.shape()[0] == 0 || scores.shape()[0] == 0 || classes.shape()[0] == 0 {
        bail!("Batch outputs carry no image: boxes={:?}, scores={:?}, classes={:?}",
            boxes.shape(), scores.shape(), classes.shape());
    }
    if scores.shape()[1] != n_rows || classes.shape()[1] != n_rows {
        bail!("Batch outputs disagree on candidate count: boxes={n_rows}, scores={}, classes={}",
            scores.shape()[1], classes.shape()[1]);
    }
    let n_valid = match num.iter().next() {
        Some(&n) if n > 0. => (n as usize).min(n_rows),
        _ => 0,
    };

    let mut raw = RawDetections::with_capacity(n_valid);
    for i in 0..n_valid {
        let bbox = to_source_box(
            boxes[[0, i, 0]],
            boxes[[0, i, 1]],
            boxes[[0, i, 2]],
            boxes[[0, i, 3]],
            info,
        );
        raw.push(class_index(classes[[0, i]], i)?, scores[[0, i]], bbox);
    }
    Ok(raw)
}

fn decode_flat(rows: &X, info: &LetterboxInfo) -> Result<RawDetections> {
    // an export with zero detections may report a rank-1 empty tensor
    if rows.is_empty() {
        return Ok(RawDetections::default());
    }
    if rows.ndim() != 2 || rows.shape()[1] != 7 {
        bail!("Flat predictions must be [N,7], got {:?}", rows.shape());
    }

    let mut raw = RawDetections::with_capacity(rows.shape()[0]);
    for i in 0..rows.shape()[0] {
        if rows[[i, 0]].round() as i64 != 0 {
            continue;
        }
        let bbox = to_source_box(rows[[i, 1]], rows[[i, 2]], rows[[i, 3]], rows[[i, 4]], info);
        raw.push(class_index(rows[[i, 6]], i)?, rows[[i, 5]], bbox);
    }
    Ok(raw)
}

/// Class indices arrive as floats; anything but a whole number is a corrupt output.
fn class_index(value: f32, row: usize) -> Result<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        bail!("Candidate {row} has a non-integral class index {value}");
    }
    Ok(value as i64)
}

fn to_source_box(x1: f32, y1: f32, x2: f32, y2: f32, info: &LetterboxInfo) -> SpotBox {
    SpotBox::from_corners(x1, y1, x2, y2)
        .unscale(info.ratio)
        .clamp_to(info.width_src, info.height_src)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(ratio: f32) -> LetterboxInfo {
        LetterboxInfo {
            width_src: 1000,
            height_src: 800,
            width_resized: 636,
            height_resized: 509,
            ratio,
        }
    }

    #[test]
    fn output_count_selects_layout() {
        assert_eq!(OutputLayout::from_output_count(4).unwrap(), OutputLayout::Batch);
        assert_eq!(OutputLayout::from_output_count(1).unwrap(), OutputLayout::Flat);
        assert!(OutputLayout::from_output_count(3).is_err());
    }

    #[test]
    fn batch_layout_honours_num_predictions() {
        let mut xs = Xs::new();
        xs.push_kv("num_predictions", X::from_shape_vec(&[1, 1], vec![2.]).unwrap());
        xs.push_kv(
            "pred_boxes",
            X::from_shape_vec(&[1, 3, 4], vec![
                10., 10., 50., 50.,
                60., 20., 30., 40.,
                0., 0., 1., 1.,
            ]).unwrap(),
        );
        xs.push_kv("pred_scores", X::from_shape_vec(&[1, 3], vec![0.9, 0.5, 0.8]).unwrap());
        xs.push_kv("pred_classes", X::from_shape_vec(&[1, 3], vec![0., 2., 1.]).unwrap());

        let raw = OutputLayout::Batch.decode(&xs, &info(1.0)).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.labels(), &[0, 2]);
        assert_eq!(raw.confidence(), &[0.9, 0.5]);
        assert_eq!(raw.bboxes()[0], SpotBox::new(10., 10., 50., 50.));
        // swapped corners are reordered
        assert_eq!(raw.bboxes()[1], SpotBox::new(30., 20., 60., 40.));
    }

    #[test]
    fn flat_layout_unscales_and_clamps() {
        let mut xs = Xs::new();
        xs.push_kv(
            "graph2_flat_predictions",
            X::from_shape_vec(&[2, 7], vec![
                0., 5., 5., 25., 700., 0.7, 1.,
                1., 5., 5., 25., 25., 0.9, 0.,
            ]).unwrap(),
        );
        let raw = OutputLayout::Flat.decode(&xs, &info(0.5)).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.labels(), &[1]);
        assert_eq!(raw.bboxes()[0], SpotBox::new(10., 10., 50., 800.));
    }

    #[test]
    fn negative_class_index_is_kept_raw() {
        let mut xs = Xs::new();
        xs.push_kv("flat", X::from_shape_vec(&[1, 7], vec![0., 1., 1., 2., 2., 0.6, -1.]).unwrap());
        let raw = OutputLayout::Flat.decode(&xs, &info(1.0)).unwrap();
        assert_eq!(raw.labels(), &[-1]);
    }

    #[test]
    fn non_integral_class_index_is_rejected() {
        for class in [f32::NAN, 1.6, f32::INFINITY] {
            let mut xs = Xs::new();
            xs.push_kv(
                "flat",
                X::from_shape_vec(&[2, 7], vec![
                    0., 1., 1., 20., 20., 0.9, 0.,
                    0., 1., 1., 20., 20., 0.8, class,
                ]).unwrap(),
            );
            assert!(OutputLayout::Flat.decode(&xs, &info(1.0)).is_err(), "class {class} accepted");
        }

        let mut xs = Xs::new();
        xs.push_kv("num_predictions", X::from_shape_vec(&[1, 1], vec![1.]).unwrap());
        xs.push_kv("pred_boxes", X::from_shape_vec(&[1, 1, 4], vec![1., 1., 5., 5.]).unwrap());
        xs.push_kv("pred_scores", X::from_shape_vec(&[1, 1], vec![0.9]).unwrap());
        xs.push_kv("pred_classes", X::from_shape_vec(&[1, 1], vec![f32::NAN]).unwrap());
        assert!(OutputLayout::Batch.decode(&xs, &info(1.0)).is_err());
    }

    #[test]
    fn empty_batch_dimension_is_an_error() {
        let mut xs = Xs::new();
        xs.push_kv("num_predictions", X::from_shape_vec(&[1, 1], vec![2.]).unwrap());
        xs.push_kv("pred_boxes", X::from_shape_vec(&[0, 2, 4], vec![]).unwrap());
        xs.push_kv("pred_scores", X::from_shape_vec(&[0, 2], vec![]).unwrap());
        xs.push_kv("pred_classes", X::from_shape_vec(&[0, 2], vec![]).unwrap());
        assert!(OutputLayout::Batch.decode(&xs, &info(1.0)).is_err());
    }
}
