extern crate spot_detect;

use std::io::Cursor;
use std::sync::Arc;
use image::{DynamicImage, ImageFormat, RgbImage};
use spot_detect::common::{ModelConfig, RawDetections, SpotBox, SpotImage};
use spot_detect::{install_global, process_image, Artifact, Predictor, SpotDetector, SpotError, SpotResult};

struct FixedPredictor;

impl Predictor for FixedPredictor {
    fn predict(&mut self, _image: &SpotImage, _threshold: f32) -> SpotResult<RawDetections> {
        Ok(vec![
            (1, 0.85, SpotBox::new(5., 5., 40., 30.)),
            (0, 0.2, SpotBox::new(0., 0., 4., 4.)),
        ]
        .into_iter()
        .collect())
    }
}

fn shared_detector() -> Arc<SpotDetector> {
    let detector = SpotDetector::with_predictors(
        ModelConfig::default(),
        vec![Box::new(FixedPredictor) as Box<dyn Predictor>],
    )
    .unwrap();
    install_global(detector)
}

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, image::Rgb([120, 120, 120])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn json_mode_uses_installed_detector() {
    let detector = shared_detector();
    assert!(Arc::ptr_eq(&detector, &SpotDetector::global().unwrap()));

    let artifact = process_image(&png_bytes(64, 48), "json").unwrap();
    let value = artifact.as_json().unwrap().to_json_value().unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.len(), 1);
    assert_eq!(obj["0"]["label_id"], 1);
    assert_eq!(obj["0"]["label_name"], "not_free_parking_space");
}

#[test]
fn overlay_mode_returns_png_of_source_size() {
    shared_detector();
    let artifact = process_image(&png_bytes(64, 48), "overlay").unwrap();
    assert_eq!(artifact.content_type(), "image/png");
    let Artifact::Png(bytes) = artifact else {
        panic!("expected a png artifact");
    };
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (64, 48));
}

#[test]
fn unknown_mode_is_a_config_error() {
    shared_detector();
    let err = process_image(&png_bytes(8, 8), "base64").unwrap_err();
    assert!(matches!(err, SpotError::Config(_)));
}

#[test]
fn undecodable_upload_is_rejected() {
    shared_detector();
    let err = process_image(b"not an image", "json").unwrap_err();
    assert!(matches!(err, SpotError::ImageDecode(_)));
    assert_eq!(err.status_code(), 400);
}
