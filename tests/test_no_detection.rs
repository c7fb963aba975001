extern crate spot_detect;

use std::io::Cursor;
use std::time::Instant;
use image::{DynamicImage, ImageFormat, RgbImage};
use spot_detect::common::{ClassVocabulary, ModelConfig, OutputMode};
use spot_detect::SpotDetector;

#[tokio::test]
async fn no_detections() {
    let Ok(onnx_path) = std::env::var("SPOT_TEST_MODEL") else {
        eprintln!("SPOT_TEST_MODEL not set, skipping");
        return;
    };
    let loop_count: u32 = 3;

    let config = ModelConfig::new(onnx_path, ClassVocabulary::parking());
    let detector = SpotDetector::init(config).unwrap();

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, image::Rgb([128, 128, 128])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();

    let now = Instant::now();
    for count in 0..loop_count {
        let artifact = detector.process_image(&bytes, OutputMode::Json).unwrap();
        assert_eq!(artifact.into_bytes().unwrap(), b"{}");
        println!("TIME | Total={:.2?} | {}th detection", now.elapsed(), count);
    }
}
