extern crate spot_detect;

use spot_detect::{global, process_image, SpotError};

// Nothing in this test binary installs a detector.
#[test]
fn process_image_requires_initialized_detector() {
    assert!(global().is_none());
    let err = process_image(b"\x89PNG", "json").unwrap_err();
    assert!(matches!(err, SpotError::ModelLoad(_)));
    assert!(err.is_fatal());
}
