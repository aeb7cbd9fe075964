use prism_base::Vec2;
use prism_camera::{CameraConfig, Constraints, Facing};
use prism_image::PixelFormat;
use std::path::PathBuf;

#[test]
fn test_default_facing_is_environment() {
    assert_eq!(Facing::default(), Facing::Environment);
}

#[test]
fn test_constraints_compound_and_minimal() {
    let facing_only = Constraints::new(Facing::Environment);
    assert!(!facing_only.is_compound());

    let full = Constraints::new(Facing::Environment)
        .with_size(Some(Vec2::new(1280, 720)))
        .with_frame_rate(Some(30.0));
    assert!(full.is_compound());
    assert_eq!(full.minimal(), facing_only);
}

#[test]
fn test_camera_config_defaults() {
    let config = CameraConfig::default();
    assert_eq!(config.device_for(Facing::Environment), &PathBuf::from("/dev/video0"));
    assert_eq!(config.format(), PixelFormat::Jpeg);
    assert_eq!(config.buffer_count(), 4);
}

#[test]
fn test_user_facing_falls_back_to_rear_device() {
    let config = CameraConfig::default().with_environment_device("/dev/video2");
    assert_eq!(config.device_for(Facing::User), &PathBuf::from("/dev/video2"));

    let config = config.with_user_device("/dev/video4");
    assert_eq!(config.device_for(Facing::User), &PathBuf::from("/dev/video4"));
}
