// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use qrscan::{AppError, Config};
use qrscan::geometry::Size;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.screen.size(), Size::new(375.0, 667.0));
    assert!(
        !config.scan.draw_overlay,
        "Overlay outlines should be off by default"
    );
    assert_eq!(config.scan.max_dimension, 640);
    assert!(config.scan.event_queue_depth > 0);
}

#[test]
fn test_generate_defaults() {
    // Definition 30 and overlay scale 0.3 on both axes
    let config = Config::default();
    assert_eq!(config.generate.definition, 30.0);
    assert_eq!(config.generate.overlay_scale, 0.3);
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.screen.width = 390.0;
    config.screen.height = 844.0;
    config.scan.draw_overlay = true;
    config.generate.definition = 12.0;

    config.save_to(&path).unwrap();
    assert!(path.exists(), "Parent directories should be created");

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "scan": { "draw_overlay": true } }"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert!(config.scan.draw_overlay);
    assert_eq!(config.scan.max_dimension, 640);
    assert_eq!(config.screen, Config::default().screen);
}

#[test]
fn test_invalid_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_non_positive_screen_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    for screen in [
        r#"{ "screen": { "width": 0.0, "height": 667.0 } }"#,
        r#"{ "screen": { "width": 375.0, "height": -1.0 } }"#,
    ] {
        std::fs::write(&path, screen).unwrap();
        assert!(
            matches!(Config::load_from(&path), Err(AppError::Config(_))),
            "{} should be rejected",
            screen
        );
    }

    let mut config = Config::default();
    config.screen.width = f64::INFINITY;
    assert!(config.validate().is_err());
    assert!(Config::default().validate().is_ok());
}
