// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for QR image generation and decoding

use image::{DynamicImage, Rgba, RgbaImage};
use qrscan::CodecError;
use qrscan::codec::{GenerateRequest, QrCodec, Scale};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn generate(text: &str) -> DynamicImage {
    let image = QrCodec::new()
        .encode(text, Scale::uniform(10.0), None, Scale::uniform(0.3))
        .unwrap();
    DynamicImage::ImageRgba8(image)
}

#[test]
fn test_decode_without_symbols_returns_input_unchanged() {
    let mut input = RgbaImage::from_pixel(120, 90, Rgba([240, 240, 240, 255]));
    for x in 10..60 {
        input.put_pixel(x, 30, Rgba([0, 0, 0, 255]));
    }
    let input = DynamicImage::ImageRgba8(input);

    let output = QrCodec::new().decode(&input);
    assert!(output.strings.is_empty());
    assert_eq!(output.image, input);
}

#[test]
fn test_round_trip() {
    let text = "https://example.com/";
    let output = QrCodec::new().decode(&generate(text));
    assert_eq!(output.strings, vec![text.to_string()]);
}

#[test]
fn test_decode_boxes_symbol_in_red() {
    let image = generate("https://example.com/");
    let output = QrCodec::new().decode(&image);

    let annotated = output.image.to_rgba8();
    assert_eq!(annotated.dimensions(), (image.width(), image.height()));
    assert!(annotated.pixels().any(|p| *p == RED));
    // Corners of the quiet zone are far from the box
    assert_eq!(*annotated.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
}

#[test]
fn test_overlay_round_trip() {
    let text = "QR overlay test";
    let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([30, 90, 200, 255])));
    let request = GenerateRequest::new(text)
        .with_definition(Scale::uniform(10.0))
        .with_overlay(logo, Scale::uniform(0.2));

    let codec = QrCodec::new();
    let image = codec.generate(&request).unwrap();

    // The overlay really covers the middle of the symbol
    let (w, h) = image.dimensions();
    assert_eq!(*image.get_pixel(w / 2, h / 2), Rgba([30, 90, 200, 255]));

    let output = codec.decode(&DynamicImage::ImageRgba8(image));
    assert_eq!(output.strings, vec![text.to_string()]);
}

#[test]
fn test_definition_per_axis() {
    let image = QrCodec::new()
        .encode("abc", Scale::new(4.0, 8.0), None, Scale::uniform(0.3))
        .unwrap();
    let (w, h) = image.dimensions();
    assert_eq!(h, w * 2);
}

#[test]
fn test_oversized_definition_is_rejected() {
    let codec = QrCodec::new();
    assert!(matches!(
        codec.encode("a", Scale::uniform(1.0e6), None, Scale::uniform(0.3)),
        Err(CodecError::InvalidParameter(_))
    ));

    let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
    let request = GenerateRequest::new("a")
        .with_definition(Scale::uniform(4.0))
        .with_overlay(logo, Scale::uniform(1.0e6));
    assert!(matches!(
        codec.generate(&request),
        Err(CodecError::InvalidParameter(_))
    ));
}

#[test]
fn test_default_request_size() {
    let image = QrCodec::new().generate(&GenerateRequest::new("abc")).unwrap();
    // Version 1: 21 modules + 8 quiet zone modules, 30 pixels each
    assert_eq!(image.dimensions(), (870, 870));
}

#[test]
fn test_file_helpers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("code.png");
    let codec = QrCodec::new();

    let request = GenerateRequest::new("saved to disk").with_definition(Scale::uniform(8.0));
    codec.encode_to_file(&request, &path).unwrap();

    let output = codec.decode_file(&path).unwrap();
    assert_eq!(output.strings, vec!["saved to disk".to_string()]);
    assert!(codec.decode_file(&dir.path().join("missing.png")).is_err());
}

#[tokio::test]
async fn test_decode_in_background() {
    let output = QrCodec::new()
        .decode_in_background(generate("background"))
        .await;
    assert_eq!(output.strings, vec!["background".to_string()]);
}
