// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Generating and decoding QR code images
//! - Running a scan session on a virtual camera
//! - Listing available cameras

use chrono::Local;
use qrscan::backends::camera::CameraBackend;
use qrscan::backends::virtual_camera::{VirtualCamera, VirtualCameraBackend, load_scene_frames};
use qrscan::codec::{GenerateRequest, QrCodec, Scale};
use qrscan::{Config, OffscreenSurface, Rect, ScanSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Options of the `scan` command
pub struct ScanOptions {
    pub images: Vec<PathBuf>,
    pub draw_overlay: bool,
    pub region: Option<Rect>,
    pub torch: bool,
    pub frames: Option<usize>,
    pub snapshot: Option<PathBuf>,
}

/// Generate a QR code image
pub fn generate(
    config: &Config,
    text: &str,
    output: Option<PathBuf>,
    definition: Option<f32>,
    overlay: Option<PathBuf>,
    overlay_scale: Option<f32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let definition = definition.unwrap_or(config.generate.definition);
    let mut request = GenerateRequest::new(text).with_definition(Scale::uniform(definition));

    if let Some(path) = overlay {
        let image = image::open(&path)
            .map_err(|e| format!("Failed to load overlay '{}': {}", path.display(), e))?;
        let scale = overlay_scale.unwrap_or(config.generate.overlay_scale);
        request = request.with_overlay(image, Scale::uniform(scale));
    }

    let output_path = match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            path
        }
        None => {
            let dir = get_default_output_dir();
            std::fs::create_dir_all(&dir)?;
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            dir.join(format!("qr_{}.png", timestamp))
        }
    };

    QrCodec::new().encode_to_file(&request, &output_path)?;
    println!("QR code saved: {}", output_path.display());
    Ok(())
}

/// Decode the QR codes in an image
pub fn decode(image: &Path, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let decoded = QrCodec::new().decode_file(image)?;

    if decoded.strings.is_empty() {
        println!("No QR codes found.");
    } else {
        for (index, text) in decoded.strings.iter().enumerate() {
            println!("  [{}] {}", index, text);
        }
    }

    if let Some(path) = output {
        decoded.image.save(&path)?;
        println!("Annotated image saved: {}", path.display());
    }
    Ok(())
}

/// Run a scan session until Ctrl+C, the frame limit or the end of the images
pub fn scan(config: &Config, options: ScanOptions) -> Result<(), Box<dyn std::error::Error>> {
    let paths = collect_image_paths(&options.images)?;
    if paths.is_empty() {
        return Err("No supported images found".into());
    }

    let backend = virtual_backend(&paths)?;
    let mut session = ScanSession::open(&backend, config)?;
    println!("Using camera: {}", session.device().name);

    if let Some(region) = options.region {
        let roi = session.set_scan_region(region)?;
        println!(
            "Scan region: x={:.3} y={:.3} w={:.3} h={:.3} (detection space)",
            roi.x, roi.y, roi.width, roi.height
        );
    }

    let mut surface = OffscreenSurface::new(session.screen_size());
    let detections = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&detections);
    let _subscription = session.start_scan(
        &mut surface,
        options.draw_overlay,
        move |strings: &[String]| {
            let frame = counter.fetch_add(1, Ordering::SeqCst) + 1;
            for text in strings {
                println!("[{}] {}", frame, text);
            }
        },
    )?;

    if options.torch {
        session.set_torch(true)?;
        println!("Torch: {:?}", session.torch_mode());
    }

    println!("Scanning... (press Ctrl+C to stop)");

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        while !stop_flag.load(Ordering::SeqCst) {
            if options
                .frames
                .is_some_and(|limit| detections.load(Ordering::SeqCst) >= limit)
            {
                break;
            }

            match tokio::time::timeout(Duration::from_millis(100), session.dispatch_next()).await {
                Ok(Some(_)) | Err(_) => {}
                Ok(None) => {
                    println!("End of images.");
                    break;
                }
            }
        }
    });

    session.stop_scan()?;
    if options.torch {
        session.set_torch(false)?;
    }

    if let Some(path) = options.snapshot {
        surface.render().save(&path)?;
        println!("Preview snapshot saved: {}", path.display());
    }

    println!(
        "Frames with detections: {}",
        detections.load(Ordering::SeqCst)
    );
    session.close();
    Ok(())
}

/// List all available cameras
pub fn list_cameras(images: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let paths = collect_image_paths(images)?;
    let backend = virtual_backend(&paths)?;
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", backend.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        println!(
            "      Facing: {}, sensor rotation: {}",
            camera.position, camera.rotation
        );
        println!(
            "      Flash: {}, torch: {}",
            yes_no(camera.has_flash),
            yes_no(camera.has_torch)
        );
        println!();
    }

    Ok(())
}

/// Back camera showing `paths`, plus a front camera without torch
fn virtual_backend(paths: &[PathBuf]) -> Result<VirtualCameraBackend, Box<dyn std::error::Error>> {
    let back = VirtualCamera::back("Virtual back camera");
    let frames = load_scene_frames(paths, back.sensor_size(), back.device().rotation)?;

    Ok(VirtualCameraBackend::new()
        .with_camera(back.with_frames(frames))
        .with_camera(VirtualCamera::front("Virtual front camera")))
}

/// Parse `x,y,width,height` into a view-space rectangle
pub fn parse_region(value: &str) -> Result<Rect, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in region '{}': {}", value, e))?;

    match parts.as_slice() {
        [x, y, width, height] if *width >= 0.0 && *height >= 0.0 => {
            Ok(Rect::new(*x, *y, *width, *height))
        }
        [_, _, _, _] => Err(format!("region '{}' has a negative size", value)),
        _ => Err(format!("expected x,y,width,height, got '{}'", value)),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn get_default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("qrscan")
}

/// Collect all image paths from input (files or directories)
fn collect_image_paths(input: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths = Vec::new();

    for path in input {
        if path.is_dir() {
            let mut entries = Vec::new();
            for entry in std::fs::read_dir(path)? {
                let file_path = entry?.path();
                if is_supported_image(&file_path) {
                    entries.push(file_path);
                }
            }
            // Sort by filename for consistent ordering
            entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
            paths.extend(entries);
        } else if is_supported_image(path) {
            paths.push(path.clone());
        } else {
            return Err(format!("Unsupported image: {}", path.display()).into());
        }
    }

    Ok(paths)
}

/// Check if a path is a supported image file
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(ext_lower.as_str(), "png" | "jpg" | "jpeg")
        })
        .unwrap_or(false)
}
