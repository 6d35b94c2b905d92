// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for scan sessions on the virtual camera

use image::{DynamicImage, Rgba};
use parking_lot::Mutex;
use qrscan::backends::camera::types::{SensorRotation, TorchMode};
use qrscan::backends::virtual_camera::{VirtualCamera, VirtualCameraBackend};
use qrscan::codec::{QrCodec, Scale};
use qrscan::scanner::{OffscreenSurface, PreviewSurface, ScanSession};
use qrscan::{CaptureDevice, Config, Rect, ScanError};
use std::sync::Arc;
use std::time::Duration;

const FAST: Duration = Duration::from_millis(5);
const WAIT: Duration = Duration::from_secs(10);

fn code_image(text: &str) -> DynamicImage {
    let image = QrCodec::new()
        .encode(text, Scale::uniform(10.0), None, Scale::uniform(0.3))
        .unwrap();
    DynamicImage::ImageRgba8(image)
}

fn backend_with(camera: VirtualCamera) -> VirtualCameraBackend {
    VirtualCameraBackend::new()
        .with_camera(VirtualCamera::front("Front"))
        .with_camera(camera)
}

fn scanning_backend(text: &str) -> VirtualCameraBackend {
    backend_with(
        VirtualCamera::back("Back")
            .with_frame_interval(FAST)
            .with_scenes(&[code_image(text)]),
    )
}

fn surface(config: &Config) -> OffscreenSurface {
    OffscreenSurface::new(config.screen.size())
}

type Seen = Arc<Mutex<Vec<Vec<String>>>>;

fn recorder() -> (Seen, impl FnMut(&[String]) + Send + 'static) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |strings: &[String]| sink.lock().push(strings.to_vec()))
}

#[test]
fn test_missing_back_camera_is_device_unavailable() {
    let config = Config::default();

    let empty = VirtualCameraBackend::new();
    assert!(matches!(
        ScanSession::open(&empty, &config),
        Err(ScanError::DeviceUnavailable)
    ));

    let front_only = VirtualCameraBackend::new().with_camera(VirtualCamera::front("Front"));
    assert!(matches!(
        ScanSession::open(&front_only, &config),
        Err(ScanError::DeviceUnavailable)
    ));
}

#[test]
fn test_scan_region_swaps_axes() {
    let config = Config::default();
    let backend = backend_with(VirtualCamera::back("Back"));
    let mut session = ScanSession::open(&backend, &config).unwrap();

    assert_eq!(session.rect_of_interest(), Rect::UNIT);
    session
        .set_scan_region(Rect::new(10.0, 20.0, 100.0, 50.0))
        .unwrap();

    let roi = session.rect_of_interest();
    assert_eq!(roi.x, 20.0 / 667.0);
    assert_eq!(roi.y, 10.0 / 375.0);
    assert_eq!(roi.width, 50.0 / 667.0);
    assert_eq!(roi.height, 100.0 / 375.0);
}

#[test]
fn test_torch_without_capability_is_a_no_op() {
    let backend = backend_with(VirtualCamera::back("Back").without_torch());
    let mut session = ScanSession::open(&backend, &Config::default()).unwrap();
    let device = backend.device("virtual:back").unwrap();

    assert!(session.set_torch(true).is_ok());
    assert_eq!(session.torch_mode(), TorchMode::Off);
    assert!(!device.is_configuration_locked());
}

#[test]
fn test_torch_toggles_under_scoped_lock() {
    let backend = backend_with(VirtualCamera::back("Back"));
    let mut session = ScanSession::open(&backend, &Config::default()).unwrap();
    let device = backend.device("virtual:back").unwrap();

    session.set_torch(true).unwrap();
    assert_eq!(session.torch_mode(), TorchMode::On);
    assert!(!device.is_configuration_locked(), "Lock must be released");

    session.set_torch(false).unwrap();
    assert_eq!(session.torch_mode(), TorchMode::Off);
}

#[test]
fn test_lock_failure_is_reported() {
    let backend = backend_with(VirtualCamera::back("Back"));
    let mut session = ScanSession::open(&backend, &Config::default()).unwrap();
    let device = backend.device("virtual:back").unwrap();

    device.set_refuse_configuration_lock(true);
    assert!(matches!(
        session.set_torch(true),
        Err(ScanError::ConfigurationLockFailed(_))
    ));
    assert_eq!(session.torch_mode(), TorchMode::Off);
}

#[test]
fn test_repeated_start_does_not_duplicate_wiring() {
    let config = Config::default();
    let backend = backend_with(VirtualCamera::back("Back").with_frame_interval(FAST));
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    let (_, first) = recorder();
    let (_, second) = recorder();
    let _a = session.start_scan(&mut surface, false, first).unwrap();
    let _b = session.start_scan(&mut surface, true, second).unwrap();

    assert_eq!(session.capture_session().inputs().len(), 1);
    assert_eq!(session.capture_session().outputs().len(), 1);
    assert_eq!(surface.layer_count(), 1);
    assert!(session.draws_overlay());

    let preview = session.preview_layer();
    let preview = preview.lock();
    assert!(surface.contains_layer(preview.id()));
    assert_eq!(preview.frame(), Rect::new(0.0, 0.0, 375.0, 667.0));
}

#[test]
fn test_stop_keeps_wiring_and_scan_resumes() {
    let config = Config::default();
    let backend = backend_with(VirtualCamera::back("Back").with_frame_interval(FAST));
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    let (_, handler) = recorder();
    let _sub = session.start_scan(&mut surface, false, handler).unwrap();
    assert!(session.is_running());

    session.stop_scan().unwrap();
    assert!(!session.is_running());
    assert!(session.capture_session().is_wired());

    let (_, handler) = recorder();
    let _sub = session.start_scan(&mut surface, false, handler).unwrap();
    assert!(session.is_running());
    assert_eq!(session.capture_session().inputs().len(), 1);
}

#[test]
fn test_closed_session_rejects_calls() {
    let config = Config::default();
    let backend = backend_with(VirtualCamera::back("Back").with_frame_interval(FAST));
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    let (_, handler) = recorder();
    let _sub = session.start_scan(&mut surface, false, handler).unwrap();
    session.close();

    assert!(session.is_closed());
    assert!(!session.is_running());
    assert!(session.capture_session().inputs().is_empty());

    let (_, handler) = recorder();
    assert!(matches!(
        session.start_scan(&mut surface, false, handler),
        Err(ScanError::SessionClosed)
    ));
    assert!(matches!(session.set_torch(true), Err(ScanError::SessionClosed)));
    assert!(matches!(
        session.set_scan_region(Rect::UNIT),
        Err(ScanError::SessionClosed)
    ));
    assert!(matches!(session.stop_scan(), Err(ScanError::SessionClosed)));
}

#[test]
fn test_stale_subscription_cannot_remove_newer_handler() {
    let config = Config::default();
    let backend = backend_with(VirtualCamera::back("Back"));
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    let (_, first) = recorder();
    let (_, second) = recorder();
    let stale = session.start_scan(&mut surface, false, first).unwrap();
    let current = session.subscribe(second).unwrap();

    assert!(!stale.is_active());
    assert!(!stale.unsubscribe());
    assert!(current.is_active());
    assert!(current.unsubscribe());
}

#[tokio::test]
async fn test_detection_reaches_newest_handler() {
    let text = "https://example.com/";
    let config = Config::default();
    let backend = scanning_backend(text);
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    let (first_seen, first) = recorder();
    let (second_seen, second) = recorder();
    let _first = session.start_scan(&mut surface, true, first).unwrap();
    let _second = session.start_scan(&mut surface, true, second).unwrap();

    let strings = tokio::time::timeout(WAIT, session.dispatch_next())
        .await
        .expect("no detection in time")
        .expect("capture loop ended");

    assert_eq!(strings, vec![text.to_string()]);
    assert!(first_seen.lock().is_empty());
    assert_eq!(*second_seen.lock(), vec![vec![text.to_string()]]);
}

#[tokio::test]
async fn test_overlay_outlines_symbol_on_preview() {
    let config = Config::default();
    let backend = scanning_backend("outline me");
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    let (_, handler) = recorder();
    let _sub = session.start_scan(&mut surface, true, handler).unwrap();
    tokio::time::timeout(WAIT, session.dispatch_next())
        .await
        .unwrap()
        .unwrap();

    let preview = session.preview_layer();
    {
        let preview = preview.lock();
        assert_eq!(preview.shapes().len(), 1);
        let shape = &preview.shapes()[0];
        assert_eq!(shape.path.len(), 4);

        // The scene is centered, so the outline is centered on the screen
        let cx = shape.path.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy = shape.path.iter().map(|p| p.y).sum::<f64>() / 4.0;
        assert!((cx - 187.5).abs() < 10.0, "outline center x = {}", cx);
        assert!((cy - 333.5).abs() < 10.0, "outline center y = {}", cy);
    }

    let snapshot = surface.render();
    assert_eq!(snapshot.dimensions(), (375, 667));
    assert!(snapshot.pixels().any(|p| *p == Rgba([255, 0, 0, 255])));
}

#[tokio::test]
async fn test_no_overlay_leaves_preview_clean() {
    let config = Config::default();
    let backend = scanning_backend("plain");
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    let (_, handler) = recorder();
    let _sub = session.start_scan(&mut surface, false, handler).unwrap();
    tokio::time::timeout(WAIT, session.dispatch_next())
        .await
        .unwrap()
        .unwrap();

    assert!(session.preview_layer().lock().shapes().is_empty());
}

#[tokio::test]
async fn test_region_of_interest_filters_detections() {
    let config = Config::default();
    let camera = VirtualCamera::back("Back")
        .with_frame_interval(FAST)
        .with_scenes(&[code_image("filtered")])
        .play_once();
    let backend = backend_with(camera);
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    // A small corner region away from the centered symbol
    session
        .set_scan_region(Rect::new(0.0, 0.0, 50.0, 50.0))
        .unwrap();

    let (seen, handler) = recorder();
    let _sub = session.start_scan(&mut surface, false, handler).unwrap();

    let next = tokio::time::timeout(WAIT, session.dispatch_next())
        .await
        .unwrap();
    assert_eq!(next, None);
    assert!(seen.lock().is_empty());
    assert_eq!(backend.device("virtual:back").unwrap().frames_delivered(), 1);
}

#[tokio::test]
async fn test_scan_region_set_before_start_applies_once_wired() {
    let config = Config::default();
    let camera = VirtualCamera::back("Back")
        .with_frame_interval(FAST)
        .with_scenes(&[code_image("centered")])
        .play_once();
    let backend = backend_with(camera);
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    // Middle of the screen
    session
        .set_scan_region(Rect::new(87.5, 183.5, 200.0, 300.0))
        .unwrap();

    let (seen, handler) = recorder();
    let _sub = session.start_scan(&mut surface, false, handler).unwrap();

    let next = tokio::time::timeout(WAIT, session.dispatch_next())
        .await
        .unwrap();
    assert_eq!(next, Some(vec!["centered".to_string()]));
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn test_dispatch_pending_drains_queue() {
    let config = Config::default();
    let camera = VirtualCamera::back("Back")
        .with_frame_interval(FAST)
        .with_scenes(&[code_image("one"), code_image("two")])
        .play_once();
    let backend = backend_with(camera);
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    let (seen, handler) = recorder();
    let _sub = session.start_scan(&mut surface, false, handler).unwrap();

    // Wait for the camera to run out of frames
    tokio::time::timeout(WAIT, async {
        while session.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(session.dispatch_pending(), 2);
    assert_eq!(
        *seen.lock(),
        vec![vec!["one".to_string()], vec!["two".to_string()]]
    );
    assert_eq!(session.dispatch_pending(), 0);
}

fn exhausted_session(backend: &VirtualCameraBackend, config: &Config) -> (ScanSession, Seen) {
    let mut session = ScanSession::open(backend, config).unwrap();
    let mut surface = surface(config);

    let (seen, handler) = recorder();
    // Dropping the subscription keeps the handler registered
    let _ = session.start_scan(&mut surface, false, handler).unwrap();

    let deadline = std::time::Instant::now() + WAIT;
    while session.is_running() {
        assert!(std::time::Instant::now() < deadline, "camera never ran out");
        std::thread::sleep(Duration::from_millis(5));
    }
    (session, seen)
}

fn two_code_backend() -> VirtualCameraBackend {
    backend_with(
        VirtualCamera::back("Back")
            .with_frame_interval(FAST)
            .with_scenes(&[code_image("one"), code_image("two")])
            .play_once(),
    )
}

#[test]
fn test_stop_discards_queued_detections() {
    let config = Config::default();
    let backend = two_code_backend();
    let (mut session, seen) = exhausted_session(&backend, &config);

    session.stop_scan().unwrap();
    assert_eq!(session.dispatch_pending(), 0);
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn test_stop_ends_dispatch_next() {
    let config = Config::default();
    let backend = two_code_backend();
    let (mut session, seen) = exhausted_session(&backend, &config);

    session.stop_scan().unwrap();
    assert_eq!(session.dispatch_next().await, None);
    assert!(seen.lock().is_empty());
}

#[test]
fn test_close_discards_queued_detections() {
    let config = Config::default();
    let backend = two_code_backend();
    let (mut session, seen) = exhausted_session(&backend, &config);

    session.close();
    assert_eq!(session.dispatch_pending(), 0);
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn test_outline_centers_on_unrotated_sensor() {
    let config = Config::default();
    let camera = VirtualCamera::back("Back")
        .with_rotation(SensorRotation::None)
        .with_frame_interval(FAST)
        .with_scenes(&[code_image("upright")]);
    let backend = backend_with(camera);
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut surface = surface(&config);

    let (_, handler) = recorder();
    let _sub = session.start_scan(&mut surface, true, handler).unwrap();
    let strings = tokio::time::timeout(WAIT, session.dispatch_next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(strings, vec!["upright".to_string()]);

    let preview = session.preview_layer();
    let preview = preview.lock();
    assert_eq!(preview.rotation(), SensorRotation::None);
    let shape = &preview.shapes()[0];
    let cx = shape.path.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = shape.path.iter().map(|p| p.y).sum::<f64>() / 4.0;
    assert!((cx - 187.5).abs() < 10.0, "outline center x = {}", cx);
    assert!((cy - 333.5).abs() < 10.0, "outline center y = {}", cy);
}

#[test]
fn test_start_on_new_surface_moves_preview_layer() {
    let config = Config::default();
    let backend = backend_with(VirtualCamera::back("Back").with_frame_interval(FAST));
    let mut session = ScanSession::open(&backend, &config).unwrap();
    let mut first_surface = surface(&config);
    let mut second_surface = surface(&config);

    let (_, handler) = recorder();
    let _a = session.start_scan(&mut first_surface, false, handler).unwrap();
    let (_, handler) = recorder();
    let _b = session.start_scan(&mut second_surface, false, handler).unwrap();

    let id = session.preview_layer().lock().id();
    assert!(!first_surface.contains_layer(id));
    assert_eq!(first_surface.layer_count(), 0);
    assert!(second_surface.contains_layer(id));
    assert_eq!(second_surface.layer_count(), 1);
}

#[test]
fn test_invalid_screen_is_rejected_on_open() {
    let mut config = Config::default();
    config.screen.width = 0.0;
    let backend = backend_with(VirtualCamera::back("Back"));

    assert!(matches!(
        ScanSession::open(&backend, &config),
        Err(ScanError::InvalidConfiguration(_))
    ));
}
