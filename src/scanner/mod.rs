// SPDX-License-Identifier: GPL-3.0-only

//! Live QR scan sessions
//!
//! A [`ScanSession`] owns one camera pipeline: the device, a capture session
//! wiring its input to a metadata output, a preview layer and a single result
//! handler. Frames are read and analyzed on a capture thread; frames with
//! detections become [`DetectionEvent`]s that the owner dispatches on its own
//! thread, so handlers and overlay updates never run on the capture thread.
//!
//! ```text
//! CaptureDevice ─► capture thread ─► MetadataOutput ─► mpsc ─► dispatch_*()
//!                       │               (ROI filter)              │
//!                       └─► PreviewLayer.latest_frame              ├─► ShapeLayer outlines
//!                                                                  └─► ResultHandler
//! ```

pub mod capture_session;
pub mod metadata_output;
pub mod preview;
pub mod subscription;

pub use capture_session::{CaptureInput, CaptureSession};
pub use metadata_output::MetadataOutput;
pub use preview::{
    LayerId, OffscreenSurface, PreviewLayer, PreviewSurface, ShapeLayer, SharedPreviewLayer,
    SurfaceId, VideoGravity,
};
pub use subscription::{HandlerSlot, ResultHandler, Subscription};

use crate::backends::camera::types::{BackendError, CameraDevice, CameraPosition, TorchMode};
use crate::backends::camera::{
    CameraBackend, CaptureDevice, CaptureLoopController, ConfigurationLock, LoopAction,
};
use crate::config::Config;
use crate::errors::ScanError;
use crate::frame_processor::{MetadataObject, MetadataObjectType, QrDetector};
use crate::geometry::{self, Rect, Size};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, info, trace, warn};

/// Symbols found in one frame
#[derive(Debug, Clone)]
pub struct DetectionEvent {
    pub objects: Vec<MetadataObject>,
    /// Sensor frame size the objects were normalized against
    pub frame_size: (u32, u32),
    pub sequence: u64,
}

impl DetectionEvent {
    /// Decoded strings in detection order, `""` for unreadable symbols
    pub fn strings(&self) -> Vec<String> {
        self.objects.iter().map(MetadataObject::string_value).collect()
    }
}

/// A camera scan session
pub struct ScanSession {
    device: Arc<dyn CaptureDevice>,
    input: CaptureInput,
    metadata_output: Arc<MetadataOutput>,
    capture_session: CaptureSession,
    preview: SharedPreviewLayer,
    draw_overlay: bool,
    handlers: HandlerSlot,
    capture_loop: Option<CaptureLoopController>,
    /// Receiving end of the running (or last) capture loop's event queue
    events: Option<mpsc::Receiver<DetectionEvent>>,
    queue_depth: usize,
    screen: Size,
    closed: bool,
}

impl ScanSession {
    /// Open the default back-facing camera of `backend`
    pub fn open(backend: &dyn CameraBackend, config: &Config) -> Result<Self, ScanError> {
        config
            .screen
            .validate()
            .map_err(ScanError::InvalidConfiguration)?;

        let Some(info) = backend.default_device(CameraPosition::Back) else {
            warn!(backend = %backend.backend_type(), "No back-facing camera found");
            return Err(ScanError::DeviceUnavailable);
        };

        let device = backend.open_device(&info)?;
        info!(
            device = %info.name,
            rotation = %info.rotation,
            has_flash = info.has_flash,
            has_torch = info.has_torch,
            "Opened scan device"
        );

        let detector = QrDetector::with_max_dimension(config.scan.max_dimension);

        Ok(Self {
            preview: PreviewLayer::new(info.rotation).shared(),
            input: CaptureInput::new(info),
            device,
            metadata_output: Arc::new(MetadataOutput::new(detector)),
            capture_session: CaptureSession::new(),
            draw_overlay: config.scan.draw_overlay,
            handlers: HandlerSlot::new(),
            capture_loop: None,
            events: None,
            queue_depth: config.scan.event_queue_depth.max(1),
            screen: config.screen.size(),
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<(), ScanError> {
        if self.closed {
            Err(ScanError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Start scanning into `surface`
    ///
    /// Wires the input and output on first use, installs the preview layer at
    /// the bottom of `surface` unless it is already there, replaces the result
    /// handler and starts the capture loop. Returns without waiting for frames.
    pub fn start_scan<F>(
        &mut self,
        surface: &mut dyn PreviewSurface,
        draw_overlay: bool,
        handler: F,
    ) -> Result<Subscription, ScanError>
    where
        F: FnMut(&[String]) + Send + 'static,
    {
        self.ensure_open()?;

        if self.capture_session.can_add_input(&self.input) {
            self.capture_session.add_input(self.input.clone());
        }
        if self.capture_session.can_add_output(&self.metadata_output) {
            self.capture_session.add_output(Arc::clone(&self.metadata_output));
            self.metadata_output.set_object_types(&[MetadataObjectType::Qr]);
        }

        let id = {
            let mut preview = self.preview.lock();
            preview.set_frame(Rect::from_size(self.screen));
            preview.set_gravity(VideoGravity::ResizeAspectFill);
            preview.id()
        };

        // Inserting into another surface moves the layer out of the old one
        if surface.contains_layer(id) {
            debug!(layer = %id, "Preview layer already installed");
        } else {
            surface.insert_layer_at_bottom(Arc::clone(&self.preview));
            debug!(layer = %id, surface = ?surface.bounds(), "Preview layer installed");
        }

        self.draw_overlay = draw_overlay;
        let subscription = self.handlers.replace(Box::new(handler));

        if !self.is_running() {
            self.start_capture_loop()?;
        }

        Ok(subscription)
    }

    fn start_capture_loop(&mut self) -> Result<(), ScanError> {
        // Join a loop that ended on its own before starting a new one
        if let Some(mut finished) = self.capture_loop.take() {
            finished.join();
        }

        let device = Arc::clone(&self.device);
        let output = Arc::clone(&self.metadata_output);
        let preview = Arc::clone(&self.preview);
        // Events left over from a previous run are stale
        let (events, receiver) = mpsc::channel(self.queue_depth);
        self.events = None;

        info!(device = %device.info().name, "Starting scan");
        let capture_loop = CaptureLoopController::start("qrscan-capture", move || {
            let frame = match device.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Camera has no more frames");
                    return LoopAction::Stop;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read frame");
                    return LoopAction::Stop;
                }
            };

            let objects = output.process(&frame);
            let frame_size = (frame.width, frame.height);
            let sequence = frame.sequence;
            preview.lock().set_latest_frame(frame);

            if objects.is_empty() {
                return LoopAction::Continue;
            }

            let event = DetectionEvent {
                objects,
                frame_size,
                sequence,
            };
            match events.try_send(event) {
                Ok(()) => LoopAction::Continue,
                Err(TrySendError::Full(_)) => {
                    trace!(sequence, "Event queue full, dropping detection");
                    LoopAction::Continue
                }
                Err(TrySendError::Closed(_)) => LoopAction::Stop,
            }
        })
        .map_err(capture_spawn_error)?;

        self.capture_loop = Some(capture_loop);
        self.events = Some(receiver);
        Ok(())
    }

    /// Stop the capture loop; wiring is kept so scanning can resume
    ///
    /// Detections still queued are discarded, so the handler is not called
    /// again until the next `start_scan`.
    pub fn stop_scan(&mut self) -> Result<(), ScanError> {
        self.ensure_open()?;
        if let Some(mut capture_loop) = self.capture_loop.take() {
            capture_loop.stop();
            info!("Scan stopped");
        }
        self.discard_pending();
        Ok(())
    }

    fn discard_pending(&mut self) {
        if let Some(mut receiver) = self.events.take() {
            receiver.close();
            let mut discarded = 0;
            while receiver.try_recv().is_ok() {
                discarded += 1;
            }
            if discarded > 0 {
                debug!(discarded, "Discarded queued detections");
            }
        }
    }

    /// Restrict detection to a view-space rectangle
    ///
    /// The rectangle is normalized against the screen bounds with the axes
    /// swapped. It only takes effect once `start_scan` has wired the output.
    pub fn set_scan_region(&mut self, view_rect: Rect) -> Result<Rect, ScanError> {
        self.ensure_open()?;
        let roi = geometry::rect_of_interest(view_rect, self.screen);
        self.metadata_output.set_rect_of_interest(roi);
        debug!(?view_rect, ?roi, "Scan region updated");
        Ok(roi)
    }

    /// Turn the torch on or off
    ///
    /// Does nothing on a device without a torch.
    pub fn set_torch(&mut self, on: bool) -> Result<(), ScanError> {
        self.ensure_open()?;
        if !self.device.has_torch() {
            debug!(device = %self.device.info().name, "Device has no torch, ignoring");
            return Ok(());
        }

        let lock = ConfigurationLock::acquire(self.device.as_ref())
            .map_err(|e| ScanError::ConfigurationLockFailed(e.to_string()))?;
        lock.set_torch_mode(TorchMode::from(on))?;
        Ok(())
    }

    /// Register a result handler, replacing the current one
    pub fn subscribe<F>(&mut self, handler: F) -> Result<Subscription, ScanError>
    where
        F: FnMut(&[String]) + Send + 'static,
    {
        self.ensure_open()?;
        Ok(self.handlers.replace(Box::new(handler)))
    }

    /// Dispatch every queued detection event without waiting
    ///
    /// Returns the number of events dispatched.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut dispatched = 0;
        while let Some(receiver) = self.events.as_mut() {
            match receiver.try_recv() {
                Ok(event) => {
                    self.dispatch(event);
                    dispatched += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        dispatched
    }

    /// Wait for the next detection event and dispatch it
    ///
    /// Returns the strings of the dispatched event, or `None` once the
    /// capture loop has ended and nothing is left in the queue.
    pub async fn dispatch_next(&mut self) -> Option<Vec<String>> {
        let event = self.events.as_mut()?.recv().await?;
        Some(self.dispatch(event))
    }

    fn dispatch(&mut self, event: DetectionEvent) -> Vec<String> {
        if self.draw_overlay {
            let mut preview = self.preview.lock();
            preview.clear_shapes();
            for object in &event.objects {
                let points = object
                    .corners
                    .iter()
                    .map(|corner| preview.transform_point(*corner, event.frame_size))
                    .collect();
                preview.add_shape(ShapeLayer::outline(points));
            }
        }

        let strings = event.strings();
        debug!(sequence = event.sequence, count = strings.len(), "Dispatching detections");
        self.handlers.invoke(&strings);
        strings
    }

    /// Stop scanning and tear down the wiring; the session cannot be reused
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Some(mut capture_loop) = self.capture_loop.take() {
            capture_loop.stop();
        }
        self.discard_pending();
        self.capture_session.remove_all();
        self.handlers.clear();
        self.preview.lock().clear_shapes();
        self.closed = true;
        info!(device = %self.device.info().name, "Scan session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_running(&self) -> bool {
        self.capture_loop
            .as_ref()
            .is_some_and(CaptureLoopController::is_running)
    }

    pub fn capture_session(&self) -> &CaptureSession {
        &self.capture_session
    }

    pub fn preview_layer(&self) -> SharedPreviewLayer {
        Arc::clone(&self.preview)
    }

    pub fn rect_of_interest(&self) -> Rect {
        self.metadata_output.rect_of_interest()
    }

    pub fn draws_overlay(&self) -> bool {
        self.draw_overlay
    }

    pub fn device(&self) -> &CameraDevice {
        self.device.info()
    }

    pub fn torch_mode(&self) -> TorchMode {
        self.device.torch_mode()
    }

    pub fn screen_size(&self) -> Size {
        self.screen
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn capture_spawn_error(err: std::io::Error) -> ScanError {
    ScanError::Backend(BackendError::InitializationFailed(format!(
        "failed to spawn capture thread: {}",
        err
    )))
}
