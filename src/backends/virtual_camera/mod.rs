// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! A software camera that replays prepared frames (usually still images placed
//! in front of the sensor, see [`file_source`]) at a fixed frame interval. It
//! models the parts of a physical device a scan session touches: facing,
//! sensor rotation, an optional torch and the exclusive configuration lock.
//!
//! ```text
//! Image files ──► scene_to_frame ──► VirtualCaptureDevice ──► read_frame()
//!                 (fit + rotate)      (loop, pace, torch)
//! ```

pub mod file_source;

pub use file_source::{blank_frame, load_scene_frames, scene_to_frame};

use crate::backends::camera::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFrame, CameraPosition,
    SensorRotation, TorchMode,
};
use crate::backends::camera::{CameraBackend, CaptureDevice};
use crate::constants::virtual_camera as vc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Description of a virtual camera before it is added to a backend
#[derive(Debug, Clone)]
pub struct VirtualCamera {
    device: CameraDevice,
    frames: Vec<CameraFrame>,
    looping: bool,
    frame_interval: Duration,
    sensor_size: (u32, u32),
}

impl VirtualCamera {
    /// A phone-like back camera: sensor mounted at 90°, torch available
    pub fn back(name: &str) -> Self {
        Self::new(name, CameraPosition::Back, SensorRotation::Rotate90, true)
    }

    /// A front camera without torch
    pub fn front(name: &str) -> Self {
        Self::new(name, CameraPosition::Front, SensorRotation::Rotate270, false)
    }

    fn new(name: &str, position: CameraPosition, rotation: SensorRotation, torch: bool) -> Self {
        Self {
            device: CameraDevice {
                name: name.to_string(),
                path: format!("virtual:{}", position),
                position,
                rotation,
                has_flash: torch,
                has_torch: torch,
            },
            frames: Vec::new(),
            looping: true,
            frame_interval: vc::FRAME_INTERVAL,
            sensor_size: (vc::SENSOR_WIDTH, vc::SENSOR_HEIGHT),
        }
    }

    /// Mount the sensor at a different angle; set before `with_scenes`
    pub fn with_rotation(mut self, rotation: SensorRotation) -> Self {
        self.device.rotation = rotation;
        self
    }

    /// Remove the torch (and flash) unit
    pub fn without_torch(mut self) -> Self {
        self.device.has_torch = false;
        self.device.has_flash = false;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Replay the frames once instead of looping forever
    pub fn play_once(mut self) -> Self {
        self.looping = false;
        self
    }

    /// Frames delivered as-is, in sensor orientation
    pub fn with_frames(mut self, frames: Vec<CameraFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Scene images placed in front of this camera's sensor
    pub fn with_scenes(mut self, scenes: &[image::DynamicImage]) -> Self {
        self.frames = scenes
            .iter()
            .map(|scene| scene_to_frame(scene, self.sensor_size, self.device.rotation))
            .collect();
        self
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    pub fn sensor_size(&self) -> (u32, u32) {
        self.sensor_size
    }
}

/// Backend exposing a fixed set of virtual cameras
#[derive(Default)]
pub struct VirtualCameraBackend {
    devices: Vec<Arc<VirtualCaptureDevice>>,
}

impl VirtualCameraBackend {
    /// A backend with no cameras at all
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_camera(mut self, camera: VirtualCamera) -> Self {
        debug!(name = %camera.device.name, position = %camera.device.position, "Adding virtual camera");
        self.devices.push(Arc::new(VirtualCaptureDevice::new(camera)));
        self
    }

    /// The concrete device behind a path, for inspecting simulated state
    pub fn device(&self, path: &str) -> Option<Arc<VirtualCaptureDevice>> {
        self.devices
            .iter()
            .find(|device| device.info.path == path)
            .cloned()
    }
}

impl CameraBackend for VirtualCameraBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.devices.iter().map(|device| device.info.clone()).collect()
    }

    fn open_device(&self, device: &CameraDevice) -> BackendResult<Arc<dyn CaptureDevice>> {
        let found = self
            .device(&device.path)
            .ok_or_else(|| BackendError::DeviceNotFound(device.path.clone()))?;

        info!(
            device = %found.info.name,
            has_flash = found.info.has_flash,
            has_torch = found.info.has_torch,
            "Opened virtual camera"
        );
        Ok(found)
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }
}

/// Playback position and pacing
struct Playback {
    cursor: usize,
    last_read: Option<Instant>,
}

/// An opened virtual camera
pub struct VirtualCaptureDevice {
    info: CameraDevice,
    frames: Vec<CameraFrame>,
    sensor_size: (u32, u32),
    looping: bool,
    frame_interval: Duration,
    playback: Mutex<Playback>,
    sequence: AtomicU64,
    torch: Mutex<TorchMode>,
    configuration_locked: AtomicBool,
    refuse_lock: AtomicBool,
}

impl VirtualCaptureDevice {
    fn new(camera: VirtualCamera) -> Self {
        Self {
            info: camera.device,
            frames: camera.frames,
            sensor_size: camera.sensor_size,
            looping: camera.looping,
            frame_interval: camera.frame_interval,
            playback: Mutex::new(Playback {
                cursor: 0,
                last_read: None,
            }),
            sequence: AtomicU64::new(0),
            torch: Mutex::new(TorchMode::Off),
            configuration_locked: AtomicBool::new(false),
            refuse_lock: AtomicBool::new(false),
        }
    }

    /// Make `lock_for_configuration` fail, as when another client holds it
    pub fn set_refuse_configuration_lock(&self, refuse: bool) {
        self.refuse_lock.store(refuse, Ordering::SeqCst);
    }

    /// Number of frames delivered so far
    pub fn frames_delivered(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    fn wait_for_next_slot(&self, playback: &mut Playback) {
        if let Some(last) = playback.last_read {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
        playback.last_read = Some(Instant::now());
    }
}

impl CaptureDevice for VirtualCaptureDevice {
    fn info(&self) -> &CameraDevice {
        &self.info
    }

    fn torch_mode(&self) -> TorchMode {
        *self.torch.lock()
    }

    fn lock_for_configuration(&self) -> BackendResult<()> {
        if self.refuse_lock.load(Ordering::SeqCst) {
            return Err(BackendError::ConfigurationLocked(format!(
                "{} is locked by another client",
                self.info.name
            )));
        }

        self.configuration_locked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| {
                BackendError::ConfigurationLocked(format!("{} is already locked", self.info.name))
            })
    }

    fn unlock_for_configuration(&self) {
        self.configuration_locked.store(false, Ordering::SeqCst);
    }

    fn is_configuration_locked(&self) -> bool {
        self.configuration_locked.load(Ordering::SeqCst)
    }

    fn set_torch_mode(&self, mode: TorchMode) -> BackendResult<()> {
        if !self.info.has_torch {
            return Err(BackendError::NotAvailable(format!(
                "{} has no torch",
                self.info.name
            )));
        }
        if !self.is_configuration_locked() {
            return Err(BackendError::Other(
                "Torch mode changed without configuration lock".into(),
            ));
        }

        *self.torch.lock() = mode;
        debug!(device = %self.info.name, ?mode, "Torch mode changed");
        Ok(())
    }

    fn read_frame(&self) -> BackendResult<Option<CameraFrame>> {
        let mut playback = self.playback.lock();

        let source = if self.frames.is_empty() {
            None
        } else if playback.cursor < self.frames.len() {
            Some(&self.frames[playback.cursor])
        } else if self.looping {
            playback.cursor = 0;
            Some(&self.frames[0])
        } else {
            debug!(device = %self.info.name, "Virtual camera exhausted");
            return Ok(None);
        };

        self.wait_for_next_slot(&mut playback);
        playback.cursor += 1;

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let frame = match source {
            Some(frame) => frame.restamped(sequence),
            None => blank_frame(self.sensor_size).restamped(sequence),
        };
        Ok(Some(frame))
    }
}
