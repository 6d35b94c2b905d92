// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for the scan capture loop
//!
//! A scan session pulls frames from its device on a dedicated thread so that
//! `start_scan` can return right after issuing the start command.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Read the next frame
    Continue,
    /// The source is exhausted or failed; end the loop
    Stop,
}

/// Controller for a capture loop running in a separate thread
///
/// The loop is stopped and joined when the controller is dropped.
///
/// ```ignore
/// let mut controller = CaptureLoopController::start("scan-capture", move || {
///     match device.read_frame() {
///         Ok(Some(frame)) => {
///             output.process(&frame);
///             LoopAction::Continue
///         }
///         _ => LoopAction::Stop,
///     }
/// })?;
///
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Spawn `loop_fn` on a named thread and call it until it returns
    /// [`LoopAction::Stop`] or the controller is stopped
    ///
    /// Fails if the thread cannot be spawned.
    pub fn start<F>(name: &str, mut loop_fn: F) -> io::Result<Self>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %thread_name, "Capture loop thread started");

                while !thread_stop.load(Ordering::SeqCst) {
                    if loop_fn() == LoopAction::Stop {
                        debug!(name = %thread_name, "Loop requested stop");
                        break;
                    }
                }

                info!(name = %thread_name, "Capture loop thread exiting");
            })
            .inspect_err(|e| {
                warn!(name = %name, error = %e, "Failed to spawn capture loop thread");
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the loop to stop without waiting for it
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// The current iteration (at most one frame read) completes first.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_loop_ends_when_source_is_exhausted() {
        let frames_read = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&frames_read);

        let mut controller = CaptureLoopController::start("test-exhausted", move || {
            if counter.fetch_add(1, Ordering::SeqCst) >= 4 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        })
        .unwrap();

        controller.join();
        assert_eq!(frames_read.load(Ordering::SeqCst), 5);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_interrupts_endless_source() {
        let frames_read = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&frames_read);

        let mut controller = CaptureLoopController::start("test-endless", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        })
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        assert!(controller.is_running());

        controller.stop();
        let after_stop = frames_read.load(Ordering::SeqCst);
        assert!(after_stop > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(frames_read.load(Ordering::SeqCst), after_stop);
    }
}
