//! Frame acquisition: a single-slot buffer and a replaying frame stream.
//!
//! The producer runs on its own thread and overwrites the slot on every
//! arrival, so a slow consumer always gets the latest frame and older ones
//! are dropped. A consumer faster than the producer blocks until the next
//! frame arrives.

use crate::error::{InspectionError, Result};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Anything the inspection loop can pull frames from.
pub trait FrameSource {
    /// Most recent frame, blocking until one is available.
    fn read(&self) -> Result<RgbImage>;
}

/// Holds at most one frame; a new frame replaces an unread one.
#[derive(Default)]
pub struct FrameSlot {
    frame: Mutex<Option<RgbImage>>,
    arrived: Condvar,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame`, dropping any frame not yet taken.
    pub fn put(&self, frame: RgbImage) {
        let mut slot = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(frame);
        self.arrived.notify_all();
    }

    /// Take the stored frame, waiting for one if the slot is empty.
    pub fn take(&self) -> RgbImage {
        let mut slot = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(frame) = slot.take() {
                return frame;
            }
            slot = self.arrived.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`FrameSlot::take`], giving up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Option<RgbImage> {
        let slot = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut slot, _) = self
            .arrived
            .wait_timeout_while(slot, timeout, |frame| frame.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }
}

/// Plays a fixed list of frames in a loop on a background thread, standing in
/// for a camera.
pub struct ReplayStream {
    frames: Arc<Vec<RgbImage>>,
    interval: Duration,
    slot: Arc<FrameSlot>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReplayStream {
    pub fn new(frames: Vec<RgbImage>, interval: Duration) -> Self {
        Self {
            frames: Arc::new(frames),
            interval,
            slot: Arc::new(FrameSlot::new()),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the producer thread. Starting a running stream does nothing.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        if self.frames.is_empty() {
            return Err(InspectionError::Precondition("replay stream has no frames".into()));
        }

        self.running.store(true, Ordering::SeqCst);
        let frames = self.frames.clone();
        let slot = self.slot.clone();
        let running = self.running.clone();
        let interval = self.interval;

        tracing::debug!(frames = frames.len(), "starting replay stream");
        self.handle = Some(std::thread::spawn(move || {
            for frame in frames.iter().cycle() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                slot.put(frame.clone());
                std::thread::sleep(interval);
            }
        }));
        Ok(())
    }

    /// Stop the producer and wait for it to finish.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("replay thread panicked");
            }
        }
    }
}

impl FrameSource for ReplayStream {
    fn read(&self) -> Result<RgbImage> {
        loop {
            if !self.is_running() {
                return Err(InspectionError::StreamNotStarted);
            }
            if let Some(frame) = self.slot.take_timeout(POLL_INTERVAL) {
                return Ok(frame);
            }
        }
    }
}

impl Drop for ReplayStream {
    fn drop(&mut self) {
        self.stop();
    }
}
