use crate::frame::{Frame, Sample};
use std::collections::VecDeque;

/// Frames kept for the averaged view
pub const ROLLING_WINDOW_SIZE: usize = 10;

/// Fixed capacity FIFO of the most recent frames
#[derive(Debug, Default)]
pub struct RollingWindow {
    frames: VecDeque<Frame>,
}

impl RollingWindow {
    pub fn new() -> Self {
        RollingWindow {
            frames: VecDeque::with_capacity(ROLLING_WINDOW_SIZE),
        }
    }

    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() == ROLLING_WINDOW_SIZE {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.frames.iter()
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.frames.back()
    }

    /// Per-pixel mean over the window.
    ///
    /// Frames are expected to share the pixel axis, the output follows the oldest frame
    /// and stops at the shortest one.
    pub fn average(&self) -> Option<Vec<Sample>> {
        let oldest = self.frames.front()?;
        let shortest = self.frames.iter().map(|f| f.len()).min().unwrap_or(0);
        let count = self.frames.len() as f64;
        let averaged = oldest[..shortest]
            .iter()
            .enumerate()
            .map(|(idx, sample)| {
                let sum: f64 = self.frames.iter().map(|f| f[idx].intensity).sum();
                Sample::new(sample.pixel, sum / count)
            })
            .collect();
        Some(averaged)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Every frame acquired since the current recording started
#[derive(Debug, Default)]
pub struct RecordingLog {
    frames: Vec<Frame>,
    active: bool,
}

impl RecordingLog {
    pub fn new() -> Self {
        RecordingLog::default()
    }

    /// Drops the previous recording
    pub fn start(&mut self) {
        self.frames.clear();
        self.active = true;
    }

    /// Recorded frames are kept until the next start
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Appends `frame` if recording, returns whether it was kept
    pub fn push(&mut self, frame: Frame) -> bool {
        if self.active {
            self.frames.push(frame);
        }
        self.active
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
