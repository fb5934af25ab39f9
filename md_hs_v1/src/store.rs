use crate::{
    error::{Error, Result},
    frame::{Sample, FRAME_PIXEL_COUNT},
    stats::InspectionRange,
};
use serde::Serialize;
use std::{collections::VecDeque, sync::Arc};

/// Amount of stored traces kept at once
pub const MAX_STORED_TRACES: usize = 5;
const HUE_STEP: u16 = 60;

/// Display color of a stored trace, renderers use full saturation
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize)]
pub struct TraceColor {
    /// Degrees, always below 360
    pub hue: u16,
}

impl TraceColor {
    /// Color of the trace at 1-based position `ordinal`
    pub fn for_ordinal(ordinal: usize) -> Self {
        let hue = (ordinal % 6) as u16 * HUE_STEP;
        TraceColor { hue }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct StoredTrace {
    pub points: Vec<Sample>,
    pub color: TraceColor,
}

impl StoredTrace {
    pub fn points_in(&self, range: InspectionRange) -> impl Iterator<Item = &Sample> + '_ {
        self.points.iter().filter(move |s| range.contains(s.pixel))
    }
}

/// Captured series subtracted from incoming frames
#[derive(PartialEq, Debug, Clone)]
pub struct BackgroundReference {
    samples: Arc<[Sample]>,
}

impl BackgroundReference {
    /// Keeps at most [`FRAME_PIXEL_COUNT`] samples, sorted by pixel
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.truncate(FRAME_PIXEL_COUNT);
        samples.sort_by_key(|s| s.pixel);
        BackgroundReference {
            samples: samples.into(),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn intensity_at(&self, pixel: u32) -> Option<f64> {
        self.samples
            .binary_search_by_key(&pixel, |s| s.pixel)
            .ok()
            .map(|idx| self.samples[idx].intensity)
    }
}

/// Operator snapshots of the signal. Lives across acquisition sessions.
#[derive(Debug, Default)]
pub struct TraceStore {
    traces: VecDeque<StoredTrace>,
    background: Option<BackgroundReference>,
}

impl TraceStore {
    pub fn new() -> Self {
        TraceStore::default()
    }

    /// Freezes the part of `current` within `range`, evicting the oldest trace when full
    pub fn store_trace(&mut self, current: &[Sample], range: InspectionRange) -> Result<&StoredTrace> {
        if current.is_empty() {
            return Err(Error::NoData);
        }
        if self.traces.len() >= MAX_STORED_TRACES {
            self.traces.pop_front();
        }
        let points = range.filter(current);
        let color = TraceColor::for_ordinal(self.traces.len() + 1);
        log::debug!(
            "Storing trace of {} points, hue {}",
            points.len(),
            color.hue
        );
        self.traces.push_back(StoredTrace { points, color });
        self.traces.back().ok_or(Error::NoData)
    }

    pub fn traces(&self) -> impl ExactSizeIterator<Item = &StoredTrace> + '_ {
        self.traces.iter()
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn clear_traces(&mut self) {
        self.traces.clear();
    }

    /// Replaces the background with `current`, truncated to a frame worth of samples
    pub fn set_background(&mut self, current: &[Sample]) -> &BackgroundReference {
        self.background
            .insert(BackgroundReference::new(current.to_vec()))
    }

    pub fn background(&self) -> Option<&BackgroundReference> {
        self.background.as_ref()
    }
}
