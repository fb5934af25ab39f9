use crate::{
    codec::{FrameDecoder, FramedRead},
    error::{Error, Result},
    export::{ExportScope, ExportSnapshot},
    frame::{DecodedFrame, Sample, FRAME_SIZE},
    history::{RecordingLog, RollingWindow},
    link::{pause, CommandLink},
    session::DeviceSession,
    stats::{find_peak, peak_to_peak, AxisRange, InspectionRange, Peak, Statistics, YRange},
    store::{BackgroundReference, StoredTrace, TraceStore},
    transport::{Purge, Transport},
};
use scopeguard::guard;
use std::time::{Duration, Instant};

/// Upper bound of frames decoded in a single tick
pub const MAX_FRAMES_PER_TICK: usize = 10;
/// Unparsed bytes tolerated before the accumulator is cut down
pub const OVERFLOW_LIMIT: usize = 100 * FRAME_SIZE;
/// Bytes kept after an overflow, the most recent ones
pub const OVERFLOW_KEEP: usize = 50 * FRAME_SIZE;
/// Scheduler period the device timings were tuned for
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Renderer and status indicator fed by the pipeline
pub trait FrameSink {
    /// Called at most once per tick
    fn render(&mut self, view: &View);
    fn saturation(&mut self, saturated: bool);
}

/// Series ready for display, restricted to the inspection range
#[derive(PartialEq, Debug, Clone)]
pub struct View {
    pub points: Vec<Sample>,
    pub peak: Option<Peak>,
    pub peak_to_peak: Option<f64>,
    pub statistics: Statistics,
    pub y_range: Option<AxisRange>,
    pub range: InspectionRange,
    /// Built from the rolling window rather than a single frame
    pub averaged: bool,
}

impl View {
    fn new(points: &[Sample], range: InspectionRange, y_range: YRange, averaged: bool) -> Self {
        let points = range.filter(points);
        View {
            peak: find_peak(&points),
            peak_to_peak: peak_to_peak(&points),
            statistics: Statistics::from_samples(&points),
            y_range: y_range.resolve(&points),
            range,
            averaged,
            points,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum AcquisitionState {
    #[default]
    Stopped,
    Running,
}

/// What a single tick did
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct TickSummary {
    pub frames: usize,
    /// Saturation of the last decoded frame
    pub saturated: Option<bool>,
    /// Bytes dropped by the overflow guard
    pub discarded: usize,
    pub read_failed: bool,
}

/// Non-fatal findings of an acquisition start
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct StartReport {
    pub purge_warning: Option<String>,
}

/// Owns everything between the data channel and the renderer.
///
/// Not reentrant, ticks and operator actions have to be serialized by the caller.
pub struct AcquisitionPipeline<T, S> {
    session: DeviceSession<T>,
    sink: S,
    framed: FramedRead<FrameDecoder>,
    window: RollingWindow,
    recording: RecordingLog,
    store: TraceStore,
    range: InspectionRange,
    y_range: YRange,
    average_view: bool,
    subtracted_view: bool,
    // Last series handed to the renderer, before range filtering
    current: Vec<Sample>,
    current_averaged: bool,
    view: Option<View>,
    state: AcquisitionState,
}

impl<T: Transport, S: FrameSink> AcquisitionPipeline<T, S> {
    pub fn new(session: DeviceSession<T>, sink: S) -> Self {
        AcquisitionPipeline {
            session,
            sink,
            framed: FramedRead::new(FrameDecoder::new()),
            window: RollingWindow::new(),
            recording: RecordingLog::new(),
            store: TraceStore::new(),
            range: InspectionRange::default(),
            y_range: YRange::default(),
            average_view: false,
            subtracted_view: false,
            current: Vec::new(),
            current_averaged: false,
            view: None,
            state: AcquisitionState::Stopped,
        }
    }

    /// Polls the data channel once and forwards what was decoded
    pub fn tick(&mut self) -> TickSummary {
        let mut summary = TickSummary::default();
        if self.state != AcquisitionState::Running {
            return summary;
        }

        let data = match self.session.data() {
            Ok(data) => data,
            Err(err) => {
                log::warn!("Skipping tick: {}", err);
                return summary;
            }
        };
        if let Err(err) = self.framed.fill(data) {
            log::warn!("Data channel read failed: {}", err);
            summary.read_failed = true;
            return summary;
        }

        let mut latest: Option<DecodedFrame> = None;
        while summary.frames < MAX_FRAMES_PER_TICK && self.framed.buffered() >= FRAME_SIZE {
            match self.framed.next_frame() {
                Ok(Some(decoded)) => {
                    log::trace!("Decoded frame, saturated: {}", decoded.saturated);
                    self.window.push(decoded.frame.clone());
                    self.recording.push(decoded.frame.clone());
                    summary.frames += 1;
                    latest = Some(decoded);
                }
                Ok(None) => break,
                // Not produced by the frame decoder for an aligned frame, kept for the
                // Decoder contract
                Err(err) => {
                    log::warn!("Skipping frame: {}", err);
                    break;
                }
            }
        }

        if self.framed.buffered() > OVERFLOW_LIMIT {
            let discarded = self.framed.keep_latest(OVERFLOW_KEEP);
            log::warn!("{}", Error::BufferOverflowRecovered { discarded });
            summary.discarded = discarded;
        }

        if let Some(decoded) = latest {
            if self.average_view {
                if let Some(averaged) = self.window.average() {
                    self.show(averaged, true);
                }
            } else {
                self.show(decoded.frame.to_vec(), false);
            }
            self.sink.saturation(decoded.saturated);
            summary.saturated = Some(decoded.saturated);
        }
        summary
    }

    /// Arms the device with the session exposure. The previous recording is dropped.
    pub fn start_acquisition(&mut self) -> Result<StartReport> {
        if self.is_running() {
            log::debug!("Acquisition already running");
            return Ok(StartReport::default());
        }
        let exposure = self.session.exposure();
        let channels = self.session.channels()?;

        self.recording.start();
        self.window.clear();
        self.framed.clear();

        let mut report = StartReport::default();
        if let Err(err) = channels.data.purge(Purge::All) {
            log::warn!("Could not purge data channel, data may be inconsistent: {}", err);
            report.purge_warning = Some(err.to_string());
        }

        if let Err(err) = arm(&mut channels.link, exposure) {
            log::error!("Could not start acquisition: {}", err);
            self.recording.stop();
            return Err(err);
        }

        self.state = AcquisitionState::Running;
        log::info!("Acquisition started, exposure {} us", exposure);
        Ok(report)
    }

    /// Disarms the device. Acquisition is stopped even when this fails, the recording
    /// and the last view are kept.
    pub fn stop_acquisition(&mut self) -> Result<()> {
        self.state = AcquisitionState::Stopped;
        self.recording.stop();
        self.framed.clear();

        let channels = self.session.channels()?;
        let mut failure = None;
        if let Err(err) = channels.link.trigger_off() {
            log::error!("Could not disarm trigger: {}", err);
            failure.get_or_insert(err);
        }
        if let Err(err) = channels.data.purge(Purge::All) {
            log::error!("Could not purge data channel: {}", err);
            failure.get_or_insert(err);
        }
        if let Err(err) = channels.data.reset() {
            log::error!("Could not reset data channel: {}", err);
            failure.get_or_insert(err);
        }

        match failure {
            Some(err) => Err(err),
            None => {
                log::info!("Acquisition stopped, {} frames recorded", self.recording.len());
                Ok(())
            }
        }
    }

    /// Applies a new exposure, restarting a running acquisition around it
    pub fn set_exposure(&mut self, exposure: u32) -> Result<()> {
        let was_running = self.is_running();
        if was_running {
            if let Err(err) = self.stop_acquisition() {
                log::warn!("Stopping before exposure change: {}", err);
            }
        }
        self.session.set_exposure(exposure)?;
        log::info!("Exposure set to {} us", exposure);
        if was_running {
            self.start_acquisition()?;
        }
        Ok(())
    }

    /// Returns whether the averaged view is now enabled
    pub fn toggle_average_view(&mut self) -> bool {
        self.average_view = !self.average_view;
        let series = if self.average_view {
            self.window.average()
        } else {
            self.window.latest().map(|frame| frame.to_vec())
        };
        if let Some(series) = series {
            self.show(series, self.average_view);
        }
        self.average_view
    }

    /// Returns whether background subtraction is now enabled. Applies to frames decoded
    /// from now on.
    pub fn toggle_subtracted_view(&mut self) -> bool {
        self.subtracted_view = !self.subtracted_view;
        self.sync_background();
        self.subtracted_view
    }

    /// Uses the last rendered series as background reference
    pub fn set_background_from_current(&mut self) -> Result<&BackgroundReference> {
        if self.current.is_empty() {
            return Err(Error::NoData);
        }
        self.store.set_background(&self.current);
        self.sync_background();
        self.store.background().ok_or(Error::NoData)
    }

    pub fn set_inspection_range(&mut self, min: u32, max: u32) -> Result<()> {
        self.range = InspectionRange::new(min, max)?;
        self.rerender();
        Ok(())
    }

    pub fn set_y_range(&mut self, y_range: YRange) {
        self.y_range = y_range;
        self.rerender();
    }

    pub fn store_current_trace(&mut self) -> Result<&StoredTrace> {
        self.store.store_trace(&self.current, self.range)
    }

    /// Stored traces restricted to the current inspection range
    pub fn stored_traces(&self) -> Vec<StoredTrace> {
        self.store
            .traces()
            .map(|trace| StoredTrace {
                points: trace.points_in(self.range).copied().collect(),
                color: trace.color,
            })
            .collect()
    }

    pub fn clear_stored_traces(&mut self) {
        self.store.clear_traces();
    }

    pub fn background(&self) -> Option<&BackgroundReference> {
        self.store.background()
    }

    /// Statistics of the last rendered series over `range`
    pub fn statistics(&self, range: InspectionRange) -> Statistics {
        Statistics::in_range(&self.current, range)
    }

    pub fn export(&self, scope: ExportScope) -> ExportSnapshot {
        ExportSnapshot::new(
            self.statistics(self.range),
            self.range.filter(&self.current),
            &self.recording,
            scope,
        )
    }

    /// Records at least `frames` frames, or as many as arrive before `timeout`.
    ///
    /// Acquisition is always stopped on return, a failing stop is only logged.
    pub fn capture(&mut self, frames: usize, interval: Duration, timeout: Duration) -> Result<usize> {
        self.start_acquisition()?;
        let mut pipeline = guard(self, |pipeline| {
            if let Err(err) = pipeline.stop_acquisition() {
                log::error!("Could not stop acquisition: {}", err);
            }
        });

        let deadline = Instant::now() + timeout;
        while pipeline.recording.len() < frames && Instant::now() < deadline {
            pipeline.tick();
            pause(interval);
        }

        let captured = pipeline.recording.len();
        // Stop failures are logged by the guard, the recording is kept either way
        drop(pipeline);
        if captured < frames {
            log::warn!("Captured {} of {} frames before timeout", captured, frames);
        }
        Ok(captured)
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AcquisitionState::Running
    }

    pub fn is_average_view(&self) -> bool {
        self.average_view
    }

    pub fn is_subtracted_view(&self) -> bool {
        self.subtracted_view
    }

    pub fn range(&self) -> InspectionRange {
        self.range
    }

    pub fn y_range(&self) -> YRange {
        self.y_range
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    /// Last rendered series, not restricted to the inspection range
    pub fn current(&self) -> &[Sample] {
        &self.current
    }

    pub fn recording(&self) -> &RecordingLog {
        &self.recording
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    /// Unparsed bytes in the accumulator
    pub fn buffered(&self) -> usize {
        self.framed.buffered()
    }

    pub fn session(&self) -> &DeviceSession<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut DeviceSession<T> {
        &mut self.session
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn show(&mut self, series: Vec<Sample>, averaged: bool) {
        let view = View::new(&series, self.range, self.y_range, averaged);
        self.sink.render(&view);
        self.current = series;
        self.current_averaged = averaged;
        self.view = Some(view);
    }

    fn rerender(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let series = std::mem::take(&mut self.current);
        self.show(series, self.current_averaged);
    }

    fn sync_background(&mut self) {
        let background = if self.subtracted_view {
            self.store.background().cloned()
        } else {
            None
        };
        self.framed.codec_mut().set_background(background);
    }
}

fn arm<T: Transport>(link: &mut CommandLink<T>, exposure: u32) -> Result<()> {
    link.set_exposure(exposure)?;
    pause(link.timing().start_delay);
    link.trigger_on()
}
