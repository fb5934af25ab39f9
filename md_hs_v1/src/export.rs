use crate::{
    frame::{Frame, Sample},
    history::RecordingLog,
    stats::Statistics,
};
use serde::Serialize;

/// Which recorded frames go into an export
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ExportScope {
    AllFrames,
    LastFrame,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordedFrames {
    AllRecordedFrames(Vec<Frame>),
    LastRecordedFrame(Frame),
}

/// Everything handed to a file writer
#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub statistics: Statistics,
    pub current_series_data: Vec<Sample>,
    /// Absent when nothing was recorded
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub recorded: Option<RecordedFrames>,
    /// Recording index of the first exported frame
    #[serde(skip)]
    pub first_frame: usize,
}

/// One line of the frame table
#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
pub struct FrameRow {
    pub frame: usize,
    pub pixel: u32,
    pub intensity: f64,
}

impl ExportSnapshot {
    pub fn new(
        statistics: Statistics,
        current: Vec<Sample>,
        recording: &RecordingLog,
        scope: ExportScope,
    ) -> Self {
        let (recorded, first_frame) = match (scope, recording.last()) {
            (_, None) => (None, 0),
            (ExportScope::AllFrames, Some(_)) => (
                Some(RecordedFrames::AllRecordedFrames(recording.frames().to_vec())),
                0,
            ),
            (ExportScope::LastFrame, Some(last)) => (
                Some(RecordedFrames::LastRecordedFrame(last.clone())),
                recording.len() - 1,
            ),
        };
        ExportSnapshot {
            statistics,
            current_series_data: current,
            recorded,
            first_frame,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        match &self.recorded {
            None => &[],
            Some(RecordedFrames::AllRecordedFrames(frames)) => frames,
            Some(RecordedFrames::LastRecordedFrame(frame)) => std::slice::from_ref(frame),
        }
    }

    /// Recorded frames flattened into `(frame, pixel, intensity)` rows
    pub fn rows(&self) -> impl Iterator<Item = FrameRow> + '_ {
        self.frames().iter().enumerate().flat_map(move |(idx, frame)| {
            frame.iter().map(move |s| FrameRow {
                frame: self.first_frame + idx,
                pixel: s.pixel,
                intensity: s.intensity,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn recording() -> RecordingLog {
        let mut log = RecordingLog::new();
        log.start();
        log.push([Sample::new(0, 1.0), Sample::new(1, 2.0)].into_iter().collect());
        log.push([Sample::new(0, 3.0), Sample::new(1, 4.0)].into_iter().collect());
        log
    }

    #[test]
    fn json_layout() {
        let snapshot = ExportSnapshot::new(
            Statistics::default(),
            vec![Sample::new(0, 3.0)],
            &recording(),
            ExportScope::LastFrame,
        );
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            value,
            json!({
                "statistics": {"mean": 0.0, "median": 0.0, "variance": 0.0, "standardDeviation": 0.0},
                "currentSeriesData": [{"pixel": 0, "intensity": 3.0}],
                "lastRecordedFrame": [{"pixel": 0, "intensity": 3.0}, {"pixel": 1, "intensity": 4.0}],
            })
        );
    }

    #[test]
    fn no_recording_no_frames() {
        let snapshot = ExportSnapshot::new(
            Statistics::default(),
            Vec::new(),
            &RecordingLog::new(),
            ExportScope::AllFrames,
        );
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("allRecordedFrames").is_none());
        assert_eq!(snapshot.rows().count(), 0);
    }

    #[test]
    fn rows_keep_recording_index() {
        let all = ExportSnapshot::new(
            Statistics::default(),
            Vec::new(),
            &recording(),
            ExportScope::AllFrames,
        );
        let frames: Vec<usize> = all.rows().map(|r| r.frame).collect();
        assert_eq!(frames, vec![0, 0, 1, 1]);

        let last = ExportSnapshot::new(
            Statistics::default(),
            Vec::new(),
            &recording(),
            ExportScope::LastFrame,
        );
        let rows: Vec<FrameRow> = last.rows().collect();
        assert_eq!(
            rows,
            vec![
                FrameRow { frame: 1, pixel: 0, intensity: 3.0 },
                FrameRow { frame: 1, pixel: 1, intensity: 4.0 },
            ]
        );
    }
}
