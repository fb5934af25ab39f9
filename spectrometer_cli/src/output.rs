use clap::{Args, ValueEnum};
use md_hs_v1::{
    export::{ExportSnapshot, RecordedFrames},
    frame::SATURATION_LEVEL,
    pipeline::View,
    Sample,
};
use plotters::prelude::*;
use simple_eyre::{eyre::eyre, Result};
use std::{
    fmt::{self, Write as _},
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

#[derive(Args)]
pub struct Output {
    /// Path to a file where readings should be stored
    #[clap(short, long, value_parser = unique_path_parser, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// File format for reading output
    #[clap(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

fn unique_path_parser(p: &str) -> Result<PathBuf> {
    let p = Path::new(p);
    if p.try_exists()? {
        Err(eyre!("Path {p:?} already exists"))
    } else {
        Ok(p.to_path_buf())
    }
}

#[derive(ValueEnum, Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    /// PNG for a single frame, animated GIF for multiple frames
    #[default]
    Chart,
    Csv,
    Json,
}

fn snapshot_to_csv(snapshot: &ExportSnapshot) -> std::result::Result<String, fmt::Error> {
    log::trace!("Formatting snapshot as CSV");
    let stats = &snapshot.statistics;
    let mut out = String::new();
    writeln!(out, "Statistics:")?;
    writeln!(out, "Mean,{}", stats.mean)?;
    writeln!(out, "Median,{}", stats.median)?;
    writeln!(out, "Variance,{}", stats.variance)?;
    writeln!(out, "Standard Deviation,{}", stats.std_dev)?;

    writeln!(out, "\nCurrent Series Data:\nPixel,Intensity")?;
    for sample in &snapshot.current_series_data {
        writeln!(out, "{},{}", sample.pixel, sample.intensity)?;
    }

    match &snapshot.recorded {
        None => {}
        Some(RecordedFrames::AllRecordedFrames(_)) => {
            writeln!(out, "\nAll Recorded Frames:\nFrame,Pixel,Intensity")?;
            for row in snapshot.rows() {
                writeln!(out, "{},{},{}", row.frame, row.pixel, row.intensity)?;
            }
        }
        Some(RecordedFrames::LastRecordedFrame(frame)) => {
            writeln!(out, "\nLast Recorded Frame:\nPixel,Intensity")?;
            for sample in frame.iter() {
                writeln!(out, "{},{}", sample.pixel, sample.intensity)?;
            }
        }
    }
    Ok(out)
}

struct ChartData<'a> {
    points: &'a [Sample],
    y_range: (f64, f64),
    idx: usize,
    timestamp: OffsetDateTime,
}

impl<'a> ChartData<'a> {
    /// Y axis covers the full sensor range, negative values only show up after subtraction
    fn full_scale(points: &'a [Sample], idx: usize, timestamp: OffsetDateTime) -> Self {
        let lowest = points.iter().map(|s| s.intensity).fold(0.0, f64::min);
        ChartData {
            points,
            y_range: (lowest, f64::from(SATURATION_LEVEL)),
            idx,
            timestamp,
        }
    }
}

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

fn draw_points<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    data: ChartData<'_>,
    peak: Option<(u32, f64)>,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let first = data.points.first().map_or(0, |s| s.pixel);
    let last = data.points.last().map_or(1, |s| s.pixel.max(first + 1));
    // Flat series have an empty auto range
    let (low, mut high) = data.y_range;
    if high <= low {
        high = low + 1.0;
    }

    log::trace!("Drawing chart axes");
    let mut chart = ChartBuilder::on(root)
        .caption(
            format!(
                "Frame #{} taken at {}",
                data.idx,
                data.timestamp.format(TIMESTAMP_FORMAT)?
            ),
            ("sans-serif", (5).percent()),
        )
        .set_label_area_size(LabelAreaPosition::Left, (8).percent())
        .set_label_area_size(LabelAreaPosition::Bottom, (5).percent())
        .build_cartesian_2d(f64::from(first)..f64::from(last), low..high)?;

    chart
        .configure_mesh()
        .x_desc("Pixel #")
        .y_desc("Intensity")
        .draw()?;

    log::trace!("Drawing {} points as a line chart", data.points.len());
    chart.draw_series(LineSeries::new(
        data.points
            .iter()
            .map(|s| (f64::from(s.pixel), s.intensity)),
        BLACK,
    ))?;

    if let Some((pixel, intensity)) = peak {
        chart.draw_series(std::iter::once(Circle::new(
            (f64::from(pixel), intensity),
            4,
            RED.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

impl Output {
    /// Stores the rendered view of a single reading
    pub fn write_view(&self, view: &View, snapshot: &ExportSnapshot) -> Result<()> {
        log::debug!("Saving reading to {:?}", self.output);
        match self.format {
            OutputFormat::Chart => {
                let root =
                    BitMapBackend::new(self.output.as_path(), (1280, 720)).into_drawing_area();
                let mut data = ChartData::full_scale(&view.points, 1, OffsetDateTime::now_local()?);
                if let Some(range) = view.y_range {
                    data.y_range = (range.min, range.max);
                }
                draw_points(&root, data, view.peak.map(|p| (p.pixel, p.intensity)))?;
            }
            OutputFormat::Csv | OutputFormat::Json => self.write_snapshot(snapshot)?,
        };
        Ok(())
    }

    /// Stores every recorded frame
    pub fn write_frames(&self, snapshot: &ExportSnapshot) -> Result<()> {
        log::debug!("Saving {} frames to {:?}", snapshot.frames().len(), self.output);
        match self.format {
            OutputFormat::Chart => {
                let root = BitMapBackend::gif(self.output.as_path(), (1280, 720), 500)?
                    .into_drawing_area();
                let timestamp = OffsetDateTime::now_local()?;
                for (frame_idx, frame) in snapshot.frames().iter().enumerate() {
                    let peak = md_hs_v1::stats::find_peak(frame).map(|p| (p.pixel, p.intensity));
                    draw_points(
                        &root,
                        ChartData::full_scale(frame, snapshot.first_frame + frame_idx + 1, timestamp),
                        peak,
                    )?;
                }
            }
            OutputFormat::Csv | OutputFormat::Json => self.write_snapshot(snapshot)?,
        };
        Ok(())
    }

    fn write_snapshot(&self, snapshot: &ExportSnapshot) -> Result<()> {
        let data = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(snapshot)?,
            _ => snapshot_to_csv(snapshot)?,
        };
        let mut out = File::create(self.output.as_path())?;
        out.write_all(data.as_bytes())?;
        Ok(())
    }
}
