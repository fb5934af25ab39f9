mod cli;
mod output;
mod serial;

use clap::Parser;
use md_hs_v1::{
    pipeline::TICK_INTERVAL, AcquisitionPipeline, ExportScope, FrameSink, Transport, View,
};
use serialport::SerialPortType;
use simple_eyre::{eyre::eyre, Result};
use std::{
    io::Write,
    thread,
    time::{Duration, Instant},
};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use cli::*;
use output::Output;
use serial::DeviceConf;

fn main() -> Result<()> {
    simple_eyre::install()?;
    let cli = Cli::parse();
    env_logger::init();

    match &cli.command {
        Commands::List => list_serial(),
        Commands::Trigger(conf) => set_trigger(conf),
        Commands::Exposure(subcomm) => match &subcomm.command {
            ExposureCommands::Set(conf) => set_exposure(conf),
        },
        Commands::Read(subcomm) => match &subcomm.command {
            ReadCommands::Single(conf) => get_single_reading(conf),
            ReadCommands::Multi(conf) => get_multi_reading(conf),
        },
        Commands::Stream(conf) => stream(conf),
    }
}

/// Returns std::io::Write stream with coloring enabled if program is run interactively
fn get_stdout() -> StandardStream {
    StandardStream::stdout(if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    })
}

fn list_serial() -> Result<()> {
    let mut stdout = get_stdout();
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        writeln!(&mut stdout, "No connected serial ports found.")?;
    } else {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(&mut stdout, "Connected serial ports:")?;
    }
    stdout.reset()?;
    for port in ports {
        match port.port_type {
            SerialPortType::UsbPort(info) => println!(
                "{} ({})",
                port.port_name,
                info.product.as_deref().unwrap_or("unknown USB device")
            ),
            _ => println!("{}", port.port_name),
        }
    }

    Ok(())
}

fn set_trigger(conf: &TriggerCommand) -> Result<()> {
    let mut session = conf.device.open_session()?;
    let link = session.link()?;
    match conf.state {
        TriggerState::On => link.trigger_on()?,
        TriggerState::Off => link.trigger_off()?,
    }
    Ok(())
}

fn set_exposure(conf: &SetExposureConf) -> Result<()> {
    let mut session = conf.device.open_session()?;
    session.set_exposure(conf.exposure_time)?;
    println!("Exposure time set to {} us", session.exposure());
    Ok(())
}

/// Counts saturated frames of a capture
#[derive(Default)]
struct ReadSink {
    rendered: usize,
    saturated: usize,
}

impl FrameSink for ReadSink {
    fn render(&mut self, _view: &View) {
        self.rendered += 1;
    }

    fn saturation(&mut self, saturated: bool) {
        if saturated {
            self.saturated += 1;
        }
    }
}

/// Prints a line per rendered view, prefixed with a saturation indicator
struct TerminalSink {
    out: StandardStream,
    saturated: bool,
}

impl TerminalSink {
    fn new() -> Self {
        TerminalSink {
            out: get_stdout(),
            saturated: false,
        }
    }

    fn print(&mut self, view: &View) -> std::io::Result<()> {
        let (color, label) = if self.saturated {
            (Color::Red, "SAT")
        } else {
            (Color::Green, " OK")
        };
        self.out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(&mut self.out, "[{label}]")?;
        self.out.reset()?;

        match view.peak {
            Some(peak) => write!(
                &mut self.out,
                " peak {:>6.0} @ {:>4}",
                peak.intensity, peak.pixel
            )?,
            None => write!(&mut self.out, " no data")?,
        }
        let stats = &view.statistics;
        writeln!(
            &mut self.out,
            " p-p {:>6.0} mean {:>8.1} median {:>8.1} sd {:>8.1}{}",
            view.peak_to_peak.unwrap_or_default(),
            stats.mean,
            stats.median,
            stats.std_dev,
            if view.averaged { " (avg)" } else { "" }
        )
    }
}

impl FrameSink for TerminalSink {
    fn render(&mut self, view: &View) {
        if let Err(err) = self.print(view) {
            log::warn!("Could not print reading: {}", err);
        }
    }

    fn saturation(&mut self, saturated: bool) {
        self.saturated = saturated;
    }
}

/// Applies view options, capturing a background first when subtraction is requested
fn prepare_view<T: Transport, S: FrameSink>(
    pipeline: &mut AcquisitionPipeline<T, S>,
    conf: &ViewConf,
) -> Result<()> {
    if let Some((min, max)) = conf.range() {
        pipeline.set_inspection_range(min, max)?;
    }
    if conf.subtract {
        log::info!("Capturing background frame");
        let captured = pipeline.capture(1, TICK_INTERVAL, capture_timeout(conf))?;
        if captured == 0 {
            return Err(eyre!("No frame received for the background reference"));
        }
        pipeline.set_background_from_current()?;
        pipeline.toggle_subtracted_view();
    }
    if conf.average {
        pipeline.toggle_average_view();
    }
    Ok(())
}

fn capture_timeout(conf: &ViewConf) -> Duration {
    Duration::from_secs(conf.capture_timeout)
}

fn capture(
    device: &DeviceConf,
    view: &ViewConf,
    count: usize,
) -> Result<AcquisitionPipeline<md_hs_v1::SerialTransport, ReadSink>> {
    let session = device.open_session()?;
    let mut pipeline = AcquisitionPipeline::new(session, ReadSink::default());
    prepare_view(&mut pipeline, view)?;

    let captured = pipeline.capture(count, TICK_INTERVAL, capture_timeout(view))?;
    if captured == 0 {
        return Err(eyre!("No frames received from the data channel"));
    }
    let sink = pipeline.sink();
    if sink.saturated > 0 {
        let mut stdout = get_stdout();
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        writeln!(
            &mut stdout,
            "{} of {} rendered frames were saturated, consider a shorter exposure",
            sink.saturated, sink.rendered
        )?;
        stdout.reset()?;
    }
    Ok(pipeline)
}

fn get_single_reading(conf: &SingleReadingConf) -> Result<()> {
    let pipeline = capture(&conf.device, &conf.view, 1)?;
    let view = pipeline
        .view()
        .ok_or_else(|| eyre!("No frame was rendered"))?;
    write_view(&conf.output, view, &pipeline.export(ExportScope::LastFrame))
}

fn write_view(output: &Output, view: &View, snapshot: &md_hs_v1::ExportSnapshot) -> Result<()> {
    output.write_view(view, snapshot)?;
    println!("Reading saved to {:?}", output.output);
    Ok(())
}

fn get_multi_reading(conf: &MultiReadingConf) -> Result<()> {
    let pipeline = capture(&conf.device, &conf.view, conf.count)?;
    let snapshot = pipeline.export(ExportScope::AllFrames);
    conf.output.write_frames(&snapshot)?;
    println!(
        "{} frames saved to {:?}",
        snapshot.frames().len(),
        conf.output.output
    );
    Ok(())
}

fn stream(conf: &StreamConf) -> Result<()> {
    let session = conf.device.open_session()?;
    let mut pipeline = AcquisitionPipeline::new(session, TerminalSink::new());
    prepare_view(&mut pipeline, &conf.view)?;

    let report = pipeline.start_acquisition()?;
    if let Some(warning) = report.purge_warning {
        log::warn!("Data may be inconsistent: {}", warning);
    }

    let deadline = Instant::now() + Duration::from_secs(conf.duration);
    let mut frames = 0;
    while Instant::now() < deadline {
        frames += pipeline.tick().frames;
        thread::sleep(TICK_INTERVAL);
    }
    pipeline.stop_acquisition()?;
    log::info!("Streamed {} frames", frames);
    Ok(())
}
