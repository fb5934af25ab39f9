use crate::{output::Output, serial::DeviceConf};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lists connected serial devices
    List,
    /// Arm or disarm the hardware trigger
    Trigger(TriggerCommand),
    /// Exposure time related commands
    Exposure(ExposureCommand),
    /// Get readings from spectrometer
    Read(ReadCommand),
    /// Print live readings to the terminal
    Stream(StreamConf),
}

#[derive(Args)]
pub struct TriggerCommand {
    #[clap(value_enum)]
    pub state: TriggerState,

    #[clap(flatten)]
    pub device: DeviceConf,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
pub enum TriggerState {
    On,
    Off,
}

#[derive(Args)]
pub struct ExposureCommand {
    #[clap(subcommand)]
    pub command: ExposureCommands,
}

#[derive(Subcommand)]
pub enum ExposureCommands {
    /// Set exposure time
    Set(SetExposureConf),
}

#[derive(Args)]
pub struct SetExposureConf {
    /// New exposure time in microseconds
    #[clap(value_parser)]
    pub exposure_time: u32,

    #[clap(flatten)]
    pub device: DeviceConf,
}

#[derive(Args)]
pub struct ReadCommand {
    #[clap(subcommand)]
    pub command: ReadCommands,
}

#[derive(Subcommand)]
pub enum ReadCommands {
    /// Get a single frame
    Single(SingleReadingConf),
    /// Get multiple frames
    Multi(MultiReadingConf),
}

/// Processing applied to the rendered series
#[derive(Args)]
pub struct ViewConf {
    /// Render the average of the last frames instead of the newest one
    #[clap(long)]
    pub average: bool,

    /// Capture one frame first and subtract it from every following frame
    #[clap(long)]
    pub subtract: bool,

    /// First pixel of the inspection range
    #[clap(long, value_parser, requires = "max-pixel")]
    pub min_pixel: Option<u32>,

    /// Last pixel of the inspection range
    #[clap(long, value_parser, requires = "min-pixel")]
    pub max_pixel: Option<u32>,

    /// Seconds to wait for frames before giving up
    #[clap(long, value_parser, default_value_t = 10)]
    pub capture_timeout: u64,
}

impl ViewConf {
    pub fn range(&self) -> Option<(u32, u32)> {
        self.min_pixel.zip(self.max_pixel)
    }
}

#[derive(Args)]
pub struct SingleReadingConf {
    #[clap(flatten)]
    pub output: Output,

    #[clap(flatten)]
    pub view: ViewConf,

    #[clap(flatten)]
    pub device: DeviceConf,
}

#[derive(Args)]
pub struct MultiReadingConf {
    /// Amount of frames captured
    #[clap(value_parser, default_value = "50")]
    pub count: usize,

    #[clap(flatten)]
    pub output: Output,

    #[clap(flatten)]
    pub view: ViewConf,

    #[clap(flatten)]
    pub device: DeviceConf,
}

#[derive(Args)]
pub struct StreamConf {
    /// How long to stream for, in seconds
    #[clap(short, long, value_parser, default_value_t = 10)]
    pub duration: u64,

    #[clap(flatten)]
    pub view: ViewConf,

    #[clap(flatten)]
    pub device: DeviceConf,
}
