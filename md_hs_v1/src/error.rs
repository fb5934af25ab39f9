use crate::command::Command;
use core::result::Result as CoreResult;
use thiserror::Error;

pub type Result<T> = CoreResult<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not open device \"{name}\": {reason}")]
    DeviceOpenFailed { name: String, reason: String },
    #[error("Could not configure device: {0}")]
    DeviceConfigFailed(String),
    #[error("Could not write {0} command to the control channel")]
    CommandWriteFailed(Command),
    #[error("Could not read acknowledgment for {0} command")]
    CommandReadFailed(Command),
    #[error("{command} was not acknowledged after {attempts} attempts")]
    AcknowledgmentTimeout { command: Command, attempts: usize },
    #[error("Device channels are not initialized, check the connection")]
    NotInitialized,
    /// Non-fatal, reported when unparsed bytes are dropped to bound memory
    #[error("Accumulator overflowed, discarded {discarded} unparsed bytes")]
    BufferOverflowRecovered { discarded: usize },
    #[error("Min range ({min}) must be less than max range ({max})")]
    InvalidRange { min: u32, max: u32 },
    #[error("No data to store")]
    NoData,
    #[error("Could not parse received data correctly")]
    InvalidData,

    #[error("{0}")]
    IOError(#[from] std::io::Error),
    #[cfg(feature = "serial")]
    #[error("{0}")]
    Serial(#[from] serialport::Error),
}
