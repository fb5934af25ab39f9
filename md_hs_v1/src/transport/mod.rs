#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "serial")]
pub use serial::{SerialConnector, SerialTransport};

use crate::error::Result;

/// Device queues dropped by [`Transport::purge`]
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Purge {
    Rx,
    Tx,
    All,
}

/// Byte level handle to one channel of the spectrometer head.
///
/// Closing the handle is tied to `Drop`.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn set_baud_rate(&mut self, baud: u32) -> Result<()>;
    fn reset(&mut self) -> Result<()>;
    fn purge(&mut self, queues: Purge) -> Result<()>;
    /// Blocking write, returns amount of bytes accepted by the device
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
    /// Amount of bytes that can be read without blocking
    fn queued_bytes(&mut self) -> Result<usize>;
    /// Blocking read of up to `buf.len()` bytes, 0 means the read timed out
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Opens transports by descriptive device name, e.g. "MD_HS_V1 A"
pub trait Connector {
    type Transport: Transport;

    fn open(&mut self, name: &str) -> Result<Self::Transport>;
}
