//! Driver for the MD_HS_V1 spectrometer head.
//!
//! The head shows up as two serial channels: a slow control channel taking 4 byte
//! commands answered by a single acknowledgment byte, and a data channel streaming
//! 2088 byte frames of big-endian pixel intensities.

pub mod codec;
pub mod command;
pub mod error;
pub mod export;
pub mod frame;
pub mod history;
pub mod link;
pub mod pipeline;
pub mod session;
pub mod stats;
pub mod store;
pub mod transport;

pub use command::Command;
pub use error::{Error, Result};
pub use export::{ExportScope, ExportSnapshot};
pub use frame::{DecodedFrame, Frame, Sample};
pub use link::{CommandLink, LinkTiming};
pub use pipeline::{AcquisitionPipeline, FrameSink, View};
pub use session::{DeviceSession, SessionConfig};
pub use stats::{InspectionRange, Statistics, YRange};
pub use transport::{Connector, Purge, Transport};

#[cfg(feature = "serial")]
pub use transport::{SerialConnector, SerialTransport};
