use super::{Connector, Purge, Transport};
use crate::error::{Error, Result};
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use std::{
    io::{self, Read, Write},
    time::Duration,
};

/// Baud rate used until the session configures the channel
const OPEN_BAUD_RATE: u32 = 9600;

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    baud: u32,
}

impl SerialTransport {
    pub fn open(name: &str, timeout: Duration) -> Result<Self> {
        let path = resolve_port(name);
        let port = serialport::new(&path, OPEN_BAUD_RATE)
            .timeout(timeout)
            .open()
            .map_err(|err| Error::DeviceOpenFailed {
                name: name.to_string(),
                reason: err.to_string(),
            })?;
        log::debug!("Opened \"{}\" on {}", name, path);
        Ok(SerialTransport {
            port,
            baud: OPEN_BAUD_RATE,
        })
    }
}

/// Maps a USB product description onto the port carrying it. Names that match no
/// enumerated port are used as a path as is.
fn resolve_port(name: &str) -> String {
    let ports = serialport::available_ports().unwrap_or_else(|err| {
        log::debug!("Could not enumerate serial ports: {}", err);
        Vec::new()
    });
    ports
        .into_iter()
        .find(|p| match &p.port_type {
            SerialPortType::UsbPort(info) => info.product.as_deref() == Some(name),
            _ => false,
        })
        .map(|p| p.port_name)
        .unwrap_or_else(|| name.to_string())
}

impl Transport for SerialTransport {
    fn set_baud_rate(&mut self, baud: u32) -> Result<()> {
        self.port.set_baud_rate(baud)?;
        self.baud = baud;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::All)?;
        self.port.set_baud_rate(self.baud)?;
        Ok(())
    }

    fn purge(&mut self, queues: Purge) -> Result<()> {
        let buffer = match queues {
            Purge::Rx => ClearBuffer::Input,
            Purge::Tx => ClearBuffer::Output,
            Purge::All => ClearBuffer::All,
        };
        self.port.clear(buffer)?;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let count = self.port.write(buf)?;
        self.port.flush()?;
        Ok(count)
    }

    fn queued_bytes(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(count) => Ok(count),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(err) => Err(err.into()),
        }
    }
}

/// Opens both channels of the head as serial ports
#[derive(Debug, Clone, Copy)]
pub struct SerialConnector {
    pub timeout: Duration,
}

impl Default for SerialConnector {
    fn default() -> Self {
        SerialConnector {
            timeout: Duration::from_millis(100),
        }
    }
}

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    fn open(&mut self, name: &str) -> Result<SerialTransport> {
        SerialTransport::open(name, self.timeout)
    }
}
