use crate::{
    error::{Error, Result},
    link::{CommandLink, LinkTiming},
    transport::{Connector, Transport},
};
use std::time::Duration;

pub const CONTROL_CHANNEL: &str = "MD_HS_V1 A";
pub const DATA_CHANNEL: &str = "MD_HS_V1 B";
pub const CONTROL_BAUD_RATE: u32 = 9600;
/// Microseconds
pub const DEFAULT_EXPOSURE: u32 = 10_000;

/// How to reach and prepare the spectrometer head
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct SessionConfig {
    /// USB description of the control (UART) channel
    pub control: String,
    /// USB description of the frame data channel
    pub data: String,
    pub baud_rate: u32,
    pub exposure: u32,
    pub read_timeout: Duration,
    pub timing: LinkTiming,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            control: CONTROL_CHANNEL.to_string(),
            data: DATA_CHANNEL.to_string(),
            baud_rate: CONTROL_BAUD_RATE,
            exposure: DEFAULT_EXPOSURE,
            read_timeout: Duration::from_millis(100),
            timing: LinkTiming::default(),
        }
    }
}

/// Both open channels of the head
pub struct Channels<T> {
    pub link: CommandLink<T>,
    pub data: T,
}

/// Owner of the device handles. Either both channels are open or none is.
pub struct DeviceSession<T> {
    channels: Option<Channels<T>>,
    exposure: u32,
}

impl<T: Transport> DeviceSession<T> {
    /// Wraps already opened channels without touching the device
    pub fn new(control: T, data: T, timing: LinkTiming, exposure: u32) -> Self {
        DeviceSession {
            channels: Some(Channels {
                link: CommandLink::new(control, timing),
                data,
            }),
            exposure,
        }
    }

    /// Session without a device, every device operation fails with [`Error::NotInitialized`]
    pub fn disconnected(exposure: u32) -> Self {
        DeviceSession {
            channels: None,
            exposure,
        }
    }

    /// Opens both channels, configures the control channel, disarms the trigger and
    /// applies the configured exposure. Nothing stays open on failure.
    pub fn open<C>(connector: &mut C, config: &SessionConfig) -> Result<Self>
    where
        C: Connector<Transport = T>,
    {
        let mut control = open_channel(connector, &config.control)?;
        let data = open_channel(connector, &config.data)?;

        control
            .set_baud_rate(config.baud_rate)
            .map_err(|err| Error::DeviceConfigFailed(format!("set baud rate: {err}")))?;
        control
            .reset()
            .map_err(|err| Error::DeviceConfigFailed(format!("reset: {err}")))?;

        let mut link = CommandLink::new(control, config.timing);
        link.trigger_off()?;
        link.set_exposure(config.exposure)?;
        log::info!(
            "Device setup complete, exposure {} us",
            config.exposure
        );

        Ok(DeviceSession {
            channels: Some(Channels { link, data }),
            exposure: config.exposure,
        })
    }

    pub fn is_open(&self) -> bool {
        self.channels.is_some()
    }

    pub fn channels(&mut self) -> Result<&mut Channels<T>> {
        self.channels.as_mut().ok_or(Error::NotInitialized)
    }

    pub fn link(&mut self) -> Result<&mut CommandLink<T>> {
        Ok(&mut self.channels()?.link)
    }

    pub fn data(&mut self) -> Result<&mut T> {
        Ok(&mut self.channels()?.data)
    }

    /// Exposure applied on the next acquisition start
    pub fn exposure(&self) -> u32 {
        self.exposure
    }

    /// Sends the exposure to the device and keeps it on success
    pub fn set_exposure(&mut self, exposure: u32) -> Result<()> {
        self.link()?.set_exposure(exposure)?;
        self.exposure = exposure;
        Ok(())
    }

    /// Drops both handles
    pub fn close(&mut self) {
        if self.channels.take().is_some() {
            log::info!("Device channels closed");
        }
    }
}

fn open_channel<C: Connector>(connector: &mut C, name: &str) -> Result<C::Transport> {
    connector.open(name).map_err(|err| match err {
        Error::DeviceOpenFailed { .. } => err,
        other => Error::DeviceOpenFailed {
            name: name.to_string(),
            reason: other.to_string(),
        },
    })
}
