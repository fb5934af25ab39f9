use clap::Args;
use md_hs_v1::{
    session::{CONTROL_CHANNEL, DATA_CHANNEL, DEFAULT_EXPOSURE},
    DeviceSession, SerialConnector, SerialTransport, SessionConfig,
};
use simple_eyre::{eyre::WrapErr, Result};
use std::time::Duration;

#[derive(Args)]
pub struct DeviceConf {
    /// USB description (or port path) of the control channel
    #[clap(long, value_parser, env = "MD_HS_CONTROL", default_value = CONTROL_CHANNEL)]
    pub control: String,

    /// USB description (or port path) of the frame data channel
    #[clap(long, value_parser, env = "MD_HS_DATA", default_value = DATA_CHANNEL)]
    pub data: String,

    /// Exposure time in microseconds applied during setup
    #[clap(short, long, value_parser, env = "MD_HS_EXPOSURE", default_value_t = DEFAULT_EXPOSURE)]
    pub exposure: u32,

    /// Serial read timeout in milliseconds
    #[clap(long, value_parser, default_value_t = 100)]
    pub timeout: u64,
}

pub type SerialSession = DeviceSession<SerialTransport>;

impl DeviceConf {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            control: self.control.clone(),
            data: self.data.clone(),
            exposure: self.exposure,
            read_timeout: Duration::from_millis(self.timeout),
            ..SessionConfig::default()
        }
    }

    pub fn open_session(&self) -> Result<SerialSession> {
        let config = self.session_config();
        let mut connector = SerialConnector {
            timeout: config.read_timeout,
        };
        DeviceSession::open(&mut connector, &config)
            .wrap_err_with(|| format!("Could not set up \"{}\" / \"{}\"", config.control, config.data))
    }
}
