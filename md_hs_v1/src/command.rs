use core::fmt::{self, Display};

/// Opcodes understood by the control channel firmware
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Opcode {
    TriggerOn = 0x02,
    TriggerOff = 0x03,
}

/// Package that can be sent over the control channel
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Command {
    TriggerOn,
    TriggerOff,
    SetExposure(u32),
}

impl Command {
    /// Every package is a single 4 byte word
    pub fn encode(&self) -> [u8; 4] {
        use Command::*;
        match *self {
            TriggerOn => [Opcode::TriggerOn as u8, 0x00, 0x00, 0x00],
            TriggerOff => [Opcode::TriggerOff as u8, 0x00, 0x00, 0x00],
            // Firmware takes the raw exposure word in host (little-endian) order
            SetExposure(t) => t.to_le_bytes(),
        }
    }

    /// Checks whether a response byte acknowledges this command
    pub fn is_acknowledged_by(&self, ack: u8) -> bool {
        use Command::*;
        match self {
            SetExposure(_) => ack == b'A',
            TriggerOn => ack == b't',
            // Trigger-off answers have been seen in both cases; 0x74 is 't'
            TriggerOff => matches!(ack, b't' | b'T'),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::TriggerOn => f.write_str("trigger-on"),
            Command::TriggerOff => f.write_str("trigger-off"),
            Command::SetExposure(t) => write!(f, "set-exposure({t})"),
        }
    }
}
