use crate::{
    command::Command,
    error::{Error, Result},
    transport::{Purge, Transport},
};
use std::{thread, time::Duration};

/// Delays of the control channel handshakes
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct LinkTiming {
    /// Attempts per command before giving up
    pub attempts: usize,
    /// Pause before every trigger-on and set-exposure attempt
    pub settle: Duration,
    /// Pause before every trigger-off retry
    pub retry_backoff: Duration,
    /// Pause between writing trigger-off and reading its acknowledgment
    pub response_delay: Duration,
    /// Pause between setting exposure and arming the trigger on acquisition start
    pub start_delay: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        LinkTiming {
            attempts: 5,
            settle: Duration::from_millis(50),
            retry_backoff: Duration::from_millis(50),
            response_delay: Duration::from_millis(20),
            start_delay: Duration::from_millis(100),
        }
    }
}

impl LinkTiming {
    /// Same attempt count, no pauses
    pub fn without_delays() -> Self {
        LinkTiming {
            settle: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            response_delay: Duration::ZERO,
            start_delay: Duration::ZERO,
            ..LinkTiming::default()
        }
    }
}

pub(crate) fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

enum Attempt {
    Accepted,
    Rejected(u8),
    WriteFailed,
    ReadFailed,
}

/// Request/acknowledge protocol on the control channel
pub struct CommandLink<T> {
    io: T,
    timing: LinkTiming,
}

impl<T: Transport> CommandLink<T> {
    pub fn new(io: T, timing: LinkTiming) -> Self {
        CommandLink { io, timing }
    }

    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }

    /// Sends the exposure time in microseconds, expects `A` back
    pub fn set_exposure(&mut self, exposure: u32) -> Result<()> {
        self.settled_handshake(Command::SetExposure(exposure))
    }

    pub fn trigger_on(&mut self) -> Result<()> {
        self.settled_handshake(Command::TriggerOn)
    }

    /// Purges the channel before every attempt. I/O errors are only reported when they
    /// happen on the last attempt.
    pub fn trigger_off(&mut self) -> Result<()> {
        let command = Command::TriggerOff;
        let attempts = self.timing.attempts;
        for attempt in 1..=attempts {
            if attempt > 1 {
                log::debug!("Retrying {}, attempt {}", command, attempt);
                pause(self.timing.retry_backoff);
            }
            if let Err(err) = self.io.purge(Purge::All) {
                log::debug!("Could not purge control channel: {}", err);
            }

            let last = attempt == attempts;
            match self.exchange(command, self.timing.response_delay) {
                Attempt::Accepted => {
                    log::debug!("{} acknowledged", command);
                    return Ok(());
                }
                Attempt::WriteFailed if last => return Err(Error::CommandWriteFailed(command)),
                Attempt::ReadFailed if last => return Err(Error::CommandReadFailed(command)),
                Attempt::Rejected(ack) => {
                    log::debug!("{} got unexpected response 0x{:02X}", command, ack)
                }
                Attempt::WriteFailed | Attempt::ReadFailed => {}
            }
        }
        log::warn!("{} not acknowledged after {} attempts", command, attempts);
        Err(Error::AcknowledgmentTimeout { command, attempts })
    }

    fn settled_handshake(&mut self, command: Command) -> Result<()> {
        let attempts = self.timing.attempts;
        for attempt in 1..=attempts {
            if attempt > 1 {
                log::debug!("Retrying {}, attempt {}", command, attempt);
            }
            pause(self.timing.settle);
            match self.exchange(command, Duration::ZERO) {
                Attempt::Accepted => {
                    log::debug!("{} acknowledged", command);
                    return Ok(());
                }
                Attempt::Rejected(ack) => {
                    log::debug!("{} got unexpected response 0x{:02X}", command, ack)
                }
                Attempt::WriteFailed | Attempt::ReadFailed => {}
            }
        }
        log::warn!("{} not acknowledged after {} attempts", command, attempts);
        Err(Error::AcknowledgmentTimeout { command, attempts })
    }

    fn exchange(&mut self, command: Command, response_delay: Duration) -> Attempt {
        let package = command.encode();
        match self.io.write(&package) {
            Ok(written) if written == package.len() => {}
            Ok(written) => {
                log::debug!("{}: short write of {} bytes", command, written);
                return Attempt::WriteFailed;
            }
            Err(err) => {
                log::debug!("{}: write failed: {}", command, err);
                return Attempt::WriteFailed;
            }
        }

        pause(response_delay);

        let mut ack = [0u8; 1];
        match self.io.read(&mut ack) {
            Ok(1) => {}
            Ok(_) => {
                log::debug!("{}: no response", command);
                return Attempt::ReadFailed;
            }
            Err(err) => {
                log::debug!("{}: read failed: {}", command, err);
                return Attempt::ReadFailed;
            }
        }

        if command.is_acknowledged_by(ack[0]) {
            Attempt::Accepted
        } else {
            Attempt::Rejected(ack[0])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use claims::*;
    use mockall::predicate::eq;

    fn broken_pipe() -> Error {
        std::io::Error::from(std::io::ErrorKind::BrokenPipe).into()
    }

    fn link(io: MockTransport) -> CommandLink<MockTransport> {
        CommandLink::new(io, LinkTiming::without_delays())
    }

    fn respond_with(io: &mut MockTransport, ack: u8) {
        io.expect_read().returning(move |buf| {
            buf[0] = ack;
            Ok(1)
        });
    }

    #[test]
    fn exposure_is_acknowledged() {
        let mut io = MockTransport::new();
        io.expect_write()
            .with(eq(&[0x10u8, 0x27, 0x00, 0x00][..]))
            .times(1)
            .returning(|buf| Ok(buf.len()));
        respond_with(&mut io, b'A');

        assert_ok!(link(io).set_exposure(10000));
    }

    #[test]
    fn exposure_times_out() {
        let mut io = MockTransport::new();
        io.expect_write().times(5).returning(|buf| Ok(buf.len()));
        respond_with(&mut io, b'a');

        assert_matches!(
            link(io).set_exposure(1),
            Err(Error::AcknowledgmentTimeout {
                command: Command::SetExposure(1),
                attempts: 5
            })
        );
    }

    #[test]
    fn trigger_on_retries_until_acknowledged() {
        let mut io = MockTransport::new();
        io.expect_write()
            .with(eq(&[0x02u8, 0, 0, 0][..]))
            .times(3)
            .returning(|buf| Ok(buf.len()));
        let mut calls = 0;
        io.expect_read().times(3).returning(move |buf| {
            calls += 1;
            // Trigger-on only takes the lowercase response
            buf[0] = if calls < 3 { b'T' } else { b't' };
            Ok(1)
        });

        assert_ok!(link(io).trigger_on());
    }

    #[test]
    fn trigger_on_times_out() {
        let mut io = MockTransport::new();
        io.expect_write().times(5).returning(|buf| Ok(buf.len()));
        // Uppercase is only good enough for trigger-off
        respond_with(&mut io, b'T');

        assert_matches!(
            link(io).trigger_on(),
            Err(Error::AcknowledgmentTimeout {
                command: Command::TriggerOn,
                attempts: 5
            })
        );
    }

    #[test]
    fn trigger_on_swallows_io_errors() {
        let mut io = MockTransport::new();
        io.expect_write().times(5).returning(|_| Err(broken_pipe()));
        io.expect_read().never();

        assert_matches!(
            link(io).trigger_on(),
            Err(Error::AcknowledgmentTimeout {
                command: Command::TriggerOn,
                ..
            })
        );
    }

    #[test]
    fn trigger_off_accepts_uppercase() {
        let mut io = MockTransport::new();
        io.expect_purge()
            .with(eq(Purge::All))
            .times(1)
            .returning(|_| Ok(()));
        io.expect_write()
            .with(eq(&[0x03u8, 0, 0, 0][..]))
            .times(1)
            .returning(|buf| Ok(buf.len()));
        respond_with(&mut io, b'T');

        assert_ok!(link(io).trigger_off());
    }

    #[test]
    fn trigger_off_times_out() {
        let mut io = MockTransport::new();
        io.expect_purge().times(5).returning(|_| Ok(()));
        io.expect_write().times(5).returning(|buf| Ok(buf.len()));
        respond_with(&mut io, b'x');

        assert_matches!(
            link(io).trigger_off(),
            Err(Error::AcknowledgmentTimeout {
                command: Command::TriggerOff,
                attempts: 5
            })
        );
    }

    #[test]
    fn trigger_off_reports_last_read_failure() {
        let mut io = MockTransport::new();
        io.expect_purge().times(5).returning(|_| Ok(()));
        io.expect_write().times(5).returning(|buf| Ok(buf.len()));
        // Timed out reads
        io.expect_read().times(5).returning(|_| Ok(0));

        assert_matches!(
            link(io).trigger_off(),
            Err(Error::CommandReadFailed(Command::TriggerOff))
        );
    }

    #[test]
    fn trigger_off_reports_last_write_failure() {
        let mut io = MockTransport::new();
        // Purge failures are not fatal
        io.expect_purge().times(5).returning(|_| Err(broken_pipe()));
        io.expect_write().times(5).returning(|_| Ok(2));
        io.expect_read().never();

        assert_matches!(
            link(io).trigger_off(),
            Err(Error::CommandWriteFailed(Command::TriggerOff))
        );
    }

    #[test]
    fn trigger_off_recovers_from_failed_write() {
        let mut io = MockTransport::new();
        io.expect_purge().times(2).returning(|_| Ok(()));
        let mut calls = 0;
        io.expect_write().times(2).returning(move |buf| {
            calls += 1;
            if calls == 1 {
                Err(broken_pipe())
            } else {
                Ok(buf.len())
            }
        });
        respond_with(&mut io, 0x74);

        assert_ok!(link(io).trigger_off());
    }
}
