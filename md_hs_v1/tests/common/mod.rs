#![allow(dead_code)]

use md_hs_v1::{
    pipeline::{FrameSink, View},
    Purge, Result, Transport,
};
use mockall::mock;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

mock! {
    pub Device {}
    impl Transport for Device {
        fn set_baud_rate(&mut self, baud: u32) -> Result<()>;
        fn reset(&mut self) -> Result<()>;
        fn purge(&mut self, queues: Purge) -> Result<()>;
        fn write(&mut self, buf: &[u8]) -> Result<usize>;
        fn queued_bytes(&mut self) -> Result<usize>;
        fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    }
}

/// Bytes queued on the fake data channel
#[derive(Default)]
pub struct HeadState {
    pub queue: VecDeque<u8>,
    /// Frame appended every time the channel is polled
    pub streaming: Option<Vec<u8>>,
    pub purges: usize,
    pub reset_fails: bool,
}

#[derive(Clone, Default)]
pub struct FakeHead(pub Arc<Mutex<HeadState>>);

impl FakeHead {
    pub fn push(&self, data: &[u8]) {
        self.0.lock().unwrap().queue.extend(data);
    }

    pub fn stream(&self, frame: Vec<u8>) {
        self.0.lock().unwrap().streaming = Some(frame);
    }

    pub fn fail_resets(&self) {
        self.0.lock().unwrap().reset_fails = true;
    }

    pub fn purges(&self) -> usize {
        self.0.lock().unwrap().purges
    }

    /// Data channel backed by this head. Purging drops everything queued.
    pub fn data_channel(&self) -> MockDevice {
        let mut data = MockDevice::new();
        let head = self.clone();
        data.expect_queued_bytes().returning(move || {
            let mut state = head.0.lock().unwrap();
            if let Some(frame) = state.streaming.clone() {
                state.queue.extend(frame);
            }
            Ok(state.queue.len())
        });
        let head = self.clone();
        data.expect_read().returning(move |buf| {
            let mut state = head.0.lock().unwrap();
            let count = buf.len().min(state.queue.len());
            for (dst, src) in buf.iter_mut().zip(state.queue.drain(..count)) {
                *dst = src;
            }
            Ok(count)
        });
        let head = self.clone();
        data.expect_purge().returning(move |_| {
            let mut state = head.0.lock().unwrap();
            state.queue.clear();
            state.purges += 1;
            Ok(())
        });
        let head = self.clone();
        data.expect_reset().returning(move || {
            if head.0.lock().unwrap().reset_fails {
                Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into())
            } else {
                Ok(())
            }
        });
        data
    }
}

/// Commands written to the control channel, in order
#[derive(Clone, Default)]
pub struct CommandLog(pub Arc<Mutex<Vec<Vec<u8>>>>);

impl CommandLog {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Control channel acknowledging every command the way the firmware does
    pub fn control_channel(&self) -> MockDevice {
        let mut control = MockDevice::new();
        let last = Arc::new(Mutex::new(Vec::new()));
        let log = self.clone();
        let written = last.clone();
        control.expect_write().returning(move |buf| {
            log.0.lock().unwrap().push(buf.to_vec());
            *written.lock().unwrap() = buf.to_vec();
            Ok(buf.len())
        });
        control.expect_read().returning(move |buf| {
            buf[0] = match last.lock().unwrap().as_slice() {
                [0x02, 0, 0, 0] | [0x03, 0, 0, 0] => b't',
                _ => b'A',
            };
            Ok(1)
        });
        control.expect_purge().returning(|_| Ok(()));
        control.expect_set_baud_rate().returning(|_| Ok(()));
        control.expect_reset().returning(|| Ok(()));
        control
    }
}

pub const TRIGGER_ON: [u8; 4] = [0x02, 0, 0, 0];
pub const TRIGGER_OFF: [u8; 4] = [0x03, 0, 0, 0];

#[derive(Default)]
pub struct Collect {
    pub views: Vec<View>,
    pub saturation: Vec<bool>,
}

impl FrameSink for Collect {
    fn render(&mut self, view: &View) {
        self.views.push(view.clone());
    }

    fn saturation(&mut self, saturated: bool) {
        self.saturation.push(saturated);
    }
}
