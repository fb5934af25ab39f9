use serde::Serialize;
use std::sync::Arc;

/// Size of a raw frame on the data channel, sync header included
pub const FRAME_SIZE: usize = 2088;
/// Each frame starts with a sync marker, which is dropped after decoding
pub const HEADER_SIZE: usize = 4;
pub const SYNC_MARKER: [u8; HEADER_SIZE] = [0x00, 0x00, 0x00, 0x01];
/// Amount of pixels in a single frame, each pixel is 2 bytes long
pub const FRAME_PIXEL_COUNT: usize = (FRAME_SIZE - HEADER_SIZE) / 2;
/// Raw value reported by a saturated pixel
pub const SATURATION_LEVEL: u16 = u16::MAX;

/// Intensity of a single pixel
#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
pub struct Sample {
    pub pixel: u32,
    pub intensity: f64,
}

impl Sample {
    pub fn new(pixel: u32, intensity: f64) -> Self {
        Sample { pixel, intensity }
    }
}

/// Decoded frame in ascending pixel order. Shared between consumers, never mutated.
pub type Frame = Arc<[Sample]>;

#[derive(PartialEq, Debug, Clone)]
pub struct DecodedFrame {
    pub frame: Frame,
    /// Some raw pixel value reached [`SATURATION_LEVEL`], checked before background subtraction
    pub saturated: bool,
}
