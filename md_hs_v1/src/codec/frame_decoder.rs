use super::decoder::Decoder;
use crate::{
    error::{Error, Result},
    frame::{
        DecodedFrame, Frame, Sample, FRAME_PIXEL_COUNT, FRAME_SIZE, HEADER_SIZE,
        SATURATION_LEVEL, SYNC_MARKER,
    },
    store::BackgroundReference,
};
use bytes::{Buf, BytesMut};
use nom::{
    bytes::complete::{tag, take_until},
    multi::fill,
    number::complete::be_u16,
    IResult,
};

/// Offset of the first sync marker in `buf`, needs at least a full marker to match
pub fn find_sync(buf: &[u8]) -> Option<usize> {
    take_until::<_, _, nom::error::Error<&[u8]>>(&SYNC_MARKER[..])(buf)
        .ok()
        .map(|(_, garbage)| garbage.len())
}

fn frame_parser(input: &[u8]) -> IResult<&[u8], [u16; FRAME_PIXEL_COUNT]> {
    let (input, _) = tag(&SYNC_MARKER[..])(input)?;
    let mut data = [0u16; FRAME_PIXEL_COUNT];
    let (input, ()) = fill(be_u16, &mut data)(input)?;
    Ok((input, data))
}

/// Splits the data channel stream into frames of [`FRAME_SIZE`] bytes
#[derive(Debug, Default)]
pub struct FrameDecoder {
    // Only set while the subtracted view is enabled
    background: Option<BackgroundReference>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder::default()
    }

    /// Reference subtracted from every following frame, `None` disables subtraction
    pub fn set_background(&mut self, background: Option<BackgroundReference>) {
        self.background = background;
    }

    fn to_frame(&self, pixels: &[u16]) -> DecodedFrame {
        let saturated = pixels.iter().any(|&raw| raw == SATURATION_LEVEL);
        let frame: Frame = pixels
            .iter()
            .enumerate()
            .map(|(idx, &raw)| {
                let pixel = idx as u32;
                let mut intensity = f64::from(raw);
                let reference = self.background.as_ref().and_then(|b| b.intensity_at(pixel));
                if let Some(reference) = reference {
                    // Negative results are kept
                    intensity -= reference;
                }
                Sample { pixel, intensity }
            })
            .collect();
        DecodedFrame { frame, saturated }
    }
}

impl Decoder for FrameDecoder {
    type Item = DecodedFrame;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<DecodedFrame>> {
        loop {
            if buf.len() < FRAME_SIZE {
                return Ok(None);
            }
            match find_sync(buf) {
                Some(0) => break,
                Some(offset) => {
                    log::trace!("Dropping {} bytes of partial frame", offset);
                    buf.advance(offset);
                }
                None => {
                    // Pure noise, drop a marker worth of bytes so the scan keeps moving
                    buf.advance(HEADER_SIZE);
                    return Ok(None);
                }
            }
        }

        // Marker is at offset 0 and a full frame is split off, so the payload always
        // parses. InvalidData only guards the parser against future layout changes.
        let raw = buf.split_to(FRAME_SIZE);
        let (_, pixels) = frame_parser(&raw).map_err(|_| Error::InvalidData)?;
        Ok(Some(self.to_frame(&pixels)))
    }
}
