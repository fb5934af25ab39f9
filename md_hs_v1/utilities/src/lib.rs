use lazy_static::lazy_static;
use manifest_dir_macros::exist_relative_path;
use nom::{
    bytes::complete::take_while_m_n,
    character::complete::multispace0,
    combinator::{all_consuming, map_res},
    multi::many1,
    sequence::delimited,
    IResult,
};

/// Raw frame layout of the data channel
pub const FRAME_SIZE: usize = 2088;
pub const SYNC_MARKER: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
pub const PIXEL_COUNT: usize = (FRAME_SIZE - SYNC_MARKER.len()) / 2;

/// Decodes a pair of chars formatted as hex into a byte. For example "FF" -> 255
fn hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
        |hex| u8::from_str_radix(hex, 16),
    )(input)
}

fn parse_hex_str(input: &str) -> IResult<&str, Vec<u8>> {
    all_consuming(many1(delimited(multispace0, hex_byte, multispace0)))(input)
}

lazy_static! {
    /// One complete frame with a single emission line around pixel 521
    pub static ref SINGLE_FRAME: Vec<u8> = {
        let hex_str = include_str!(exist_relative_path!(
            "resources/test/single_frame_example.txt"
        ));
        let (_, data) = parse_hex_str(hex_str)
            .expect("Failed to parse resources/test/single_frame_example.txt");
        data
    };
    /// Data channel capture: 7 bytes of a cut frame, three complete frames (the last one
    /// saturated) and the first 700 bytes of a fourth one
    pub static ref CAPTURED_STREAM: Vec<u8> = {
        let hex_str = include_str!(exist_relative_path!(
            "resources/test/captured_stream_example.txt"
        ));
        let (_, data) = parse_hex_str(hex_str)
            .expect("Failed to parse resources/test/captured_stream_example.txt");
        data
    };
}

/// Builds a raw frame from per-pixel values
pub fn frame_bytes(pixel: impl Fn(usize) -> u16) -> Vec<u8> {
    let mut data = Vec::with_capacity(FRAME_SIZE);
    data.extend_from_slice(&SYNC_MARKER);
    for idx in 0..PIXEL_COUNT {
        data.extend_from_slice(&pixel(idx).to_be_bytes());
    }
    data
}

/// Raw frame where every pixel reports `value`
pub fn flat_frame(value: u16) -> Vec<u8> {
    frame_bytes(|_| value)
}

/// Bytes that never contain a sync marker
pub fn noise(len: usize) -> Vec<u8> {
    (0..len).map(|idx| 0x40 | (idx % 0x3F) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::*;

    #[test]
    fn hex_byte_parser() {
        assert_ok_eq!(hex_byte("FF"), ("", 255));
        assert_ok_eq!(hex_byte("ff"), ("", 255));
        assert_err!(hex_byte("NH"));
    }

    #[test]
    fn hex_str_parser() {
        assert_ok_eq!(
            parse_hex_str("DEADBEEF"),
            ("", vec![0xDE, 0xAD, 0xBE, 0xEF])
        );
        assert_ok_eq!(
            parse_hex_str(" DE AD\nBE EF \n"),
            ("", vec![0xDE, 0xAD, 0xBE, 0xEF])
        );
        assert_err!(parse_hex_str("NOT HEX"));
    }

    #[test]
    fn fixture_sizes() {
        assert_eq!(SINGLE_FRAME.len(), FRAME_SIZE);
        assert_eq!(&SINGLE_FRAME[..4], &SYNC_MARKER);
        assert_eq!(CAPTURED_STREAM.len(), 7 + 3 * FRAME_SIZE + 700);
    }

    #[test]
    fn builders() {
        let frame = frame_bytes(|idx| idx as u16);
        assert_eq!(frame.len(), FRAME_SIZE);
        assert_eq!(&frame[4..8], &[0x00, 0x00, 0x00, 0x01]);
        assert!(noise(4096).windows(4).all(|w| w != SYNC_MARKER));
    }
}
