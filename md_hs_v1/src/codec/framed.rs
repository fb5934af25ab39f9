use super::decoder::Decoder;
use crate::{
    error::{Error, Result},
    transport::Transport,
};
use bytes::{Buf, BytesMut};

/// Read half of a framed channel, the transport itself is borrowed per call
pub struct FramedRead<D> {
    codec: D,
    buf: BytesMut,
}

impl<D> FramedRead<D>
where
    D: Decoder<Error = Error>,
{
    pub fn new(codec: D) -> Self {
        FramedRead {
            codec,
            buf: BytesMut::new(),
        }
    }

    pub fn codec_mut(&mut self) -> &mut D {
        &mut self.codec
    }

    /// Amount of bytes waiting to be framed
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Moves everything the device has queued into the read buffer, without blocking
    pub fn fill<T: Transport + ?Sized>(&mut self, io: &mut T) -> Result<usize> {
        let queued = io.queued_bytes()?;
        if queued == 0 {
            return Ok(0);
        }
        let start = self.buf.len();
        self.buf.resize(start + queued, 0);
        let read = match io.read(&mut self.buf[start..]) {
            Ok(read) => read,
            Err(err) => {
                self.buf.truncate(start);
                return Err(err);
            }
        };
        self.buf.truncate(start + read);
        Ok(read)
    }

    /// Appends bytes received out of band
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn next_frame(&mut self) -> Result<Option<D::Item>> {
        self.codec.decode(&mut self.buf)
    }

    /// Keeps only the most recent `keep` bytes, returns amount of dropped bytes
    pub fn keep_latest(&mut self, keep: usize) -> usize {
        let dropped = self.buf.len().saturating_sub(keep);
        self.buf.advance(dropped);
        dropped
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::FrameDecoder,
        frame::{FRAME_SIZE, SYNC_MARKER},
        transport::MockTransport,
    };
    use claims::*;

    fn zero_frame() -> Vec<u8> {
        let mut data = SYNC_MARKER.to_vec();
        data.resize(FRAME_SIZE, 0);
        data
    }

    #[test]
    fn fill_reads_queued_bytes() {
        let mut io = MockTransport::new();
        io.expect_queued_bytes().times(1).returning(|| Ok(FRAME_SIZE + 2));
        io.expect_read().times(1).returning(|buf| {
            let frame = zero_frame();
            buf[..FRAME_SIZE].copy_from_slice(&frame);
            // Device delivered less than it announced
            Ok(FRAME_SIZE)
        });

        let mut framed = FramedRead::new(FrameDecoder::new());
        assert_ok_eq!(framed.fill(&mut io), FRAME_SIZE);
        assert_eq!(framed.buffered(), FRAME_SIZE);
        assert_some!(assert_ok!(framed.next_frame()));
        assert_eq!(framed.buffered(), 0);
    }

    #[test]
    fn fill_skips_read_when_idle() {
        let mut io = MockTransport::new();
        io.expect_queued_bytes().times(1).returning(|| Ok(0));
        io.expect_read().never();

        let mut framed = FramedRead::new(FrameDecoder::new());
        assert_ok_eq!(framed.fill(&mut io), 0);
    }

    #[test]
    fn failed_read_keeps_buffer() {
        let mut io = MockTransport::new();
        io.expect_queued_bytes().returning(|| Ok(16));
        io.expect_read()
            .returning(|_| Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into()));

        let mut framed = FramedRead::new(FrameDecoder::new());
        framed.extend_from_slice(&[1, 2, 3]);
        assert_err!(framed.fill(&mut io));
        assert_eq!(framed.buffered(), 3);
    }

    #[test]
    fn keep_latest_drops_oldest() {
        let mut framed = FramedRead::new(FrameDecoder::new());
        framed.extend_from_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(framed.keep_latest(2), 3);
        assert_eq!(framed.buffered(), 2);
        assert_eq!(framed.keep_latest(10), 0);
        assert_eq!(&framed.buf[..], &[4, 5]);
    }
}
