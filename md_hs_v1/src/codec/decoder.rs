use bytes::BytesMut;

/// Stateful demultiplexer over an accumulating byte buffer
pub trait Decoder {
    type Error: std::error::Error;
    type Item;

    /// Takes at most one item from the front of `buf`.
    ///
    /// `Ok(None)` means more bytes are needed. Bytes that can never become part of an
    /// item may still be dropped from `buf` in that case.
    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error>;
}
