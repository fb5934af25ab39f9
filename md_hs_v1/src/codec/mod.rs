pub mod decoder;
pub mod frame_decoder;
pub mod framed;

pub use decoder::Decoder;
pub use frame_decoder::FrameDecoder;
pub use framed::FramedRead;
