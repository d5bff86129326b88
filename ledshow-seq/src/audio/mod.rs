//! Audio pipeline: sources, ring buffer, decoder worker, device sink,
//! and the periodic writer.
//!
//! Data flow: file → decoder → ring → audio writer → device (streamed),
//! or file → mmap → audio writer → device (WAV fast path).

pub mod decoder;
pub mod mp3;
pub mod ring;
pub mod sink;
pub mod source;
pub mod wav;
pub mod writer;

pub use decoder::PcmDecoder;
pub use ring::{SampleRing, StreamStatus};
pub use sink::PcmSink;
pub use source::{AudioKind, AudioStream, Chunk};
