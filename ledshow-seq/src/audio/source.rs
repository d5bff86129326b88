//! Audio sources: memory-mapped WAV or a decoded compressed stream.
//!
//! Both variants expose the same operations to the audio writer; the
//! WAV case short-circuits past the ring buffer and indexes the mapping
//! directly, the streamed case reads whatever the decoder worker has
//! buffered.

use crate::audio::decoder::{DecoderWorker, PcmDecoder};
use crate::audio::mp3::SymphoniaDecoder;
use crate::audio::ring::{SampleRing, StreamStatus};
use crate::audio::wav::WavAudio;
use crate::error::Result;
use ledshow_common::params;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Source container kind, decided by the file locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    Wav,
    Mp3,
}

/// One attempt at pulling frames out of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// This many whole frames were copied out.
    Frames(usize),
    /// Nothing buffered right now, but the decoder is still producing.
    Empty,
    /// The source has nothing left and never will.
    Drained,
}

/// Streamed source: ring buffer plus the worker feeding it.
pub struct StreamAudio {
    ring: Arc<SampleRing>,
    decoder: Option<Box<dyn PcmDecoder>>,
    worker: Option<DecoderWorker>,
    sample_rate: u32,
    channels: u16,
    total_frames: u64,
}

impl StreamAudio {
    pub fn new(decoder: Box<dyn PcmDecoder>) -> Self {
        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels();
        let total_frames = decoder.total_frames();
        let ring = Arc::new(SampleRing::new(
            params::RING_CAPACITY_SAMPLES,
            channels as usize,
        ));
        StreamAudio {
            ring,
            decoder: Some(decoder),
            worker: None,
            sample_rate,
            channels,
            total_frames,
        }
    }

    /// Spawn the decoder worker and block until the pre-roll is
    /// satisfied: at least 100 ms buffered, or the stream already
    /// finished or errored.
    fn start(&mut self) -> Result<()> {
        let Some(decoder) = self.decoder.take() else {
            return Ok(()); // already started
        };
        let worker = DecoderWorker::spawn(decoder, Arc::clone(&self.ring))?;
        self.worker = Some(worker);

        let preroll_frames =
            (self.sample_rate as u64 * params::PREROLL_MS / 1000) as usize;
        let status = self.ring.wait_min_frames(preroll_frames);
        debug!(
            "pre-roll complete: {} frames buffered, status {:?}",
            self.ring.available_frames(),
            status
        );
        Ok(())
    }

    fn drained(&self) -> bool {
        self.ring.poll_status() != StreamStatus::Producing && self.ring.available_samples() == 0
    }

    fn close(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown(Duration::from_millis(params::DECODER_JOIN_TIMEOUT_MS));
        }
    }
}

/// A playable audio stream.
pub enum AudioStream {
    Wav(WavAudio),
    Stream(StreamAudio),
}

impl AudioStream {
    /// Open a source file. Load failures (bad header, oversized data,
    /// unreadable file) surface here, before any device is touched.
    pub fn open(path: &Path, kind: AudioKind, max_frames: u64) -> Result<Self> {
        match kind {
            AudioKind::Wav => {
                let wav = WavAudio::open(path, max_frames)?;
                info!(
                    "WAV source: {} Hz, {} ch, {} frames",
                    wav.sample_rate(),
                    wav.channels(),
                    wav.total_frames()
                );
                Ok(AudioStream::Wav(wav))
            }
            AudioKind::Mp3 => {
                let decoder = SymphoniaDecoder::open(path)?;
                Ok(AudioStream::from_decoder(Box::new(decoder)))
            }
        }
    }

    /// Build a streamed source from any decoder (the seam the streamed
    /// playback tests use).
    pub fn from_decoder(decoder: Box<dyn PcmDecoder>) -> Self {
        AudioStream::Stream(StreamAudio::new(decoder))
    }

    pub fn format_label(&self) -> &'static str {
        match self {
            AudioStream::Wav(_) => "WAV",
            AudioStream::Stream(_) => "MP3",
        }
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            AudioStream::Wav(w) => w.sample_rate(),
            AudioStream::Stream(s) => s.sample_rate,
        }
    }

    pub fn channels(&self) -> u16 {
        match self {
            AudioStream::Wav(w) => w.channels(),
            AudioStream::Stream(s) => s.channels,
        }
    }

    /// Total frames, 0 when the container does not say.
    pub fn total_frames(&self) -> u64 {
        match self {
            AudioStream::Wav(w) => w.total_frames(),
            AudioStream::Stream(s) => s.total_frames,
        }
    }

    /// Start producing. WAV needs nothing; streams spawn the decoder
    /// worker and honor the pre-roll contract.
    pub fn start(&mut self) -> Result<()> {
        match self {
            AudioStream::Wav(_) => Ok(()),
            AudioStream::Stream(s) => s.start(),
        }
    }

    /// Copy the next frame-aligned region into `out`.
    ///
    /// WAV does not advance its cursor here (see [`commit`]); the
    /// streamed case consumes from the ring immediately.
    ///
    /// [`commit`]: AudioStream::commit
    pub fn fill(&mut self, out: &mut [i16]) -> Chunk {
        match self {
            AudioStream::Wav(w) => {
                let frames = w.fill(out);
                if frames == 0 {
                    Chunk::Drained
                } else {
                    Chunk::Frames(frames)
                }
            }
            AudioStream::Stream(s) => {
                let samples = s.ring.read(out);
                if samples > 0 {
                    Chunk::Frames(samples / s.channels as usize)
                } else if s.drained() {
                    Chunk::Drained
                } else {
                    Chunk::Empty
                }
            }
        }
    }

    /// Acknowledge a successful device write of `frames` from the last
    /// `fill`. A failed write skips this, so the WAV cursor replays the
    /// same region on the next attempt.
    pub fn commit(&mut self, frames: usize) {
        match self {
            AudioStream::Wav(w) => w.advance(frames),
            AudioStream::Stream(_) => {}
        }
    }

    /// Frames still buffered (ring fill) or remaining (WAV).
    pub fn available_frames(&self) -> usize {
        match self {
            AudioStream::Wav(w) => w.frames_remaining() as usize,
            AudioStream::Stream(s) => s.ring.available_frames(),
        }
    }

    /// Exact frames left, when the source knows (WAV only).
    pub fn frames_remaining(&self) -> Option<u64> {
        match self {
            AudioStream::Wav(w) => Some(w.frames_remaining()),
            AudioStream::Stream(_) => None,
        }
    }

    /// Finished with nothing buffered.
    pub fn drained(&self) -> bool {
        match self {
            AudioStream::Wav(w) => w.frames_remaining() == 0,
            AudioStream::Stream(s) => s.drained(),
        }
    }

    /// Producer status; WAV sources are trivially `Finished` once the
    /// cursor hits the end.
    pub fn status(&self) -> StreamStatus {
        match self {
            AudioStream::Wav(w) => {
                if w.frames_remaining() == 0 {
                    StreamStatus::Finished
                } else {
                    StreamStatus::Producing
                }
            }
            AudioStream::Stream(s) => s.ring.poll_status(),
        }
    }

    /// Stop the decoder worker (bounded join) and release the source.
    pub fn close(&mut self) {
        if let AudioStream::Stream(s) = self {
            s.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic ramp generator standing in for a real decoder.
    struct RampDecoder {
        rate: u32,
        frames_left: u64,
        total: u64,
        next: i16,
    }

    impl RampDecoder {
        fn new(rate: u32, frames: u64) -> Self {
            RampDecoder {
                rate,
                frames_left: frames,
                total: frames,
                next: 0,
            }
        }
    }

    impl PcmDecoder for RampDecoder {
        fn sample_rate(&self) -> u32 {
            self.rate
        }
        fn channels(&self) -> u16 {
            2
        }
        fn total_frames(&self) -> u64 {
            self.total
        }
        fn next_chunk(&mut self, out: &mut Vec<i16>) -> std::result::Result<usize, crate::error::DecodeError> {
            out.clear();
            let chunk = (self.rate as u64 * params::DECODE_CHUNK_MS / 1000)
                .min(self.frames_left) as usize;
            for _ in 0..chunk {
                out.push(self.next);
                out.push(self.next);
                self.next = self.next.wrapping_add(1);
            }
            self.frames_left -= chunk as u64;
            Ok(chunk)
        }
    }

    #[test]
    fn preroll_buffers_at_least_100ms_for_a_long_stream() {
        let mut stream = AudioStream::from_decoder(Box::new(RampDecoder::new(44_100, 88_200)));
        stream.start().unwrap();
        // 100 ms at 44.1 kHz
        assert!(stream.available_frames() >= 4410);
        stream.close();
    }

    #[test]
    fn preroll_returns_finished_for_a_stream_shorter_than_100ms() {
        let mut stream = AudioStream::from_decoder(Box::new(RampDecoder::new(44_100, 1000)));
        stream.start().unwrap();
        assert_eq!(stream.status(), StreamStatus::Finished);
        assert_eq!(stream.available_frames(), 1000);
        stream.close();
    }

    #[test]
    fn stream_drains_to_exactly_the_decoded_frame_count() {
        let mut stream = AudioStream::from_decoder(Box::new(RampDecoder::new(8000, 3000)));
        stream.start().unwrap();

        let mut out = vec![0i16; 512];
        let mut frames = 0usize;
        loop {
            match stream.fill(&mut out) {
                Chunk::Frames(n) => {
                    stream.commit(n);
                    frames += n;
                }
                Chunk::Empty => std::thread::yield_now(),
                Chunk::Drained => break,
            }
        }
        assert_eq!(frames, 3000);
        assert!(stream.drained());
        stream.close();
    }

    #[test]
    fn wav_source_reports_known_remaining_frames() {
        let dir = tempfile::tempdir().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = dir.path().join("a.wav");
        let mut w = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..441i16 {
            w.write_sample(i).unwrap();
        }
        w.finalize().unwrap();

        let mut stream =
            AudioStream::open(&path, AudioKind::Wav, params::MAX_AUDIO_FRAMES).unwrap();
        stream.start().unwrap();
        assert_eq!(stream.frames_remaining(), Some(441));
        assert_eq!(stream.format_label(), "WAV");

        let mut out = vec![0i16; 441];
        match stream.fill(&mut out) {
            Chunk::Frames(n) => {
                assert_eq!(n, 441);
                stream.commit(n);
            }
            other => panic!("expected frames, got {other:?}"),
        }
        assert!(stream.drained());
        assert_eq!(stream.fill(&mut out), Chunk::Drained);
    }
}
