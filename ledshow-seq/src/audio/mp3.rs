//! Compressed-stream decoding via symphonia.
//!
//! Output is always coerced to interleaved signed 16-bit stereo at the
//! source's native rate: mono sources have each sample duplicated, so
//! the rest of the engine only ever sees two channels on this path.

use crate::audio::decoder::PcmDecoder;
use crate::error::DecodeError;
use ledshow_common::params;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Streaming decoder handle producing i16 stereo chunks.
pub struct SymphoniaDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    total_frames: u64,
    sample_buf: Option<SampleBuffer<i16>>,
}

impl SymphoniaDecoder {
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Probe(e.to_string()))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or(DecodeError::MissingParameters("sample rate"))?;
        let total_frames = codec_params.n_frames.unwrap_or(0);

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Probe(e.to_string()))?;

        debug!(
            "compressed stream opened: {} Hz, {} frames",
            sample_rate,
            if total_frames > 0 {
                total_frames.to_string()
            } else {
                "unknown".to_string()
            }
        );

        Ok(SymphoniaDecoder {
            format,
            decoder,
            track_id,
            sample_rate,
            total_frames,
            sample_buf: None,
        })
    }
}

impl PcmDecoder for SymphoniaDecoder {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        2
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn next_chunk(&mut self, out: &mut Vec<i16>) -> Result<usize, DecodeError> {
        out.clear();
        let target =
            (self.sample_rate as u64 * params::DECODE_CHUNK_MS / 1000) as usize;
        let mut frames = 0usize;

        while frames < target {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(DecodeError::Failed(e.to_string())),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let buf = self.sample_buf.get_or_insert_with(|| {
                        SampleBuffer::<i16>::new(decoded.capacity() as u64, spec)
                    });
                    buf.copy_interleaved_ref(decoded);
                    let samples = buf.samples();
                    match spec.channels.count() {
                        1 => {
                            out.reserve(samples.len() * 2);
                            for &s in samples {
                                out.push(s);
                                out.push(s);
                            }
                            frames += samples.len();
                        }
                        2 => {
                            out.extend_from_slice(samples);
                            frames += samples.len() / 2;
                        }
                        n => {
                            return Err(DecodeError::Failed(format!(
                                "unsupported channel layout ({n} channels)"
                            )))
                        }
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // corrupt packet; skip it and keep going
                    warn!("skipping undecodable packet: {e}");
                    continue;
                }
                Err(e) => return Err(DecodeError::Failed(e.to_string())),
            }
        }

        Ok(frames)
    }
}
