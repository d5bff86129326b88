//! Memory-mapped WAV source.
//!
//! WAV playback bypasses the ring buffer entirely: the whole file is
//! mapped read-only, the `data` chunk located, and the audio writer
//! indexes PCM frames straight out of the mapping. The mapping is
//! memory-locked best-effort so playback never takes a page fault.

use crate::error::LoadError;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const WAVE_FORMAT_PCM: u16 = 1;

/// PCM source backed by a read-only mapping of a RIFF/WAVE file.
#[derive(Debug)]
pub struct WavAudio {
    map: Mmap,
    data_offset: usize,
    sample_rate: u32,
    channels: u16,
    total_frames: u64,
    frames_consumed: u64,
}

struct FmtChunk {
    format_code: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

fn u16_at(bytes: &[u8], off: usize) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(off..off + 2)?.try_into().ok()?))
}

fn u32_at(bytes: &[u8], off: usize) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(off..off + 4)?.try_into().ok()?))
}

impl WavAudio {
    /// Map and validate a WAV file.
    ///
    /// Requires a PCM 16-bit `fmt ` chunk and a `data` chunk; unknown
    /// chunks between them are skipped. Files longer than `max_frames`
    /// are rejected before any device or GPIO work happens.
    pub fn open(path: &Path, max_frames: u64) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let map = unsafe { Mmap::map(&file) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let bytes: &[u8] = &map;
        if bytes.len() < RIFF_HEADER_LEN
            || &bytes[0..4] != b"RIFF"
            || &bytes[8..12] != b"WAVE"
        {
            return Err(LoadError::NotRiffWave {
                path: path.to_path_buf(),
            });
        }

        let mut fmt: Option<FmtChunk> = None;
        let mut data: Option<(usize, usize)> = None;

        let mut pos = RIFF_HEADER_LEN;
        while pos + CHUNK_HEADER_LEN <= bytes.len() {
            let id = &bytes[pos..pos + 4];
            let size = u32_at(bytes, pos + 4).unwrap_or(0) as usize;
            let body = pos + CHUNK_HEADER_LEN;

            if id == b"fmt " {
                if size < 16 || body + 16 > bytes.len() {
                    return Err(LoadError::MissingChunk {
                        chunk: "fmt ",
                        path: path.to_path_buf(),
                    });
                }
                fmt = Some(FmtChunk {
                    format_code: u16_at(bytes, body).unwrap_or(0),
                    channels: u16_at(bytes, body + 2).unwrap_or(0),
                    sample_rate: u32_at(bytes, body + 4).unwrap_or(0),
                    bits_per_sample: u16_at(bytes, body + 14).unwrap_or(0),
                });
            } else if id == b"data" {
                let available = bytes.len().saturating_sub(body);
                data = Some((body, size.min(available)));
                break;
            }

            // chunks are word-aligned; odd sizes carry a pad byte
            pos = body + size + (size & 1);
        }

        let fmt = fmt.ok_or_else(|| LoadError::MissingChunk {
            chunk: "fmt ",
            path: path.to_path_buf(),
        })?;
        let (data_offset, data_len) = data.ok_or_else(|| LoadError::MissingChunk {
            chunk: "data",
            path: path.to_path_buf(),
        })?;

        if fmt.format_code != WAVE_FORMAT_PCM || fmt.bits_per_sample != 16 {
            return Err(LoadError::UnsupportedWav {
                path: path.to_path_buf(),
                format_code: fmt.format_code,
                bits: fmt.bits_per_sample,
            });
        }
        if fmt.channels == 0 || fmt.channels > 2 {
            return Err(LoadError::BadChannelCount {
                path: path.to_path_buf(),
                channels: fmt.channels,
            });
        }

        let frame_bytes = fmt.channels as usize * 2;
        let total_frames = (data_len / frame_bytes) as u64;
        if total_frames > max_frames {
            return Err(LoadError::Oversized {
                frames: total_frames,
                max: max_frames,
            });
        }

        // Lock the mapping into RAM so playback takes no page faults;
        // needs RLIMIT_MEMLOCK headroom, so failure is tolerated.
        if let Err(e) = map.lock() {
            warn!("mlock of WAV mapping failed ({e}); continuing unlocked");
        }

        debug!(
            "WAV mapped: {} Hz, {} ch, {} frames, data at +{:#x}",
            fmt.sample_rate, fmt.channels, total_frames, data_offset
        );

        Ok(WavAudio {
            map,
            data_offset,
            sample_rate: fmt.sample_rate,
            channels: fmt.channels,
            total_frames,
            frames_consumed: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn frames_remaining(&self) -> u64 {
        self.total_frames - self.frames_consumed
    }

    /// Copy the next frames at the cursor into `out` without advancing,
    /// so a failed device write can retry the same region. Returns the
    /// number of whole frames copied.
    pub fn fill(&self, out: &mut [i16]) -> usize {
        let want = out.len() / self.channels as usize;
        let frames = (self.frames_remaining() as usize).min(want);
        if frames == 0 {
            return 0;
        }

        let frame_bytes = self.channels as usize * 2;
        let start = self.data_offset + self.frames_consumed as usize * frame_bytes;
        let bytes = &self.map[start..start + frames * frame_bytes];
        for (dst, src) in out.iter_mut().zip(bytes.chunks_exact(2)) {
            *dst = i16::from_le_bytes([src[0], src[1]]);
        }
        frames
    }

    /// Advance the cursor after a successful device write.
    pub fn advance(&mut self, frames: usize) {
        self.frames_consumed = (self.frames_consumed + frames as u64).min(self.total_frames);
    }
}
