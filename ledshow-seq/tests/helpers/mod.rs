//! Shared fixtures and fakes for the playback integration tests.
#![allow(dead_code)] // each test binary uses a different subset

use ledshow_seq::audio::decoder::PcmDecoder;
use ledshow_seq::audio::sink::PcmSink;
use ledshow_seq::error::{DecodeError, DeviceError};
use ledshow_seq::gpio::GpioOutputs;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Recording device: accepts frames, optionally failing a window of
/// write calls to model an underrunning device.
pub struct FakeSink {
    pub configured: Option<(u32, u16)>,
    pub frames_accepted: usize,
    pub write_calls: usize,
    pub prepares: usize,
    pub drains: usize,
    pub fail_window: Range<usize>,
    channels: usize,
}

impl FakeSink {
    pub fn new() -> Self {
        FakeSink {
            configured: None,
            frames_accepted: 0,
            write_calls: 0,
            prepares: 0,
            drains: 0,
            fail_window: 0..0,
            channels: 2,
        }
    }

    pub fn failing_writes(window: Range<usize>) -> Self {
        let mut sink = Self::new();
        sink.fail_window = window;
        sink
    }
}

impl PcmSink for FakeSink {
    fn configure(&mut self, sample_rate: u32, channels: u16) -> Result<(), DeviceError> {
        self.configured = Some((sample_rate, channels));
        self.channels = channels as usize;
        Ok(())
    }

    fn write_frames(&mut self, interleaved: &[i16]) -> Result<(), DeviceError> {
        let call = self.write_calls;
        self.write_calls += 1;
        if self.fail_window.contains(&call) {
            return Err(DeviceError::Write("simulated underrun".into()));
        }
        self.frames_accepted += interleaved.len() / self.channels;
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        self.prepares += 1;
        Ok(())
    }

    fn delay_frames(&mut self) -> Result<i64, DeviceError> {
        Ok(0)
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        self.drains += 1;
        Ok(())
    }
}

/// One GPIO register write, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioEvent {
    Set(u32),
    Clear(u32),
}

/// Records every register write instead of touching hardware.
#[derive(Default)]
pub struct RecordingGpio {
    pub events: Vec<GpioEvent>,
}

impl RecordingGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pattern-boundary writes performed by the LED writer (the engine's
    /// own all-clear calls are clear-only).
    pub fn pattern_writes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, GpioEvent::Set(_)))
            .count()
    }

    /// Output word after replaying every write.
    pub fn final_state(&self) -> u32 {
        self.events.iter().fold(0u32, |state, event| match event {
            GpioEvent::Set(mask) => state | mask,
            GpioEvent::Clear(mask) => state & !mask,
        })
    }
}

impl GpioOutputs for RecordingGpio {
    fn set_bits(&mut self, mask: u32) {
        self.events.push(GpioEvent::Set(mask));
    }

    fn clear_bits(&mut self, mask: u32) {
        self.events.push(GpioEvent::Clear(mask));
    }
}

/// Write a mono 440 Hz sine WAV fixture.
pub fn write_sine_wav(dir: &Path, name: &str, sample_rate: u32, frames: usize) -> PathBuf {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let path = dir.join(name);
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let v = (t * 440.0 * std::f32::consts::TAU).sin();
        writer.write_sample((v * 12_000.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

/// Write a pattern file from `(duration_ms, bits)` lines.
pub fn write_patterns(dir: &Path, name: &str, lines: &[(u32, &str)]) -> PathBuf {
    let path = dir.join(name);
    let text: String = lines
        .iter()
        .map(|(ms, bits)| format!("{ms} {bits}\n"))
        .collect();
    std::fs::write(&path, text).unwrap();
    path
}

/// Deterministic stereo sine decoder standing in for a compressed
/// stream, so the streamed path runs without codec fixtures.
pub struct SineDecoder {
    sample_rate: u32,
    frames_left: u64,
    total: u64,
    position: u64,
}

impl SineDecoder {
    pub fn new(sample_rate: u32, frames: u64) -> Self {
        SineDecoder {
            sample_rate,
            frames_left: frames,
            total: frames,
            position: 0,
        }
    }
}

impl PcmDecoder for SineDecoder {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        2
    }

    fn total_frames(&self) -> u64 {
        self.total
    }

    fn next_chunk(&mut self, out: &mut Vec<i16>) -> Result<usize, DecodeError> {
        out.clear();
        let chunk = (self.sample_rate as u64 / 10).min(self.frames_left) as usize;
        for _ in 0..chunk {
            let t = self.position as f32 / self.sample_rate as f32;
            let v = ((t * 440.0 * std::f32::consts::TAU).sin() * 12_000.0) as i16;
            out.push(v);
            out.push(v);
            self.position += 1;
        }
        self.frames_left -= chunk as u64;
        Ok(chunk)
    }
}
