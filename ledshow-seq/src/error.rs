//! Error types for the sequencer.
//!
//! Expected failures use `Result` with per-concern error enums; the
//! top-level `Error` collects them for the orchestration path. Load-time
//! errors are fatal for a song and abort before any real-time thread is
//! started.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the sequencer.
#[derive(Debug, Error)]
pub enum Error {
    /// IO errors from file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Song/pattern/WAV load failures
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Compressed-stream decode failures
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Audio device failures
    #[error("audio device error: {0}")]
    Device(#[from] DeviceError),

    /// GPIO mapping failures
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ledshow_common::ConfigError),

    /// UDP song receiver failures
    #[error("UDP receive error: {0}")]
    Udp(String),
}

/// Errors raised while loading a song's inputs.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("song '{base}' not found under {dir} (need .wav or .mp3)")]
    SongNotFound { base: String, dir: PathBuf },

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not a RIFF/WAVE file")]
    NotRiffWave { path: PathBuf },

    #[error("no '{chunk}' chunk in {path}")]
    MissingChunk { chunk: &'static str, path: PathBuf },

    #[error("unsupported WAV format in {path} (need PCM 16-bit, got format {format_code}, {bits} bits)")]
    UnsupportedWav {
        path: PathBuf,
        format_code: u16,
        bits: u16,
    },

    #[error("unsupported channel count {channels} in {path} (need mono or stereo)")]
    BadChannelCount { path: PathBuf, channels: u16 },

    #[error("audio too long: {frames} frames, maximum is {max}")]
    Oversized { frames: u64, max: u64 },
}

/// Errors raised by the compressed-stream decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to probe stream format: {0}")]
    Probe(String),

    #[error("no audio track found in stream")]
    NoAudioTrack,

    #[error("stream parameters incomplete: {0}")]
    MissingParameters(&'static str),

    #[error("decode failed: {0}")]
    Failed(String),

    #[error("IO error while decoding: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the output device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("binary was built without the alsa-backend feature")]
    BackendUnavailable,

    #[error("failed to open device '{device}': {reason}")]
    Open { device: String, reason: String },

    #[error("device configuration failed: {0}")]
    Configure(String),

    #[error("device write failed: {0}")]
    Write(String),

    #[error("device operation failed: {0}")]
    Other(String),
}

/// Errors raised while mapping or programming GPIO.
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("failed to open /dev/mem: {0} (needs CAP_SYS_RAWIO or root)")]
    OpenMem(std::io::Error),

    #[error("failed to map GPIO window at {base:#x}: {source}")]
    Map { base: u64, source: std::io::Error },
}

/// Result type alias using the sequencer error type.
pub type Result<T> = std::result::Result<T, Error>;
