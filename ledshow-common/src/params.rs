//! Central tuning parameters.
//!
//! Every timing and sizing constant the playback engine depends on lives
//! here, so the magic numbers of the system are named in one place rather
//! than scattered through the real-time code.

/// Audio writer wake period in milliseconds.
pub const AUDIO_PERIOD_MS: u64 = 30;

/// Device period length in milliseconds (smallest submission unit).
pub const DEVICE_PERIOD_MS: u64 = 10;

/// Sub-writes of one device period each, per audio writer wake.
///
/// Three 10 ms writes per 30 ms wake keep the device buffer far enough
/// ahead that one lost wake does not underrun.
pub const SUBWRITES_PER_CYCLE: usize = 3;

/// Device buffer length, in device periods.
pub const DEVICE_BUFFER_PERIODS: usize = 12;

/// Silent periods written at device setup to flush residual audio.
pub const SILENCE_PREFILL_PERIODS: usize = 4;

/// LED writer tick period in milliseconds.
pub const LED_PERIOD_MS: u64 = 10;

/// Ring buffer capacity in interleaved samples (~3 s of 48 kHz stereo).
pub const RING_CAPACITY_SAMPLES: usize = 48_000 * 3 * 2;

/// Minimum buffered audio before streamed playback may start.
pub const PREROLL_MS: u64 = 100;

/// Decode chunk target per worker iteration, in milliseconds.
pub const DECODE_CHUNK_MS: u64 = 100;

/// Per-thread statistics ring capacity; the audio writer also stops
/// after this many cycles.
pub const STATS_CAPACITY: usize = 60_000;

/// Audio writer cycles between device delay samples.
pub const DELAY_SAMPLE_INTERVAL: u64 = 100;

/// Upper bound on pattern table length.
pub const MAX_PATTERNS: usize = 2048;

/// Upper bound on WAV length in frames; larger files are a load error.
pub const MAX_AUDIO_FRAMES: u64 = 120_000_000;

/// Minimum pattern duration in milliseconds.
pub const MIN_PATTERN_MS: u32 = 70;

/// SCHED_FIFO priority of the LED writer (highest: a missed 10 ms tick
/// is visible to a human).
pub const LED_RT_PRIORITY: i32 = 80;

/// SCHED_FIFO priority of the audio writer (the device buffers ~120 ms).
pub const AUDIO_RT_PRIORITY: i32 = 75;

/// Default UDP port for song-name announcements.
pub const UDP_PORT: u16 = 5005;

/// Timeout waiting for a UDP song announcement, in seconds.
pub const UDP_TIMEOUT_SECS: u64 = 30;

/// How long to wait for the decoder worker to exit at shutdown before
/// detaching it, in milliseconds.
pub const DECODER_JOIN_TIMEOUT_MS: u64 = 2000;
