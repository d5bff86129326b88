//! Per-song playback orchestration.
//!
//! One call to [`play_song`] owns everything a playback needs: pattern
//! table, audio stream, statistics. The real-time threads receive typed
//! references into that state through `std::thread::scope`, so nothing
//! survives a song except the returned statistics and there is no state
//! to reset between songs.
//!
//! Sequence per song: load patterns, open the stream, start the decoder
//! (pre-roll), configure the device, then start the LED writer and the
//! audio writer against one shared clock, join both, drain the device,
//! clear the LEDs, and hand the statistics back for the report.

use crate::audio::sink::PcmSink;
use crate::audio::source::{AudioKind, AudioStream};
use crate::audio::writer as audio_writer;
use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::error::Result;
use crate::gpio::{GpioOutputs, LED_MASK};
use crate::led::pattern;
use crate::led::writer as led_writer;
use crate::rt;
use crate::stats::{AudioThreadStats, LedThreadStats, PlaybackStats};
use ledshow_common::params;
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything the locator resolved for one song.
#[derive(Debug, Clone)]
pub struct SongInputs {
    pub base: String,
    pub audio_path: PathBuf,
    pub kind: AudioKind,
    pub pattern_path: PathBuf,
}

/// Load-time bounds, injectable for tests.
#[derive(Debug, Clone)]
pub struct PlaybackLimits {
    pub max_audio_frames: u64,
}

impl Default for PlaybackLimits {
    fn default() -> Self {
        PlaybackLimits {
            max_audio_frames: params::MAX_AUDIO_FRAMES,
        }
    }
}

/// Play one song to completion (or cancellation) and return its
/// statistics.
///
/// Load failures abort before the device is configured or any GPIO
/// write happens; whatever happens afterwards, the LEDs are cleared on
/// the way out.
pub fn play_song(
    inputs: &SongInputs,
    sink: &mut dyn PcmSink,
    gpio: &mut dyn GpioOutputs,
    clock: &dyn Clock,
    cancel: &CancelToken,
    limits: &PlaybackLimits,
) -> Result<PlaybackStats> {
    info!("=== starting playback of '{}' ===", inputs.base);

    let patterns = pattern::load_patterns(&inputs.pattern_path)?;
    let mut stream = AudioStream::open(&inputs.audio_path, inputs.kind, limits.max_audio_frames)?;
    info!(
        "{}: {} Hz, {} ch, {} patterns",
        stream.format_label(),
        stream.sample_rate(),
        stream.channels(),
        patterns.len()
    );

    // Pre-roll: for streamed sources this blocks until ~100 ms is
    // buffered (or the stream is already done), so the audio writer
    // never starts against an empty ring.
    stream.start()?;
    sink.configure(stream.sample_rate(), stream.channels())?;

    // Known-dark starting state to match the writer's zero shadow.
    gpio.clear_bits(LED_MASK);

    let mut audio_stats = AudioThreadStats::new();
    let mut led_stats = LedThreadStats::new();
    let started = clock.now();

    std::thread::scope(|scope| {
        let stream = &mut stream;
        let audio_stats = &mut audio_stats;
        let led_stats = &mut led_stats;
        let patterns = &patterns;
        let sink: &mut dyn PcmSink = &mut *sink;
        let gpio: &mut dyn GpioOutputs = &mut *gpio;

        let led = scope.spawn(move || {
            rt::promote_current_thread("LED", params::LED_RT_PRIORITY);
            led_writer::run(patterns, gpio, clock, cancel, led_stats)
        });
        let audio = scope.spawn(move || {
            rt::promote_current_thread("audio", params::AUDIO_RT_PRIORITY);
            audio_writer::run(stream, sink, clock, cancel, audio_stats)
        });

        match audio.join() {
            Ok(()) => {}
            Err(payload) => std::panic::resume_unwind(payload),
        }
        match led.join() {
            Ok(final_shadow) => {
                if final_shadow != 0 {
                    info!("LED writer left shadow at {final_shadow:#010x}");
                }
            }
            Err(payload) => std::panic::resume_unwind(payload),
        }
    });

    let elapsed = clock.now() - started;

    if let Err(e) = sink.drain() {
        warn!("device drain failed: {e}");
    }
    stream.close();
    gpio.clear_bits(LED_MASK);

    info!(
        "playback of '{}' finished after {:.2} s ({} underruns, {} stalls)",
        inputs.base,
        elapsed.as_secs_f64(),
        audio_stats.underruns,
        audio_stats.stalls
    );

    Ok(PlaybackStats {
        audio_format: stream.format_label(),
        sample_rate: stream.sample_rate(),
        channels: stream.channels(),
        pattern_count: patterns.len(),
        duration_secs: elapsed.as_secs_f64(),
        audio: audio_stats,
        led: led_stats,
    })
}
