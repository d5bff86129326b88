//! Periodic audio writer.
//!
//! Wakes every 30 ms on an absolute deadline and performs three
//! sub-writes of one device period (10 ms of frames) each. The device
//! is configured with a ~120 ms buffer, so staying three periods ahead
//! absorbs a lost wake without underrunning. Underruns re-prepare the
//! device and lose the missed sub-write; deadlines are never caught up.

use crate::audio::sink::PcmSink;
use crate::audio::source::{AudioStream, Chunk};
use crate::cancel::CancelToken;
use crate::clock::{duration_delta_us, Clock, DeadlineTimer};
use crate::stats::AudioThreadStats;
use ledshow_common::params;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Device buffer depth in milliseconds at the stream's configured rate.
///
/// Diagnostic only, but it must use the actual rate: a fixed 44.1 kHz
/// here misreports every 32 kHz and 48 kHz stream.
pub fn frames_to_ms(frames: i64, sample_rate: u32) -> f64 {
    frames as f64 * 1000.0 / sample_rate as f64
}

/// Drain the source into the sink until it runs dry, the stats ring
/// fills, or shutdown is requested.
pub fn run(
    source: &mut AudioStream,
    sink: &mut dyn PcmSink,
    clock: &dyn Clock,
    cancel: &CancelToken,
    stats: &mut AudioThreadStats,
) {
    let sample_rate = source.sample_rate();
    let channels = source.channels() as usize;
    let period_frames = (sample_rate as u64 * params::DEVICE_PERIOD_MS / 1000) as usize;
    let cycle_frames = (params::SUBWRITES_PER_CYCLE * period_frames) as u64;

    let mut scratch = vec![0i16; period_frames * channels];
    let mut timer = DeadlineTimer::new(
        clock.now(),
        Duration::from_millis(params::AUDIO_PERIOD_MS),
    );
    let mut prev_wake: Option<Duration> = None;
    let mut last_delay: i64 = 0;

    loop {
        if cancel.is_cancelled() {
            debug!("audio writer: shutdown requested");
            break;
        }
        if stats.cycles() >= params::STATS_CAPACITY as u64 {
            warn!("audio writer: statistics capacity reached, stopping");
            break;
        }
        // A known-length source with less than one full cycle left is
        // done; the residual frames are not played.
        if let Some(remaining) = source.frames_remaining() {
            if remaining < cycle_frames {
                break;
            }
        } else if source.drained() {
            break;
        }

        let wake = timer.wait(clock);
        let jitter_us = wake.jitter_us();
        if jitter_us < 0 {
            trace!(
                "audio deadline missed by {} us at cycle {}",
                -jitter_us,
                stats.cycles()
            );
        }
        let wake_interval = prev_wake
            .map(|p| duration_delta_us(wake.actual, p))
            .unwrap_or(0);
        prev_wake = Some(wake.actual);

        let mut runtime_us: i64 = 0;
        let mut drained = false;
        for _ in 0..params::SUBWRITES_PER_CYCLE {
            match source.fill(&mut scratch) {
                Chunk::Frames(frames) => {
                    let t0 = clock.now();
                    match sink.write_frames(&scratch[..frames * channels]) {
                        Ok(()) => {
                            runtime_us += duration_delta_us(clock.now(), t0);
                            source.commit(frames);
                        }
                        Err(e) => {
                            stats.underruns += 1;
                            let n = stats.underruns;
                            if n <= 10 || n % 50 == 0 {
                                warn!("underrun #{n}: {e}");
                            }
                            if let Err(e) = sink.prepare() {
                                warn!("device recovery failed: {e}");
                            }
                        }
                    }
                }
                Chunk::Empty => {
                    stats.stalls += 1;
                }
                Chunk::Drained => {
                    drained = true;
                    break;
                }
            }
        }

        if stats.cycles() % params::DELAY_SAMPLE_INTERVAL == 0 {
            if let Ok(delay) = sink.delay_frames() {
                last_delay = delay;
                debug!(
                    "cycle {}: device delay {} frames ({:.2} ms)",
                    stats.cycles(),
                    delay,
                    frames_to_ms(delay, sample_rate)
                );
            }
        }

        stats.runtime_us.push(runtime_us);
        stats.jitter_us.push(jitter_us);
        stats.wake_interval_us.push(wake_interval);
        stats.device_delay_frames.push(last_delay);
        stats.source_frames.push(source.available_frames() as i64);

        if drained {
            break;
        }
    }
}
