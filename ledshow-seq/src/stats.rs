//! Per-thread runtime statistics.
//!
//! The real-time threads record into fixed-capacity rings that overwrite
//! the oldest sample once full (and count what they dropped), so a long
//! playback cannot grow memory. Everything here is owned by exactly one
//! thread during playback and only read after the joins.

use ledshow_common::params;

/// Fixed-capacity measurement ring with overwrite-and-count semantics.
#[derive(Debug, Clone)]
pub struct StatsRing {
    values: Vec<i64>,
    capacity: usize,
    next: usize,
    recorded: u64,
}

impl StatsRing {
    pub fn new(capacity: usize) -> Self {
        StatsRing {
            values: Vec::with_capacity(capacity.min(4096)),
            capacity,
            next: 0,
            recorded: 0,
        }
    }

    pub fn push(&mut self, value: i64) {
        if self.values.len() < self.capacity {
            self.values.push(value);
        } else {
            self.values[self.next] = value;
            self.next = (self.next + 1) % self.capacity;
        }
        self.recorded += 1;
    }

    /// Samples currently held (≤ capacity).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total samples ever recorded, including overwritten ones.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// True once `capacity` samples have been recorded.
    pub fn is_full(&self) -> bool {
        self.recorded >= self.capacity as u64
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Min/max/mean and approximate p99 of the held samples.
    pub fn summary(&self) -> Option<Summary> {
        if self.values.is_empty() {
            return None;
        }

        let mut min = self.values[0];
        let mut max = self.values[0];
        let mut sum: i64 = 0;
        for &v in &self.values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        let mean = sum as f64 / self.values.len() as f64;

        // Approximate p99 without sorting: if fewer than 1% of samples
        // sit above 3x the mean, report the largest value below that
        // threshold, otherwise the true max.
        let threshold = (mean * 3.0) as i64;
        let mut above = 0usize;
        let mut max_below = min;
        for &v in &self.values {
            if v > threshold {
                above += 1;
            } else if v > max_below {
                max_below = v;
            }
        }
        let p99 = if above < self.values.len() / 100 {
            max_below
        } else {
            max
        };

        Some(Summary {
            min,
            max,
            mean,
            p99,
        })
    }
}

/// Summary statistics of one measurement series.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub p99: i64,
}

/// Measurements recorded by the audio writer, one entry per 30 ms cycle.
#[derive(Debug, Clone)]
pub struct AudioThreadStats {
    /// Time spent in device submission per cycle.
    pub runtime_us: StatsRing,
    /// Scheduled minus actual wake time (negative = late).
    pub jitter_us: StatsRing,
    /// Interval between consecutive wakes.
    pub wake_interval_us: StatsRing,
    /// Device buffer delay, sampled every `DELAY_SAMPLE_INTERVAL` cycles
    /// and carried forward between samples.
    pub device_delay_frames: StatsRing,
    /// Source frames still buffered (ring fill for streams, remaining
    /// file for WAV).
    pub source_frames: StatsRing,
    /// Device write failures recovered by re-preparing.
    pub underruns: u32,
    /// Cycles that found the ring empty while the decoder was still
    /// producing.
    pub stalls: u32,
}

impl AudioThreadStats {
    pub fn new() -> Self {
        AudioThreadStats {
            runtime_us: StatsRing::new(params::STATS_CAPACITY),
            jitter_us: StatsRing::new(params::STATS_CAPACITY),
            wake_interval_us: StatsRing::new(params::STATS_CAPACITY),
            device_delay_frames: StatsRing::new(params::STATS_CAPACITY),
            source_frames: StatsRing::new(params::STATS_CAPACITY),
            underruns: 0,
            stalls: 0,
        }
    }

    /// Cycles recorded so far; the writer stops at the ring capacity.
    pub fn cycles(&self) -> u64 {
        self.jitter_us.recorded()
    }
}

impl Default for AudioThreadStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Measurements recorded by the LED writer.
#[derive(Debug, Clone)]
pub struct LedThreadStats {
    /// Wake jitter per 10 ms tick (nanoseconds, negative = late).
    pub jitter_ns: StatsRing,
    /// GPIO write duration per pattern boundary (nanoseconds).
    pub write_ns: StatsRing,
}

impl LedThreadStats {
    pub fn new() -> Self {
        LedThreadStats {
            jitter_ns: StatsRing::new(params::STATS_CAPACITY),
            write_ns: StatsRing::new(params::STATS_CAPACITY),
        }
    }
}

impl Default for LedThreadStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the post-run report needs, owned per playback.
#[derive(Debug, Clone)]
pub struct PlaybackStats {
    pub audio_format: &'static str,
    pub sample_rate: u32,
    pub channels: u16,
    pub pattern_count: usize,
    pub duration_secs: f64,
    pub audio: AudioThreadStats,
    pub led: LedThreadStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_overwrites_and_counts_when_full() {
        let mut ring = StatsRing::new(4);
        for v in 0..6 {
            ring.push(v);
        }
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.recorded(), 6);
        assert!(ring.is_full());
        // 0 and 1 were overwritten by 4 and 5.
        assert_eq!(ring.values(), &[4, 5, 2, 3]);
    }

    #[test]
    fn summary_basics() {
        let mut ring = StatsRing::new(16);
        for v in [10, 20, 30, 40] {
            ring.push(v);
        }
        let s = ring.summary().unwrap();
        assert_eq!(s.min, 10);
        assert_eq!(s.max, 40);
        assert!((s.mean - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn p99_excludes_a_rare_spike() {
        let mut ring = StatsRing::new(1024);
        for _ in 0..999 {
            ring.push(100);
        }
        ring.push(10_000);
        let s = ring.summary().unwrap();
        assert_eq!(s.max, 10_000);
        assert_eq!(s.p99, 100);
    }

    #[test]
    fn empty_ring_has_no_summary() {
        assert!(StatsRing::new(8).summary().is_none());
    }
}
