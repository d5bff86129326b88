//! Post-run playback report.
//!
//! One text file per playback: format and timing summary, per-thread
//! min/max/mean/p99 statistics with threshold assessments, then the raw
//! per-cycle data as CSV for offline analysis.

use crate::stats::{PlaybackStats, StatsRing, Summary};
use chrono::Local;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

const RULE: &str =
    "================================================================================";

/// `report_<song>_<timestamp>.txt` in the working directory.
pub fn report_path(song: &str) -> PathBuf {
    PathBuf::from(format!(
        "report_{song}_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Render and write the report.
pub fn save(path: &Path, song: &str, stats: &PlaybackStats) -> std::io::Result<()> {
    std::fs::write(path, render(song, stats))?;
    info!("playback report saved to {}", path.display());
    Ok(())
}

fn summary_line(out: &mut String, label: &str, summary: Option<Summary>, unit: &str) {
    match summary {
        Some(s) => writeln!(
            out,
            "{label}min={} {unit}, max={} {unit}, avg={:.1} {unit}, p99={} {unit}",
            s.min, s.max, s.mean, s.p99
        )
        .unwrap(),
        None => writeln!(out, "{label}(no samples)").unwrap(),
    }
}

/// Worst lateness in a jitter series (jitter is negative when late).
fn worst_lateness(ring: &StatsRing) -> i64 {
    ring.summary().map(|s| (-s.min).max(0)).unwrap_or(0)
}

/// Render the full report.
pub fn render(song: &str, stats: &PlaybackStats) -> String {
    let mut out = String::new();

    writeln!(out, "{RULE}").unwrap();
    writeln!(out, "LEDSHOW PLAYBACK REPORT").unwrap();
    writeln!(out, "Song: {song}").unwrap();
    writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")).unwrap();
    writeln!(out, "{RULE}\n").unwrap();

    writeln!(out, "PLAYBACK INFO").unwrap();
    writeln!(out, "-------------").unwrap();
    writeln!(out, "Audio format:      {}", stats.audio_format).unwrap();
    writeln!(out, "Sample rate:       {} Hz", stats.sample_rate).unwrap();
    writeln!(out, "Channels:          {}", stats.channels).unwrap();
    writeln!(out, "Pattern count:     {}", stats.pattern_count).unwrap();
    writeln!(out, "Duration:          {:.2} sec\n", stats.duration_secs).unwrap();

    let audio = &stats.audio;
    if !audio.jitter_us.is_empty() {
        writeln!(
            out,
            "AUDIO THREAD STATISTICS ({} cycles)",
            audio.jitter_us.recorded()
        )
        .unwrap();
        writeln!(out, "--------------------------------------").unwrap();
        summary_line(&mut out, "Processing time:   ", audio.runtime_us.summary(), "us");
        summary_line(&mut out, "Wake jitter:       ", audio.jitter_us.summary(), "us");
        summary_line(
            &mut out,
            "Wake interval:     ",
            audio.wake_interval_us.summary(),
            "us",
        );
        summary_line(
            &mut out,
            "Device buffer:     ",
            audio.device_delay_frames.summary(),
            "frames",
        );
        summary_line(
            &mut out,
            "Source buffer:     ",
            audio.source_frames.summary(),
            "frames",
        );
        writeln!(out, "Underruns:         {}", audio.underruns).unwrap();
        writeln!(out, "Buffer stalls:     {}\n", audio.stalls).unwrap();

        writeln!(out, "AUDIO QUALITY ASSESSMENT").unwrap();
        writeln!(out, "------------------------").unwrap();
        if audio.underruns == 0 {
            writeln!(out, "[OK] No underruns detected").unwrap();
        } else if audio.underruns < 5 {
            writeln!(
                out,
                "[WARN] {} underruns detected - minor audio glitches possible",
                audio.underruns
            )
            .unwrap();
        } else {
            writeln!(
                out,
                "[FAIL] {} underruns detected - audio quality degraded",
                audio.underruns
            )
            .unwrap();
        }

        let late_us = worst_lateness(&audio.jitter_us);
        if late_us < 5_000 {
            writeln!(out, "[OK] Scheduling jitter within limits (max {late_us} us late)").unwrap();
        } else if late_us < 15_000 {
            writeln!(out, "[WARN] Scheduling jitter elevated (max {late_us} us late)").unwrap();
        } else {
            writeln!(out, "[FAIL] Scheduling jitter too high (max {late_us} us late)").unwrap();
        }

        if audio.stalls == 0 {
            writeln!(out, "[OK] No decoder stalls").unwrap();
        } else {
            writeln!(
                out,
                "[WARN] {} decoder stalls - decoding may be too slow",
                audio.stalls
            )
            .unwrap();
        }
        writeln!(out).unwrap();
    }

    let led = &stats.led;
    if !led.jitter_ns.is_empty() {
        writeln!(
            out,
            "LED THREAD STATISTICS ({} ticks)",
            led.jitter_ns.recorded()
        )
        .unwrap();
        writeln!(out, "-----------------------------------").unwrap();
        if let Some(s) = led.write_ns.summary() {
            writeln!(
                out,
                "GPIO write time:   min={:.2} us, max={:.2} us, avg={:.2} us",
                s.min as f64 / 1000.0,
                s.max as f64 / 1000.0,
                s.mean / 1000.0
            )
            .unwrap();
        }
        if let Some(s) = led.jitter_ns.summary() {
            writeln!(
                out,
                "Wake jitter:       min={:.2} us, max={:.2} us, avg={:.2} us, p99={:.2} us",
                s.min as f64 / 1000.0,
                s.max as f64 / 1000.0,
                s.mean / 1000.0,
                s.p99 as f64 / 1000.0
            )
            .unwrap();
        }

        writeln!(out, "\nLED QUALITY ASSESSMENT").unwrap();
        writeln!(out, "----------------------").unwrap();
        let late_us = worst_lateness(&led.jitter_ns) / 1000;
        if late_us < 1_000 {
            writeln!(out, "[OK] LED timing jitter within limits (max {late_us} us late)").unwrap();
        } else if late_us < 5_000 {
            writeln!(out, "[WARN] LED timing jitter elevated (max {late_us} us late)").unwrap();
        } else {
            writeln!(out, "[FAIL] LED timing jitter too high (max {late_us} us late)").unwrap();
        }
        writeln!(out).unwrap();
    }

    writeln!(out, "{RULE}").unwrap();
    writeln!(out, "RAW DATA (CSV format)").unwrap();
    writeln!(out, "{RULE}\n").unwrap();

    if !audio.jitter_us.is_empty() {
        writeln!(out, "# Audio thread data").unwrap();
        writeln!(
            out,
            "audio_index,runtime_us,jitter_us,wake_interval_us,device_delay_frames,source_frames"
        )
        .unwrap();
        let runtime = audio.runtime_us.values();
        let jitter = audio.jitter_us.values();
        let interval = audio.wake_interval_us.values();
        let delay = audio.device_delay_frames.values();
        let source = audio.source_frames.values();
        for i in 0..jitter.len() {
            writeln!(
                out,
                "{i},{},{},{},{},{}",
                runtime.get(i).copied().unwrap_or(0),
                jitter[i],
                interval.get(i).copied().unwrap_or(0),
                delay.get(i).copied().unwrap_or(0),
                source.get(i).copied().unwrap_or(0)
            )
            .unwrap();
        }
        writeln!(out).unwrap();
    }

    if !led.jitter_ns.is_empty() {
        writeln!(out, "# LED thread data").unwrap();
        writeln!(out, "led_index,jitter_ns").unwrap();
        for (i, v) in led.jitter_ns.values().iter().enumerate() {
            writeln!(out, "{i},{v}").unwrap();
        }
        writeln!(out).unwrap();
        writeln!(out, "# LED pattern writes").unwrap();
        writeln!(out, "write_index,write_ns").unwrap();
        for (i, v) in led.write_ns.values().iter().enumerate() {
            writeln!(out, "{i},{v}").unwrap();
        }
    }

    out
}
