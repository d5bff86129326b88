//! End-to-end playback over the WAV fast path, with fake device and
//! GPIO backends and the real clock and thread layout.

mod helpers;

use helpers::{write_patterns, write_sine_wav, FakeSink, RecordingGpio};
use ledshow_seq::audio::source::AudioKind;
use ledshow_seq::clock::MonotonicClock;
use ledshow_seq::engine::{self, PlaybackLimits, SongInputs};
use ledshow_seq::error::{Error, LoadError};
use ledshow_seq::{report, CancelToken};

fn inputs(audio: std::path::PathBuf, patterns: std::path::PathBuf) -> SongInputs {
    SongInputs {
        base: "test".into(),
        audio_path: audio,
        kind: AudioKind::Wav,
        pattern_path: patterns,
    }
}

/// One second of tone, ten 100 ms patterns: playback takes about a
/// second, the LED writer performs exactly one write pair per pattern,
/// and everything ends dark.
#[test]
fn one_second_wav_with_ten_patterns() {
    let dir = tempfile::tempdir().unwrap();
    let audio = write_sine_wav(dir.path(), "tone.wav", 44_100, 44_100);
    let lines: Vec<(u32, &str)> = (0..10)
        .map(|i| (100, if i % 2 == 0 { "11111111" } else { "00000000" }))
        .collect();
    let patterns = write_patterns(dir.path(), "tone.txt", &lines);

    let mut sink = FakeSink::new();
    let mut gpio = RecordingGpio::new();
    let clock = MonotonicClock::new();
    let cancel = CancelToken::new();

    let stats = engine::play_song(
        &inputs(audio, patterns),
        &mut sink,
        &mut gpio,
        &clock,
        &cancel,
        &PlaybackLimits::default(),
    )
    .unwrap();

    assert_eq!(stats.audio_format, "WAV");
    assert_eq!(stats.sample_rate, 44_100);
    assert_eq!(stats.channels, 1);
    assert_eq!(stats.pattern_count, 10);
    assert!(
        stats.duration_secs > 0.9 && stats.duration_secs < 1.5,
        "duration {} out of range",
        stats.duration_secs
    );

    // 33 full cycles of 3 x 441 frames; the 441-frame residual is not
    // played.
    assert_eq!(sink.frames_accepted, 43_659);
    assert_eq!(sink.configured, Some((44_100, 1)));
    assert_eq!(sink.drains, 1);
    assert_eq!(stats.audio.underruns, 0);
    assert_eq!(stats.audio.stalls, 0);

    // Exactly one set/clear pair per pattern boundary.
    assert_eq!(gpio.pattern_writes(), 10);
    assert_eq!(gpio.final_state(), 0);

    let text = report::render("test", &stats);
    assert!(text.contains("[OK] No underruns detected"));
    assert!(!text.contains("[FAIL]"));
}

/// A 100 ms file and a single 100 ms pattern wind everything down
/// almost immediately, with the LEDs cleared.
#[test]
fn short_wav_terminates_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let audio = write_sine_wav(dir.path(), "blip.wav", 44_100, 4_410);
    let patterns = write_patterns(dir.path(), "blip.txt", &[(100, "10101010")]);

    let mut sink = FakeSink::new();
    let mut gpio = RecordingGpio::new();
    let clock = MonotonicClock::new();
    let cancel = CancelToken::new();

    let wall_start = std::time::Instant::now();
    let stats = engine::play_song(
        &inputs(audio, patterns),
        &mut sink,
        &mut gpio,
        &clock,
        &cancel,
        &PlaybackLimits::default(),
    )
    .unwrap();

    assert!(stats.duration_secs < 0.5, "took {} s", stats.duration_secs);
    assert!(wall_start.elapsed().as_secs_f64() < 1.0);
    assert_eq!(gpio.pattern_writes(), 1);
    assert_eq!(gpio.final_state(), 0);
}

/// An oversized WAV is refused at load time: the device is never
/// configured and no GPIO write happens.
#[test]
fn oversized_wav_aborts_before_any_device_work() {
    let dir = tempfile::tempdir().unwrap();
    let audio = write_sine_wav(dir.path(), "long.wav", 44_100, 4_410);
    let patterns = write_patterns(dir.path(), "long.txt", &[(100, "11111111")]);

    let mut sink = FakeSink::new();
    let mut gpio = RecordingGpio::new();
    let clock = MonotonicClock::new();
    let cancel = CancelToken::new();

    let err = engine::play_song(
        &inputs(audio, patterns),
        &mut sink,
        &mut gpio,
        &clock,
        &cancel,
        &PlaybackLimits {
            max_audio_frames: 1_000,
        },
    )
    .unwrap_err();

    assert!(matches!(err, Error::Load(LoadError::Oversized { .. })));
    assert!(sink.configured.is_none());
    assert!(gpio.events.is_empty());
}

/// A missing pattern file aborts the song before the audio device is
/// touched.
#[test]
fn missing_pattern_file_aborts_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let audio = write_sine_wav(dir.path(), "tone.wav", 44_100, 44_100);
    let missing = dir.path().join("nope.txt");

    let mut sink = FakeSink::new();
    let mut gpio = RecordingGpio::new();
    let clock = MonotonicClock::new();
    let cancel = CancelToken::new();

    let err = engine::play_song(
        &inputs(audio, missing),
        &mut sink,
        &mut gpio,
        &clock,
        &cancel,
        &PlaybackLimits::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Load(LoadError::Open { .. })));
    assert!(sink.configured.is_none());
    assert_eq!(sink.write_calls, 0);
}

/// Cancellation mid-song stops both writers and still ends dark.
#[test]
fn cancellation_stops_playback_early() {
    let dir = tempfile::tempdir().unwrap();
    let audio = write_sine_wav(dir.path(), "tone.wav", 44_100, 441_000); // 10 s
    let patterns = write_patterns(dir.path(), "tone.txt", &[(10_000, "11111111")]);

    let mut sink = FakeSink::new();
    let mut gpio = RecordingGpio::new();
    let clock = MonotonicClock::new();
    let cancel = CancelToken::new();

    {
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            cancel.cancel();
        });
    }

    let stats = engine::play_song(
        &inputs(audio, patterns),
        &mut sink,
        &mut gpio,
        &clock,
        &cancel,
        &PlaybackLimits::default(),
    )
    .unwrap();

    assert!(stats.duration_secs < 2.0);
    assert_eq!(gpio.final_state(), 0);
}
