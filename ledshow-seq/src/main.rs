//! ledshow sequencer binary: CLI, interactive menu, and wiring of the
//! real backends (ALSA device, `/dev/mem` GPIO) into the playback
//! engine.
//!
//! Needs CAP_SYS_RAWIO (GPIO mapping) and CAP_SYS_NICE (SCHED_FIFO) to
//! run unprivileged; without the latter it degrades to normal-priority
//! scheduling with a warning.

use anyhow::Result;
use clap::Parser;
use ledshow_common::{params, Config};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledshow_seq::audio::sink::PcmSink;
use ledshow_seq::clock::MonotonicClock;
use ledshow_seq::engine::{self, PlaybackLimits};
use ledshow_seq::error::Error;
use ledshow_seq::gpio::{GpioOutputs, MemGpio, LED_MASK};
use ledshow_seq::{locate, report, udp, CancelToken};

#[derive(Parser, Debug)]
#[command(name = "ledshow-seq")]
#[command(about = "Audio-synchronized LED sequencer")]
#[command(version)]
struct Args {
    /// Verbose mode (per-cycle timing diagnostics)
    #[arg(short, long)]
    verbose: bool,

    /// Music directory (overrides config file)
    #[arg(short, long)]
    music_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Song base name to play directly (without .wav/.txt); no argument
    /// enters the interactive menu
    song: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "ledshow_seq=debug,ledshow_common=debug"
    } else {
        "ledshow_seq=info,ledshow_common=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting ledshow sequencer");

    let config = Config::load(args.config.as_deref(), args.music_dir.clone(), args.verbose)?;
    info!(
        "configuration: music_dir={}, device='{}', board={:?}",
        config.music_dir.display(),
        config.audio_device,
        config.board
    );

    let cancel = CancelToken::new();
    {
        // The handler only trips the token; LED clearing happens on the
        // main path once the writers have observed it.
        let token = cancel.clone();
        ctrlc::set_handler(move || token.cancel())?;
    }

    info!("Initializing GPIO...");
    let mut gpio = MemGpio::map(config.board).map_err(Error::Gpio)?;
    gpio.init_outputs();

    apply_hw_volume(&config);

    let clock = MonotonicClock::new();
    let limits = PlaybackLimits::default();

    let outcome = match args.song.as_deref() {
        Some(song) => run_song(&config, song, &mut gpio, &clock, &cancel, &limits),
        None => menu_loop(&config, &mut gpio, &clock, &cancel, &limits),
    };

    // Whatever happened, leave the lights dark.
    gpio.clear_bits(LED_MASK);
    info!("GPIO cleared. Goodbye.");

    outcome
}

/// Locate, play, and report one song.
fn run_song(
    config: &Config,
    song: &str,
    gpio: &mut dyn GpioOutputs,
    clock: &MonotonicClock,
    cancel: &CancelToken,
    limits: &PlaybackLimits,
) -> Result<()> {
    let inputs = locate::locate_song(&config.music_dir, song).map_err(Error::Load)?;
    let mut sink = open_sink(config)?;
    let stats = engine::play_song(&inputs, sink.as_mut(), gpio, clock, cancel, limits)?;

    let path = report::report_path(song);
    report::save(&path, song, &stats)?;
    Ok(())
}

/// Interactive menu when no song was given on the command line.
fn menu_loop(
    config: &Config,
    gpio: &mut dyn GpioOutputs,
    clock: &MonotonicClock,
    cancel: &CancelToken,
    limits: &PlaybackLimits,
) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        println!("\n=== LED + Music Sequencer ===");
        println!("1) Play song manually");
        println!("2) Receive song name via UDP");
        println!("3) Exit");
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break; // EOF
        };

        match line.trim() {
            "1" => {
                print!("Enter song base name (without .wav/.txt): ");
                std::io::stdout().flush()?;
                let Some(base) = lines.next().transpose()? else {
                    break;
                };
                let base = base.trim().to_string();
                if base.is_empty() {
                    println!("Empty name, returning to menu.");
                    continue;
                }
                if let Err(e) = run_song(config, &base, gpio, clock, cancel, limits) {
                    error!("playback of '{base}' failed: {e}");
                }
            }
            "2" => {
                println!(
                    "Waiting for UDP announcement on port {} ({} s timeout)...",
                    config.udp_port,
                    params::UDP_TIMEOUT_SECS
                );
                match udp::receive_song(
                    config.udp_port,
                    Duration::from_secs(params::UDP_TIMEOUT_SECS),
                ) {
                    Ok(song) => {
                        print!("UDP provided song '{song}'. Play it? (y/n): ");
                        std::io::stdout().flush()?;
                        let Some(answer) = lines.next().transpose()? else {
                            break;
                        };
                        if answer.trim().eq_ignore_ascii_case("y") {
                            if let Err(e) = run_song(config, &song, gpio, clock, cancel, limits) {
                                error!("playback of '{song}' failed: {e}");
                            }
                        } else {
                            println!("Canceled, returning to menu.");
                        }
                    }
                    Err(e) => println!("No valid UDP song received: {e}"),
                }
            }
            "3" => {
                println!("Exiting.");
                break;
            }
            other => println!("Invalid choice '{other}'. Try again."),
        }
    }

    Ok(())
}

#[cfg(feature = "alsa-backend")]
fn open_sink(config: &Config) -> Result<Box<dyn PcmSink>> {
    use ledshow_seq::audio::sink::AlsaSink;
    Ok(Box::new(
        AlsaSink::open(&config.audio_device).map_err(Error::Device)?,
    ))
}

#[cfg(not(feature = "alsa-backend"))]
fn open_sink(_config: &Config) -> Result<Box<dyn PcmSink>> {
    Err(Error::Device(ledshow_seq::error::DeviceError::BackendUnavailable).into())
}

#[cfg(feature = "alsa-backend")]
fn apply_hw_volume(config: &Config) {
    use ledshow_seq::audio::sink::set_hw_volume;
    use tracing::warn;

    if let Some(percent) = config.volume_percent {
        if let Err(e) = set_hw_volume("default", &config.mixer_control, percent) {
            warn!("could not set hardware volume: {e}");
        }
    }
}

#[cfg(not(feature = "alsa-backend"))]
fn apply_hw_volume(_config: &Config) {}
