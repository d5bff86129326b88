//! Output device abstraction.
//!
//! The engine talks to the device through `PcmSink`, so playback logic
//! and tests never depend on real hardware. The ALSA implementation
//! (behind the `alsa-backend` feature) configures the device the way
//! the timing design expects: S16LE interleaved, native rate and
//! channel count, ~10 ms periods, a 12-period buffer, and a silence
//! pre-fill followed by drop+prepare so a new song never plays the tail
//! of the previous one.

use crate::error::DeviceError;

/// Push-mode PCM output device.
pub trait PcmSink: Send {
    /// Apply hardware parameters and leave the device prepared with a
    /// silent pre-fill flushed away.
    fn configure(&mut self, sample_rate: u32, channels: u16) -> Result<(), DeviceError>;

    /// Submit interleaved frames; blocks until the device accepts them.
    /// An error usually means the device underran.
    fn write_frames(&mut self, interleaved: &[i16]) -> Result<(), DeviceError>;

    /// Recover the device after a failed write.
    fn prepare(&mut self) -> Result<(), DeviceError>;

    /// Frames currently queued in the device buffer.
    fn delay_frames(&mut self) -> Result<i64, DeviceError>;

    /// Let buffered audio play out at end of song.
    fn drain(&mut self) -> Result<(), DeviceError>;
}

#[cfg(feature = "alsa-backend")]
pub use self::alsa_backend::{set_hw_volume, AlsaSink};

#[cfg(feature = "alsa-backend")]
mod alsa_backend {
    use super::PcmSink;
    use crate::error::DeviceError;
    use alsa::pcm::{Access, Format, Frames, HwParams, PCM};
    use alsa::{Direction, ValueOr};
    use ledshow_common::params;
    use tracing::{debug, info};

    fn dev_err(context: &str) -> impl Fn(alsa::Error) -> DeviceError + '_ {
        move |e| DeviceError::Configure(format!("{context}: {e}"))
    }

    /// Real output device driven through the ALSA PCM API.
    pub struct AlsaSink {
        pcm: PCM,
        channels: usize,
    }

    impl AlsaSink {
        pub fn open(device: &str) -> Result<Self, DeviceError> {
            let pcm = PCM::new(device, Direction::Playback, false).map_err(|e| {
                DeviceError::Open {
                    device: device.to_string(),
                    reason: e.to_string(),
                }
            })?;
            info!("audio device '{device}' opened");
            Ok(AlsaSink { pcm, channels: 2 })
        }
    }

    impl PcmSink for AlsaSink {
        fn configure(&mut self, sample_rate: u32, channels: u16) -> Result<(), DeviceError> {
            let period_frames =
                (sample_rate as u64 * params::DEVICE_PERIOD_MS / 1000) as Frames;
            {
                let hwp = HwParams::any(&self.pcm).map_err(dev_err("hw params"))?;
                hwp.set_access(Access::RWInterleaved)
                    .map_err(dev_err("access"))?;
                hwp.set_format(Format::s16()).map_err(dev_err("format"))?;
                hwp.set_channels(channels as u32)
                    .map_err(dev_err("channels"))?;
                hwp.set_rate(sample_rate, ValueOr::Nearest)
                    .map_err(dev_err("rate"))?;
                hwp.set_period_size_near(period_frames, ValueOr::Nearest)
                    .map_err(dev_err("period size"))?;
                hwp.set_buffer_size_near(
                    period_frames * params::DEVICE_BUFFER_PERIODS as Frames,
                )
                .map_err(dev_err("buffer size"))?;
                self.pcm.hw_params(&hwp).map_err(dev_err("apply hw params"))?;
            }
            self.pcm.prepare().map_err(dev_err("prepare"))?;

            // Flush residual audio from a previous song: a few silent
            // periods, then reset the buffer pointers.
            let silence = vec![0i16; period_frames as usize * channels as usize];
            {
                let io = self.pcm.io_i16().map_err(dev_err("io"))?;
                for _ in 0..params::SILENCE_PREFILL_PERIODS {
                    let _ = io.writei(&silence);
                }
            }
            self.pcm.drop().map_err(dev_err("drop"))?;
            self.pcm.prepare().map_err(dev_err("re-prepare"))?;

            self.channels = channels as usize;
            debug!(
                "device configured: {} Hz, {} ch, period {} frames, buffer {} frames",
                sample_rate,
                channels,
                period_frames,
                period_frames * params::DEVICE_BUFFER_PERIODS as Frames
            );
            Ok(())
        }

        fn write_frames(&mut self, interleaved: &[i16]) -> Result<(), DeviceError> {
            let io = self
                .pcm
                .io_i16()
                .map_err(|e| DeviceError::Write(e.to_string()))?;
            io.writei(interleaved)
                .map(|_| ())
                .map_err(|e| DeviceError::Write(e.to_string()))
        }

        fn prepare(&mut self) -> Result<(), DeviceError> {
            self.pcm
                .prepare()
                .map_err(|e| DeviceError::Other(e.to_string()))
        }

        fn delay_frames(&mut self) -> Result<i64, DeviceError> {
            self.pcm
                .delay()
                .map(|f| f as i64)
                .map_err(|e| DeviceError::Other(e.to_string()))
        }

        fn drain(&mut self) -> Result<(), DeviceError> {
            self.pcm
                .drain()
                .map_err(|e| DeviceError::Other(e.to_string()))
        }
    }

    /// Set the hardware mixer once at startup; 0..=100 maps onto the
    /// element's native range.
    pub fn set_hw_volume(card: &str, control: &str, percent: u8) -> Result<(), DeviceError> {
        use alsa::mixer::{Mixer, SelemId};

        let mixer = Mixer::new(card, false).map_err(|e| DeviceError::Other(e.to_string()))?;
        let id = SelemId::new(control, 0);
        let selem = mixer
            .find_selem(&id)
            .ok_or_else(|| DeviceError::Other(format!("mixer control '{control}' not found")))?;

        let (min, max) = selem.get_playback_volume_range();
        let percent = percent.min(100) as i64;
        let volume = min + (max - min) * percent / 100;
        selem
            .set_playback_volume_all(volume)
            .map_err(|e| DeviceError::Other(e.to_string()))?;
        info!("hardware volume set to {percent}% ({volume} raw)");
        Ok(())
    }
}
