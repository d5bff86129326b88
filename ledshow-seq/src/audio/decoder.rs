//! Decoder worker: keeps the ring buffer fed from a compressed source.
//!
//! The worker runs at normal priority and spends its life in a simple
//! loop: decode up to ~100 ms of frames, block on "space available"
//! while pushing them into the ring, repeat. End of stream and decode
//! failure both leave the ring in a finished state so the audio writer
//! drains and terminates naturally.

use crate::audio::ring::{SampleRing, StreamStatus};
use crate::error::DecodeError;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Source of decoded PCM, chunk by chunk.
///
/// The production implementation wraps symphonia; tests substitute
/// synthetic decoders to drive the streamed playback path without
/// compressed fixtures.
pub trait PcmDecoder: Send {
    fn sample_rate(&self) -> u32;

    /// Output channel count (the decoded stream is coerced to this).
    fn channels(&self) -> u16;

    /// Total frames when the container knows it, 0 otherwise.
    fn total_frames(&self) -> u64;

    /// Decode the next chunk (bounded to roughly 100 ms) of interleaved
    /// samples into `out`, replacing its contents. Returns the number of
    /// frames produced; 0 means end of stream.
    fn next_chunk(&mut self, out: &mut Vec<i16>) -> Result<usize, DecodeError>;
}

/// Handle to the running decoder thread.
pub struct DecoderWorker {
    ring: Arc<SampleRing>,
    handle: Option<JoinHandle<()>>,
}

impl DecoderWorker {
    /// Spawn the worker. The ring reflects its progress: `Finished` on
    /// end of stream, `Errored` on decode failure.
    pub fn spawn(
        mut decoder: Box<dyn PcmDecoder>,
        ring: Arc<SampleRing>,
    ) -> std::io::Result<Self> {
        let worker_ring = Arc::clone(&ring);
        let handle = std::thread::Builder::new()
            .name("decoder".into())
            .spawn(move || {
                let mut chunk = Vec::new();
                loop {
                    if worker_ring.is_aborted() {
                        break;
                    }
                    match decoder.next_chunk(&mut chunk) {
                        Ok(0) => {
                            debug!("decoder reached end of stream");
                            worker_ring.mark_finished();
                            break;
                        }
                        Ok(_) => {
                            let wrote = worker_ring.write(&chunk);
                            if wrote < chunk.len() {
                                // aborted while blocked on space
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("decode failed mid-stream: {e}");
                            worker_ring.mark_error();
                            break;
                        }
                    }
                }
                if worker_ring.poll_status() == StreamStatus::Producing {
                    worker_ring.mark_finished();
                }
            })?;

        Ok(DecoderWorker {
            ring,
            handle: Some(handle),
        })
    }

    /// Abort the ring and wait up to `timeout` for the worker to exit.
    ///
    /// A decoder stuck inside the codec cannot be interrupted, so after
    /// the timeout the handle is detached instead of hanging the
    /// orchestrator.
    pub fn shutdown(&mut self, timeout: Duration) {
        self.ring.abort();
        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + timeout;
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!("decoder did not stop within {timeout:?}; detaching its thread");
            }
        }
    }
}

impl Drop for DecoderWorker {
    fn drop(&mut self) {
        self.ring.abort();
        // an un-shutdown handle is detached; the worker exits at its
        // next wait point
    }
}
