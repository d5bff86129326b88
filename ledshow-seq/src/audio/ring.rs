//! Single-producer / single-consumer ring of interleaved PCM samples.
//!
//! Shared between the decoder worker (producer) and the audio writer
//! (consumer). Positions are published with Release and read with
//! Acquire so each side always observes a self-consistent pair; the
//! mutex + condvar pair exists only for the producer's blocking write,
//! the consumer's pre-roll wait, and abort wakeups. One slot stays
//! unused to distinguish full from empty.
//!
//! ## Invariants
//!
//! - `write_pos` is mutated only by the producer, `read_pos` only by
//!   the consumer.
//! - `used = (write_pos - read_pos) mod capacity`,
//!   `space = capacity - used - 1`.
//! - Wrap-around copies split into at most two contiguous segments.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

/// Producer-side lifecycle of the stream feeding the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// The decoder is still producing samples.
    Producing,
    /// End of stream; whatever is buffered is all there will be.
    Finished,
    /// The decoder failed; also implies finished.
    Errored,
}

const STATUS_PRODUCING: u8 = 0;
const STATUS_FINISHED: u8 = 1;
const STATUS_ERRORED: u8 = 2;

pub struct SampleRing {
    buf: Box<[UnsafeCell<i16>]>,
    capacity: usize,
    channels: usize,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
    status: AtomicU8,
    aborted: AtomicBool,
    lock: Mutex<()>,
    space_avail: Condvar,
    data_avail: Condvar,
}

// Safety: the buffer is accessed through raw pointers under the SPSC
// discipline above; producer and consumer never touch the same region
// because used/space bound their copies and positions are release/acquire.
unsafe impl Send for SampleRing {}
unsafe impl Sync for SampleRing {}

impl SampleRing {
    pub fn new(capacity: usize, channels: usize) -> Self {
        assert!(capacity > channels && channels > 0);
        SampleRing {
            buf: (0..capacity).map(|_| UnsafeCell::new(0)).collect(),
            capacity,
            channels,
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            status: AtomicU8::new(STATUS_PRODUCING),
            aborted: AtomicBool::new(false),
            lock: Mutex::new(()),
            space_avail: Condvar::new(),
            data_avail: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn used(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        let r = self.read_pos.load(Ordering::Acquire);
        (w + self.capacity - r) % self.capacity
    }

    fn space(&self) -> usize {
        self.capacity - self.used() - 1
    }

    /// Buffered samples.
    pub fn available_samples(&self) -> usize {
        self.used()
    }

    /// Buffered whole frames.
    pub fn available_frames(&self) -> usize {
        self.used() / self.channels
    }

    pub fn poll_status(&self) -> StreamStatus {
        match self.status.load(Ordering::Acquire) {
            STATUS_FINISHED => StreamStatus::Finished,
            STATUS_ERRORED => StreamStatus::Errored,
            _ => StreamStatus::Producing,
        }
    }

    /// End of stream reached; wakes the pre-roll waiter.
    pub fn mark_finished(&self) {
        self.status.store(STATUS_FINISHED, Ordering::Release);
        let _guard = self.lock.lock().unwrap();
        self.data_avail.notify_all();
    }

    /// Decode failure; an errored stream is also finished.
    pub fn mark_error(&self) {
        self.status.store(STATUS_ERRORED, Ordering::Release);
        let _guard = self.lock.lock().unwrap();
        self.data_avail.notify_all();
    }

    /// Wake every waiter and make further writes return early.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
        let _guard = self.lock.lock().unwrap();
        self.space_avail.notify_all();
        self.data_avail.notify_all();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Copy every sample into the ring, blocking on "space available".
    ///
    /// Returns the number of samples written, which is less than
    /// `samples.len()` only when the ring was aborted mid-write.
    pub fn write(&self, samples: &[i16]) -> usize {
        let mut written = 0;
        while written < samples.len() {
            if self.is_aborted() {
                break;
            }

            let space = self.space();
            if space < self.channels.max(2) {
                let mut guard = self.lock.lock().unwrap();
                loop {
                    if self.is_aborted() {
                        return written;
                    }
                    if self.space() >= self.channels.max(2) {
                        break;
                    }
                    guard = self.space_avail.wait(guard).unwrap();
                }
                drop(guard);
                continue;
            }

            let w = self.write_pos.load(Ordering::Relaxed);
            let n = space.min(samples.len() - written);
            let first = n.min(self.capacity - w);
            let base = self.buf.as_ptr() as *mut i16;
            unsafe {
                std::ptr::copy_nonoverlapping(samples.as_ptr().add(written), base.add(w), first);
                if n > first {
                    std::ptr::copy_nonoverlapping(
                        samples.as_ptr().add(written + first),
                        base,
                        n - first,
                    );
                }
            }
            self.write_pos.store((w + n) % self.capacity, Ordering::Release);
            written += n;

            let _guard = self.lock.lock().unwrap();
            self.data_avail.notify_all();
        }
        written
    }

    /// Copy up to `out.len()` samples, aligned down to a whole frame.
    ///
    /// Never blocks; returns 0 when the ring is empty.
    pub fn read(&self, out: &mut [i16]) -> usize {
        let r = self.read_pos.load(Ordering::Relaxed);
        let w = self.write_pos.load(Ordering::Acquire);
        let used = (w + self.capacity - r) % self.capacity;

        let mut n = used.min(out.len());
        n -= n % self.channels;
        if n == 0 {
            return 0;
        }

        let first = n.min(self.capacity - r);
        let base = self.buf.as_ptr() as *const i16;
        unsafe {
            std::ptr::copy_nonoverlapping(base.add(r), out.as_mut_ptr(), first);
            if n > first {
                std::ptr::copy_nonoverlapping(base, out.as_mut_ptr().add(first), n - first);
            }
        }
        self.read_pos.store((r + n) % self.capacity, Ordering::Release);

        let _guard = self.lock.lock().unwrap();
        self.space_avail.notify_all();
        n
    }

    /// Block until at least `min_frames` are buffered, the producer is
    /// done, or the ring is aborted. Returns the status at wake-up.
    pub fn wait_min_frames(&self, min_frames: usize) -> StreamStatus {
        let mut guard = self.lock.lock().unwrap();
        loop {
            let status = self.poll_status();
            if status != StreamStatus::Producing
                || self.available_frames() >= min_frames
                || self.is_aborted()
            {
                return status;
            }
            guard = self.data_avail.wait(guard).unwrap();
        }
    }
}
