//! # ledshow sequencer
//!
//! Real-time audio playback with synchronized LED control for a
//! memory-mapped-GPIO single-board computer. Plays WAV (mmap fast path)
//! or MP3-style compressed sources while an independent 10 ms timeline
//! drives eight GPIO lines from a textual pattern script.
//!
//! ## Architecture
//!
//! ```text
//!                     +-------------------+
//!                     |  decoder worker   | (streams only, normal prio)
//!                     |  - decode ~100 ms |
//!                     |  - fills ring     |
//!                     +---------+---------+
//!                               | write (blocking)
//!                               v
//!                     +-------------------+
//!                     |    sample ring    | (~3 s @ 48 kHz stereo)
//!                     +---------+---------+
//!                               | read (non-blocking)
//!                               v
//! +-------------------+   +-------------------+
//! |    LED writer     |   |   audio writer    | (SCHED_FIFO 75)
//! | SCHED_FIFO 80     |   |  - 3 x 10 ms sub- |
//! | - 10 ms tick      |   |    writes / 30 ms |
//! | - shadow-reg diff |   |  - underrun retry |
//! +---------+---------+   +---------+---------+
//!           v                       v
//!      [GPIO set/clr]          [PCM device]
//! ```
//!
//! WAV sources bypass the ring: the file is mapped, locked into RAM and
//! indexed directly, so the hard real-time path takes no page faults and
//! no locks. Both writers sleep to absolute deadlines off one shared
//! monotonic clock; the timelines are musically synchronous because they
//! start together, not because they are frame-locked.

pub mod audio;
pub mod cancel;
pub mod clock;
pub mod engine;
pub mod error;
pub mod gpio;
pub mod led;
pub mod locate;
pub mod report;
pub mod rt;
pub mod stats;
pub mod udp;

pub use cancel::CancelToken;
pub use error::{Error, Result};
