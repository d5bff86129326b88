//! Real-time scheduling of the writer threads.
//!
//! The LED writer runs SCHED_FIFO at the highest priority of the three
//! activities, the audio writer one step below, and the decoder stays at
//! normal priority. Promotion needs CAP_SYS_NICE; without it playback
//! still works, so failure is a warning rather than an error.

use tracing::{debug, warn};

/// Switch the calling thread to SCHED_FIFO at the given priority.
pub fn promote_current_thread(name: &str, priority: i32) {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if rc == 0 {
        debug!("{name} thread promoted to SCHED_FIFO priority {priority}");
    } else {
        warn!(
            "could not set SCHED_FIFO priority {priority} for {name} thread (errno {rc}); \
             running at normal priority"
        );
    }
}
