//! Periodic LED writer.
//!
//! Ticks every 10 ms on an absolute deadline, holding each pattern for
//! its tick count. On a pattern boundary it computes the minimal
//! set/clear delta against a shadow of the output word and writes the
//! set register first, a full fence, then the clear register. Pins
//! outside the LED mask are never touched, and a pattern identical to
//! the previous one writes nothing but zeros (no-ops on this hardware).

use crate::cancel::CancelToken;
use crate::clock::{duration_delta_ns, Clock, DeadlineTimer};
use crate::gpio::{GpioOutputs, LED_MASK, PIN_MAP};
use crate::led::pattern::Pattern;
use crate::stats::LedThreadStats;
use ledshow_common::params;
use std::sync::atomic::{fence, Ordering};
use std::time::Duration;
use tracing::debug;

/// Register writes for one pattern boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioUpdate {
    /// Output word after the writes land.
    pub desired: u32,
    /// Bits going high this boundary.
    pub set: u32,
    /// Bits going low this boundary.
    pub clear: u32,
}

/// Diff the pattern mask against the shadow word.
///
/// Only bits that actually change appear in `set`/`clear`, and both are
/// restricted to the LED mask.
pub fn plan_update(shadow: u32, mask: u8) -> GpioUpdate {
    let mut desired = shadow;
    for (i, &pin) in PIN_MAP.iter().enumerate() {
        let bit = 1u32 << pin;
        if (mask >> (7 - i)) & 1 == 1 {
            desired |= bit;
        } else {
            desired &= !bit;
        }
    }
    GpioUpdate {
        desired,
        set: !shadow & desired & LED_MASK,
        clear: shadow & !desired & LED_MASK,
    }
}

/// Drive the pattern table front to back. Returns the final shadow word.
pub fn run(
    patterns: &[Pattern],
    gpio: &mut dyn GpioOutputs,
    clock: &dyn Clock,
    cancel: &CancelToken,
    stats: &mut LedThreadStats,
) -> u32 {
    let mut shadow = 0u32;
    let mut index = 0usize;
    let mut ticks_remaining = 0u32;
    let mut timer = DeadlineTimer::new(
        clock.now(),
        Duration::from_millis(params::LED_PERIOD_MS),
    );

    while index < patterns.len() {
        if cancel.is_cancelled() {
            debug!("LED writer: shutdown requested at pattern {index}");
            break;
        }

        let wake = timer.wait(clock);

        if ticks_remaining == 0 {
            let pattern = &patterns[index];
            let update = plan_update(shadow, pattern.mask);

            let t0 = clock.now();
            gpio.set_bits(update.set);
            // set must be observed before clear
            fence(Ordering::SeqCst);
            gpio.clear_bits(update.clear);
            shadow = update.desired;
            stats.write_ns.push(duration_delta_ns(clock.now(), t0));

            ticks_remaining = pattern.ticks();
        }

        stats.jitter_ns.push(wake.jitter_ns());

        ticks_remaining -= 1;
        if ticks_remaining == 0 {
            index += 1;
        }
    }

    shadow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::led::pattern::parse_line;

    #[derive(Default)]
    struct RecordingGpio {
        sets: Vec<u32>,
        clears: Vec<u32>,
    }

    impl RecordingGpio {
        fn state(&self) -> u32 {
            self.sets
                .iter()
                .zip(&self.clears)
                .fold(0u32, |state, (&s, &c)| (state | s) & !c)
        }
    }

    impl GpioOutputs for RecordingGpio {
        fn set_bits(&mut self, mask: u32) {
            self.sets.push(mask);
        }
        fn clear_bits(&mut self, mask: u32) {
            self.clears.push(mask);
        }
    }

    #[test]
    fn shadow_tracks_set_minus_clear_within_the_led_mask() {
        let mut shadow = 0u32;
        let mut reference = 0u32;
        for mask in [0xFFu8, 0x00, 0xA5, 0xA5, 0x5A, 0xFF, 0x01] {
            let update = plan_update(shadow, mask);
            reference = (reference | update.set) & !update.clear;
            shadow = update.desired;
            assert_eq!(shadow & LED_MASK, reference & LED_MASK);
            assert_eq!(update.set & !LED_MASK, 0);
            assert_eq!(update.clear & !LED_MASK, 0);
            // set and clear are disjoint by construction
            assert_eq!(update.set & update.clear, 0);
        }
    }

    #[test]
    fn identical_masks_produce_an_empty_diff() {
        let first = plan_update(0, 0xA5);
        let second = plan_update(first.desired, 0xA5);
        assert_eq!(second.set, 0);
        assert_eq!(second.clear, 0);
        assert_eq!(second.desired, first.desired);
    }

    #[test]
    fn all_on_sets_exactly_the_led_mask() {
        let update = plan_update(0, 0xFF);
        assert_eq!(update.set, LED_MASK);
        assert_eq!(update.clear, 0);

        let off = plan_update(update.desired, 0x00);
        assert_eq!(off.set, 0);
        assert_eq!(off.clear, LED_MASK);
        assert_eq!(off.desired, 0);
    }

    #[test]
    fn bits_outside_the_led_mask_survive() {
        let foreign = 1u32 << 9; // some pin the sequencer does not own
        let update = plan_update(foreign, 0x00);
        assert_eq!(update.desired & foreign, foreign);
        assert_eq!(update.set, 0);
        assert_eq!(update.clear, 0);
    }

    #[test]
    fn writer_consumes_the_table_and_ends_dark() {
        let patterns: Vec<_> = (0..10)
            .map(|i| {
                let bits = if i % 2 == 0 { "11111111" } else { "00000000" };
                parse_line(&format!("100 {bits}")).unwrap()
            })
            .collect();

        let mut gpio = RecordingGpio::default();
        let clock = ManualClock::new();
        let cancel = CancelToken::new();
        let mut stats = LedThreadStats::new();

        let shadow = run(&patterns, &mut gpio, &clock, &cancel, &mut stats);

        // One set/clear pair per pattern boundary, no more.
        assert_eq!(gpio.sets.len(), 10);
        assert_eq!(gpio.clears.len(), 10);
        assert_eq!(shadow, 0);
        assert_eq!(gpio.state(), 0);
        // 10 patterns x 100 ms at a 10 ms tick
        assert_eq!(stats.jitter_ns.recorded(), 100);
        assert_eq!(stats.write_ns.recorded(), 10);
        // The simulated clock wakes exactly on schedule.
        assert!(stats.jitter_ns.values().iter().all(|&j| j == 0));
    }

    #[test]
    fn cancellation_stops_the_table_early() {
        let patterns = vec![parse_line("1000 11111111").unwrap(); 5];
        let mut gpio = RecordingGpio::default();
        let clock = ManualClock::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut stats = LedThreadStats::new();

        run(&patterns, &mut gpio, &clock, &cancel, &mut stats);
        assert!(gpio.sets.is_empty());
    }
}
