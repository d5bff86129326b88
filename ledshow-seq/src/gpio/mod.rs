//! Memory-mapped GPIO access.
//!
//! Maps the SoC's GPIO register window out of `/dev/mem` and exposes
//! the three operations the system needs: function-select to output,
//! set, and clear. The set- and clear-only registers make single-bit
//! updates atomic — writing 0 to either is a no-op — which is what the
//! LED writer's shadow-register diff discipline relies on.

use crate::error::GpioError;
use ledshow_common::Board;
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use tracing::info;

/// Physical pin for each logical LED, MSB of the pattern mask first.
pub const PIN_MAP: [u32; 8] = [22, 5, 6, 26, 23, 24, 25, 16];

/// Every pin the sequencer drives, as a GPSET0/GPCLR0 mask.
pub const LED_MASK: u32 = {
    let mut mask = 0u32;
    let mut i = 0;
    while i < PIN_MAP.len() {
        mask |= 1 << PIN_MAP[i];
        i += 1;
    }
    mask
};

/// Register window length: GPFSEL0 through the last GPIO register.
pub const GPIO_WINDOW_LEN: usize = 0xB4;

const GPSET0: usize = 0x1C;
const GPCLR0: usize = 0x28;

/// The two register writes the LED writer performs. Implemented by the
/// hardware mapping and by recording fakes in tests.
pub trait GpioOutputs: Send {
    /// Drive the masked pins high (GPSET0; zeros are no-ops).
    fn set_bits(&mut self, mask: u32);

    /// Drive the masked pins low (GPCLR0; zeros are no-ops).
    fn clear_bits(&mut self, mask: u32);
}

/// GPIO register window mapped from `/dev/mem`.
pub struct MemGpio {
    map: MmapMut,
}

impl MemGpio {
    /// Map the register window for the configured board generation.
    pub fn map(board: Board) -> Result<Self, GpioError> {
        let base = board.gpio_base();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")
            .map_err(GpioError::OpenMem)?;
        let map = unsafe {
            MmapOptions::new()
                .offset(base)
                .len(GPIO_WINDOW_LEN)
                .map_mut(&file)
        }
        .map_err(|source| GpioError::Map { base, source })?;

        info!("GPIO window mapped at {base:#x} ({GPIO_WINDOW_LEN:#x} bytes)");
        Ok(MemGpio { map })
    }

    fn reg(&mut self, byte_offset: usize) -> *mut u32 {
        debug_assert!(byte_offset + 4 <= GPIO_WINDOW_LEN);
        unsafe { self.map.as_mut_ptr().add(byte_offset) as *mut u32 }
    }

    /// Configure every LED pin as an output and drive it low.
    pub fn init_outputs(&mut self) {
        for &pin in &PIN_MAP {
            let fsel = (pin / 10) as usize * 4;
            let shift = (pin % 10) * 3;
            unsafe {
                let reg = self.reg(fsel);
                let current = std::ptr::read_volatile(reg);
                // function 0b001 = output
                std::ptr::write_volatile(reg, (current & !(0b111 << shift)) | (0b001 << shift));
            }
        }
        self.clear_bits(LED_MASK);
        info!("GPIO pins {PIN_MAP:?} configured as outputs, all low");
    }
}

impl GpioOutputs for MemGpio {
    fn set_bits(&mut self, mask: u32) {
        let reg = self.reg(GPSET0);
        unsafe { std::ptr::write_volatile(reg, mask) }
    }

    fn clear_bits(&mut self, mask: u32) {
        let reg = self.reg(GPCLR0);
        unsafe { std::ptr::write_volatile(reg, mask) }
    }
}
