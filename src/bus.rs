//! Bus snapshots and the platform line sampler.

mod gpio;
mod trace;

pub use gpio::SysfsGpio;
pub use trace::{BusTrace, RecordingSampler, ReplaySampler};

use crate::mapping::Address;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::io;

pub const ADDRESS_LINES: usize = 24;

bitflags! {
    /// Control lines, in logical (asserted = set) form.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ControlLines: u8 {
        const READ = 0b0000_0001;
        const WRITE = 0b0000_0010;
        const CART = 0b0000_0100;
    }
}

/// One look at the address bus and control lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusSample {
    pub address: Address,
    pub control: ControlLines,
}

impl BusSample {
    pub fn new(address: u32, control: ControlLines) -> Self {
        Self {
            address: Address::new(address),
            control,
        }
    }

    #[inline]
    pub fn cart_selected(&self) -> bool {
        self.control.contains(ControlLines::CART)
    }

    #[inline]
    pub fn reading(&self) -> bool {
        self.control.contains(ControlLines::READ)
    }

    #[inline]
    pub fn writing(&self) -> bool {
        self.control.contains(ControlLines::WRITE)
    }
}

/// Source of bus snapshots polled by the cartridge loop.
///
/// Implementations that can latch every line in one register read should
/// do so; reading lines one by one while the bus moves can mix two
/// addresses into one sample.
pub trait BusSampler {
    fn sample(&mut self) -> io::Result<BusSample>;

    /// True once a finite source has nothing left to give.
    fn exhausted(&self) -> bool {
        false
    }
}

/// Platform layer exposing single line levels.
pub trait GpioLines {
    fn read_line(&mut self, line: u8) -> io::Result<bool>;
}

/// Which platform line carries each bus signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLayout {
    /// Line numbers for A0..A23, in bit order.
    pub address: [u8; ADDRESS_LINES],
    pub read: u8,
    pub write: u8,
    pub cart: u8,
    /// Control lines read low when asserted.
    pub control_active_low: bool,
}

impl PinLayout {
    /// Reference wiring of the bridge board (wiringPi numbering).
    pub const fn wiring() -> Self {
        Self {
            address: [
                29, 28, 27, 26, 31, 11, 10, 6, // A0-A7
                5, 4, 1, 16, 15, 8, 9, 7, // A8-A15
                0, 2, 3, 12, 13, 14, 30, 21, // A16-A23
            ],
            read: 24,
            write: 23,
            cart: 22,
            control_active_low: false,
        }
    }

    /// Every line the sampler touches: control lines first.
    pub fn lines(&self) -> impl Iterator<Item = u8> + '_ {
        [self.cart, self.read, self.write]
            .into_iter()
            .chain(self.address.iter().copied())
    }
}

impl Default for PinLayout {
    fn default() -> Self {
        Self::wiring()
    }
}

/// Assembles snapshots from individual line reads.
///
/// Order per sample: cart-select, then A0..A23 (only while selected),
/// then read and write strobes.
pub struct PinSampler<G: GpioLines> {
    gpio: G,
    layout: PinLayout,
}

impl<G: GpioLines> PinSampler<G> {
    pub fn new(gpio: G, layout: PinLayout) -> Self {
        Self { gpio, layout }
    }

    fn control(&mut self, line: u8) -> io::Result<bool> {
        let level = self.gpio.read_line(line)?;
        Ok(level != self.layout.control_active_low)
    }

    fn address(&mut self) -> io::Result<u32> {
        let mut raw = 0u32;
        for (bit, &line) in self.layout.address.iter().enumerate() {
            if self.gpio.read_line(line)? {
                raw |= 1 << bit;
            }
        }
        Ok(raw)
    }
}

impl<G: GpioLines> BusSampler for PinSampler<G> {
    fn sample(&mut self) -> io::Result<BusSample> {
        if !self.control(self.layout.cart)? {
            return Ok(BusSample::default());
        }
        let address = self.address()?;
        let mut control = ControlLines::CART;
        control.set(ControlLines::READ, self.control(self.layout.read)?);
        control.set(ControlLines::WRITE, self.control(self.layout.write)?);
        Ok(BusSample::new(address, control))
    }
}
