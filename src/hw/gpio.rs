// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! General-purpose I/O.
//!
//! A [`Pin`] owns one `(port, index)` line. Construction gates the port clock through the
//! [`ClockGate`] it is handed and then writes the pin's 4-bit field in CRL (pins 0..=7) or CRH
//! (pins 8..=15):
//!
//! | bits | meaning |
//! | ---- | ------- |
//! | `[1:0]` MODE | `00` input, `01` output 10 MHz, `10` output 2 MHz, `11` output 50 MHz |
//! | `[3:2]` CNF  | input: analog / floating / pull; output: push-pull / open-drain / AF variants |
//!
//! Output levels are driven through BSRR, which is a single store and therefore safe to use from
//! interrupt and foreground context at the same time on different pins of one port. Configuration
//! is a read-modify-write of CRL/CRH and is *not*: pins sharing a register half must be
//! configured from one context.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

use super::rcc::{ClockGate, Peripheral};
use super::regs::{map, Registers};
use crate::Error;

/// GPIO register offsets.
pub mod reg {
    pub const CRL: u32 = 0x00;
    pub const CRH: u32 = 0x04;
    pub const IDR: u32 = 0x08;
    pub const ODR: u32 = 0x0C;
    pub const BSRR: u32 = 0x10;
    pub const BRR: u32 = 0x14;
}

/// GPIO port.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
    C,
}

impl Port {
    /// Base address of the port's register block.
    #[inline]
    pub fn base(self) -> u32 {
        match self {
            Port::A => map::GPIOA,
            Port::B => map::GPIOB,
            Port::C => map::GPIOC,
        }
    }

    /// Zero-based port number.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Port selector value in the AFIO_EXTICRx fields.
    #[inline]
    pub fn exti_code(self) -> u32 {
        self as u32
    }

    /// Clock gate feeding this port.
    #[inline]
    pub fn peripheral(self) -> Peripheral {
        match self {
            Port::A => Peripheral::GpioA,
            Port::B => Peripheral::GpioB,
            Port::C => Peripheral::GpioC,
        }
    }
}

/// Input configuration (CNF bits with MODE = `00`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    Analog,
    Floating,
    Pull(Pull),
}

/// Which way an input with a pull resistor is pulled; selected through the ODR bit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    Up,
    Down,
}

/// Output drive strength (MODE bits).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputSpeed {
    Mhz10 = 0b01,
    Mhz2 = 0b10,
    Mhz50 = 0b11,
}

/// Output configuration (CNF bits with MODE != `00`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputMode {
    PushPull = 0b00,
    OpenDrain = 0b01,
    AfPushPull = 0b10,
    AfOpenDrain = 0b11,
}

/// Complete pin configuration.
///
/// Input-only electrical modes can't be combined with an output speed and vice versa.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input(InputMode),
    Output(OutputSpeed, OutputMode),
}

impl PinMode {
    /// General-purpose push-pull output at 50 MHz.
    pub const PUSH_PULL: PinMode = PinMode::Output(OutputSpeed::Mhz50, OutputMode::PushPull);
    /// Alternate-function push-pull output at 50 MHz.
    pub const AF_PUSH_PULL: PinMode = PinMode::Output(OutputSpeed::Mhz50, OutputMode::AfPushPull);
    /// Floating input.
    pub const FLOATING: PinMode = PinMode::Input(InputMode::Floating);

    /// 4-bit CRL/CRH field for this mode.
    pub fn nibble(self) -> u32 {
        let (mode, cnf) = match self {
            PinMode::Input(InputMode::Analog) => (0b00, 0b00),
            PinMode::Input(InputMode::Floating) => (0b00, 0b01),
            PinMode::Input(InputMode::Pull(_)) => (0b00, 0b10),
            PinMode::Output(speed, out) => (speed as u32, out as u32),
        };
        mode | (cnf << 2)
    }
}

/// One GPIO line.
pub struct Pin<R> {
    regs: R,
    port: Port,
    index: u8,
    mode: PinMode,
}

impl<R: Registers> Pin<R> {
    /// Gate the port clock and configure `index` of `port` in `mode`.
    pub fn new(clocks: &ClockGate<R>, port: Port, index: u8, mode: PinMode) -> Result<Self, Error>
    where
        R: Copy,
    {
        if index > 15 {
            return Err(Error::InvalidPin(index));
        }
        clocks.enable_peripheral(port.peripheral());

        let pin = Self {
            regs: *clocks.regs(),
            port,
            index,
            mode,
        };
        pin.configure();
        Ok(pin)
    }

    /// Write this pin's field into CRL/CRH.
    ///
    /// Read-modify-write of a register shared with seven other pins.
    pub fn configure(&self) {
        let (offset, shift) = if self.index < 8 {
            (reg::CRL, self.index as u32 * 4)
        } else {
            (reg::CRH, (self.index as u32 - 8) * 4)
        };
        let nibble = self.mode.nibble();
        self.regs.modify(self.port.base() + offset, |v| {
            (v & !(0xF << shift)) | (nibble << shift)
        });

        if let PinMode::Input(InputMode::Pull(pull)) = self.mode {
            match pull {
                Pull::Up => self.regs.set_bits(self.port.base() + reg::ODR, self.mask()),
                Pull::Down => self.regs.write(self.port.base() + reg::BRR, self.mask()),
            }
        }
        trace!(
            "gpio: P{:?}{} field {}",
            self.port,
            self.index,
            nibble
        );
    }

    /// Change the mode and reconfigure.
    pub fn reconfigure(&mut self, mode: PinMode) {
        self.mode = mode;
        self.configure();
    }

    #[inline]
    fn mask(&self) -> u32 {
        1 << self.index
    }

    /// Drive the output high.
    #[inline]
    pub fn set(&self) {
        self.regs.write(self.port.base() + reg::BSRR, self.mask());
    }

    /// Drive the output low.
    #[inline]
    pub fn clear(&self) {
        self.regs
            .write(self.port.base() + reg::BSRR, self.mask() << 16);
    }

    /// Drive the output to `high`.
    #[inline]
    pub fn set_level(&self, high: bool) {
        if high {
            self.set()
        } else {
            self.clear()
        }
    }

    /// Live level of the pad.
    #[inline]
    pub fn get(&self) -> bool {
        self.regs.read(self.port.base() + reg::IDR) & self.mask() != 0
    }

    /// Level last written to the output latch.
    #[inline]
    pub fn is_set_high(&self) -> bool {
        self.regs.read(self.port.base() + reg::ODR) & self.mask() != 0
    }

    #[inline]
    pub fn port(&self) -> Port {
        self.port
    }

    #[inline]
    pub fn index(&self) -> u8 {
        self.index
    }

    #[inline]
    pub fn mode(&self) -> PinMode {
        self.mode
    }
}

impl<R> ErrorType for Pin<R> {
    type Error = Infallible;
}

impl<R: Registers> OutputPin for Pin<R> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.clear();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set();
        Ok(())
    }
}

impl<R: Registers> StatefulOutputPin for Pin<R> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::is_set_high(self))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!Pin::is_set_high(self))
    }
}

impl<R: Registers> InputPin for Pin<R> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.get())
    }
}
