// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Reset and clock control: oscillator selection and peripheral clock gating.
//!
//! Every peripheral on the STM32F103 is unclocked after reset. A register block must have its
//! enable bit set in one of the three bus enable registers before the first access, otherwise
//! writes are silently dropped by the hardware. [`ClockGate`] is handed to every other wrapper in
//! `hw`, which gates its own block before touching it.

use super::regs::{map, Registers};
use crate::Error;

/// RCC register offsets.
pub mod reg {
    pub const CR: u32 = 0x00;
    pub const AHBENR: u32 = 0x14;
    pub const APB2ENR: u32 = 0x18;
    pub const APB1ENR: u32 = 0x1C;
}

/// Bus whose enable register holds a peripheral's clock bit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralBus {
    Apb1,
    Apb2,
    Ahb,
}

impl PeripheralBus {
    #[inline]
    fn enable_register(self) -> u32 {
        map::RCC
            + match self {
                PeripheralBus::Apb1 => reg::APB1ENR,
                PeripheralBus::Apb2 => reg::APB2ENR,
                PeripheralBus::Ahb => reg::AHBENR,
            }
    }
}

/// Oscillator switched on at startup.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// External crystal (HSEON).
    Hse,
    /// Internal 8 MHz RC (HSION).
    Hsi,
    /// Main PLL (PLLON).
    Pll,
}

impl ClockSource {
    /// Enable bit of this oscillator in RCC_CR.
    #[inline]
    pub fn enable_bit(self) -> u32 {
        match self {
            ClockSource::Hse => 16,
            ClockSource::Hsi => 0,
            ClockSource::Pll => 24,
        }
    }

    /// Ready flag of this oscillator in RCC_CR.
    #[inline]
    pub fn ready_bit(self) -> u32 {
        self.enable_bit() + 1
    }
}

/// Peripherals whose clocks the drivers in this crate gate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Afio,
    GpioA,
    GpioB,
    GpioC,
    Tim1,
    Usart1,
    Tim2,
    Tim3,
    Tim4,
}

impl Peripheral {
    /// Bus and bit position of this peripheral's clock enable.
    pub fn gate(self) -> (PeripheralBus, u8) {
        use PeripheralBus::*;
        match self {
            Peripheral::Afio => (Apb2, 0),
            Peripheral::GpioA => (Apb2, 2),
            Peripheral::GpioB => (Apb2, 3),
            Peripheral::GpioC => (Apb2, 4),
            Peripheral::Tim1 => (Apb2, 11),
            Peripheral::Usart1 => (Apb2, 14),
            Peripheral::Tim2 => (Apb1, 0),
            Peripheral::Tim3 => (Apb1, 1),
            Peripheral::Tim4 => (Apb1, 2),
        }
    }
}

/// Clock gating capability.
///
/// Constructing one switches on the selected oscillator. Peripheral clocks are never switched off
/// again.
#[derive(Copy, Clone, Debug)]
pub struct ClockGate<R> {
    regs: R,
    source: ClockSource,
}

impl<R: Registers> ClockGate<R> {
    /// Switch on `source` and return the gate.
    ///
    /// Does not wait for the ready flag; see [`ClockGate::is_ready`].
    pub fn new(regs: R, source: ClockSource) -> Self {
        regs.set_bits(map::RCC + reg::CR, 1 << source.enable_bit());
        debug!("rcc: oscillator {:?} on", source);
        Self { regs, source }
    }

    /// Oscillator selected at construction.
    #[inline]
    pub fn source(&self) -> ClockSource {
        self.source
    }

    /// Whether the selected oscillator reports ready.
    pub fn is_ready(&self) -> bool {
        let cr = self.regs.read(map::RCC + reg::CR);
        cr & (1 << self.source.ready_bit()) != 0
    }

    /// Set clock-enable `bit` in the enable register of `bus`.
    ///
    /// Idempotent: if the bit is already set the register is not written again.
    pub fn enable(&self, bus: PeripheralBus, bit: u8) -> Result<(), Error> {
        if bit > 31 {
            return Err(Error::InvalidClockBit(bit));
        }
        self.set_enable(bus, bit);
        Ok(())
    }

    /// Enable the clock of a named peripheral.
    #[inline]
    pub fn enable_peripheral(&self, peripheral: Peripheral) {
        let (bus, bit) = peripheral.gate();
        self.set_enable(bus, bit);
    }

    /// `bit` must be below 32.
    fn set_enable(&self, bus: PeripheralBus, bit: u8) {
        if self.is_enabled(bus, bit) {
            return;
        }
        self.regs.set_bits(bus.enable_register(), 1 << bit);
        debug!("rcc: clock {:?}[{}] enabled", bus, bit);
    }

    /// Whether clock-enable `bit` on `bus` is set. Out-of-range bits read as disabled.
    pub fn is_enabled(&self, bus: PeripheralBus, bit: u8) -> bool {
        bit <= 31 && self.regs.read(bus.enable_register()) & (1 << bit) != 0
    }

    /// Register access this gate was built with.
    #[inline]
    pub fn regs(&self) -> &R {
        &self.regs
    }
}
