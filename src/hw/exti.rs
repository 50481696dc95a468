// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! External edge interrupts.
//!
//! The F103 has one EXTI line per pin *number*: line N can be routed to PAN, PBN or PCN through
//! AFIO_EXTICRx, never to two ports at once. Lines 0..=4 have their own vectors, lines 5..=9 and
//! 10..=15 share one each. [`Exti`] keeps one handler per line and [`Exti::service`] is what the
//! vector calls.
//!
//! Registration happens once at startup; a second handler for a line that already has one is
//! refused with [`Error::LineInUse`].

use super::gpio::Port;
use super::rcc::{ClockGate, Peripheral};
use super::regs::{map, nvic_unmask, Registers};
use crate::Error;

/// EXTI register offsets, plus the first AFIO external interrupt configuration register.
pub mod reg {
    pub const IMR: u32 = 0x00;
    pub const EMR: u32 = 0x04;
    pub const RTSR: u32 = 0x08;
    pub const FTSR: u32 = 0x0C;
    pub const SWIER: u32 = 0x10;
    pub const PR: u32 = 0x14;

    /// Offset of AFIO_EXTICR1 from the AFIO base. EXTICR2..4 follow at +4 each.
    pub const AFIO_EXTICR1: u32 = 0x08;
}

/// Number of EXTI lines routed to GPIO.
pub const LINES: usize = 16;

/// Edge(s) a line fires on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    Rising,
    Falling,
    Both,
}

impl Trigger {
    #[inline]
    fn rising(self) -> bool {
        matches!(self, Trigger::Rising | Trigger::Both)
    }

    #[inline]
    fn falling(self) -> bool {
        matches!(self, Trigger::Falling | Trigger::Both)
    }
}

/// Interrupt vectors serving the GPIO lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtiVector {
    Exti0,
    Exti1,
    Exti2,
    Exti3,
    Exti4,
    Exti9_5,
    Exti15_10,
}

impl ExtiVector {
    /// Vector serving `line`, which must be below 16.
    pub fn for_line(line: u8) -> Self {
        match line {
            0 => ExtiVector::Exti0,
            1 => ExtiVector::Exti1,
            2 => ExtiVector::Exti2,
            3 => ExtiVector::Exti3,
            4 => ExtiVector::Exti4,
            5..=9 => ExtiVector::Exti9_5,
            _ => ExtiVector::Exti15_10,
        }
    }

    /// NVIC interrupt number.
    pub fn irq(self) -> u8 {
        match self {
            ExtiVector::Exti0 => 6,
            ExtiVector::Exti1 => 7,
            ExtiVector::Exti2 => 8,
            ExtiVector::Exti3 => 9,
            ExtiVector::Exti4 => 10,
            ExtiVector::Exti9_5 => 23,
            ExtiVector::Exti15_10 => 40,
        }
    }

    /// Bit mask of the lines this vector serves.
    pub fn lines(self) -> u32 {
        match self {
            ExtiVector::Exti0 => 1 << 0,
            ExtiVector::Exti1 => 1 << 1,
            ExtiVector::Exti2 => 1 << 2,
            ExtiVector::Exti3 => 1 << 3,
            ExtiVector::Exti4 => 1 << 4,
            ExtiVector::Exti9_5 => 0x03E0,
            ExtiVector::Exti15_10 => 0xFC00,
        }
    }
}

/// Something to run when an edge arrives on a line.
///
/// Called in interrupt context with the line (pin) number. Must be short and must not block.
pub trait EdgeHandler {
    fn on_edge(&self, line: u8);
}

/// Per-line handler table and EXTI configuration.
pub struct Exti<'a, R> {
    clocks: ClockGate<R>,
    handlers: [Option<&'a (dyn EdgeHandler + Sync)>; LINES],
}

impl<'a, R: Registers + Copy> Exti<'a, R> {
    /// Gate AFIO and return an empty table.
    pub fn new(clocks: &ClockGate<R>) -> Self {
        clocks.enable_peripheral(Peripheral::Afio);
        Self {
            clocks: *clocks,
            handlers: [None; LINES],
        }
    }

    /// Route `pin` of `port` to its EXTI line, arm `trigger` and call `handler` on every edge.
    ///
    /// Fails with [`Error::LineInUse`] if the line already has a handler, in which case nothing
    /// is changed.
    pub fn listen(
        &mut self,
        port: Port,
        pin: u8,
        trigger: Trigger,
        handler: &'a (dyn EdgeHandler + Sync),
    ) -> Result<(), Error> {
        if pin as usize >= LINES {
            return Err(Error::InvalidPin(pin));
        }
        if self.handlers[pin as usize].is_some() {
            warn!("exti: line {} already has a handler", pin);
            return Err(Error::LineInUse(pin));
        }

        self.clocks.enable_peripheral(port.peripheral());
        let regs = self.clocks.regs();
        let line = pin as u32;
        let bit = 1 << line;

        let exticr = map::AFIO + reg::AFIO_EXTICR1 + 4 * (line / 4);
        let shift = (line % 4) * 4;
        regs.modify(exticr, |v| (v & !(0xF << shift)) | (port.exti_code() << shift));

        if trigger.rising() {
            regs.set_bits(map::EXTI + reg::RTSR, bit);
        } else {
            regs.clear_bits(map::EXTI + reg::RTSR, bit);
        }
        if trigger.falling() {
            regs.set_bits(map::EXTI + reg::FTSR, bit);
        } else {
            regs.clear_bits(map::EXTI + reg::FTSR, bit);
        }

        // Install before unmasking so the first edge finds its handler.
        self.handlers[pin as usize] = Some(handler);
        regs.set_bits(map::EXTI + reg::IMR, bit);
        nvic_unmask(regs, ExtiVector::for_line(pin).irq());

        debug!("exti: line {} <- P{:?}{} {:?}", pin, port, pin, trigger);
        Ok(())
    }

    /// Whether `line` has a handler.
    #[inline]
    pub fn is_listening(&self, line: u8) -> bool {
        (line as usize) < LINES && self.handlers[line as usize].is_some()
    }

    /// Raise `line` from software through SWIER.
    pub fn pend(&self, line: u8) {
        if (line as usize) < LINES {
            let regs = self.clocks.regs();
            regs.clear_bits(map::EXTI + reg::SWIER, 1 << line);
            regs.set_bits(map::EXTI + reg::SWIER, 1 << line);
        }
    }

    /// Acknowledge and dispatch every pending, unmasked line of `vector`.
    ///
    /// Call this from the interrupt vector itself.
    pub fn service(&self, vector: ExtiVector) {
        let regs = self.clocks.regs();
        let pending = regs.read(map::EXTI + reg::PR)
            & regs.read(map::EXTI + reg::IMR)
            & vector.lines();
        if pending == 0 {
            return;
        }
        regs.write(map::EXTI + reg::PR, pending);

        let mut rest = pending;
        while rest != 0 {
            let line = rest.trailing_zeros() as u8;
            rest &= rest - 1;
            match self.handlers[line as usize] {
                Some(handler) => handler.on_edge(line),
                None => warn!("exti: spurious edge on line {}", line),
            }
        }
    }
}
