// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Interrupt-driven USART1, the serial link to the host computer.
//!
//! Frames are 8N1. Receive and transmit each go through a 64-byte ring buffer shared with the
//! USART1 vector, which must call [`Usart::on_interrupt`]. Foreground calls never touch the data
//! register directly: writes queue a byte and enable the TXE interrupt, the vector drains the
//! queue and switches TXE off again once it is empty.
//!
//! Note: When using `writeln!`, include `\r` in the format string so terminals get CRLF line
//! endings. On the host, open the port with
//! ```text
//! $ screen /dev/ttyUSB0 115200
//! ```

use core::cell::RefCell;
use core::convert::Infallible;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;
use heapless::Deque;

use super::gpio::{Pin, PinMode, Port};
use super::rcc::{ClockGate, Peripheral};
use super::regs::{map, nvic_unmask, Registers};
use crate::Error;

/// USART register offsets.
pub mod reg {
    pub const SR: u32 = 0x00;
    pub const DR: u32 = 0x04;
    pub const BRR: u32 = 0x08;
    pub const CR1: u32 = 0x0C;
    pub const CR2: u32 = 0x10;
    pub const CR3: u32 = 0x14;
}

/// Capacity of each ring buffer.
pub const BUFFER: usize = 64;

/// NVIC interrupt number of USART1.
pub const IRQ: u8 = 37;

const SR_ORE: u32 = 1 << 3;
const SR_RXNE: u32 = 1 << 5;
const SR_TC: u32 = 1 << 6;
const SR_TXE: u32 = 1 << 7;

const CR1_RE: u32 = 1 << 2;
const CR1_TE: u32 = 1 << 3;
const CR1_RXNEIE: u32 = 1 << 5;
const CR1_TXEIE: u32 = 1 << 7;
const CR1_UE: u32 = 1 << 13;

type Ring = Mutex<RefCell<Deque<u8, BUFFER>>>;

pub struct Usart<R> {
    regs: R,
    rx: Ring,
    tx: Ring,
    overruns: AtomicU32,
    _pins: (Pin<R>, Pin<R>),
}

impl<R: Registers + Copy> Usart<R> {
    /// Bring up USART1 on PA9 (TX) / PA10 (RX) at `baud`, given its bus clock `pclk` in Hz.
    pub fn new(clocks: &ClockGate<R>, pclk: u32, baud: u32) -> Result<Self, Error> {
        // BRR needs at least one whole mantissa step.
        if baud == 0 || pclk / baud < 16 {
            return Err(Error::InvalidBaud(baud));
        }
        clocks.enable_peripheral(Peripheral::Usart1);
        let tx_pin = Pin::new(clocks, Port::A, 9, PinMode::AF_PUSH_PULL)?;
        let rx_pin = Pin::new(clocks, Port::A, 10, PinMode::FLOATING)?;

        let regs = *clocks.regs();
        let base = map::USART1;
        regs.write(base + reg::BRR, pclk / baud);
        regs.write(base + reg::CR2, 0);
        regs.write(base + reg::CR3, 0);
        regs.write(base + reg::CR1, CR1_UE | CR1_TE | CR1_RE | CR1_RXNEIE);
        nvic_unmask(&regs, IRQ);

        info!("usart1: {} baud", baud);

        Ok(Self {
            regs,
            rx: Mutex::new(RefCell::new(Deque::new())),
            tx: Mutex::new(RefCell::new(Deque::new())),
            overruns: AtomicU32::new(0),
            _pins: (tx_pin, rx_pin),
        })
    }
}

impl<R: Registers> Usart<R> {
    #[inline]
    fn enable_tx_interrupt(&self) {
        self.regs.set_bits(map::USART1 + reg::CR1, CR1_TXEIE);
    }

    /// Queue one byte for transmission.
    pub fn write_byte(&self, byte: u8) -> nb::Result<(), Infallible> {
        let queued =
            critical_section::with(|cs| self.tx.borrow_ref_mut(cs).push_back(byte).is_ok());
        if !queued {
            return Err(nb::Error::WouldBlock);
        }
        self.enable_tx_interrupt();
        Ok(())
    }

    /// Queue as many of `bytes` as fit and return how many that was.
    pub fn write(&self, bytes: &[u8]) -> usize {
        let n = critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);
            bytes
                .iter()
                .take_while(|&&b| tx.push_back(b).is_ok())
                .count()
        });
        if n > 0 {
            self.enable_tx_interrupt();
        }
        n
    }

    /// Write `s` followed by CRLF, blocking while the queue is full.
    pub fn println(&self, s: &str) {
        for &b in s.as_bytes().iter().chain(b"\r\n") {
            let _ = nb::block!(self.write_byte(b));
        }
    }

    /// Take one received byte.
    pub fn read_byte(&self) -> nb::Result<u8, Infallible> {
        critical_section::with(|cs| self.rx.borrow_ref_mut(cs).pop_front())
            .ok_or(nb::Error::WouldBlock)
    }

    /// Move up to `buf.len()` received bytes into `buf` and return how many.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        critical_section::with(|cs| {
            let mut rx = self.rx.borrow_ref_mut(cs);
            let mut n = 0;
            while n < buf.len() {
                match rx.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            n
        })
    }

    /// Done once the queue is empty and the last frame has left the shift register.
    pub fn flush(&self) -> nb::Result<(), Infallible> {
        let drained = critical_section::with(|cs| self.tx.borrow_ref(cs).is_empty());
        if drained && self.regs.read(map::USART1 + reg::SR) & SR_TC != 0 {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Received bytes dropped because the buffer was full or the hardware overran.
    #[inline]
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Body of the USART1 vector.
    pub fn on_interrupt(&self) {
        let base = map::USART1;
        let sr = self.regs.read(base + reg::SR);

        if sr & (SR_RXNE | SR_ORE) != 0 {
            // Reading DR after SR clears both flags.
            let byte = self.regs.read(base + reg::DR) as u8;
            let mut lost = u32::from(sr & SR_ORE != 0);
            let stored = critical_section::with(|cs| self.rx.borrow_ref_mut(cs).push_back(byte));
            if stored.is_err() {
                lost += 1;
            }
            if lost > 0 {
                self.overruns.fetch_add(lost, Ordering::Relaxed);
                warn!("usart1: receive overrun");
            }
        }

        if sr & SR_TXE != 0 && self.regs.read(base + reg::CR1) & CR1_TXEIE != 0 {
            match critical_section::with(|cs| self.tx.borrow_ref_mut(cs).pop_front()) {
                Some(byte) => self.regs.write(base + reg::DR, byte as u32),
                None => self.regs.clear_bits(base + reg::CR1, CR1_TXEIE),
            }
        }
    }
}

/// Blocking formatter. Do not use from the USART1 vector itself.
impl<R: Registers> fmt::Write for &Usart<R> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &b in s.as_bytes() {
            let _ = nb::block!(self.write_byte(b));
        }
        Ok(())
    }
}
