// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Host-side model of the STM32F103 registers this crate uses.
//!
//! `RegisterModel` implements [`Registers`] over a fixed table of addresses and reproduces the
//! side effects the drivers depend on:
//!
//! | Register | Behaviour |
//! | -------- | --------- |
//! | `RCC_CR` | reset value `0x0000_0083`; HSIRDY/HSERDY/PLLRDY follow their ON bits |
//! | `GPIOx_CRL/CRH` | reset value `0x4444_4444` (all floating inputs) |
//! | `GPIOx_BSRR/BRR` | write-only; set/reset bits of ODR, low half of BSRR wins |
//! | `GPIOx_IDR` | read-only; ODR for output pins, the externally driven level for inputs |
//! | `EXTI_PR` | edges latch here if the line is unmasked, selected in AFIO and armed; write 1 clears |
//! | `EXTI_SWIER` | setting a bit latches the unmasked line in PR |
//! | `NVIC_ISERx` | write-one-to-set |
//! | `TIMx_EGR` | self-clearing; UG zeroes CNT |
//! | `USART1_SR/DR` | TXE and TC always set; DR writes are captured, injected bytes raise RXNE |
//!
//! Output transitions do not latch EXTI edges; tests raise edges explicitly with
//! [`RegisterModel::inject_edge`] or by driving an input with [`RegisterModel::set_input`].
//!
//! Accesses outside the table read as zero, are otherwise ignored and are counted in
//! [`RegisterModel::unmapped_accesses`].

use core::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};

use heapless::Vec;

use super::exti::reg as exti_reg;
use super::gpio::{reg as gpio_reg, Port};
use super::pwm::reg as tim_reg;
use super::rcc::reg as rcc_reg;
use super::regs::{map, Registers};
use super::usart::reg as usart_reg;

const RCC_REGS: [u32; 4] = [
    rcc_reg::CR,
    rcc_reg::AHBENR,
    rcc_reg::APB2ENR,
    rcc_reg::APB1ENR,
];
const AFIO_REGS: [u32; 4] = [
    exti_reg::AFIO_EXTICR1,
    exti_reg::AFIO_EXTICR1 + 4,
    exti_reg::AFIO_EXTICR1 + 8,
    exti_reg::AFIO_EXTICR1 + 12,
];
const EXTI_REGS: [u32; 6] = [
    exti_reg::IMR,
    exti_reg::EMR,
    exti_reg::RTSR,
    exti_reg::FTSR,
    exti_reg::SWIER,
    exti_reg::PR,
];
const GPIO_REGS: [u32; 6] = [
    gpio_reg::CRL,
    gpio_reg::CRH,
    gpio_reg::IDR,
    gpio_reg::ODR,
    gpio_reg::BSRR,
    gpio_reg::BRR,
];
const TIM_REGS: [u32; 13] = [
    tim_reg::CR1,
    tim_reg::EGR,
    tim_reg::CCMR1,
    tim_reg::CCMR2,
    tim_reg::CCER,
    tim_reg::CNT,
    tim_reg::PSC,
    tim_reg::ARR,
    tim_reg::CCR1,
    tim_reg::CCR1 + 4,
    tim_reg::CCR1 + 8,
    tim_reg::CCR1 + 12,
    tim_reg::BDTR,
];
const USART_REGS: [u32; 6] = [
    usart_reg::SR,
    usart_reg::DR,
    usart_reg::BRR,
    usart_reg::CR1,
    usart_reg::CR2,
    usart_reg::CR3,
];
const NVIC_REGS: [u32; 2] = [0x00, 0x04];

const GPIO_BASES: [u32; 3] = [map::GPIOA, map::GPIOB, map::GPIOC];
const TIM_BASES: [u32; 4] = [map::TIM1, map::TIM2, map::TIM3, map::TIM4];

const SLOTS: usize = RCC_REGS.len()
    + AFIO_REGS.len()
    + EXTI_REGS.len()
    + GPIO_REGS.len() * GPIO_BASES.len()
    + TIM_REGS.len() * TIM_BASES.len()
    + USART_REGS.len()
    + NVIC_REGS.len();

const fn fill(
    mut out: [u32; SLOTS],
    mut n: usize,
    base: u32,
    offsets: &[u32],
) -> ([u32; SLOTS], usize) {
    let mut i = 0;
    while i < offsets.len() {
        out[n] = base + offsets[i];
        n += 1;
        i += 1;
    }
    (out, n)
}

const fn address_table() -> [u32; SLOTS] {
    let out = [0u32; SLOTS];
    let (out, n) = fill(out, 0, map::RCC, &RCC_REGS);
    let (out, n) = fill(out, n, map::AFIO, &AFIO_REGS);
    let (out, n) = fill(out, n, map::EXTI, &EXTI_REGS);
    let (out, n) = fill(out, n, map::GPIOA, &GPIO_REGS);
    let (out, n) = fill(out, n, map::GPIOB, &GPIO_REGS);
    let (out, n) = fill(out, n, map::GPIOC, &GPIO_REGS);
    let (out, n) = fill(out, n, map::TIM1, &TIM_REGS);
    let (out, n) = fill(out, n, map::TIM2, &TIM_REGS);
    let (out, n) = fill(out, n, map::TIM3, &TIM_REGS);
    let (out, n) = fill(out, n, map::TIM4, &TIM_REGS);
    let (out, n) = fill(out, n, map::USART1, &USART_REGS);
    let (out, _) = fill(out, n, map::NVIC_ISER, &NVIC_REGS);
    out
}

static ADDRESSES: [u32; SLOTS] = address_table();

const CR_ON_BITS: u32 = (1 << 0) | (1 << 16) | (1 << 24);
const CR_RDY_BITS: u32 = CR_ON_BITS << 1;

const SR_RXNE: u32 = 1 << 5;
const SR_TC: u32 = 1 << 6;
const SR_TXE: u32 = 1 << 7;
const SR_ORE: u32 = 1 << 3;

const TX_CAPTURE: usize = 128;

/// Which register block an address falls into.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Block {
    Rcc,
    Exti,
    Gpio(usize),
    Tim,
    Usart,
    Nvic,
    Other,
}

fn classify(addr: u32) -> (Block, u32) {
    for (i, base) in GPIO_BASES.iter().enumerate() {
        if (*base..*base + 0x400).contains(&addr) {
            return (Block::Gpio(i), addr - base);
        }
    }
    for base in TIM_BASES.iter() {
        if (*base..*base + 0x400).contains(&addr) {
            return (Block::Tim, addr - base);
        }
    }
    let blocks = [
        (map::RCC, Block::Rcc),
        (map::EXTI, Block::Exti),
        (map::USART1, Block::Usart),
        (map::NVIC_ISER, Block::Nvic),
    ];
    for (base, block) in blocks {
        if (base..base + 0x400).contains(&addr) {
            return (block, addr - base);
        }
    }
    (Block::Other, 0)
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO32: AtomicU32 = AtomicU32::new(0);
#[allow(clippy::declare_interior_mutable_const)]
const ZERO8: AtomicU8 = AtomicU8::new(0);

/// Register-level double of the STM32F103 peripherals used by this crate.
pub struct RegisterModel {
    values: [AtomicU32; SLOTS],
    writes: [AtomicU32; SLOTS],
    /// Externally driven pad levels, one word per port.
    inputs: [AtomicU32; 3],
    rx: AtomicU32,
    tx: [AtomicU8; TX_CAPTURE],
    tx_len: AtomicUsize,
    unmapped: AtomicUsize,
}

impl Default for RegisterModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterModel {
    /// A model in the post-reset state.
    pub fn new() -> Self {
        let model = Self {
            values: [ZERO32; SLOTS],
            writes: [ZERO32; SLOTS],
            inputs: [ZERO32; 3],
            rx: ZERO32,
            tx: [ZERO8; TX_CAPTURE],
            tx_len: AtomicUsize::new(0),
            unmapped: AtomicUsize::new(0),
        };
        model.poke(map::RCC + rcc_reg::CR, 0x0000_0083);
        for base in GPIO_BASES {
            model.poke(base + gpio_reg::CRL, 0x4444_4444);
            model.poke(base + gpio_reg::CRH, 0x4444_4444);
        }
        model
    }

    fn slot(addr: u32) -> Option<usize> {
        ADDRESSES.iter().position(|a| *a == addr)
    }

    /// Stored value of a register, without read side effects.
    ///
    /// For `GPIOx_IDR` use [`RegisterModel::pin_level`] instead; the stored word is unused.
    pub fn peek(&self, addr: u32) -> u32 {
        match Self::slot(addr) {
            Some(i) => self.values[i].load(Ordering::Relaxed),
            None => 0,
        }
    }

    /// Store a value without write side effects and without counting it.
    pub fn poke(&self, addr: u32, value: u32) {
        if let Some(i) = Self::slot(addr) {
            self.values[i].store(value, Ordering::Relaxed);
        }
    }

    /// Number of writes issued to `addr` through [`Registers::write`].
    pub fn write_count(&self, addr: u32) -> u32 {
        match Self::slot(addr) {
            Some(i) => self.writes[i].load(Ordering::Relaxed),
            None => 0,
        }
    }

    /// Accesses that fell outside the modelled address table.
    pub fn unmapped_accesses(&self) -> usize {
        self.unmapped.load(Ordering::Relaxed)
    }

    /// Output data latch of a pin.
    pub fn output_level(&self, port: Port, pin: u8) -> bool {
        self.peek(port.base() + gpio_reg::ODR) & (1 << pin) != 0
    }

    /// Level a read of `GPIOx_IDR` would report for a pin.
    pub fn pin_level(&self, port: Port, pin: u8) -> bool {
        self.idr(port.index()) & (1 << pin) != 0
    }

    /// 4-bit mode/config field of a pin as stored in CRL/CRH.
    pub fn pin_nibble(&self, port: Port, pin: u8) -> u8 {
        let (offset, shift) = if pin < 8 {
            (gpio_reg::CRL, pin * 4)
        } else {
            (gpio_reg::CRH, (pin - 8) * 4)
        };
        ((self.peek(port.base() + offset) >> shift) & 0xF) as u8
    }

    fn is_output(&self, port: usize, pin: u8) -> bool {
        let base = GPIO_BASES[port];
        let (offset, shift) = if pin < 8 {
            (gpio_reg::CRL, pin * 4)
        } else {
            (gpio_reg::CRH, (pin - 8) * 4)
        };
        (self.peek(base + offset) >> shift) & 0b11 != 0
    }

    fn idr(&self, port: usize) -> u32 {
        let odr = self.peek(GPIO_BASES[port] + gpio_reg::ODR);
        let ext = self.inputs[port].load(Ordering::Relaxed);
        (0..16u8).fold(0, |acc, pin| {
            let bit = 1 << pin;
            let src = if self.is_output(port, pin) { odr } else { ext };
            acc | (src & bit)
        })
    }

    /// Drive the pad of an input pin from outside.
    ///
    /// A change of the level seen by an input pin is fed to the EXTI edge detector. Returns
    /// whether an edge was latched in `EXTI_PR`.
    pub fn set_input(&self, port: Port, pin: u8, high: bool) -> bool {
        let p = port.index();
        let bit = 1u32 << pin;
        let before = self.inputs[p].load(Ordering::Relaxed) & bit != 0;
        if high {
            self.inputs[p].fetch_or(bit, Ordering::Relaxed);
        } else {
            self.inputs[p].fetch_and(!bit, Ordering::Relaxed);
        }
        if before == high || self.is_output(p, pin) {
            return false;
        }
        self.latch(port, pin, high)
    }

    /// Present one edge on a pin to the EXTI edge detector, whatever the pin's mode.
    ///
    /// Returns whether it was latched in `EXTI_PR` (line unmasked, selected in AFIO, armed for
    /// this edge direction).
    pub fn inject_edge(&self, port: Port, pin: u8, rising: bool) -> bool {
        self.latch(port, pin, rising)
    }

    fn latch(&self, port: Port, pin: u8, rising: bool) -> bool {
        let line = pin as u32;
        let bit = 1 << line;
        let exticr = self.peek(map::AFIO + exti_reg::AFIO_EXTICR1 + 4 * (line / 4));
        let selected = (exticr >> ((line % 4) * 4)) & 0xF;
        if selected != port.exti_code() {
            return false;
        }
        let edge = if rising {
            exti_reg::RTSR
        } else {
            exti_reg::FTSR
        };
        let armed = self.peek(map::EXTI + edge) & bit != 0;
        let unmasked = self.peek(map::EXTI + exti_reg::IMR) & bit != 0;
        if !(armed && unmasked) {
            return false;
        }
        self.or(map::EXTI + exti_reg::PR, bit);
        true
    }

    /// Make one byte available in `USART1_DR` and raise RXNE (ORE if one was still pending).
    pub fn usart_receive(&self, byte: u8) {
        let sr = map::USART1 + usart_reg::SR;
        if self.peek(sr) & SR_RXNE != 0 {
            self.or(sr, SR_ORE);
        }
        self.rx.store(byte as u32, Ordering::Relaxed);
        self.or(sr, SR_RXNE);
    }

    /// Bytes written to `USART1_DR` so far (the first 128).
    pub fn transmitted(&self) -> Vec<u8, TX_CAPTURE> {
        let len = self.tx_len.load(Ordering::Relaxed).min(TX_CAPTURE);
        self.tx[..len]
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }

    fn or(&self, addr: u32, mask: u32) {
        if let Some(i) = Self::slot(addr) {
            self.values[i].fetch_or(mask, Ordering::Relaxed);
        }
    }

    fn and(&self, addr: u32, mask: u32) {
        if let Some(i) = Self::slot(addr) {
            self.values[i].fetch_and(mask, Ordering::Relaxed);
        }
    }
}

impl Registers for RegisterModel {
    fn read(&self, addr: u32) -> u32 {
        if Self::slot(addr).is_none() {
            self.unmapped.fetch_add(1, Ordering::Relaxed);
            return 0;
        }
        match classify(addr) {
            (Block::Gpio(p), gpio_reg::IDR) => self.idr(p),
            (Block::Gpio(_), gpio_reg::BSRR) | (Block::Gpio(_), gpio_reg::BRR) => 0,
            (Block::Usart, usart_reg::SR) => self.peek(addr) | SR_TXE | SR_TC,
            (Block::Usart, usart_reg::DR) => {
                self.and(map::USART1 + usart_reg::SR, !(SR_RXNE | SR_ORE));
                self.rx.load(Ordering::Relaxed)
            }
            _ => self.peek(addr),
        }
    }

    fn write(&self, addr: u32, value: u32) {
        let Some(i) = Self::slot(addr) else {
            self.unmapped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        self.writes[i].fetch_add(1, Ordering::Relaxed);

        match classify(addr) {
            (Block::Gpio(p), gpio_reg::BSRR) => {
                let odr = GPIO_BASES[p] + gpio_reg::ODR;
                let reset = value >> 16;
                let set = value & 0xFFFF;
                self.poke(odr, (self.peek(odr) & !reset) | set);
            }
            (Block::Gpio(p), gpio_reg::BRR) => {
                self.and(GPIO_BASES[p] + gpio_reg::ODR, !(value & 0xFFFF));
            }
            (Block::Gpio(_), gpio_reg::IDR) => {}
            (Block::Rcc, rcc_reg::CR) => {
                let value = (value & !CR_RDY_BITS) | ((value & CR_ON_BITS) << 1);
                self.poke(addr, value);
            }
            (Block::Exti, exti_reg::PR) => self.and(addr, !value),
            (Block::Exti, exti_reg::SWIER) => {
                let imr = self.peek(map::EXTI + exti_reg::IMR);
                let rising = value & !self.peek(addr);
                self.poke(addr, value);
                self.or(map::EXTI + exti_reg::PR, rising & imr);
            }
            (Block::Nvic, _) => self.or(addr, value),
            (Block::Tim, tim_reg::EGR) => {
                if value & 1 != 0 {
                    self.poke(addr - tim_reg::EGR + tim_reg::CNT, 0);
                }
            }
            (Block::Usart, usart_reg::DR) => {
                let n = self.tx_len.fetch_add(1, Ordering::Relaxed);
                if n < TX_CAPTURE {
                    self.tx[n].store(value as u8, Ordering::Relaxed);
                }
            }
            (Block::Usart, usart_reg::SR) => self.and(addr, value),
            _ => self.poke(addr, value),
        }
    }
}
