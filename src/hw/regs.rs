// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Register access for the STM32F103.
//!
//! Every peripheral wrapper in `hw` talks to its registers through the [`Registers`] trait rather
//! than through raw pointers, so the same driver code runs against the real address space
//! ([`Mmio`]) or against the host-side [`RegisterModel`](super::model::RegisterModel).

use core::ptr;

/// Base addresses of the register blocks this crate touches.
pub mod map {
    pub const TIM2: u32 = 0x4000_0000;
    pub const TIM3: u32 = 0x4000_0400;
    pub const TIM4: u32 = 0x4000_0800;
    pub const AFIO: u32 = 0x4001_0000;
    pub const EXTI: u32 = 0x4001_0400;
    pub const GPIOA: u32 = 0x4001_0800;
    pub const GPIOB: u32 = 0x4001_0C00;
    pub const GPIOC: u32 = 0x4001_1000;
    pub const TIM1: u32 = 0x4001_2C00;
    pub const USART1: u32 = 0x4001_3800;
    pub const RCC: u32 = 0x4002_1000;

    /// NVIC interrupt set-enable registers (ISER0, ISER1, ...).
    pub const NVIC_ISER: u32 = 0xE000_E100;
}

/// 32-bit register access at absolute addresses.
///
/// All methods take `&self`: the registers are shared between foreground code and interrupt
/// handlers, and serialising read-modify-write sequences is the caller's business.
pub trait Registers {
    /// Read a register.
    fn read(&self, addr: u32) -> u32;

    /// Write a register.
    fn write(&self, addr: u32, value: u32);

    /// Read-modify-write. Not atomic with respect to interrupts.
    #[inline]
    fn modify<F>(&self, addr: u32, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(addr);
        self.write(addr, f(value));
    }

    /// Set the bits of `mask`.
    #[inline]
    fn set_bits(&self, addr: u32, mask: u32) {
        self.modify(addr, |v| v | mask);
    }

    /// Clear the bits of `mask`.
    #[inline]
    fn clear_bits(&self, addr: u32, mask: u32) {
        self.modify(addr, |v| v & !mask);
    }
}

impl<R: Registers + ?Sized> Registers for &R {
    #[inline]
    fn read(&self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    #[inline]
    fn write(&self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }
}

/// Volatile access to the memory-mapped peripherals of the running MCU.
#[derive(Copy, Clone, Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Create a handle to the real register space.
    ///
    /// # Safety
    ///
    /// Only meaningful on the STM32F103 itself. The caller must make sure no other code (a HAL,
    /// a second `Mmio`) drives the same peripherals in a conflicting way. Prefer
    /// [`Platform::take`](crate::platform::Platform::take), which hands this out once.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Registers for Mmio {
    #[inline]
    fn read(&self, addr: u32) -> u32 {
        // SAFETY: `Mmio` only exists on the target, where `addr` is one of the aligned register
        // addresses from `map`.
        unsafe { ptr::read_volatile(addr as usize as *const u32) }
    }

    #[inline]
    fn write(&self, addr: u32, value: u32) {
        // SAFETY: see `read`.
        unsafe { ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}

/// Enable one interrupt in the NVIC by writing its ISER bit.
///
/// ISER is write-one-to-set, so this is a single store and never disturbs the other lines.
#[inline]
pub(crate) fn nvic_unmask<R: Registers>(regs: &R, irq: u8) {
    let addr = map::NVIC_ISER + 4 * (irq as u32 / 32);
    regs.write(addr, 1 << (irq as u32 % 32));
}
