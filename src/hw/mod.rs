// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Hardware Abstraction Layer
//!
//! MCU-level wrappers around the STM32F103 register blocks. Each wrapper is generic over
//! [`Registers`] so it runs unchanged against [`Mmio`] on the target and against
//! `RegisterModel` in host tests.
//!
//! - [`regs`]: register access trait, memory map, NVIC enable
//! - [`rcc`]: oscillator selection and peripheral clock gating
//! - [`gpio`]: pin configuration and level access
//! - [`pwm`]: fixed-frequency PWM on TIM1..TIM4
//! - [`exti`]: edge interrupts and per-line handler dispatch
//! - [`usart`]: buffered, interrupt-driven USART1
//! - `model`: host-side register double, behind the `model` feature

pub mod exti;
pub mod gpio;
#[cfg(any(test, feature = "model"))]
pub mod model;
pub mod pwm;
pub mod rcc;
pub mod regs;
pub mod usart;

pub use exti::{EdgeHandler, Exti, ExtiVector, Trigger};
pub use gpio::{Pin, PinMode, Port};
#[cfg(any(test, feature = "model"))]
pub use model::RegisterModel;
pub use pwm::{Channel, PwmChannel, Timer};
pub use rcc::{ClockGate, ClockSource, Peripheral, PeripheralBus};
pub use regs::{Mmio, Registers};
pub use usart::Usart;
