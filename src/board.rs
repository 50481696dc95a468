// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin and clock assignments of the Cyber Truck controller board (STM32F103C8, "blue pill").
//!
//! | Function | Lines |
//! | -------- | ----- |
//! | Left motor IN1/IN2, encoder A/B | PA0, PA1 |
//! | Left motor PWM (TIM3_CH1) | PA6 |
//! | Right motor IN1/IN2, encoder A/B | PB12, PB13 |
//! | Right motor PWM (TIM4_CH1) | PB6 |
//! | USART1 TX/RX to the host | PA9, PA10 |

use crate::drivers::dc_motor::MotorConfig;
use crate::hw::gpio::Port;
use crate::hw::pwm::{Channel, Timer};
use crate::hw::rcc::ClockSource;

pub const CLOCK_SOURCE: ClockSource = ClockSource::Hse;

/// External crystal.
pub const HSE_HZ: u32 = 8_000_000;

/// Core clock, HSE x 9 through the PLL.
pub const SYSCLK_HZ: u32 = 72_000_000;

/// APB1 clock. Timers on APB1 run at twice this, i.e. `SYSCLK_HZ`.
pub const PCLK1_HZ: u32 = 36_000_000;

/// APB2 clock (USART1, TIM1).
pub const PCLK2_HZ: u32 = 72_000_000;

pub const BAUD: u32 = 115_200;

pub const LEFT_MOTOR: MotorConfig = MotorConfig::new(Port::A, [0, 1], Timer::Tim3, Channel::C1);

pub const RIGHT_MOTOR: MotorConfig =
    MotorConfig::new(Port::B, [12, 13], Timer::Tim4, Channel::C1);

pub const MOTORS: [MotorConfig; 2] = [LEFT_MOTOR, RIGHT_MOTOR];
