// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! PWM outputs on the general-purpose and advanced timers.
//!
//! Prescale and period are fixed at compile time: with a 72 MHz timer clock, `PRESCALER = 71`
//! and `PERIOD = 999` give a 1 MHz tick and a 1 kHz PWM carrier. There is no runtime frequency
//! change. Each [`PwmChannel`] configures its channel in PWM mode 1 with compare preload, puts the
//! channel's output line into alternate-function push-pull and starts the counter.
//!
//! Output lines (no remap):
//!
//! | Timer | CH1 | CH2 | CH3 | CH4 |
//! | ----- | --- | --- | --- | --- |
//! | TIM1  | PA8 | PA9 | PA10 | PA11 |
//! | TIM2  | PA0 | PA1 | PA2 | PA3 |
//! | TIM3  | PA6 | PA7 | PB0 | PB1 |
//! | TIM4  | PB6 | PB7 | PB8 | PB9 |

use core::convert::Infallible;

use embedded_hal::pwm::{ErrorType, SetDutyCycle};

use super::gpio::{Pin, PinMode, Port};
use super::rcc::{ClockGate, Peripheral};
use super::regs::{map, Registers};
use crate::Error;

/// Timer register offsets.
pub mod reg {
    pub const CR1: u32 = 0x00;
    pub const EGR: u32 = 0x14;
    pub const CCMR1: u32 = 0x18;
    pub const CCMR2: u32 = 0x1C;
    pub const CCER: u32 = 0x20;
    pub const CNT: u32 = 0x24;
    pub const PSC: u32 = 0x28;
    pub const ARR: u32 = 0x2C;
    pub const CCR1: u32 = 0x34;
    pub const BDTR: u32 = 0x44;
}

/// Timer clock prescaler (PSC).
pub const PRESCALER: u16 = 72 - 1;

/// Auto-reload value (ARR). The compare range is `0..=PERIOD + 1`.
pub const PERIOD: u16 = 1000 - 1;

const CR1_CEN: u32 = 1 << 0;
const CR1_ARPE: u32 = 1 << 7;
const EGR_UG: u32 = 1 << 0;
const BDTR_MOE: u32 = 1 << 15;
/// OCxM = 110 (PWM mode 1) with OCxPE, for the low half of a CCMR register.
const OC_PWM1_PRELOAD: u32 = (0b110 << 4) | (1 << 3);

/// Timer used for a PWM output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timer {
    Tim1,
    Tim2,
    Tim3,
    Tim4,
}

impl Timer {
    /// Base address of the timer's register block.
    #[inline]
    pub fn base(self) -> u32 {
        match self {
            Timer::Tim1 => map::TIM1,
            Timer::Tim2 => map::TIM2,
            Timer::Tim3 => map::TIM3,
            Timer::Tim4 => map::TIM4,
        }
    }

    #[inline]
    fn peripheral(self) -> Peripheral {
        match self {
            Timer::Tim1 => Peripheral::Tim1,
            Timer::Tim2 => Peripheral::Tim2,
            Timer::Tim3 => Peripheral::Tim3,
            Timer::Tim4 => Peripheral::Tim4,
        }
    }

    /// Output line of `channel` on this timer.
    pub fn output(self, channel: Channel) -> (Port, u8) {
        let ch = channel as u8;
        match self {
            Timer::Tim1 => (Port::A, 8 + ch),
            Timer::Tim2 => (Port::A, ch),
            Timer::Tim3 => match channel {
                Channel::C1 | Channel::C2 => (Port::A, 6 + ch),
                Channel::C3 | Channel::C4 => (Port::B, ch - 2),
            },
            Timer::Tim4 => (Port::B, 6 + ch),
        }
    }
}

/// Timer capture/compare channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    C1 = 0,
    C2 = 1,
    C3 = 2,
    C4 = 3,
}

impl Channel {
    #[inline]
    fn ccr(self) -> u32 {
        reg::CCR1 + 4 * self as u32
    }
}

/// Map a 0..=100 percent duty onto the compare range. Larger values saturate at 100 %.
#[inline]
pub fn compare_for_percent(percent: u8) -> u32 {
    let percent = percent.min(100) as u32;
    (PERIOD as u32 + 1) * percent / 100
}

/// One PWM output.
pub struct PwmChannel<R> {
    regs: R,
    timer: Timer,
    channel: Channel,
    output: Pin<R>,
}

impl<R: Registers + Copy> PwmChannel<R> {
    /// Gate the timer, fix prescale and period, and bring up `channel` at 0 % duty.
    pub fn new(clocks: &ClockGate<R>, timer: Timer, channel: Channel) -> Result<Self, Error> {
        clocks.enable_peripheral(timer.peripheral());

        let (port, index) = timer.output(channel);
        let output = Pin::new(clocks, port, index, PinMode::AF_PUSH_PULL)?;

        let regs = *clocks.regs();
        let base = timer.base();

        regs.write(base + reg::PSC, PRESCALER as u32);
        regs.write(base + reg::ARR, PERIOD as u32);
        regs.write(base + channel.ccr(), 0);

        // CH1/CH3 live in the low byte of CCMR1/CCMR2, CH2/CH4 in the high byte.
        let ccmr = if (channel as u8) < 2 {
            reg::CCMR1
        } else {
            reg::CCMR2
        };
        let shift = 8 * (channel as u32 % 2);
        regs.modify(base + ccmr, |v| {
            (v & !(0xFF << shift)) | (OC_PWM1_PRELOAD << shift)
        });
        regs.set_bits(base + reg::CCER, 1 << (4 * channel as u32));
        if timer == Timer::Tim1 {
            regs.set_bits(base + reg::BDTR, BDTR_MOE);
        }

        // Latch PSC/ARR and start counting.
        regs.write(base + reg::EGR, EGR_UG);
        regs.set_bits(base + reg::CR1, CR1_ARPE | CR1_CEN);

        debug!(
            "pwm: {:?} {:?} on P{:?}{}",
            timer,
            channel,
            port,
            index
        );

        Ok(Self {
            regs,
            timer,
            channel,
            output,
        })
    }
}

impl<R: Registers> PwmChannel<R> {
    /// Set the duty cycle in percent of the period.
    ///
    /// Values above 100 are clamped to 100.
    pub fn set_duty(&self, percent: u8) {
        if percent > 100 {
            warn!("pwm: duty {}% clamped to 100%", percent);
        }
        self.write_compare(compare_for_percent(percent));
    }

    #[inline]
    fn write_compare(&self, value: u32) {
        self.regs.write(self.timer.base() + self.channel.ccr(), value);
    }

    /// Current compare register value.
    #[inline]
    pub fn compare(&self) -> u32 {
        self.regs.read(self.timer.base() + self.channel.ccr())
    }

    /// Current duty cycle in whole percent, rounded down.
    pub fn duty_percent(&self) -> u8 {
        (self.compare() * 100 / (PERIOD as u32 + 1)).min(100) as u8
    }

    #[inline]
    pub fn timer(&self) -> Timer {
        self.timer
    }

    #[inline]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// The alternate-function output line.
    #[inline]
    pub fn output(&self) -> &Pin<R> {
        &self.output
    }
}

impl<R> ErrorType for PwmChannel<R> {
    type Error = Infallible;
}

impl<R: Registers> SetDutyCycle for PwmChannel<R> {
    fn max_duty_cycle(&self) -> u16 {
        PERIOD + 1
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.write_compare(duty.min(PERIOD + 1) as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::gpio::reg as gpio_reg;
    use crate::hw::model::RegisterModel;
    use crate::hw::rcc::{reg as rcc_reg, ClockSource};

    #[test]
    fn output_lines() {
        assert_eq!(Timer::Tim1.output(Channel::C1), (Port::A, 8));
        assert_eq!(Timer::Tim2.output(Channel::C4), (Port::A, 3));
        assert_eq!(Timer::Tim3.output(Channel::C2), (Port::A, 7));
        assert_eq!(Timer::Tim3.output(Channel::C3), (Port::B, 0));
        assert_eq!(Timer::Tim4.output(Channel::C4), (Port::B, 9));
    }

    #[test]
    fn init_fixes_prescale_and_period() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let pwm = PwmChannel::new(&clocks, Timer::Tim3, Channel::C1).unwrap();
        let base = map::TIM3;

        assert_eq!(model.peek(base + reg::PSC), 71);
        assert_eq!(model.peek(base + reg::ARR), 999);
        assert_eq!(model.peek(base + reg::CCMR1) & 0xFF, 0x68);
        assert_eq!(model.peek(base + reg::CCER), 1);
        assert_eq!(model.peek(base + reg::CR1), CR1_ARPE | CR1_CEN);
        assert_eq!(pwm.compare(), 0);

        // TIM3 on APB1 bit 1, its output PA6 as AF push-pull.
        assert_eq!(model.peek(map::RCC + rcc_reg::APB1ENR), 1 << 1);
        assert_eq!(model.pin_nibble(Port::A, 6), 0xB);
        assert_eq!(model.unmapped_accesses(), 0);
    }

    #[test]
    fn high_channels_use_the_upper_ccmr_byte() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let _c3 = PwmChannel::new(&clocks, Timer::Tim4, Channel::C3).unwrap();
        let _c4 = PwmChannel::new(&clocks, Timer::Tim4, Channel::C4).unwrap();

        assert_eq!(model.peek(map::TIM4 + reg::CCMR2), 0x6868);
        assert_eq!(model.peek(map::TIM4 + reg::CCER), (1 << 8) | (1 << 12));
        assert_eq!(model.peek(map::TIM4 + reg::CCMR1), 0);
    }

    #[test]
    fn tim1_needs_main_output_enable() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let _pwm = PwmChannel::new(&clocks, Timer::Tim1, Channel::C2).unwrap();
        assert_eq!(model.peek(map::TIM1 + reg::BDTR), BDTR_MOE);
        assert_eq!(model.peek(map::RCC + rcc_reg::APB2ENR) & (1 << 11), 1 << 11);
    }

    #[test]
    fn duty_is_monotonic_over_the_whole_range() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let pwm = PwmChannel::new(&clocks, Timer::Tim2, Channel::C2).unwrap();

        let mut last = 0;
        for percent in 0..=100u8 {
            pwm.set_duty(percent);
            let ccr = pwm.compare();
            assert!(ccr >= last);
            last = ccr;
        }
        assert_eq!(last, 1000);
    }

    #[test]
    fn duty_readback_and_clamp() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let mut pwm = PwmChannel::new(&clocks, Timer::Tim2, Channel::C1).unwrap();

        pwm.set_duty(75);
        assert_eq!(pwm.compare(), 750);
        assert_eq!(pwm.duty_percent(), 75);

        pwm.set_duty(180);
        assert_eq!(pwm.compare(), 1000);

        pwm.set_duty_cycle_percent(40).unwrap();
        assert_eq!(pwm.compare(), 400);
        assert_eq!(model.peek(map::GPIOA + gpio_reg::ODR), 0);
    }
}
