// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Crate-wide error type.

use core::fmt;

use crate::hw::gpio::Port;
use crate::hw::pwm::{Channel, Timer};

/// Error type for construction and registration.
///
/// Everything that can go wrong is caught while the board is being brought up; the per-tick paths
/// (`set`, `clear`, `set_duty`, encoder dispatch) have no failure mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Pin index outside 0..=15.
    InvalidPin(u8),
    /// Clock-enable bit outside 0..=31.
    InvalidClockBit(u8),
    /// Both direction pins of a motor name the same line.
    DuplicatePin(u8),
    /// The PWM output line of a motor is one of its direction pins.
    PwmPinConflict { port: Port, pin: u8 },
    /// Another motor already drives this timer channel.
    PwmInUse { timer: Timer, channel: Channel },
    /// A direction pin of one motor is the PWM output line of another.
    PwmLineTaken { port: Port, pin: u8 },
    /// The EXTI line already has a handler.
    LineInUse(u8),
    /// The registry slot for this pin belongs to another motor.
    PinClaimed(u8),
    /// Motor index outside the bank.
    NoSuchMotor(usize),
    /// Baud rate of zero, or too high for the bus clock.
    InvalidBaud(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPin(pin) => write!(f, "pin index {} out of range", pin),
            Error::InvalidClockBit(bit) => write!(f, "clock enable bit {} out of range", bit),
            Error::DuplicatePin(pin) => write!(f, "pin {} used twice", pin),
            Error::PwmPinConflict { port, pin } => {
                write!(f, "PWM output P{:?}{} is a direction pin", port, pin)
            }
            Error::PwmInUse { timer, channel } => {
                write!(f, "{:?} {:?} already drives another motor", timer, channel)
            }
            Error::PwmLineTaken { port, pin } => {
                write!(f, "P{:?}{} is both a PWM output and a direction pin", port, pin)
            }
            Error::LineInUse(line) => write!(f, "EXTI line {} already registered", line),
            Error::PinClaimed(pin) => write!(f, "pin {} already claimed by a motor", pin),
            Error::NoSuchMotor(index) => write!(f, "no motor at index {}", index),
            Error::InvalidBaud(baud) => write!(f, "baud rate {} not reachable", baud),
        }
    }
}
