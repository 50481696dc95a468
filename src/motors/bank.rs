// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Motors addressed by index, the way a remote command names them ("motor 2 forward").
//!
//! An index outside the bank is reported as [`Error::NoSuchMotor`] rather than dropped.

use crate::drivers::dc_motor::{Direction, MotorUnit};
use crate::hw::regs::Registers;
use crate::Error;

pub struct MotorBank<'a, R, const N: usize> {
    motors: [&'a MotorUnit<R>; N],
}

impl<'a, R: Registers, const N: usize> MotorBank<'a, R, N> {
    pub fn new(motors: [&'a MotorUnit<R>; N]) -> Self {
        Self { motors }
    }

    #[inline]
    pub fn len(&self) -> usize {
        N
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn motor(&self, index: usize) -> Result<&'a MotorUnit<R>, Error> {
        self.motors
            .get(index)
            .copied()
            .ok_or(Error::NoSuchMotor(index))
    }

    pub fn drive(&self, index: usize, direction: Direction) -> Result<(), Error> {
        self.motor(index)?.drive(direction);
        Ok(())
    }

    pub fn set_speed(&self, index: usize, percent: u8) -> Result<(), Error> {
        self.motor(index)?.set_speed(percent);
        Ok(())
    }

    pub fn stop(&self, index: usize) -> Result<(), Error> {
        self.motor(index)?.stop();
        Ok(())
    }

    pub fn position(&self, index: usize) -> Result<i32, Error> {
        Ok(self.motor(index)?.position())
    }

    /// Same direction and speed on every motor.
    pub fn drive_all(&self, direction: Direction, percent: u8) {
        for motor in self.motors {
            motor.drive(direction);
            motor.set_speed(percent);
        }
    }

    pub fn stop_all(&self) {
        for motor in self.motors {
            motor.stop();
        }
    }

    /// Positions of all motors, in bank order.
    pub fn positions(&self) -> [i32; N] {
        self.motors.map(|m| m.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::dc_motor::MotorConfig;
    use crate::drivers::encoder::EncoderChannel;
    use crate::hw::gpio::Port;
    use crate::hw::model::RegisterModel;
    use crate::hw::pwm::{Channel, Timer};
    use crate::hw::rcc::{ClockGate, ClockSource};

    #[test]
    fn out_of_range_index_is_an_error() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let left = MotorUnit::new(
            &clocks,
            MotorConfig::new(Port::A, [0, 1], Timer::Tim3, Channel::C1),
        )
        .unwrap();
        let right = MotorUnit::new(
            &clocks,
            MotorConfig::new(Port::B, [12, 13], Timer::Tim4, Channel::C1),
        )
        .unwrap();
        let bank = MotorBank::new([&left, &right]);

        assert_eq!(bank.len(), 2);
        assert_eq!(bank.drive(2, Direction::Forward), Err(Error::NoSuchMotor(2)));
        assert_eq!(bank.set_speed(7, 50), Err(Error::NoSuchMotor(7)));
        assert_eq!(bank.stop(usize::MAX), Err(Error::NoSuchMotor(usize::MAX)));
        assert_eq!(bank.position(2), Err(Error::NoSuchMotor(2)));
        assert!(bank.motor(3).is_err());

        bank.drive(1, Direction::Reverse).unwrap();
        bank.set_speed(1, 30).unwrap();
        assert_eq!(right.state(), Direction::Reverse);
        assert_eq!(right.speed(), 30);
        assert_eq!(left.state(), Direction::Stopped);
    }

    #[test]
    fn all_motors() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let left = MotorUnit::new(
            &clocks,
            MotorConfig::new(Port::A, [0, 1], Timer::Tim3, Channel::C1),
        )
        .unwrap();
        let right = MotorUnit::new(
            &clocks,
            MotorConfig::new(Port::B, [12, 13], Timer::Tim4, Channel::C1),
        )
        .unwrap();
        let bank = MotorBank::new([&left, &right]);

        bank.drive_all(Direction::Forward, 80);
        assert_eq!(left.speed(), 80);
        assert_eq!(right.state(), Direction::Forward);

        left.handle_edge(EncoderChannel::A);
        right.handle_edge(EncoderChannel::A);
        right.handle_edge(EncoderChannel::A);
        assert_eq!(bank.positions(), [1, 2]);

        bank.stop_all();
        assert_eq!(left.speed(), 0);
        assert_eq!(right.state(), Direction::Stopped);
    }
}
