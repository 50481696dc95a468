// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Brushed DC motor behind an H-bridge with a two-channel encoder.
//!
//! A [`MotorUnit`] drives two direction lines (IN1/IN2 of the bridge) and one PWM enable. The same
//! two lines carry the encoder signals back: edges on them are routed through
//! [`MotorRegistry`](crate::motors::MotorRegistry) to [`MotorUnit::handle_edge`], which adjusts
//! the position counter according to the configured [`DecodeRule`].
//!
//! Every method takes `&self`, so the registry (interrupt context) and the application
//! (foreground) can share one unit. The position counter has exactly one writer in steady state,
//! the interrupt; foreground only loads it or zeroes it.

use core::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use super::encoder::{DecodeRule, EncoderChannel};
use crate::hw::gpio::{Pin, PinMode, Port};
use crate::hw::pwm::{Channel, PwmChannel, Timer};
use crate::hw::rcc::ClockGate;
use crate::hw::regs::Registers;
use crate::Error;

/// Bridge state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// IN1 high, IN2 low.
    Forward,
    /// IN1 low, IN2 high.
    Reverse,
    /// Both low.
    Stopped,
}

impl Direction {
    #[inline]
    fn levels(self) -> (bool, bool) {
        match self {
            Direction::Forward => (true, false),
            Direction::Reverse => (false, true),
            Direction::Stopped => (false, false),
        }
    }

    #[inline]
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Direction::Forward,
            1 => Direction::Reverse,
            _ => Direction::Stopped,
        }
    }
}

/// Wiring of one motor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorConfig {
    /// Port of both direction / encoder lines.
    pub port: Port,
    /// `[IN1 / encoder A, IN2 / encoder B]` pin indices.
    pub pins: [u8; 2],
    /// Timer and channel of the PWM enable.
    pub timer: Timer,
    pub channel: Channel,
    pub decode: DecodeRule,
}

impl MotorConfig {
    /// Config with the default decode rule.
    pub const fn new(port: Port, pins: [u8; 2], timer: Timer, channel: Channel) -> Self {
        Self {
            port,
            pins,
            timer,
            channel,
            decode: DecodeRule::SameChannel,
        }
    }

    /// Same wiring, different decode rule.
    pub const fn with_decode(self, decode: DecodeRule) -> Self {
        Self { decode, ..self }
    }

    /// Pin of an encoder channel.
    #[inline]
    pub fn pin(&self, channel: EncoderChannel) -> u8 {
        self.pins[channel.index()]
    }

    /// Reject configurations that cannot be wired.
    pub fn validate(&self) -> Result<(), Error> {
        for &pin in &self.pins {
            if pin > 15 {
                return Err(Error::InvalidPin(pin));
            }
        }
        if self.pins[0] == self.pins[1] {
            return Err(Error::DuplicatePin(self.pins[0]));
        }
        let (port, pin) = self.timer.output(self.channel);
        if port == self.port && self.pins.contains(&pin) {
            return Err(Error::PwmPinConflict { port, pin });
        }
        Ok(())
    }

    /// Reject wiring that collides with another motor's PWM channel or output line.
    pub fn check_against(&self, other: &MotorConfig) -> Result<(), Error> {
        if self.timer == other.timer && self.channel == other.channel {
            return Err(Error::PwmInUse {
                timer: self.timer,
                channel: self.channel,
            });
        }
        for (a, b) in [(self, other), (other, self)] {
            let (port, pin) = b.timer.output(b.channel);
            if port == a.port && a.pins.contains(&pin) {
                return Err(Error::PwmLineTaken { port, pin });
            }
        }
        Ok(())
    }
}

/// One H-bridge motor with encoder feedback.
pub struct MotorUnit<R> {
    config: MotorConfig,
    pins: [Pin<R>; 2],
    pwm: PwmChannel<R>,
    state: AtomicU8,
    position: AtomicI32,
}

impl<R: Registers + Copy> MotorUnit<R> {
    /// Configure the direction lines as push-pull outputs, bring up the PWM channel and leave the
    /// motor stopped at 0 % duty.
    ///
    /// Encoder interrupts are not armed here; attach the unit to a
    /// [`MotorRegistry`](crate::motors::MotorRegistry) for that.
    pub fn new(clocks: &ClockGate<R>, config: MotorConfig) -> Result<Self, Error> {
        config.validate()?;

        let pins = [
            Pin::new(clocks, config.port, config.pins[0], PinMode::PUSH_PULL)?,
            Pin::new(clocks, config.port, config.pins[1], PinMode::PUSH_PULL)?,
        ];
        let pwm = PwmChannel::new(clocks, config.timer, config.channel)?;

        let motor = Self {
            config,
            pins,
            pwm,
            state: AtomicU8::new(Direction::Stopped as u8),
            position: AtomicI32::new(0),
        };
        motor.drive(Direction::Stopped);

        info!(
            "motor: P{:?}{}/P{:?}{} pwm {:?} {:?}",
            config.port,
            config.pins[0],
            config.port,
            config.pins[1],
            config.timer,
            config.channel
        );
        Ok(motor)
    }
}

impl<R: Registers> MotorUnit<R> {
    /// Set the bridge to `direction`. Takes effect immediately, without dead time.
    pub fn drive(&self, direction: Direction) {
        let (in1, in2) = direction.levels();
        let [a, b] = &self.pins;
        // Release before asserting so both lines are never high together.
        if in1 {
            b.set_level(in2);
            a.set_level(in1);
        } else {
            a.set_level(in1);
            b.set_level(in2);
        }
        self.state.store(direction as u8, Ordering::Relaxed);
        debug!("motor: P{:?}{} {:?}", self.config.port, self.config.pins[0], direction);
    }

    /// Set the PWM duty in percent. Does not change direction.
    #[inline]
    pub fn set_speed(&self, percent: u8) {
        self.pwm.set_duty(percent);
    }

    /// Bridge off, then duty to zero.
    pub fn stop(&self) {
        self.drive(Direction::Stopped);
        self.pwm.set_duty(0);
    }

    /// Encoder count since construction or the last reset.
    #[inline]
    pub fn position(&self) -> i32 {
        self.position.load(Ordering::Relaxed)
    }

    /// Zero the encoder count.
    ///
    /// A tick that lands between a caller's [`position`](Self::position) and this store is lost.
    #[inline]
    pub fn reset_position(&self) {
        self.position.store(0, Ordering::Relaxed);
    }

    /// Last commanded direction.
    #[inline]
    pub fn state(&self) -> Direction {
        Direction::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Current duty in percent.
    #[inline]
    pub fn speed(&self) -> u8 {
        self.pwm.duty_percent()
    }

    #[inline]
    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    #[inline]
    pub fn pwm(&self) -> &PwmChannel<R> {
        &self.pwm
    }

    /// Count one rising edge on `channel`.
    ///
    /// Interrupt context only. The update is a plain load and store: the interrupt is the only
    /// writer, and an edge on the other line of the same motor cannot preempt it.
    pub fn handle_edge(&self, channel: EncoderChannel) {
        let own = self.pins[channel.index()].get();
        let companion = self.pins[channel.companion().index()].get();
        let step = self.config.decode.step(channel, own, companion);
        let position = self.position.load(Ordering::Relaxed);
        self.position
            .store(position.wrapping_add(step), Ordering::Relaxed);
    }
}
