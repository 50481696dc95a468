// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin-to-motor lookup for encoder interrupts.
//!
//! The EXTI vectors only say *which line* fired. The registry maps that line number back to the
//! [`MotorUnit`] owning the pin and to the encoder channel the pin carries. It is filled with
//! [`MotorRegistry::attach`] during startup and then handed, by shared reference, to the EXTI
//! table with [`MotorRegistry::bind`]. From then on it can no longer be changed.

use crate::drivers::dc_motor::MotorUnit;
use crate::drivers::encoder::EncoderChannel;
use crate::hw::exti::{EdgeHandler, Exti, Trigger, LINES};
use crate::hw::regs::Registers;
use crate::Error;

type Slot<'a, R> = Option<(&'a MotorUnit<R>, EncoderChannel)>;

pub struct MotorRegistry<'a, R> {
    slots: [Slot<'a, R>; LINES],
}

impl<'a, R: Registers> Default for MotorRegistry<'a, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R: Registers> MotorRegistry<'a, R> {
    pub const fn new() -> Self {
        Self {
            slots: [None; LINES],
        }
    }

    /// Claim both encoder pins of `motor`.
    ///
    /// Fails with [`Error::PinClaimed`] if either slot is taken, and with [`Error::PwmInUse`] or
    /// [`Error::PwmLineTaken`] if its PWM wiring collides with an attached motor. The registry is
    /// unchanged on error.
    pub fn attach(&mut self, motor: &'a MotorUnit<R>) -> Result<(), Error> {
        let config = motor.config();
        for channel in [EncoderChannel::A, EncoderChannel::B] {
            let pin = config.pin(channel);
            if self.slots[pin as usize].is_some() {
                warn!("registry: pin {} already claimed", pin);
                return Err(Error::PinClaimed(pin));
            }
        }
        for (other, _) in self.slots.iter().flatten() {
            if let Err(e) = config.check_against(other.config()) {
                warn!("registry: {:?}", e);
                return Err(e);
            }
        }
        for channel in [EncoderChannel::A, EncoderChannel::B] {
            self.slots[config.pin(channel) as usize] = Some((motor, channel));
        }
        Ok(())
    }

    /// Motor and channel owning `pin`.
    pub fn motor(&self, pin: u8) -> Option<(&'a MotorUnit<R>, EncoderChannel)> {
        self.slots.get(pin as usize).copied().flatten()
    }

    /// Number of claimed pins.
    pub fn claimed(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl<'a, R: Registers + Copy + Sync + 'a> MotorRegistry<'a, R> {
    /// Arm a rising-edge interrupt on every claimed pin with this registry as the handler.
    ///
    /// Fails with [`Error::LineInUse`] before arming anything if one of the lines already has a
    /// handler.
    pub fn bind(&'a self, exti: &mut Exti<'a, R>) -> Result<(), Error> {
        for (pin, slot) in self.slots.iter().enumerate() {
            if slot.is_some() && exti.is_listening(pin as u8) {
                warn!("registry: EXTI line {} taken", pin);
                return Err(Error::LineInUse(pin as u8));
            }
        }
        for (pin, slot) in self.slots.iter().enumerate() {
            if let Some((motor, _)) = slot {
                exti.listen(motor.config().port, pin as u8, Trigger::Rising, self)?;
            }
        }
        Ok(())
    }
}

impl<'a, R: Registers> MotorRegistry<'a, R> {
    /// Shared entry point of all encoder edges.
    ///
    /// Pins nobody claimed are ignored.
    pub fn encoder_callback(&self, pin: u8) {
        match self.motor(pin) {
            Some((motor, channel)) => motor.handle_edge(channel),
            None => warn!("registry: edge on unclaimed pin {}", pin),
        }
    }
}

impl<'a, R: Registers> EdgeHandler for MotorRegistry<'a, R> {
    #[inline]
    fn on_edge(&self, line: u8) {
        self.encoder_callback(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::dc_motor::{Direction, MotorConfig};
    use crate::hw::exti::reg as exti_reg;
    use crate::hw::gpio::Port;
    use crate::hw::model::RegisterModel;
    use crate::hw::pwm::{Channel, Timer};
    use crate::hw::rcc::{ClockGate, ClockSource};
    use crate::hw::regs::map;

    const LEFT: MotorConfig = MotorConfig::new(Port::A, [0, 1], Timer::Tim3, Channel::C1);
    const RIGHT: MotorConfig = MotorConfig::new(Port::B, [2, 3], Timer::Tim4, Channel::C1);

    #[test]
    fn attach_claims_both_pins() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let motor = MotorUnit::new(&clocks, LEFT).unwrap();
        let mut registry = MotorRegistry::new();

        registry.attach(&motor).unwrap();
        assert_eq!(registry.claimed(), 2);
        assert!(matches!(registry.motor(0), Some((_, EncoderChannel::A))));
        assert!(matches!(registry.motor(1), Some((_, EncoderChannel::B))));
        assert!(registry.motor(2).is_none());
        assert!(registry.motor(200).is_none());
    }

    #[test]
    fn overlapping_motor_is_rejected_whole() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let left = MotorUnit::new(&clocks, LEFT).unwrap();
        let other = MotorConfig::new(Port::B, [1, 5], Timer::Tim4, Channel::C2);
        let clash = MotorUnit::new(&clocks, other).unwrap();
        let mut registry = MotorRegistry::new();

        registry.attach(&left).unwrap();
        assert_eq!(registry.attach(&clash), Err(Error::PinClaimed(1)));
        assert!(registry.motor(5).is_none());
        assert_eq!(registry.claimed(), 2);
    }

    #[test]
    fn shared_timer_channel_is_rejected() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let left = MotorUnit::new(&clocks, LEFT).unwrap();
        let twin = MotorConfig::new(Port::B, [12, 13], Timer::Tim3, Channel::C1);
        let twin = MotorUnit::new(&clocks, twin).unwrap();
        let mut registry = MotorRegistry::new();

        registry.attach(&left).unwrap();
        assert_eq!(
            registry.attach(&twin),
            Err(Error::PwmInUse {
                timer: Timer::Tim3,
                channel: Channel::C1
            })
        );
        assert!(registry.motor(12).is_none());
        assert_eq!(registry.claimed(), 2);
    }

    #[test]
    fn direction_pin_on_a_pwm_output_is_rejected() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let left = MotorUnit::new(&clocks, LEFT).unwrap();
        // PA6 is TIM3_CH1, the enable line of LEFT.
        let other = MotorConfig::new(Port::A, [6, 7], Timer::Tim4, Channel::C2);
        let other = MotorUnit::new(&clocks, other).unwrap();
        let mut registry = MotorRegistry::new();

        registry.attach(&left).unwrap();
        assert_eq!(
            registry.attach(&other),
            Err(Error::PwmLineTaken {
                port: Port::A,
                pin: 6
            })
        );
        assert!(registry.motor(6).is_none());
    }

    #[test]
    fn callback_reaches_only_the_owner() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let left = MotorUnit::new(&clocks, LEFT).unwrap();
        let right = MotorUnit::new(&clocks, RIGHT).unwrap();
        let mut registry = MotorRegistry::new();
        registry.attach(&left).unwrap();
        registry.attach(&right).unwrap();

        left.drive(Direction::Forward);
        right.drive(Direction::Forward);
        registry.encoder_callback(2);
        registry.encoder_callback(2);
        registry.encoder_callback(0);
        registry.encoder_callback(9);

        assert_eq!(left.position(), 1);
        assert_eq!(right.position(), 2);
    }

    #[test]
    fn bind_arms_rising_edges() {
        let model = RegisterModel::new();
        let clocks = ClockGate::new(&model, ClockSource::Hse);
        let left = MotorUnit::new(&clocks, LEFT).unwrap();
        let mut registry = MotorRegistry::new();
        registry.attach(&left).unwrap();

        let mut exti = Exti::new(&clocks);
        registry.bind(&mut exti).unwrap();
        assert!(exti.is_listening(0));
        assert!(exti.is_listening(1));
        assert!(!exti.is_listening(2));
        assert_eq!(model.peek(map::EXTI + exti_reg::RTSR), 0b11);
    }
}
