//! Full bring-up against the register model: clocks, pins, PWM, EXTI and the encoder path.

use cybertruck::drivers::{DecodeRule, Direction, MotorConfig, MotorUnit};
use cybertruck::hw::exti::reg as exti_reg;
use cybertruck::hw::pwm::reg as tim_reg;
use cybertruck::hw::regs::map;
use cybertruck::hw::{
    Channel, ClockGate, ClockSource, Exti, ExtiVector, Port, RegisterModel, Timer,
};
use cybertruck::motors::MotorRegistry;

const MOTOR: MotorConfig = MotorConfig::new(Port::A, [0, 1], Timer::Tim3, Channel::C1);

/// One rising edge on `pin` of port A, serviced the way the vector would.
fn edge(model: &RegisterModel, exti: &Exti<'_, &RegisterModel>, pin: u8) {
    assert!(model.inject_edge(Port::A, pin, true));
    exti.service(ExtiVector::for_line(pin));
}

#[test]
fn forward_at_75_percent_counts_ten_edges() {
    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, ClockSource::Hse);
    let motor = MotorUnit::new(&clocks, MOTOR).unwrap();
    let mut registry = MotorRegistry::new();
    registry.attach(&motor).unwrap();
    let mut exti = Exti::new(&clocks);
    registry.bind(&mut exti).unwrap();

    motor.drive(Direction::Forward);
    motor.set_speed(75);

    assert!(model.output_level(Port::A, 0));
    assert!(!model.output_level(Port::A, 1));
    assert_eq!(model.peek(map::TIM3 + tim_reg::CCR1), 750);
    assert_eq!(model.peek(map::TIM3 + tim_reg::ARR) + 1, 1000);

    for _ in 0..10 {
        edge(&model, &exti, 0);
    }
    assert_eq!(motor.position(), 10);
    assert_eq!(model.peek(map::EXTI + exti_reg::PR), 0);
    assert_eq!(model.unmapped_accesses(), 0);
}

#[test]
fn interleaved_reads_track_the_same_channel_rule() {
    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, ClockSource::Hse);
    let motor = MotorUnit::new(&clocks, MOTOR).unwrap();
    let mut registry = MotorRegistry::new();
    registry.attach(&motor).unwrap();
    let mut exti = Exti::new(&clocks);
    registry.bind(&mut exti).unwrap();

    // (direction, pin, expected delta)
    let script = [
        (Direction::Forward, 0, 1),
        (Direction::Forward, 1, 1),
        (Direction::Reverse, 1, -1),
        (Direction::Reverse, 0, -1),
        (Direction::Stopped, 0, -1),
        (Direction::Stopped, 1, 1),
    ];
    let mut expected = 0;
    for (direction, pin, delta) in script {
        motor.drive(direction);
        for _ in 0..3 {
            edge(&model, &exti, pin);
            expected += delta;
            assert_eq!(motor.position(), expected);
        }
    }
}

#[test]
fn decode_rules_differ_only_when_both_lines_agree() {
    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, ClockSource::Hse);
    let same = MotorUnit::new(&clocks, MOTOR).unwrap();
    let quad = MotorUnit::new(
        &clocks,
        MotorConfig::new(Port::B, [0, 1], Timer::Tim4, Channel::C1).with_decode(DecodeRule::Quadrature),
    )
    .unwrap();

    // Forward: A high, B low. Both rules count every edge up.
    same.drive(Direction::Forward);
    quad.drive(Direction::Forward);
    for motor in [&same, &quad] {
        motor.handle_edge(cybertruck::drivers::EncoderChannel::A);
    }
    assert_eq!((same.position(), quad.position()), (1, 1));

    // Stopped: both low. Same-channel counts A down, quadrature counts it up.
    same.drive(Direction::Stopped);
    quad.drive(Direction::Stopped);
    for motor in [&same, &quad] {
        motor.handle_edge(cybertruck::drivers::EncoderChannel::A);
    }
    assert_eq!((same.position(), quad.position()), (0, 2));
}

#[test]
fn reset_then_read_is_zero() {
    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, ClockSource::Hse);
    let motor = MotorUnit::new(&clocks, MOTOR).unwrap();
    let mut registry = MotorRegistry::new();
    registry.attach(&motor).unwrap();
    let mut exti = Exti::new(&clocks);
    registry.bind(&mut exti).unwrap();

    motor.drive(Direction::Forward);
    for _ in 0..4 {
        edge(&model, &exti, 0);
    }
    motor.reset_position();
    assert_eq!(motor.position(), 0);
}

#[test]
fn tick_between_read_and_reset_is_lost() {
    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, ClockSource::Hse);
    let motor = MotorUnit::new(&clocks, MOTOR).unwrap();
    let mut registry = MotorRegistry::new();
    registry.attach(&motor).unwrap();
    let mut exti = Exti::new(&clocks);
    registry.bind(&mut exti).unwrap();

    motor.drive(Direction::Forward);
    for _ in 0..3 {
        edge(&model, &exti, 0);
    }
    let read = motor.position();
    // The interrupt lands after the read, before the reset.
    edge(&model, &exti, 0);
    motor.reset_position();

    assert_eq!(read, 3);
    assert_eq!(motor.position(), 0);
}

#[test]
fn stop_after_speed_zero_leaves_the_motor_off() {
    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, ClockSource::Hse);
    let motor = MotorUnit::new(&clocks, MOTOR).unwrap();

    motor.drive(Direction::Reverse);
    motor.set_speed(40);
    motor.set_speed(0);
    motor.stop();

    assert_eq!(model.peek(map::TIM3 + tim_reg::CCR1), 0);
    assert!(!model.output_level(Port::A, 0));
    assert!(!model.output_level(Port::A, 1));
    assert_eq!(motor.state(), Direction::Stopped);
}
