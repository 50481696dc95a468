//! Encoder edges from several motors sharing the EXTI vectors.

use cybertruck::board;
use cybertruck::drivers::{Direction, MotorConfig, MotorUnit};
use cybertruck::hw::{
    Channel, ClockGate, ClockSource, Exti, ExtiVector, Port, RegisterModel, Timer, Trigger,
};
use cybertruck::hw::exti::reg as exti_reg;
use cybertruck::hw::regs::map;
use cybertruck::motors::{MotorBank, MotorRegistry};
use cybertruck::Error;

#[test]
fn adjacent_pins_reach_only_their_owner() {
    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, ClockSource::Hse);
    // Pins 5/6 and 7/8: both pairs share EXTI9_5.
    let first = MotorUnit::new(
        &clocks,
        MotorConfig::new(Port::B, [5, 6], Timer::Tim2, Channel::C1),
    )
    .unwrap();
    let second = MotorUnit::new(
        &clocks,
        MotorConfig::new(Port::B, [7, 8], Timer::Tim2, Channel::C2),
    )
    .unwrap();
    let mut registry = MotorRegistry::new();
    registry.attach(&first).unwrap();
    registry.attach(&second).unwrap();
    let mut exti = Exti::new(&clocks);
    registry.bind(&mut exti).unwrap();

    first.drive(Direction::Forward);
    second.drive(Direction::Forward);

    // Two lines pending at once, one service call.
    model.inject_edge(Port::B, 6, true);
    model.inject_edge(Port::B, 7, true);
    exti.service(ExtiVector::Exti9_5);

    // First: B edge with B low -> +1. Second: A edge with A high -> +1.
    assert_eq!(first.position(), 1);
    assert_eq!(second.position(), 1);

    model.inject_edge(Port::B, 7, true);
    exti.service(ExtiVector::Exti9_5);
    model.inject_edge(Port::B, 7, true);
    exti.service(ExtiVector::Exti9_5);
    assert_eq!(first.position(), 1);
    assert_eq!(second.position(), 3);
}

#[test]
fn lines_on_another_port_do_not_fire() {
    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, ClockSource::Hse);
    let motor = MotorUnit::new(&clocks, board::RIGHT_MOTOR).unwrap();
    let mut registry = MotorRegistry::new();
    registry.attach(&motor).unwrap();
    let mut exti = Exti::new(&clocks);
    registry.bind(&mut exti).unwrap();

    motor.drive(Direction::Forward);
    assert!(!model.inject_edge(Port::A, 12, true));
    assert!(!model.inject_edge(Port::B, 12, false));
    assert!(model.inject_edge(Port::B, 12, true));
    exti.service(ExtiVector::Exti15_10);
    assert_eq!(motor.position(), 1);
}

#[test]
fn encoder_line_cannot_be_taken_twice() {
    struct Nop;
    impl cybertruck::hw::EdgeHandler for Nop {
        fn on_edge(&self, _line: u8) {}
    }

    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, ClockSource::Hse);
    let motor = MotorUnit::new(&clocks, board::LEFT_MOTOR).unwrap();
    let nop = Nop;
    let mut registry = MotorRegistry::new();
    registry.attach(&motor).unwrap();
    let mut exti = Exti::new(&clocks);

    exti.listen(Port::C, 1, Trigger::Falling, &nop).unwrap();
    assert_eq!(registry.bind(&mut exti), Err(Error::LineInUse(1)));
    // Nothing armed by the failed bind.
    assert!(!exti.is_listening(0));
    assert_eq!(model.peek(map::EXTI + exti_reg::IMR), 1 << 1);
}

#[test]
fn board_bring_up() {
    let model = RegisterModel::new();
    let clocks = ClockGate::new(&model, board::CLOCK_SOURCE);
    let left = MotorUnit::new(&clocks, board::LEFT_MOTOR).unwrap();
    let right = MotorUnit::new(&clocks, board::RIGHT_MOTOR).unwrap();
    let mut registry = MotorRegistry::new();
    registry.attach(&left).unwrap();
    registry.attach(&right).unwrap();
    let mut exti = Exti::new(&clocks);
    registry.bind(&mut exti).unwrap();
    let bank = MotorBank::new([&left, &right]);

    bank.drive_all(Direction::Forward, 50);
    for pin in [0, 0, 1] {
        model.inject_edge(Port::A, pin, true);
        exti.service(ExtiVector::for_line(pin));
    }
    model.inject_edge(Port::B, 13, true);
    exti.service(ExtiVector::Exti15_10);

    // Left: two A edges (+2) and one B edge with B low (+1). Right: one B edge (+1).
    assert_eq!(bank.positions(), [3, 1]);
    assert_eq!(bank.position(2), Err(Error::NoSuchMotor(2)));

    bank.stop_all();
    assert_eq!(left.speed(), 0);
    assert_eq!(right.state(), Direction::Stopped);
}
