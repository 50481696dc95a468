// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

#![no_main]
#![no_std]

use core::cell::Cell;
use core::fmt::Write;

use cortex_m::singleton;
use cortex_m_rt::entry;
use critical_section::Mutex;
use defmt_rtt as _;
use panic_halt as _;

use hal::{pac, pac::interrupt, prelude::*};
use stm32f1xx_hal as hal;

use cybertruck::board;
use cybertruck::drivers::{Direction, MotorUnit};
use cybertruck::hw::{Exti, ExtiVector, Mmio, Usart};
use cybertruck::motors::{MotorBank, MotorRegistry};
use cybertruck::platform::Platform;

static EXTI: Mutex<Cell<Option<&'static Exti<'static, Mmio>>>> = Mutex::new(Cell::new(None));
static USART: Mutex<Cell<Option<&'static Usart<Mmio>>>> = Mutex::new(Cell::new(None));

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();

    // Clocks: 8 MHz HSE -> 72 MHz SYSCLK, APB1 36 MHz, APB2 72 MHz
    let mut flash = dp.FLASH.constrain();
    let rcc = dp.RCC.constrain();
    let clocks = rcc
        .cfgr
        .use_hse(board::HSE_HZ.Hz())
        .sysclk(board::SYSCLK_HZ.Hz())
        .pclk1(board::PCLK1_HZ.Hz())
        .freeze(&mut flash.acr);

    // Everything below drives the registers directly.
    let platform = Platform::take(board::CLOCK_SOURCE).unwrap();
    let gate = platform.clocks();

    // USART1 (host link)
    let usart: &'static Usart<Mmio> = critical_section::with(|cs| {
        let usart: &'static Usart<Mmio> = singleton!(: Usart<Mmio> =
            Usart::new(gate, clocks.pclk2().raw(), board::BAUD).unwrap())
        .unwrap();
        USART.borrow(cs).set(Some(usart));
        usart
    });

    // Motors
    let left: &'static MotorUnit<Mmio> =
        singleton!(: MotorUnit<Mmio> = MotorUnit::new(gate, board::LEFT_MOTOR).unwrap()).unwrap();
    let right: &'static MotorUnit<Mmio> =
        singleton!(: MotorUnit<Mmio> = MotorUnit::new(gate, board::RIGHT_MOTOR).unwrap()).unwrap();

    // Encoder routing
    let registry = singleton!(: MotorRegistry<'static, Mmio> = MotorRegistry::new()).unwrap();
    registry.attach(left).unwrap();
    registry.attach(right).unwrap();
    let registry: &'static MotorRegistry<'static, Mmio> = registry;

    let exti = singleton!(: Exti<'static, Mmio> = Exti::new(gate)).unwrap();
    // Publish the table before the first edge can be taken.
    critical_section::with(|cs| {
        registry.bind(exti).unwrap();
        let exti: &'static Exti<'static, Mmio> = exti;
        EXTI.borrow(cs).set(Some(exti));
    });

    let bank = MotorBank::new([left, right]);
    defmt::info!("cybertruck: {} motors up", bank.len());
    usart.println("cybertruck: ready");

    // EXAMPLE USAGE
    bank.drive_all(Direction::Forward, 60);

    let mut out = usart;
    loop {
        cortex_m::asm::delay(board::SYSCLK_HZ / 10);
        let [l, r] = bank.positions();
        defmt::debug!("position L={} R={}", l, r);
        let _ = write!(out, "L={} R={}\r\n", l, r);
    }
}

fn service(vector: ExtiVector) {
    if let Some(exti) = critical_section::with(|cs| EXTI.borrow(cs).get()) {
        exti.service(vector);
    }
}

#[interrupt]
fn EXTI0() {
    service(ExtiVector::Exti0);
}

#[interrupt]
fn EXTI1() {
    service(ExtiVector::Exti1);
}

#[interrupt]
fn EXTI2() {
    service(ExtiVector::Exti2);
}

#[interrupt]
fn EXTI3() {
    service(ExtiVector::Exti3);
}

#[interrupt]
fn EXTI4() {
    service(ExtiVector::Exti4);
}

#[interrupt]
fn EXTI9_5() {
    service(ExtiVector::Exti9_5);
}

#[interrupt]
fn EXTI15_10() {
    service(ExtiVector::Exti15_10);
}

#[interrupt]
fn USART1() {
    if let Some(usart) = critical_section::with(|cs| USART.borrow(cs).get()) {
        usart.on_interrupt();
    }
}
