// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Cyber Truck Drive Firmware
//!
//! This crate contains the motor-control core of the Cyber Truck robot, written in Rust, targeting
//! an STM32F103 MCU. It drives brushed DC motors through H-bridges and tracks their position from
//! encoder edges.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`hw`] | MCU-level wrappers around RCC, GPIO, timers, EXTI and USART |
//! | [`drivers`] | Device-level drivers (DC motor, encoder decoding) |
//! | [`motors`] | Encoder interrupt routing and index-addressed motor groups |
//! | [`board`] | Pin and clock assignments of the controller board |
//! | [`platform`] | Once-per-boot hardware context |
//!
//! Everything in `hw` goes through the [`Registers`](hw::Registers) trait, so the whole stack
//! runs on the host against `hw::RegisterModel` (feature `model`) in `cargo test`.
//!
//! ## Getting Started
//!
//! Build docs:
//!
//! ```bash
//! cargo doc --no-deps --open
//! ```
//!
//! Run the host tests:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --features firmware --target thumbv7m-none-eabi
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module below.
#[macro_use]
mod fmt;

pub mod board;
pub mod drivers;
pub mod error;
pub mod hw;
pub mod motors;
pub mod platform;

pub use error::Error;
