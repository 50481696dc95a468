// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Actuator Abstractions
//!
//! This module ties `MotorUnit`s from `drivers` to the interrupt system and to the application.
//!
//! ## Modules
//!
//! - [`registry`] - Pin-to-motor table that routes encoder edges to their owner.
//! - [`bank`] - Index-addressed group of motors.

pub mod bank;
pub mod registry;

pub use bank::MotorBank;
pub use registry::MotorRegistry;
