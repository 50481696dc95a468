// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! This module contains device-specific drivers that sit above the raw `hw/` layer and below the
//! actuator-level composition in `motors/`.
//!
//! ## Existing drivers
//!
//! - [`dc_motor`] – H-bridge DC motor with direction lines, PWM enable and encoder count
//! - [`encoder`] – rising-edge decode rules for a two-channel encoder

pub mod dc_motor;
pub mod encoder;

pub use dc_motor::{Direction, MotorConfig, MotorUnit};
pub use encoder::{DecodeRule, EncoderChannel};
