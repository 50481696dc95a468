// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Software decoding of a two-channel incremental encoder.
//!
//! Only rising edges are monitored, so each channel contributes one count per electrical cycle.
//! What a count means depends on the [`DecodeRule`].

/// Encoder channel an edge arrived on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderChannel {
    A,
    B,
}

impl EncoderChannel {
    /// Index into a motor's `[A, B]` pin pair.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The other channel.
    #[inline]
    pub fn companion(self) -> Self {
        match self {
            EncoderChannel::A => EncoderChannel::B,
            EncoderChannel::B => EncoderChannel::A,
        }
    }
}

/// How a rising edge is turned into a position step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeRule {
    /// Sample the channel that fired.
    ///
    /// A: +1 if A reads high, else -1. B: -1 if B reads high, else +1.
    ///
    /// Right after a rising edge the firing line is normally high, so this mostly counts A up and
    /// B down.
    #[default]
    SameChannel,
    /// Classic quadrature: sample the companion channel.
    ///
    /// A: +1 if B reads low, else -1. B: +1 if A reads high, else -1.
    Quadrature,
}

impl DecodeRule {
    /// Position delta for a rising edge on `channel`, given the levels read right after it.
    pub fn step(self, channel: EncoderChannel, own_high: bool, companion_high: bool) -> i32 {
        let up = match (self, channel) {
            (DecodeRule::SameChannel, EncoderChannel::A) => own_high,
            (DecodeRule::SameChannel, EncoderChannel::B) => !own_high,
            (DecodeRule::Quadrature, EncoderChannel::A) => !companion_high,
            (DecodeRule::Quadrature, EncoderChannel::B) => companion_high,
        };
        if up {
            1
        } else {
            -1
        }
    }
}
