// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Process-wide hardware context.
//!
//! [`Platform`] bundles the register access and the [`ClockGate`] built from it. Everything else
//! receives what it needs from here instead of reaching for globals.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::hw::rcc::{ClockGate, ClockSource};
use crate::hw::regs::{Mmio, Registers};

static TAKEN: AtomicBool = AtomicBool::new(false);

#[derive(Copy, Clone, Debug)]
pub struct Platform<R> {
    clocks: ClockGate<R>,
}

impl<R: Registers + Copy> Platform<R> {
    /// Switch on `source` through `regs`.
    pub fn new(regs: R, source: ClockSource) -> Self {
        Self {
            clocks: ClockGate::new(regs, source),
        }
    }

    #[inline]
    pub fn clocks(&self) -> &ClockGate<R> {
        &self.clocks
    }

    #[inline]
    pub fn regs(&self) -> R {
        *self.clocks.regs()
    }
}

impl Platform<Mmio> {
    /// The context for the real MCU. Returns `Some` exactly once per boot.
    pub fn take(source: ClockSource) -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            return None;
        }
        // SAFETY: guarded by `TAKEN`, so this is the only `Mmio` the crate hands out.
        let regs = unsafe { Mmio::new() };
        Some(Self::new(regs, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::model::RegisterModel;
    use crate::hw::rcc::PeripheralBus;

    #[test]
    fn model_platform() {
        let model = RegisterModel::new();
        let platform = Platform::new(&model, ClockSource::Hsi);
        assert!(platform.clocks().is_ready());
        platform.clocks().enable(PeripheralBus::Apb2, 2).unwrap();
        assert!(platform.clocks().is_enabled(PeripheralBus::Apb2, 2));
        assert_eq!(platform.clocks().source(), ClockSource::Hsi);
    }
}
