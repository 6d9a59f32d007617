/*++

Licensed under the Apache-2.0 license.

File Name:

    pins.rs

Abstract:

    File contains the embedded-hal pin and delay adapters and the clock
    that drive the emulated wire.

--*/

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use meshsig_drivers::MonotonicClock;

use crate::SharedWire;

/// Open-drain IO pin wired to the emulated chip.
pub struct EmuPin {
    wire: SharedWire,

    /// Line shorted to the supply: drives are lost and it always reads high
    stuck_high: Rc<Cell<bool>>,
}

impl EmuPin {
    pub fn new(wire: SharedWire) -> Self {
        Self {
            wire,
            stuck_high: Rc::new(Cell::new(false)),
        }
    }

    /// Handle that shorts the line while set.
    pub fn stuck_high(&self) -> Rc<Cell<bool>> {
        self.stuck_high.clone()
    }

    fn drive(&mut self, high: bool) {
        if !self.stuck_high.get() {
            self.wire.borrow_mut().drive(high);
        }
    }
}

impl ErrorType for EmuPin {
    type Error = Infallible;
}

impl OutputPin for EmuPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

impl InputPin for EmuPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.stuck_high.get() || self.wire.borrow_mut().is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Busy-wait that advances virtual time instead of spinning.
pub struct EmuDelay {
    wire: SharedWire,
}

impl EmuDelay {
    pub fn new(wire: SharedWire) -> Self {
        Self { wire }
    }
}

impl DelayNs for EmuDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.wire.borrow_mut().advance_ns(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.wire.borrow_mut().advance_ns(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.wire.borrow_mut().advance_ns(u64::from(ms) * 1_000_000);
    }
}

/// Millisecond clock derived from the wire's virtual time.
#[derive(Clone)]
pub struct ModelClock {
    wire: SharedWire,
}

impl ModelClock {
    pub fn new(wire: SharedWire) -> Self {
        Self { wire }
    }
}

impl MonotonicClock for ModelClock {
    fn now_ms(&self) -> u32 {
        (self.wire.borrow().now_ns() / 1_000_000) as u32
    }
}
