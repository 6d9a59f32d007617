/*++

Licensed under the Apache-2.0 license.

File Name:

    model_bus.rs

Abstract:

    File contains a byte-level single-wire bus that hands whole transfers to
    the emulated chip, skipping the token waveform. Transfer times are still
    charged to virtual time.

--*/

use meshsig_drivers::{SigningError, SigningResult, SwiBus, SwiFlag};
use meshsig_emu_periph::{TOKEN_NS, TURNAROUND_NS, WAKE_LOW_MIN_NS};

use crate::SharedWire;

/// Time from the end of the wake pulse until the chip accepts flags.
const WAKE_HIGH_NS: u64 = 2_500_000;

fn transfer_ns(bytes: usize) -> u64 {
    bytes as u64 * 8 * TOKEN_NS
}

pub struct ModelBus {
    wire: SharedWire,
}

impl ModelBus {
    pub fn new(wire: SharedWire) -> Self {
        Self { wire }
    }
}

impl SwiBus for ModelBus {
    fn wake_pulse(&mut self) -> SigningResult<()> {
        let mut wire = self.wire.borrow_mut();
        wire.advance_ns(WAKE_LOW_MIN_NS);
        let now = wire.now_ns();
        wire.chip_mut().wake_pulse(now);
        wire.advance_ns(WAKE_HIGH_NS);
        Ok(())
    }

    fn send(&mut self, flag: SwiFlag, bytes: &[u8]) -> SigningResult<()> {
        let mut wire = self.wire.borrow_mut();
        wire.advance_ns(transfer_ns(1 + bytes.len()));
        let now = wire.now_ns();
        match flag {
            SwiFlag::Command => wire.chip_mut().command(now, bytes),
            SwiFlag::Idle => wire.chip_mut().idle(now),
            SwiFlag::Sleep => wire.chip_mut().sleep(now),
            SwiFlag::Transmit => {}
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> SigningResult<usize> {
        if buf.is_empty() {
            return Err(SigningError::DRIVER_SWI_RX_EMPTY_BUFFER);
        }
        let mut wire = self.wire.borrow_mut();
        wire.advance_ns(transfer_ns(1));
        let now = wire.now_ns();
        let packet = wire
            .chip_mut()
            .transmit(now)
            .ok_or(SigningError::DRIVER_SWI_RX_TIMEOUT)?;
        let len = packet.len().min(buf.len());
        buf[..len].copy_from_slice(&packet[..len]);
        wire.advance_ns(TURNAROUND_NS + transfer_ns(len));
        Ok(len)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.wire.borrow_mut().advance_ns(u64::from(ms) * 1_000_000);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_wire;
    use meshsig_drivers::{Command, Sha204, CMD_SIZE_MAX, RSP_SIZE_MAX};
    use meshsig_emu_periph::{Atsha204Params, WAKE_RESPONSE};

    #[test]
    fn test_wake_response() {
        let wire = new_wire(Atsha204Params::default());
        let mut bus = ModelBus::new(wire.clone());
        bus.wake_pulse().unwrap();
        let mut rsp = [0u8; 4];
        assert_eq!(bus.receive(&mut rsp), Ok(4));
        assert_eq!(rsp, WAKE_RESPONSE);
        assert!(wire.borrow().chip().is_awake());
    }

    #[test]
    fn test_execute_random() {
        let wire = new_wire(Atsha204Params::default());
        let mut dev = Sha204::new(ModelBus::new(wire.clone()));
        let mut tx = [0u8; CMD_SIZE_MAX];
        let mut rx = [0u8; RSP_SIZE_MAX];
        dev.wake().unwrap();
        let data = dev
            .execute(&mut tx, &mut rx, Command::Random, 0, 0, &[])
            .unwrap();
        assert_eq!(data.len(), 32);
        dev.sleep().unwrap();
        assert!(wire.borrow().chip().is_asleep());
    }

    #[test]
    fn test_disconnected() {
        let wire = new_wire(Atsha204Params::default());
        wire.borrow_mut().chip_mut().set_connected(false);
        let mut dev = Sha204::new(ModelBus::new(wire));
        assert_eq!(dev.wake(), Err(SigningError::DRIVER_SHA204_NO_CHIP));
    }
}
