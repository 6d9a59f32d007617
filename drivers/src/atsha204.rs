/*++

Licensed under the Apache-2.0 license.

File Name:

    atsha204.rs

Abstract:

    File contains the ATSHA204 primitive layer: random numbers, HMAC-SHA256
    over a pass-through challenge and serial number readout, each as one
    wake / command / sleep interaction.

--*/

use crate::primitives::{CryptoPrimitives, Serial, MAC_SIZE, RANDOM_SIZE, SERIAL_SIZE};
use crate::sha204::{Command, Sha204, CMD_SIZE_MAX, RSP_SIZE_MAX};
use crate::swi::SwiBus;
use crate::{SigningError, SigningResult};
use zeroize::Zeroize;

/// Data slot holding the HMAC key.
pub const HMAC_KEY_SLOT: u16 = 0;

/// Random: refresh the EEPROM seed before generating.
const RANDOM_MODE_SEED_UPDATE: u8 = 0x00;

/// Nonce: load the 32 input bytes into TempKey unchanged.
const NONCE_MODE_PASSTHROUGH: u8 = 0x03;

/// HMAC: TempKey source flag must be "input", i.e. a pass-through nonce.
pub(crate) const HMAC_MODE_SOURCE_FLAG_MATCH: u8 = 0x04;

/// Read: 32 byte access instead of 4.
const READ_ZONE_COUNT_FLAG: u8 = 0x80;

const READ_ZONE_CONFIG: u8 = 0x00;

/// ATSHA204 on a single-wire bus.
///
/// Owns the device and the command and response buffers. Not re-entrant.
pub struct Atsha204<B> {
    dev: Sha204<B>,
    tx_buffer: [u8; CMD_SIZE_MAX],
    rx_buffer: [u8; RSP_SIZE_MAX],
}

impl<B: SwiBus> Atsha204<B> {
    pub fn new(bus: B) -> Self {
        Self {
            dev: Sha204::new(bus),
            tx_buffer: [0u8; CMD_SIZE_MAX],
            rx_buffer: [0u8; RSP_SIZE_MAX],
        }
    }

    /// Run `op` between a wake and a sleep. The device is put back to sleep
    /// and the buffers are wiped whatever `op` returns.
    fn session<T>(
        &mut self,
        op: impl FnOnce(&mut Sha204<B>, &mut [u8], &mut [u8]) -> SigningResult<T>,
    ) -> SigningResult<T> {
        let result = match self.dev.wake() {
            Ok(()) => op(&mut self.dev, &mut self.tx_buffer, &mut self.rx_buffer),
            Err(err) => Err(err),
        };
        let slept = self.dev.sleep();
        self.tx_buffer.zeroize();
        self.rx_buffer.zeroize();
        let value = result?;
        slept?;
        Ok(value)
    }
}

fn expect_size(data: &[u8], size: usize) -> SigningResult<()> {
    if data.len() == size {
        Ok(())
    } else {
        Err(SigningError::DRIVER_ATSHA204_RESPONSE_SIZE)
    }
}

impl<B: SwiBus> CryptoPrimitives for Atsha204<B> {
    fn random(&mut self) -> SigningResult<[u8; RANDOM_SIZE]> {
        self.session(|dev, tx, rx| {
            let data = dev.execute(tx, rx, Command::Random, RANDOM_MODE_SEED_UPDATE, 0, &[])?;
            expect_size(data, RANDOM_SIZE)?;
            let mut random = [0u8; RANDOM_SIZE];
            random.copy_from_slice(data);
            Ok(random)
        })
    }

    fn hmac_sha256(&mut self, challenge: &[u8; MAC_SIZE]) -> SigningResult<[u8; MAC_SIZE]> {
        self.session(|dev, tx, rx| {
            dev.execute(tx, rx, Command::Nonce, NONCE_MODE_PASSTHROUGH, 0, challenge)?;
            let data = dev.execute(
                tx,
                rx,
                Command::Hmac,
                HMAC_MODE_SOURCE_FLAG_MATCH,
                HMAC_KEY_SLOT,
                &[],
            )?;
            expect_size(data, MAC_SIZE)?;
            let mut mac = [0u8; MAC_SIZE];
            mac.copy_from_slice(data);
            Ok(mac)
        })
    }

    fn read_serial(&mut self) -> SigningResult<Serial> {
        self.session(|dev, tx, rx| {
            let data = dev.execute(
                tx,
                rx,
                Command::Read,
                READ_ZONE_COUNT_FLAG | READ_ZONE_CONFIG,
                0,
                &[],
            )?;
            expect_size(data, 32)?;
            // SN[0..4] sits in config word 0, SN[4..9] at bytes 8..13.
            let mut serial = [0u8; SERIAL_SIZE];
            serial[..4].copy_from_slice(&data[..4]);
            serial[4..].copy_from_slice(&data[8..13]);
            Ok(serial)
        })
    }
}
