/*++

Licensed under the Apache-2.0 license.

File Name:

    soft.rs

Abstract:

    File contains the software crypto primitives. They reproduce the
    ATSHA204 HMAC message layout so a node without the chip produces MACs
    that a node with the chip accepts, given the same key.

--*/

use crate::atsha204::{HMAC_KEY_SLOT, HMAC_MODE_SOURCE_FLAG_MATCH};
use crate::primitives::{
    CryptoPrimitives, Serial, MAC_SIZE, RANDOM_SIZE, SERIAL_PREFIX, SERIAL_SUFFIX,
};
use crate::sha204::Command;
use crate::{SigningError, SigningResult};
use hmac::{Hmac, Mac};
use rand_core::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const SOFT_KEY_SIZE: usize = 32;

#[derive(Zeroize, ZeroizeOnDrop)]
struct HmacKey([u8; SOFT_KEY_SIZE]);

/// Crypto primitives computed in software.
pub struct SoftAtsha204<R> {
    key: HmacKey,
    serial: Serial,
    rng: R,
}

impl<R: RngCore> SoftAtsha204<R> {
    /// # Arguments
    ///
    /// * `key` - Shared HMAC key, the same value provisioned into the chips' key slot
    /// * `serial` - Serial number this node reports
    /// * `rng` - Random source for nonces
    pub fn new(key: [u8; SOFT_KEY_SIZE], serial: Serial, rng: R) -> Self {
        Self {
            key: HmacKey(key),
            serial,
            rng,
        }
    }
}

impl<R: RngCore> CryptoPrimitives for SoftAtsha204<R> {
    fn random(&mut self) -> SigningResult<[u8; RANDOM_SIZE]> {
        let mut random = [0u8; RANDOM_SIZE];
        self.rng
            .try_fill_bytes(&mut random)
            .map_err(|_| SigningError::DRIVER_SOFT_RNG_FAILURE)?;
        Ok(random)
    }

    fn hmac_sha256(&mut self, challenge: &[u8; MAC_SIZE]) -> SigningResult<[u8; MAC_SIZE]> {
        let mut mac = Hmac::<sha2::Sha256>::new_from_slice(&self.key.0)
            .map_err(|_| SigningError::DRIVER_SOFT_HMAC_KEY)?;
        let [slot_lo, slot_hi] = HMAC_KEY_SLOT.to_le_bytes();

        // 88 bytes, as the HMAC command hashes them. The serial bytes a chip
        // mixes in are the manufacturer constants, not this node's serial.
        mac.update(&[0u8; 32]);
        mac.update(challenge);
        mac.update(&[
            Command::Hmac as u8,
            HMAC_MODE_SOURCE_FLAG_MATCH,
            slot_lo,
            slot_hi,
        ]);
        mac.update(&[0u8; 11]);
        mac.update(&[SERIAL_SUFFIX]);
        mac.update(&[0u8; 4]);
        mac.update(&SERIAL_PREFIX);
        mac.update(&[0u8; 2]);

        Ok(mac.finalize().into_bytes().into())
    }

    fn read_serial(&mut self) -> SigningResult<Serial> {
        Ok(self.serial)
    }
}
