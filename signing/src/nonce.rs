/*++

Licensed under the Apache-2.0 license.

File Name:

    nonce.rs

Abstract:

    File contains the nonce a verifier issues: 20 random bytes, a reserved
    zero byte, the issuer's 9 byte serial number and two reserved zero bytes.

--*/

use crate::{SigningError, SigningResult};
use meshsig_drivers::{Serial, RANDOM_SIZE, SERIAL_SIZE};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const NONCE_SIZE: usize = 32;

const NONCE_RANDOM_SIZE: usize = 20;
const NONCE_SERIAL_OFFSET: usize = NONCE_RANDOM_SIZE + 1;
const NONCE_SERIAL_END: usize = NONCE_SERIAL_OFFSET + SERIAL_SIZE;

#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Build a nonce from fresh random material and the issuer's serial.
    pub fn issue(random: &[u8; RANDOM_SIZE], serial: &Serial) -> Self {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..NONCE_RANDOM_SIZE].copy_from_slice(&random[..NONCE_RANDOM_SIZE]);
        nonce[NONCE_SERIAL_OFFSET..NONCE_SERIAL_END].copy_from_slice(serial);
        Self(nonce)
    }

    /// Accept a nonce received from a peer.
    ///
    /// # Errors
    ///
    /// * `SIGNING_MALFORMED_NONCE` - Wrong length, reserved bytes set, or all zero
    pub fn parse(bytes: &[u8]) -> SigningResult<Self> {
        let nonce: [u8; NONCE_SIZE] = bytes
            .try_into()
            .map_err(|_| SigningError::SIGNING_MALFORMED_NONCE)?;
        let reserved_clear =
            nonce[NONCE_RANDOM_SIZE] == 0 && nonce[NONCE_SERIAL_END..].iter().all(|&b| b == 0);
        let nonce = Self(nonce);
        if !reserved_clear || nonce.is_zero() {
            return Err(SigningError::SIGNING_MALFORMED_NONCE);
        }
        Ok(nonce)
    }

    /// Serial number of the node that issued the nonce.
    pub fn serial(&self) -> Serial {
        let mut serial = [0u8; SERIAL_SIZE];
        serial.copy_from_slice(&self.0[NONCE_SERIAL_OFFSET..NONCE_SERIAL_END]);
        serial
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}
