/*++

Licensed under the Apache-2.0 license.

File Name:

    soft_hmac_kat.rs

Abstract:

    File contains the Known Answer Test (KAT) for the software HMAC
    primitive: an ATSHA204 HMAC command in pass-through mode on key slot 0.

--*/

use meshsig_drivers::{
    CryptoPrimitives, Serial, SigningError, SigningResult, SoftAtsha204, MAC_SIZE,
};
use rand_core::{impls, Error, RngCore};

const KEY: [u8; 32] = [0x5A; 32];

const SERIAL: Serial = [0x01, 0x23, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0xEE];

#[cfg_attr(rustfmt, rustfmt_skip)]
const EXPECTED_MAC: [u8; MAC_SIZE] = [
    0x22, 0x07, 0xc9, 0x1b, 0xa2, 0x25, 0xc0, 0x4d, 0x8b, 0xb2, 0x0f, 0xfd, 0x9e, 0xb0, 0xf6, 0x1d,
    0x31, 0xb5, 0x65, 0x51, 0x3a, 0x2b, 0x6d, 0x4c, 0x16, 0xd2, 0xbc, 0x91, 0x85, 0x03, 0x9c, 0x69,
];

/// The KAT never draws random numbers.
struct NoRng;

impl RngCore for NoRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[derive(Default, Debug)]
pub struct SoftHmacKat {}

impl SoftHmacKat {
    /// This function executes the Known Answer Test (aka KAT) for the
    /// software HMAC primitive.
    ///
    /// # Returns
    ///
    /// * `SigningResult` - Result denoting the KAT outcome.
    pub fn execute(&self) -> SigningResult<()> {
        let mut soft = SoftAtsha204::new(KEY, SERIAL, NoRng);
        let challenge: [u8; MAC_SIZE] = core::array::from_fn(|i| i as u8);
        let mac = soft
            .hmac_sha256(&challenge)
            .map_err(|_| SigningError::KAT_SOFT_HMAC_FAILURE)?;
        if mac != EXPECTED_MAC {
            return Err(SigningError::KAT_SOFT_HMAC_FAILURE);
        }
        Ok(())
    }
}
