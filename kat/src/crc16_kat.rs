/*++

Licensed under the Apache-2.0 license.

File Name:

    crc16_kat.rs

Abstract:

    File contains the Known Answer Test (KAT) for the SHA204 link CRC-16.

--*/

use meshsig_drivers::{crc16, SigningError, SigningResult};

/// Count and status of the wake token, and the CRC the device sends with it.
const WAKE_TOKEN_BODY: [u8; 2] = [0x04, 0x11];
const WAKE_TOKEN_CRC: u16 = 0x4333;

#[derive(Default, Debug)]
pub struct Crc16Kat {}

impl Crc16Kat {
    /// This function executes the Known Answer Test (aka KAT) for CRC-16.
    ///
    /// # Returns
    ///
    /// * `SigningResult` - Result denoting the KAT outcome.
    pub fn execute(&self) -> SigningResult<()> {
        if crc16(&WAKE_TOKEN_BODY) != WAKE_TOKEN_CRC {
            return Err(SigningError::KAT_CRC16_FAILURE);
        }
        Ok(())
    }
}
