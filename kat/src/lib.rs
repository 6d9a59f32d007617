/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the mesh signing Known Answer Tests.

--*/

#![no_std]

mod crc16_kat;
mod sha256_kat;
mod soft_hmac_kat;

pub use crc16_kat::Crc16Kat;
pub use meshsig_drivers::{SigningError, SigningResult};
pub use sha256_kat::Sha256Kat;
pub use soft_hmac_kat::SoftHmacKat;

use meshsig_drivers::Sha256;

/// Execute the KATs every signing backend depends on.
///
/// # Arguments
///
/// * `sha256` - Software SHA-256 engine
///
/// # Returns
///
/// * `SigningResult` - Result denoting the KAT outcome.
pub fn execute_kats(sha256: &mut Sha256) -> SigningResult<()> {
    Sha256Kat::default().execute(sha256)?;
    Crc16Kat::default().execute()?;
    Ok(())
}
