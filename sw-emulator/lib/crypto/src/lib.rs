/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulator crypto library: reference
    computations of the ATSHA204 digests and its CRC.

--*/

mod crc16;
mod sha204;

pub use crc16::Crc16;
pub use sha204::{HmacMode, Sha204Digest, OTP_HMAC_SIZE};
