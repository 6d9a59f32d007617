/*++

Licensed under the Apache-2.0 license.

File Name:

    primitives.rs

Abstract:

    File contains the primitive operations the signing state machine needs
    from a crypto provider.

--*/

use crate::SigningResult;

/// Width of the device serial number.
pub const SERIAL_SIZE: usize = 9;

/// Output of one random request.
pub const RANDOM_SIZE: usize = 32;

/// Challenge and MAC width of the HMAC operation.
pub const MAC_SIZE: usize = 32;

/// Serial bytes 0 and 1. Fixed by the manufacturer on every ATSHA204.
pub const SERIAL_PREFIX: [u8; 2] = [0x01, 0x23];

/// Serial byte 8. Fixed by the manufacturer on every ATSHA204.
pub const SERIAL_SUFFIX: u8 = 0xEE;

pub type Serial = [u8; SERIAL_SIZE];

/// Random numbers, keyed HMAC-SHA256 and identity.
///
/// Every call is a complete device interaction; no state is carried between
/// calls on the provider side.
pub trait CryptoPrimitives {
    /// 32 bytes from the random number generator.
    fn random(&mut self) -> SigningResult<[u8; RANDOM_SIZE]>;

    /// HMAC-SHA256 of `challenge` with the provisioned key, laid out the way
    /// the ATSHA204 HMAC command lays it out.
    fn hmac_sha256(&mut self, challenge: &[u8; MAC_SIZE]) -> SigningResult<[u8; MAC_SIZE]>;

    /// Serial number of this node.
    fn read_serial(&mut self) -> SigningResult<Serial>;
}
