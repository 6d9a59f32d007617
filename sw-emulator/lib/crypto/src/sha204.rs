/*++

Licensed under the Apache-2.0 license.

File Name:

    sha204.rs

Abstract:

    File contains the digests the ATSHA204 computes internally for the
    Nonce and HMAC commands.

--*/

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// OTP bytes an HMAC may include.
pub const OTP_HMAC_SIZE: usize = 11;

const OPCODE_NONCE: u8 = 0x16;
const OPCODE_HMAC: u8 = 0x11;

/// Mode byte of the HMAC command.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HmacMode(pub u8);

impl HmacMode {
    /// TempKey source flag must be "input".
    pub const SOURCE_FLAG_MATCH: u8 = 0x04;

    /// Include OTP[0..11].
    pub const INCLUDE_OTP_88: u8 = 0x10;

    /// Include OTP[0..4].
    pub const INCLUDE_OTP_64: u8 = 0x20;

    /// Include SN[2..4] and SN[4..8].
    pub const INCLUDE_SN: u8 = 0x40;

    const VALID_BITS: u8 =
        Self::SOURCE_FLAG_MATCH | Self::INCLUDE_OTP_88 | Self::INCLUDE_OTP_64 | Self::INCLUDE_SN;

    pub fn is_valid(self) -> bool {
        self.0 & !Self::VALID_BITS == 0
    }

    pub fn source_input(self) -> bool {
        self.0 & Self::SOURCE_FLAG_MATCH != 0
    }

    fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
}

/// ATSHA204 internal digests
pub struct Sha204Digest;

impl Sha204Digest {
    /// Size of the message the HMAC command authenticates
    pub const HMAC_MESSAGE_SIZE: usize = 88;

    /// Build the 88 byte HMAC message
    ///
    /// # Arguments
    ///
    /// * `temp_key` - TempKey contents
    /// * `mode` - HMAC mode byte
    /// * `key_id` - Key slot
    /// * `otp` - First OTP bytes
    /// * `sn` - Device serial number
    pub fn hmac_message(
        temp_key: &[u8; 32],
        mode: HmacMode,
        key_id: u16,
        otp: &[u8; OTP_HMAC_SIZE],
        sn: &[u8; 9],
    ) -> [u8; Self::HMAC_MESSAGE_SIZE] {
        let mut msg = [0u8; Self::HMAC_MESSAGE_SIZE];
        msg[32..64].copy_from_slice(temp_key);
        msg[64] = OPCODE_HMAC;
        msg[65] = mode.0;
        msg[66..68].copy_from_slice(&key_id.to_le_bytes());
        if mode.has(HmacMode::INCLUDE_OTP_88) {
            msg[68..79].copy_from_slice(otp);
        } else if mode.has(HmacMode::INCLUDE_OTP_64) {
            msg[68..72].copy_from_slice(&otp[..4]);
        }
        msg[79] = sn[8];
        if mode.has(HmacMode::INCLUDE_SN) {
            msg[80..84].copy_from_slice(&sn[4..8]);
        }
        msg[84..86].copy_from_slice(&sn[..2]);
        if mode.has(HmacMode::INCLUDE_SN) {
            msg[86..88].copy_from_slice(&sn[2..4]);
        }
        msg
    }

    /// HMAC command output
    pub fn hmac(
        key: &[u8; 32],
        temp_key: &[u8; 32],
        mode: HmacMode,
        key_id: u16,
        otp: &[u8; OTP_HMAC_SIZE],
        sn: &[u8; 9],
    ) -> [u8; 32] {
        let msg = Self::hmac_message(temp_key, mode, key_id, otp, sn);
        // A 32 byte key is always accepted.
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).unwrap();
        mac.update(&msg);
        mac.finalize().into_bytes().into()
    }

    /// TempKey produced by a random-mode Nonce command
    ///
    /// # Arguments
    ///
    /// * `rand_out` - Random number returned to the host
    /// * `num_in` - Host supplied input
    /// * `mode` - Nonce mode byte
    pub fn nonce(rand_out: &[u8; 32], num_in: &[u8; 20], mode: u8) -> [u8; 32] {
        let mut sha = Sha256::new();
        sha.update(rand_out);
        sha.update(num_in);
        sha.update([OPCODE_NONCE, mode, 0x00]);
        sha.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SN: [u8; 9] = [0x01, 0x23, 0x5A, 0x3C, 0x11, 0x22, 0x33, 0x44, 0xEE];

    fn key() -> [u8; 32] {
        core::array::from_fn(|i| i as u8)
    }

    #[test]
    fn test_hmac_source_input() {
        let mac = Sha204Digest::hmac(
            &key(),
            &[0xAA; 32],
            HmacMode(HmacMode::SOURCE_FLAG_MATCH),
            0,
            &[0u8; OTP_HMAC_SIZE],
            &SN,
        );
        assert_eq!(
            hex::encode(mac),
            "94e67884eb5fea96621a3c5d9b12bdbb43357fec27b96ff8fd0e0977bc28607b"
        );
    }

    #[test]
    fn test_hmac_message_layout() {
        let msg = Sha204Digest::hmac_message(
            &[0xAA; 32],
            HmacMode(HmacMode::SOURCE_FLAG_MATCH | HmacMode::INCLUDE_SN),
            3,
            &[0x55; OTP_HMAC_SIZE],
            &SN,
        );
        assert_eq!(&msg[..32], &[0u8; 32]);
        assert_eq!(&msg[64..68], &[0x11, 0x44, 0x03, 0x00]);
        // OTP left out without an OTP mode bit.
        assert_eq!(&msg[68..79], &[0u8; 11]);
        assert_eq!(msg[79], 0xEE);
        assert_eq!(&msg[80..84], &SN[4..8]);
        assert_eq!(&msg[84..88], &SN[..4]);
    }

    #[test]
    fn test_nonce_random_mode() {
        let temp_key = Sha204Digest::nonce(&[0x11; 32], &[0x22; 20], 0);
        assert_eq!(
            hex::encode(temp_key),
            "096ff5bd9f604cd3baa00d2b394b6e1c5d94759894ab7b78f9b165ac6f207b9e"
        );
    }

    #[test]
    fn test_mode_validity() {
        assert!(HmacMode(0x04).is_valid());
        assert!(HmacMode(0x44).is_valid());
        assert!(!HmacMode(0x01).is_valid());
    }
}
