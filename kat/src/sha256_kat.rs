/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for the software SHA-256.

--*/

use meshsig_drivers::{Sha256, SigningError, SigningResult, SHA256_DIGEST_SIZE};

#[cfg_attr(rustfmt, rustfmt_skip)]
const EXPECTED_NO_DATA: [u8; SHA256_DIGEST_SIZE] = [
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
];

#[cfg_attr(rustfmt, rustfmt_skip)]
const EXPECTED_ABC: [u8; SHA256_DIGEST_SIZE] = [
    0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae, 0x22, 0x23,
    0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61, 0xf2, 0x00, 0x15, 0xad,
];

#[derive(Default, Debug)]
pub struct Sha256Kat {}

impl Sha256Kat {
    /// This function executes the Known Answer Tests (aka KAT) for SHA256.
    ///
    /// Test vector source:
    /// https://csrc.nist.gov/CSRC/media/Projects/Cryptographic-Algorithm-Validation-Program/documents/shs/shabytetestvectors.zip
    ///
    /// # Arguments
    ///
    /// * `sha` - SHA-256 engine
    ///
    /// # Returns
    ///
    /// * `SigningResult` - Result denoting the KAT outcome.
    pub fn execute(&self, sha: &mut Sha256) -> SigningResult<()> {
        self.kat_no_data(sha)?;
        self.kat_streamed(sha)
    }

    fn kat_no_data(&self, sha: &mut Sha256) -> SigningResult<()> {
        let digest = sha
            .digest(&[])
            .map_err(|_| SigningError::KAT_SHA256_FAILURE)?;
        if digest != EXPECTED_NO_DATA {
            return Err(SigningError::KAT_SHA256_FAILURE);
        }
        Ok(())
    }

    fn kat_streamed(&self, sha: &mut Sha256) -> SigningResult<()> {
        let digest = Self::digest_split(sha).map_err(|_| SigningError::KAT_SHA256_FAILURE)?;
        if digest != EXPECTED_ABC {
            return Err(SigningError::KAT_SHA256_FAILURE);
        }
        Ok(())
    }

    fn digest_split(sha: &mut Sha256) -> SigningResult<[u8; SHA256_DIGEST_SIZE]> {
        let mut op = sha.digest_init()?;
        op.update(b"a")?;
        op.update(b"bc")?;
        op.finalize()
    }
}
