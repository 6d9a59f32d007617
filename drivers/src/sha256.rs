/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256.rs

Abstract:

    File contains API for software SHA-256 operations. Used to reduce MAC
    inputs longer than the device's 32 byte challenge window.

--*/

use crate::{SigningError, SigningResult};
use sha2::digest::block_buffer::Block;
use sha2::digest::consts::U64;
use zeroize::Zeroize;

pub const SHA256_DIGEST_SIZE: usize = 32;

const SHA256_BLOCK_BYTE_SIZE: usize = 64;
const SHA256_BLOCK_LEN_OFFSET: usize = 56;
const SHA256_MAX_DATA_SIZE: usize = 1024 * 1024;

#[cfg_attr(rustfmt, rustfmt_skip)]
const HASH_IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
    0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// SHA-256 engine. Holds the chaining state of the digest in progress.
pub struct Sha256 {
    hash: [u32; 8],
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha256 {
    pub const fn new() -> Self {
        Self { hash: HASH_IV }
    }

    /// Initialize multi step digest operation
    ///
    /// # Returns
    ///
    /// * `Sha256DigestOp` - Object representing the digest operation
    pub fn digest_init(&mut self) -> SigningResult<Sha256DigestOp<'_>> {
        self.hash = HASH_IV;
        Ok(Sha256DigestOp {
            sha: self,
            buf: [0u8; SHA256_BLOCK_BYTE_SIZE],
            buf_idx: 0,
            data_size: 0,
        })
    }

    /// Calculate the digest of the buffer
    ///
    /// # Arguments
    ///
    /// * `buf` - Buffer to calculate the digest over
    pub fn digest(&mut self, buf: &[u8]) -> SigningResult<[u8; SHA256_DIGEST_SIZE]> {
        if buf.len() > SHA256_MAX_DATA_SIZE {
            return Err(SigningError::DRIVER_SHA256_MAX_DATA);
        }
        let mut op = self.digest_init()?;
        op.update(buf)?;
        op.finalize()
    }

    fn compress(&mut self, block: &[u8; SHA256_BLOCK_BYTE_SIZE]) {
        let block = *Block::<U64>::from_slice(block);
        sha2::compress256(&mut self.hash, &[block]);
    }

    fn read_digest(&self) -> [u8; SHA256_DIGEST_SIZE] {
        let mut digest = [0u8; SHA256_DIGEST_SIZE];
        self.hash
            .iter()
            .flat_map(|word| word.to_be_bytes())
            .zip(digest.iter_mut())
            .for_each(|(src, dest)| *dest = src);
        digest
    }

    fn zeroize_internal(&mut self) {
        self.hash.zeroize();
    }
}

/// Multi step SHA-256 digest operation
pub struct Sha256DigestOp<'a> {
    /// SHA-256 engine
    sha: &'a mut Sha256,

    /// Staging buffer
    buf: [u8; SHA256_BLOCK_BYTE_SIZE],

    /// Current staging buffer index
    buf_idx: usize,

    /// Data size
    data_size: usize,
}

impl Sha256DigestOp<'_> {
    /// Update the digest with data
    ///
    /// # Arguments
    ///
    /// * `data` - Data to used to update the digest
    pub fn update(&mut self, data: &[u8]) -> SigningResult<()> {
        if self.data_size + data.len() > SHA256_MAX_DATA_SIZE {
            return Err(SigningError::DRIVER_SHA256_MAX_DATA);
        }

        for byte in data {
            self.data_size += 1;
            self.buf[self.buf_idx] = *byte;
            self.buf_idx += 1;

            if self.buf_idx == SHA256_BLOCK_BYTE_SIZE {
                self.sha.compress(&self.buf);
                self.buf_idx = 0;
            }
        }

        Ok(())
    }

    /// Finalize the digest operation. Consumes the operation.
    pub fn finalize(mut self) -> SigningResult<[u8; SHA256_DIGEST_SIZE]> {
        self.buf[self.buf_idx] = 0x80;
        self.buf[self.buf_idx + 1..].fill(0);
        if self.buf_idx >= SHA256_BLOCK_LEN_OFFSET {
            self.sha.compress(&self.buf);
            self.buf.fill(0);
        }

        let bit_len = (self.data_size as u64) << 3;
        self.buf[SHA256_BLOCK_LEN_OFFSET..].copy_from_slice(&bit_len.to_be_bytes());
        self.sha.compress(&self.buf);

        let digest = self.sha.read_digest();
        self.sha.zeroize_internal();
        self.buf.zeroize();

        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA256_ABC: [u8; SHA256_DIGEST_SIZE] = [
        0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae, 0x22,
        0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61, 0xf2, 0x00,
        0x15, 0xad,
    ];

    #[test]
    fn test_digest_abc() {
        let mut sha = Sha256::new();
        assert_eq!(sha.digest(b"abc").unwrap(), SHA256_ABC);
    }

    #[test]
    fn test_streaming_matches_reference() {
        use sha2::Digest;

        // 55, 56 and 64 bytes land on either side of the length field.
        for len in [0usize, 31, 55, 56, 63, 64, 65, 100, 200] {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let expected: [u8; 32] = sha2::Sha256::digest(&data).into();

            let mut sha = Sha256::new();
            let mut op = sha.digest_init().unwrap();
            for chunk in data.chunks(7) {
                op.update(chunk).unwrap();
            }
            assert_eq!(op.finalize().unwrap(), expected, "len {len}");
        }
    }

    #[test]
    fn test_engine_reusable_after_finalize() {
        let mut sha = Sha256::new();
        let mut op = sha.digest_init().unwrap();
        op.update(b"ab").unwrap();
        op.update(b"c").unwrap();
        assert_eq!(op.finalize().unwrap(), SHA256_ABC);
        assert_eq!(sha.digest(b"abc").unwrap(), SHA256_ABC);
    }

    #[test]
    fn test_digest_max_data() {
        let mut sha = Sha256::new();
        let mut op = sha.digest_init().unwrap();
        assert_eq!(
            op.update(&vec![0u8; SHA256_MAX_DATA_SIZE + 1]),
            Err(SigningError::DRIVER_SHA256_MAX_DATA)
        );
    }
}
