/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the mesh signing drivers: the single-wire
    transport to the ATSHA204, its command layer, and the software
    primitives that stand in for it.

--*/

#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod atsha204;
mod clock;
mod crc;
mod primitives;
pub mod printer;
mod sha204;
mod sha256;
mod soft;
mod swi;

pub use atsha204::{Atsha204, HMAC_KEY_SLOT};
pub use clock::MonotonicClock;
pub use crc::{crc16, crc16_bytes, crc16_check};
pub use meshsig_error::{ErrorKind, SigningError, SigningResult};
pub use primitives::{
    CryptoPrimitives, Serial, MAC_SIZE, RANDOM_SIZE, SERIAL_PREFIX, SERIAL_SIZE, SERIAL_SUFFIX,
};
pub use printer::{set_log_sink, HexBytes};
pub use sha204::{Command, Sha204, Status, CMD_SIZE_MAX, RSP_SIZE_MAX};
pub use sha256::{Sha256, Sha256DigestOp, SHA256_DIGEST_SIZE};
pub use soft::{SoftAtsha204, SOFT_KEY_SIZE};
pub use swi::{SwiBus, SwiFlag, SwiPhy};
