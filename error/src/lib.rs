/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the signing stack for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Signing Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SigningError(pub NonZeroU32);

/// Coarse classification of a [`SigningError`].
///
/// The façade collapses every error into a "drop the message" boolean; the
/// kind is what shows up in debug output.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Wake, CRC, timeout or status failure talking to the crypto chip.
    ChipUnreachable,
    /// Signature field carries another backend's tag.
    SchemeMismatch,
    /// Nonce sender is not authorized by the whitelist.
    WhitelistReject,
    /// Verification window elapsed before the signed message arrived.
    ReplayWindowExpired,
    /// MAC suffix does not match.
    VerificationMismatch,
    /// Operation called out of order.
    ProtocolMisuse,
    /// Nonce or message does not have the expected layout.
    Malformed,
    /// Self test or internal invariant failure.
    Internal,
}

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: SigningError = SigningError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(& 'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl SigningError {
    /// Create a signing error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a SigningError from a u32 is to
    /// use `SigningError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("SigningError cannot be 0"),
        }
    }

    define_error_constants![
        (DRIVER_SWI_PIN, 0x00010001, "SWI Error: IO pin access failed"),
        (
            DRIVER_SWI_RX_TIMEOUT,
            0x00010002,
            "SWI Error: no start pulse before timeout"
        ),
        (
            DRIVER_SWI_RX_EMPTY_BUFFER,
            0x00010003,
            "SWI Error: receive called with an empty buffer"
        ),
        (
            DRIVER_SHA204_NO_CHIP,
            0x00020001,
            "SHA204 Error: no valid wake token"
        ),
        (DRIVER_SHA204_BAD_CRC, 0x00020002, "SHA204 Error: response CRC mismatch"),
        (
            DRIVER_SHA204_TIMEOUT,
            0x00020003,
            "SHA204 Error: no response within the execution window"
        ),
        (
            DRIVER_SHA204_BAD_SIZE,
            0x00020004,
            "SHA204 Error: response count byte out of range"
        ),
        (
            DRIVER_SHA204_CMD_TOO_LARGE,
            0x00020005,
            "SHA204 Error: command does not fit the command buffer"
        ),
        (
            DRIVER_SHA204_STATUS_CHECKMAC,
            0x00020006,
            "SHA204 Error: chip reported checkmac miscompare"
        ),
        (
            DRIVER_SHA204_STATUS_PARSE,
            0x00020007,
            "SHA204 Error: chip reported parse error"
        ),
        (
            DRIVER_SHA204_STATUS_EXECUTION,
            0x00020008,
            "SHA204 Error: chip reported execution error"
        ),
        (
            DRIVER_SHA204_STATUS_WAKE,
            0x00020009,
            "SHA204 Error: chip reported wake status to a command"
        ),
        (
            DRIVER_SHA204_STATUS_COMM,
            0x0002000A,
            "SHA204 Error: chip reported a communication CRC error"
        ),
        (
            DRIVER_SHA204_STATUS_UNKNOWN,
            0x0002000B,
            "SHA204 Error: chip reported an unknown status"
        ),
        (
            DRIVER_SHA204_BUFFER_TOO_SMALL,
            0x0002000C,
            "SHA204 Error: response buffer too small"
        ),
        (
            DRIVER_ATSHA204_RESPONSE_SIZE,
            0x00030001,
            "ATSHA204 Error: unexpected response length"
        ),
        (
            DRIVER_SOFT_RNG_FAILURE,
            0x00030002,
            "Software primitives Error: random source failed"
        ),
        (
            DRIVER_SOFT_HMAC_KEY,
            0x00030003,
            "Software primitives Error: HMAC key rejected"
        ),
        (
            DRIVER_SHA256_MAX_DATA,
            0x00040001,
            "SHA256 Error: max data exceeded"
        ),
        (
            SIGNING_SCHEME_MISMATCH,
            0x00050001,
            "Signing Error: signing scheme tag mismatch"
        ),
        (
            SIGNING_WHITELIST_REJECT,
            0x00050002,
            "Signing Error: nonce sender not in whitelist or serial mismatch"
        ),
        (
            SIGNING_REPLAY_WINDOW_EXPIRED,
            0x00050003,
            "Signing Error: verification window expired"
        ),
        (
            SIGNING_VERIFICATION_MISMATCH,
            0x00050004,
            "Signing Error: signature mismatch"
        ),
        (
            SIGNING_NO_PENDING_VERIFICATION,
            0x00050005,
            "Signing Error: verify without a preceding nonce"
        ),
        (
            SIGNING_NO_NONCE,
            0x00050006,
            "Signing Error: sign without a received nonce"
        ),
        (
            SIGNING_VERIFICATION_PENDING,
            0x00050007,
            "Signing Error: peer nonce received while a verification is pending"
        ),
        (
            SIGNING_MALFORMED_NONCE,
            0x00050008,
            "Signing Error: malformed nonce"
        ),
        (
            SIGNING_PAYLOAD_LENGTH,
            0x00050009,
            "Signing Error: payload length exceeds capacity"
        ),
        (KAT_SHA256_FAILURE, 0x00060001, "KAT Error: SHA256 failure"),
        (KAT_CRC16_FAILURE, 0x00060002, "KAT Error: CRC16 failure"),
        (
            KAT_SOFT_HMAC_FAILURE,
            0x00060003,
            "KAT Error: software HMAC layout failure"
        ),
    ];

    /// Classify the error for debug output.
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Self::SIGNING_SCHEME_MISMATCH => ErrorKind::SchemeMismatch,
            Self::SIGNING_WHITELIST_REJECT => ErrorKind::WhitelistReject,
            Self::SIGNING_REPLAY_WINDOW_EXPIRED => ErrorKind::ReplayWindowExpired,
            Self::SIGNING_VERIFICATION_MISMATCH => ErrorKind::VerificationMismatch,
            Self::SIGNING_NO_PENDING_VERIFICATION
            | Self::SIGNING_NO_NONCE
            | Self::SIGNING_VERIFICATION_PENDING => ErrorKind::ProtocolMisuse,
            Self::SIGNING_MALFORMED_NONCE | Self::SIGNING_PAYLOAD_LENGTH => ErrorKind::Malformed,
            _ => match self.component() {
                0x0001..=0x0003 => ErrorKind::ChipUnreachable,
                _ => ErrorKind::Internal,
            },
        }
    }

    /// Component half of the error code.
    pub fn component(&self) -> u16 {
        (self.0.get() >> 16) as u16
    }
}

impl From<core::num::NonZeroU32> for crate::SigningError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::SigningError(val)
    }
}

impl From<SigningError> for core::num::NonZeroU32 {
    fn from(val: SigningError) -> Self {
        val.0
    }
}

impl From<SigningError> for u32 {
    fn from(val: SigningError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for SigningError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(SigningError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type SigningResult<T> = Result<T, SigningError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_try_from() {
        assert!(SigningError::try_from(0).is_err());
        assert_eq!(
            Ok(SigningError::DRIVER_SHA204_BAD_CRC),
            SigningError::try_from(0x00020002)
        );
    }

    #[test]
    fn test_error_constants_uniqueness() {
        let constants = SigningError::all_constants();
        let mut error_values = HashSet::new();
        let mut duplicates = Vec::new();

        for (name, value) in constants {
            if !error_values.insert(value) {
                duplicates.push((name, value));
            }
        }

        assert!(
            duplicates.is_empty(),
            "Found duplicate error codes: {:?}",
            duplicates
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            SigningError::DRIVER_SHA204_NO_CHIP.kind(),
            ErrorKind::ChipUnreachable
        );
        assert_eq!(
            SigningError::DRIVER_SWI_RX_TIMEOUT.kind(),
            ErrorKind::ChipUnreachable
        );
        assert_eq!(
            SigningError::SIGNING_NO_NONCE.kind(),
            ErrorKind::ProtocolMisuse
        );
        assert_eq!(
            SigningError::SIGNING_REPLAY_WINDOW_EXPIRED.kind(),
            ErrorKind::ReplayWindowExpired
        );
        assert_eq!(
            SigningError::KAT_SHA256_FAILURE.kind(),
            ErrorKind::Internal
        );
    }
}
