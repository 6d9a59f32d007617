/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the mesh message signing library: the
    challenge/response state machine, the message record it annotates and
    the backends the transport selects between.

--*/

#![cfg_attr(not(any(test, feature = "std")), no_std)]

/// Signing debug output.
#[cfg(feature = "debug-signing")]
macro_rules! sig_debug {
    ($($tt:tt)*) => {
        meshsig_drivers::cprintln!($($tt)*)
    };
}

/// Signing debug output, compiled out.
#[cfg(not(feature = "debug-signing"))]
macro_rules! sig_debug {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $(let _ = &$arg;)*
    }};
}

mod backend;
mod config;
mod fsm;
mod message;
mod nonce;
mod whitelist;

pub use backend::{NoSigning, Signer, SigningBackend};
pub use config::{SigningConfig, DEFAULT_REQUEST_SIGNATURES, DEFAULT_VERIFICATION_WINDOW_MS};
pub use fsm::{SigningFsm, SigningState};
pub use message::{
    Message, MessageHeader, SignedHeader, C_INTERNAL, C_PRESENTATION, C_REQ, C_SET, C_STREAM,
    I_GET_NONCE, I_GET_NONCE_RESPONSE, I_REQUEST_SIGNING, MAC_SUFFIX_LEN, MAX_PAYLOAD,
    SIGNATURE_CAPACITY, SIGNING_TAG_HMAC_SHA256, SIGNING_TAG_NONE,
};
pub use meshsig_error::{ErrorKind, SigningError, SigningResult};
pub use nonce::{Nonce, NONCE_SIZE};
pub use whitelist::{Whitelist, WhitelistEntry};

/// Name of an error kind for debug output.
pub fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ChipUnreachable => "chip unreachable",
        ErrorKind::SchemeMismatch => "scheme mismatch",
        ErrorKind::WhitelistReject => "whitelist reject",
        ErrorKind::ReplayWindowExpired => "replay window expired",
        ErrorKind::VerificationMismatch => "verification mismatch",
        ErrorKind::ProtocolMisuse => "protocol misuse",
        ErrorKind::Malformed => "malformed",
        ErrorKind::Internal => "internal",
    }
}
