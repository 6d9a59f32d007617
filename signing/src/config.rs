/*++

Licensed under the Apache-2.0 license.

File Name:

    config.rs

Abstract:

    File contains the build-time configuration of a signing backend.

--*/

use crate::whitelist::{Whitelist, WhitelistEntry};

/// Ask peers to sign what they send to this node.
pub const DEFAULT_REQUEST_SIGNATURES: bool = true;

/// How long an issued nonce stays valid.
pub const DEFAULT_VERIFICATION_WINDOW_MS: u32 = 5_000;

#[derive(Clone, Copy, Debug)]
pub struct SigningConfig {
    /// Advertised to peers in the signing presentation
    pub request_signatures: bool,

    /// Authorized peers; empty disables the check
    pub whitelist: &'static [WhitelistEntry],

    /// Replay window
    pub verification_window_ms: u32,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl SigningConfig {
    pub const DEFAULT: Self = Self {
        request_signatures: DEFAULT_REQUEST_SIGNATURES,
        whitelist: &[],
        verification_window_ms: DEFAULT_VERIFICATION_WINDOW_MS,
    };

    pub const fn with_request_signatures(mut self, request_signatures: bool) -> Self {
        self.request_signatures = request_signatures;
        self
    }

    pub const fn with_whitelist(mut self, whitelist: &'static [WhitelistEntry]) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub const fn with_verification_window_ms(mut self, window_ms: u32) -> Self {
        self.verification_window_ms = window_ms;
        self
    }

    pub fn whitelist(&self) -> Whitelist<'static> {
        Whitelist::new(self.whitelist)
    }
}
