/*++

Licensed under the Apache-2.0 license.

File Name:

    whitelist.rs

Abstract:

    File contains the whitelist binding node ids to device serial numbers.

--*/

use crate::{SigningError, SigningResult};
use meshsig_drivers::Serial;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WhitelistEntry {
    pub node_id: u8,
    pub serial: Serial,
}

/// Read-only table of authorized peers. An empty table authorizes everyone.
#[derive(Clone, Copy, Debug)]
pub struct Whitelist<'a> {
    entries: &'a [WhitelistEntry],
}

impl<'a> Whitelist<'a> {
    pub const fn new(entries: &'a [WhitelistEntry]) -> Self {
        Self { entries }
    }

    pub fn is_enabled(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Check that `node_id` is listed and bound to `serial`. A node id may
    /// appear more than once; any matching entry admits it.
    pub fn check(&self, node_id: u8, serial: &Serial) -> SigningResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        if self
            .entries
            .iter()
            .any(|entry| entry.node_id == node_id && entry.serial == *serial)
        {
            Ok(())
        } else {
            Err(SigningError::SIGNING_WHITELIST_REJECT)
        }
    }
}
