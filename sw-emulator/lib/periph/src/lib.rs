/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulator peripheral library: an emulated
    ATSHA204 and the single-wire bus it hangs off.

--*/

mod atsha204;
mod swi_wire;

pub use atsha204::{
    Atsha204Chip, Atsha204Params, TempKey, CONFIG_ZONE_SIZE, OTP_ZONE_SIZE, SLOT_COUNT,
    WAKE_RESPONSE, WATCHDOG_NS,
};
pub use swi_wire::{SwiWire, BIT_NS, TOKEN_NS, TURNAROUND_NS, WAKE_LOW_MIN_NS};
