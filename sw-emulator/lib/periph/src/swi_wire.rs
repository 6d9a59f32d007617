/*++

Licensed under the Apache-2.0 license.

File Name:

    swi_wire.rs

Abstract:

    File contains the single-wire bus between a host pin and the emulated
    ATSHA204. Host pulses are decoded into tokens, bytes and flags in
    virtual time; chip responses are replayed as a pulse train the host
    samples.

--*/

use crate::atsha204::Atsha204Chip;
use std::collections::VecDeque;

/// One bit time at 230.4 kbaud.
pub const BIT_NS: u64 = 4_340;

/// Duration of one token.
pub const TOKEN_NS: u64 = 8 * BIT_NS;

/// Shortest low time the chip takes as a wake pulse.
pub const WAKE_LOW_MIN_NS: u64 = 60_000;

/// Delay between the end of a transmit flag and the first response token.
pub const TURNAROUND_NS: u64 = 60_000;

/// A second pulse starting within this window of the first makes a logic 0.
const ZERO_WINDOW_NS: u64 = 4 * BIT_NS;

const FLAG_COMMAND: u8 = 0x77;
const FLAG_TRANSMIT: u8 = 0x88;
const FLAG_IDLE: u8 = 0xBB;
const FLAG_SLEEP: u8 = 0xCC;

/// Turns host pulse start times into bytes.
#[derive(Default)]
struct TokenDecoder {
    /// Start of a token whose value is not known yet
    token_start: Option<u64>,
    byte: u8,
    bits: u8,
}

impl TokenDecoder {
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add one bit. Returns the byte and its end time when complete.
    fn push(&mut self, bit: bool, start: u64) -> Option<(u8, u64)> {
        if bit {
            self.byte |= 1 << self.bits;
        }
        self.bits += 1;
        if self.bits == 8 {
            let byte = self.byte;
            self.byte = 0;
            self.bits = 0;
            Some((byte, start + TOKEN_NS))
        } else {
            None
        }
    }

    /// A host low pulse started at `start`.
    fn pulse(&mut self, start: u64) -> Option<(u8, u64)> {
        match self.token_start.take() {
            Some(first) if start - first <= ZERO_WINDOW_NS => self.push(false, first),
            Some(first) => {
                self.token_start = Some(start);
                self.push(true, first)
            }
            None => {
                self.token_start = Some(start);
                None
            }
        }
    }

    /// Close a token that can no longer turn into a logic 0.
    fn flush(&mut self, now: u64) -> Option<(u8, u64)> {
        match self.token_start {
            Some(first) if now - first > ZERO_WINDOW_NS => {
                self.token_start = None;
                self.push(true, first)
            }
            _ => None,
        }
    }
}

/// Single-wire bus with the emulated chip attached.
pub struct SwiWire {
    chip: Atsha204Chip,

    /// Virtual time
    now_ns: u64,

    /// When the host started pulling the line low
    host_low_since: Option<u64>,

    decoder: TokenDecoder,

    /// Bytes of the transfer in progress, flag first
    rx: Vec<u8>,

    /// Low intervals the chip drives, in time order
    chip_pulses: VecDeque<(u64, u64)>,
}

impl SwiWire {
    pub fn new(chip: Atsha204Chip) -> Self {
        Self {
            chip,
            now_ns: 0,
            host_low_since: None,
            decoder: TokenDecoder::default(),
            rx: Vec::new(),
            chip_pulses: VecDeque::new(),
        }
    }

    pub fn chip(&self) -> &Atsha204Chip {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut Atsha204Chip {
        &mut self.chip
    }

    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    pub fn advance_ns(&mut self, ns: u64) {
        self.now_ns += ns;
        self.sync();
    }

    /// Host drives the line low (`false`) or releases it (`true`).
    pub fn drive(&mut self, high: bool) {
        self.sync();
        match (high, self.host_low_since) {
            (false, None) => self.host_low_since = Some(self.now_ns),
            (true, Some(start)) => {
                self.host_low_since = None;
                if self.now_ns - start >= WAKE_LOW_MIN_NS {
                    self.decoder.reset();
                    self.rx.clear();
                    self.chip_pulses.clear();
                    self.chip.wake_pulse(self.now_ns);
                } else if let Some((byte, end)) = self.decoder.pulse(start) {
                    self.receive_byte(byte, end);
                }
            }
            _ => {}
        }
    }

    /// Level the host reads back.
    pub fn is_high(&mut self) -> bool {
        self.sync();
        let now = self.now_ns;
        // Pulses are ordered and the ones already over are dropped by sync.
        let chip_low = self
            .chip_pulses
            .front()
            .is_some_and(|&(start, _)| start <= now);
        self.host_low_since.is_none() && !chip_low
    }

    fn sync(&mut self) {
        if let Some((byte, end)) = self.decoder.flush(self.now_ns) {
            self.receive_byte(byte, end);
        }
        self.chip.tick(self.now_ns);
        while let Some(&(_, end)) = self.chip_pulses.front() {
            if end > self.now_ns {
                break;
            }
            self.chip_pulses.pop_front();
        }
    }

    fn receive_byte(&mut self, byte: u8, end: u64) {
        self.rx.push(byte);
        match self.rx[0] {
            FLAG_COMMAND => {
                // Flag, then `count` packet bytes.
                if self.rx.len() > 1 && self.rx.len() - 1 >= usize::from(self.rx[1].max(1)) {
                    self.chip.command(end, &self.rx[1..]);
                    self.rx.clear();
                }
            }
            FLAG_TRANSMIT => {
                self.rx.clear();
                if let Some(packet) = self.chip.transmit(end) {
                    self.schedule_response(&packet, end + TURNAROUND_NS);
                }
            }
            FLAG_IDLE => {
                self.rx.clear();
                self.chip.idle(end);
            }
            FLAG_SLEEP => {
                self.rx.clear();
                self.chip.sleep(end);
            }
            _ => self.rx.clear(),
        }
    }

    fn schedule_response(&mut self, packet: &[u8], start: u64) {
        let mut token = start;
        for byte in packet {
            for bit in 0..8 {
                self.chip_pulses.push_back((token, token + BIT_NS));
                if byte & (1 << bit) == 0 {
                    self.chip_pulses
                        .push_back((token + 2 * BIT_NS, token + 3 * BIT_NS));
                }
                token += TOKEN_NS;
            }
        }
    }
}
