/*++

Licensed under the Apache-2.0 license.

File Name:

    atsha204.rs

Abstract:

    File contains the emulated ATSHA204 crypto authentication chip. The
    power state (sleep, idle, awake) is a state machine; commands are
    executed from raw packets and their responses become available after the
    command's execution time.

--*/

use meshsig_emu_crypto::{Crc16, HmacMode, Sha204Digest, OTP_HMAC_SIZE};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use smlang::statemachine;

/// Configuration zone size
pub const CONFIG_ZONE_SIZE: usize = 88;

/// OTP zone size
pub const OTP_ZONE_SIZE: usize = 64;

/// Number of data slots
pub const SLOT_COUNT: usize = 16;

/// Time the chip stays awake before the watchdog puts it to sleep.
pub const WATCHDOG_NS: u64 = 1_300_000_000;

/// Token the chip answers a wake pulse with.
pub const WAKE_RESPONSE: [u8; 4] = [0x04, 0x11, 0x33, 0x43];

const OP_READ: u8 = 0x02;
const OP_HMAC: u8 = 0x11;
const OP_NONCE: u8 = 0x16;
const OP_RANDOM: u8 = 0x1B;
const OP_DEVREV: u8 = 0x30;

const STATUS_SUCCESS: u8 = 0x00;
const STATUS_PARSE_ERROR: u8 = 0x03;
const STATUS_EXECUTION_ERROR: u8 = 0x0F;
const STATUS_CRC_ERROR: u8 = 0xFF;

const CMD_SIZE_MIN: usize = 7;

const DEVREV: [u8; 4] = [0x00, 0x00, 0x00, 0x04];

statemachine! {
    transitions: {
        // CurrentState Event [guard] / action = NextState

        *Sleep + WakePulse / wake = Awake,
        Idle + WakePulse / wake = Awake,

        // A wake pulse on an awake chip is ignored.
        Awake + WakePulse = Awake,

        Awake + IdleFlag / idle = Idle,
        Awake + SleepFlag / clear_volatile = Sleep,
        Awake + WatchdogExpired / clear_volatile = Sleep
    }
}

/// Contents of the TempKey register
#[derive(Debug, Copy, Clone)]
pub struct TempKey {
    pub value: [u8; 32],

    /// Loaded by a pass-through nonce rather than generated
    pub source_input: bool,
}

/// Response waiting for a transmit flag
struct PendingOutput {
    packet: Vec<u8>,
    ready_at_ns: u64,
}

/// State machine extended variables.
pub struct Context {
    /// Time of the event being processed
    now_ns: u64,

    /// When the chip last woke up
    awake_since_ns: u64,

    /// TempKey, lost on sleep
    temp_key: Option<TempKey>,

    /// Output buffer, lost on idle and sleep
    output: Option<PendingOutput>,
}

impl Context {
    fn new() -> Self {
        Self {
            now_ns: 0,
            awake_since_ns: 0,
            temp_key: None,
            output: None,
        }
    }
}

impl StateMachineContext for Context {
    // actions
    fn wake(&mut self) {
        self.awake_since_ns = self.now_ns;
        self.output = Some(PendingOutput {
            packet: WAKE_RESPONSE.to_vec(),
            ready_at_ns: self.now_ns,
        });
    }

    fn idle(&mut self) {
        self.output = None;
    }

    fn clear_volatile(&mut self) {
        self.temp_key = None;
        self.output = None;
    }
}

/// Provisioning of an emulated chip
#[derive(Debug, Clone)]
pub struct Atsha204Params {
    /// Serial number; bytes 0..2 and 8 are fixed by the manufacturer
    pub serial: [u8; 9],

    /// Key stored in every data slot
    pub key: [u8; 32],

    /// Seed of the random number generator
    pub rng_seed: u64,
}

impl Default for Atsha204Params {
    fn default() -> Self {
        Self {
            serial: [0x01, 0x23, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEE],
            key: [0u8; 32],
            rng_seed: 0,
        }
    }
}

/// Emulated ATSHA204
pub struct Atsha204Chip {
    state_machine: StateMachine<Context>,
    config: [u8; CONFIG_ZONE_SIZE],
    otp: [u8; OTP_ZONE_SIZE],
    slots: [[u8; 32]; SLOT_COUNT],
    serial: [u8; 9],
    rng: StdRng,

    /// A disconnected chip ignores the bus.
    connected: bool,

    /// Flip a bit in the next response packet.
    corrupt_next: bool,

    wake_count: u32,
    command_count: u32,
}

impl Atsha204Chip {
    pub fn new(params: Atsha204Params) -> Self {
        let mut config = [0u8; CONFIG_ZONE_SIZE];
        config[..4].copy_from_slice(&params.serial[..4]);
        config[4..8].copy_from_slice(&DEVREV);
        config[8..13].copy_from_slice(&params.serial[4..]);
        // I2C address, slot 0 is a secret that never reads out.
        config[16] = 0xC8;
        config[20] = 0x8F;
        config[21] = 0x80;
        // Data and configuration zones locked.
        config[86] = 0x00;
        config[87] = 0x00;

        Self {
            state_machine: StateMachine::new(Context::new()),
            config,
            otp: [0u8; OTP_ZONE_SIZE],
            slots: [params.key; SLOT_COUNT],
            serial: params.serial,
            rng: StdRng::seed_from_u64(params.rng_seed),
            connected: true,
            corrupt_next: false,
            wake_count: 0,
            command_count: 0,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn corrupt_next_response(&mut self) {
        self.corrupt_next = true;
    }

    pub fn is_awake(&self) -> bool {
        matches!(self.state_machine.state(), States::Awake)
    }

    pub fn is_asleep(&self) -> bool {
        matches!(self.state_machine.state(), States::Sleep)
    }

    pub fn temp_key(&self) -> Option<TempKey> {
        self.state_machine.context.temp_key
    }

    /// Wake pulses seen while connected
    pub fn wake_count(&self) -> u32 {
        self.wake_count
    }

    /// Command packets received while awake
    pub fn command_count(&self) -> u32 {
        self.command_count
    }

    /// Advance the watchdog to `now_ns`.
    pub fn tick(&mut self, now_ns: u64) {
        let ctx = &self.state_machine.context;
        if self.is_awake() && now_ns.saturating_sub(ctx.awake_since_ns) >= WATCHDOG_NS {
            self.state_machine.context.now_ns = now_ns;
            let _ = self.state_machine.process_event(Events::WatchdogExpired);
        }
    }

    fn event(&mut self, now_ns: u64, event: Events) {
        if !self.connected {
            return;
        }
        self.tick(now_ns);
        self.state_machine.context.now_ns = now_ns;
        let _ = self.state_machine.process_event(event);
    }

    pub fn wake_pulse(&mut self, now_ns: u64) {
        if self.connected {
            self.wake_count += 1;
        }
        self.event(now_ns, Events::WakePulse);
    }

    pub fn idle(&mut self, now_ns: u64) {
        self.event(now_ns, Events::IdleFlag);
    }

    pub fn sleep(&mut self, now_ns: u64) {
        self.event(now_ns, Events::SleepFlag);
    }

    /// Accept a command packet (count through CRC).
    pub fn command(&mut self, now_ns: u64, packet: &[u8]) {
        if !self.connected {
            return;
        }
        self.tick(now_ns);
        if !self.is_awake() {
            return;
        }
        self.command_count += 1;

        let (data, exec_ns) = self.execute(packet);
        let mut response = Vec::with_capacity(data.len() + 3);
        response.push((data.len() + 3) as u8);
        response.extend_from_slice(&data);
        let crc = Crc16::bytes(&response);
        response.extend_from_slice(&crc);
        if self.corrupt_next {
            self.corrupt_next = false;
            response[1] ^= 0x01;
        }

        self.state_machine.context.output = Some(PendingOutput {
            packet: response,
            ready_at_ns: now_ns + exec_ns,
        });
    }

    /// Answer a transmit flag. Nothing is returned while asleep, idle or
    /// still executing.
    pub fn transmit(&mut self, now_ns: u64) -> Option<Vec<u8>> {
        if !self.connected {
            return None;
        }
        self.tick(now_ns);
        if !self.is_awake() {
            return None;
        }
        let ctx = &mut self.state_machine.context;
        let ready = matches!(&ctx.output, Some(output) if output.ready_at_ns <= now_ns);
        if ready {
            ctx.output.take().map(|output| output.packet)
        } else {
            None
        }
    }

    /// Returns the response data and the execution time.
    fn execute(&mut self, packet: &[u8]) -> (Vec<u8>, u64) {
        if packet.len() < CMD_SIZE_MIN {
            return (vec![STATUS_PARSE_ERROR], 0);
        }
        if packet[0] as usize != packet.len() || !Crc16::verify(packet) {
            return (vec![STATUS_CRC_ERROR], 0);
        }

        let opcode = packet[1];
        let param1 = packet[2];
        let param2 = u16::from_le_bytes([packet[3], packet[4]]);
        let data = &packet[5..packet.len() - 2];

        let result = match opcode {
            OP_READ => self.read(param1, param2).map(|d| (d, 1)),
            OP_HMAC => self.hmac(param1, param2).map(|d| (d, 27)),
            OP_NONCE => self.nonce(param1, data).map(|d| (d, 22)),
            OP_RANDOM => self.random(param1).map(|d| (d, 11)),
            OP_DEVREV => Ok((DEVREV.to_vec(), 1)),
            _ => Err(STATUS_PARSE_ERROR),
        };
        match result {
            Ok((data, exec_ms)) => (data, exec_ms * 1_000_000),
            Err(status) => (vec![status], 0),
        }
    }

    fn read(&mut self, param1: u8, param2: u16) -> Result<Vec<u8>, u8> {
        let len = if param1 & 0x80 != 0 { 32 } else { 4 };
        let offset = if len == 32 {
            ((param2 >> 3) & 0x03) as usize * 32
        } else {
            (param2 & 0x1F) as usize * 4
        };
        let zone: &[u8] = match param1 & 0x03 {
            0 => &self.config,
            1 => &self.otp,
            // Data zone is locked and slots are secret.
            2 => return Err(STATUS_EXECUTION_ERROR),
            _ => return Err(STATUS_PARSE_ERROR),
        };
        zone.get(offset..offset + len)
            .map(|d| d.to_vec())
            .ok_or(STATUS_PARSE_ERROR)
    }

    fn hmac(&mut self, param1: u8, param2: u16) -> Result<Vec<u8>, u8> {
        let mode = HmacMode(param1);
        let slot = param2 as usize;
        if !mode.is_valid() || slot >= SLOT_COUNT {
            return Err(STATUS_PARSE_ERROR);
        }
        let temp_key = match self.state_machine.context.temp_key {
            Some(tk) if tk.source_input == mode.source_input() => tk,
            _ => return Err(STATUS_EXECUTION_ERROR),
        };

        let mut otp = [0u8; OTP_HMAC_SIZE];
        otp.copy_from_slice(&self.otp[..OTP_HMAC_SIZE]);
        let mac = Sha204Digest::hmac(
            &self.slots[slot],
            &temp_key.value,
            mode,
            param2,
            &otp,
            &self.serial,
        );
        self.state_machine.context.temp_key = None;
        Ok(mac.to_vec())
    }

    fn nonce(&mut self, mode: u8, data: &[u8]) -> Result<Vec<u8>, u8> {
        match (mode, data.len()) {
            (0 | 1, 20) => {
                let mut rand_out = [0u8; 32];
                self.rng.fill_bytes(&mut rand_out);
                let mut num_in = [0u8; 20];
                num_in.copy_from_slice(data);
                self.state_machine.context.temp_key = Some(TempKey {
                    value: Sha204Digest::nonce(&rand_out, &num_in, mode),
                    source_input: false,
                });
                Ok(rand_out.to_vec())
            }
            (3, 32) => {
                let mut value = [0u8; 32];
                value.copy_from_slice(data);
                self.state_machine.context.temp_key = Some(TempKey {
                    value,
                    source_input: true,
                });
                Ok(vec![STATUS_SUCCESS])
            }
            _ => Err(STATUS_PARSE_ERROR),
        }
    }

    fn random(&mut self, mode: u8) -> Result<Vec<u8>, u8> {
        if mode > 1 {
            return Err(STATUS_PARSE_ERROR);
        }
        let mut out = [0u8; 32];
        self.rng.fill_bytes(&mut out);
        Ok(out.to_vec())
    }
}
