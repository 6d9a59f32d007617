/*++

Licensed under the Apache-2.0 license.

File Name:

    sha204.rs

Abstract:

    File contains the SHA204 link layer: wake handshake, command framing,
    CRC protection and response parsing on top of a SWI bus.

    Command packet:  count | opcode | param1 | param2 (LE) | data | crc (LE)
    Response packet: count | data | crc (LE)

--*/

use crate::crc::{crc16_bytes, crc16_check};
use crate::swi::{SwiBus, SwiFlag};
use crate::{SigningError, SigningResult};

/// Command packet without data.
pub const CMD_SIZE_MIN: usize = 7;

/// Largest command packet: 32 bytes of data plus a 32 byte MAC.
pub const CMD_SIZE_MAX: usize = CMD_SIZE_MIN + 64;

/// Status-only response packet.
pub const RSP_SIZE_MIN: usize = 4;

/// Largest response packet: 32 bytes of data.
pub const RSP_SIZE_MAX: usize = 3 + 32;

/// Response the device sends after a wake pulse.
const WAKE_RESPONSE: [u8; RSP_SIZE_MIN] = [0x04, 0x11, 0x33, 0x43];

/// Transmit attempts after the execution time has elapsed.
const RESPONSE_POLL_ATTEMPTS: u32 = 4;

/// Spacing between transmit attempts.
const RESPONSE_POLL_INTERVAL_MS: u32 = 1;

/// Device command opcodes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Command {
    Read = 0x02,
    Hmac = 0x11,
    Nonce = 0x16,
    Random = 0x1B,
    DevRev = 0x30,
}

impl Command {
    /// Worst-case execution time in milliseconds.
    pub fn max_exec_ms(self) -> u32 {
        match self {
            Command::Read => 4,
            Command::Hmac => 69,
            Command::Nonce => 60,
            Command::Random => 50,
            Command::DevRev => 2,
        }
    }
}

/// Status byte of a four byte response.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    CheckMacMiscompare = 0x01,
    ParseError = 0x03,
    ExecutionError = 0x0F,
    AfterWake = 0x11,
    CrcError = 0xFF,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Success),
            0x01 => Some(Status::CheckMacMiscompare),
            0x03 => Some(Status::ParseError),
            0x0F => Some(Status::ExecutionError),
            0x11 => Some(Status::AfterWake),
            0xFF => Some(Status::CrcError),
            _ => None,
        }
    }

    fn check(byte: u8) -> SigningResult<()> {
        match Self::from_byte(byte) {
            Some(Status::Success) => Ok(()),
            Some(Status::CheckMacMiscompare) => Err(SigningError::DRIVER_SHA204_STATUS_CHECKMAC),
            Some(Status::ParseError) => Err(SigningError::DRIVER_SHA204_STATUS_PARSE),
            Some(Status::ExecutionError) => Err(SigningError::DRIVER_SHA204_STATUS_EXECUTION),
            Some(Status::AfterWake) => Err(SigningError::DRIVER_SHA204_STATUS_WAKE),
            Some(Status::CrcError) => Err(SigningError::DRIVER_SHA204_STATUS_COMM),
            None => Err(SigningError::DRIVER_SHA204_STATUS_UNKNOWN),
        }
    }
}

/// SHA204 device on a single-wire bus.
pub struct Sha204<B> {
    bus: B,
}

impl<B: SwiBus> Sha204<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Wake the device and check its wake token.
    ///
    /// # Errors
    ///
    /// * `DRIVER_SHA204_NO_CHIP` - Nothing answered, or the answer is not a
    ///   valid wake token
    pub fn wake(&mut self) -> SigningResult<()> {
        self.bus.wake_pulse()?;
        let mut rsp = [0u8; RSP_SIZE_MIN];
        match self.bus.receive(&mut rsp) {
            Ok(RSP_SIZE_MIN) if rsp == WAKE_RESPONSE => Ok(()),
            _ => Err(SigningError::DRIVER_SHA204_NO_CHIP),
        }
    }

    /// Frame a command into `tx` and send it.
    ///
    /// # Arguments
    ///
    /// * `tx` - Command buffer
    /// * `command` - Opcode
    /// * `param1` - First parameter (mode or zone)
    /// * `param2` - Second parameter (key id or address)
    /// * `data` - Command data
    pub fn send(
        &mut self,
        tx: &mut [u8],
        command: Command,
        param1: u8,
        param2: u16,
        data: &[u8],
    ) -> SigningResult<()> {
        let count = CMD_SIZE_MIN + data.len();
        if count > tx.len() || count > u8::MAX as usize {
            return Err(SigningError::DRIVER_SHA204_CMD_TOO_LARGE);
        }

        tx[0] = count as u8;
        tx[1] = command as u8;
        tx[2] = param1;
        tx[3..5].copy_from_slice(&param2.to_le_bytes());
        tx[5..count - 2].copy_from_slice(data);
        let crc = crc16_bytes(&tx[..count - 2]);
        tx[count - 2..count].copy_from_slice(&crc);

        self.bus.send(SwiFlag::Command, &tx[..count])
    }

    /// Read one response packet into `rx`.
    ///
    /// # Returns
    ///
    /// * `usize` - Packet length including count and CRC
    pub fn receive(&mut self, rx: &mut [u8]) -> SigningResult<usize> {
        let received = match self.bus.receive(rx) {
            Ok(n) => n,
            Err(SigningError::DRIVER_SWI_RX_TIMEOUT) => {
                return Err(SigningError::DRIVER_SHA204_TIMEOUT)
            }
            Err(err) => return Err(err),
        };

        let count = rx[0] as usize;
        if count > rx.len() {
            return Err(SigningError::DRIVER_SHA204_BUFFER_TOO_SMALL);
        }
        if received < RSP_SIZE_MIN || count < RSP_SIZE_MIN || count > received {
            return Err(SigningError::DRIVER_SHA204_BAD_SIZE);
        }
        if !crc16_check(&rx[..count]) {
            return Err(SigningError::DRIVER_SHA204_BAD_CRC);
        }
        if count == RSP_SIZE_MIN {
            Status::check(rx[1])?;
        }
        Ok(count)
    }

    /// Send a command, wait for it to execute and read its response.
    ///
    /// # Returns
    ///
    /// * `&[u8]` - Response data without count and CRC
    pub fn execute<'r>(
        &mut self,
        tx: &mut [u8],
        rx: &'r mut [u8],
        command: Command,
        param1: u8,
        param2: u16,
        data: &[u8],
    ) -> SigningResult<&'r [u8]> {
        self.send(tx, command, param1, param2, data)?;
        self.bus.delay_ms(command.max_exec_ms());

        let mut attempt = 0;
        let count = loop {
            match self.receive(rx) {
                Err(SigningError::DRIVER_SHA204_TIMEOUT)
                    if attempt + 1 < RESPONSE_POLL_ATTEMPTS =>
                {
                    attempt += 1;
                    self.bus.delay_ms(RESPONSE_POLL_INTERVAL_MS);
                }
                result => break result?,
            }
        };
        Ok(&rx[1..count - 2])
    }

    /// Put the device in idle mode. TempKey is kept.
    pub fn idle(&mut self) -> SigningResult<()> {
        self.bus.send(SwiFlag::Idle, &[])
    }

    /// Put the device to sleep. TempKey and all other volatile state is lost.
    pub fn sleep(&mut self) -> SigningResult<()> {
        self.bus.send(SwiFlag::Sleep, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// Replays canned responses and records what the driver sent.
    #[derive(Default)]
    struct ScriptedBus {
        responses: VecDeque<SigningResult<Vec<u8>>>,
        sent: Vec<(SwiFlag, Vec<u8>)>,
        slept_ms: u32,
        wakes: u32,
    }

    impl SwiBus for ScriptedBus {
        fn wake_pulse(&mut self) -> SigningResult<()> {
            self.wakes += 1;
            Ok(())
        }
        fn send(&mut self, flag: SwiFlag, bytes: &[u8]) -> SigningResult<()> {
            self.sent.push((flag, bytes.to_vec()));
            Ok(())
        }
        fn receive(&mut self, buf: &mut [u8]) -> SigningResult<usize> {
            let rsp = self
                .responses
                .pop_front()
                .unwrap_or(Err(SigningError::DRIVER_SWI_RX_TIMEOUT))?;
            let n = rsp.len().min(buf.len());
            buf[..n].copy_from_slice(&rsp[..n]);
            Ok(n)
        }
        fn delay_ms(&mut self, ms: u32) {
            self.slept_ms += ms;
        }
    }

    fn packet(data: &[u8]) -> Vec<u8> {
        let mut p = vec![(data.len() + 3) as u8];
        p.extend_from_slice(data);
        let crc = crc16_bytes(&p);
        p.extend_from_slice(&crc);
        p
    }

    #[test]
    fn test_wake_accepts_wake_token() {
        let mut bus = ScriptedBus::default();
        bus.responses.push_back(Ok(WAKE_RESPONSE.to_vec()));
        let mut dev = Sha204::new(bus);
        assert_eq!(dev.wake(), Ok(()));
        assert_eq!(dev.bus.wakes, 1);
    }

    #[test]
    fn test_wake_without_chip() {
        let mut dev = Sha204::new(ScriptedBus::default());
        assert_eq!(dev.wake(), Err(SigningError::DRIVER_SHA204_NO_CHIP));

        let mut bus = ScriptedBus::default();
        bus.responses.push_back(Ok(vec![0x04, 0x11, 0x33, 0x44]));
        let mut dev = Sha204::new(bus);
        assert_eq!(dev.wake(), Err(SigningError::DRIVER_SHA204_NO_CHIP));
    }

    #[test]
    fn test_send_frames_command() {
        let mut dev = Sha204::new(ScriptedBus::default());
        let mut tx = [0u8; CMD_SIZE_MAX];
        dev.send(&mut tx, Command::Read, 0x80, 0x0000, &[]).unwrap();

        let (flag, bytes) = &dev.bus.sent[0];
        assert_eq!(*flag, SwiFlag::Command);
        assert_eq!(bytes.len(), CMD_SIZE_MIN);
        assert_eq!(&bytes[..5], &[0x07, 0x02, 0x80, 0x00, 0x00]);
        assert!(crc16_check(bytes));
    }

    #[test]
    fn test_send_rejects_oversized_data() {
        let mut dev = Sha204::new(ScriptedBus::default());
        let mut tx = [0u8; CMD_SIZE_MIN + 4];
        assert_eq!(
            dev.send(&mut tx, Command::Nonce, 0x03, 0, &[0u8; 32]),
            Err(SigningError::DRIVER_SHA204_CMD_TOO_LARGE)
        );
        assert!(dev.bus.sent.is_empty());
    }

    #[test]
    fn test_receive_checks_crc_and_status() {
        let mut bus = ScriptedBus::default();
        let mut bad = packet(&[0xAA; 32]);
        bad[10] ^= 0x01;
        bus.responses.push_back(Ok(bad));
        bus.responses.push_back(Ok(packet(&[0x0F])));
        bus.responses.push_back(Ok(packet(&[0x00])));
        let mut dev = Sha204::new(bus);
        let mut rx = [0u8; RSP_SIZE_MAX];

        assert_eq!(
            dev.receive(&mut rx),
            Err(SigningError::DRIVER_SHA204_BAD_CRC)
        );
        assert_eq!(
            dev.receive(&mut rx),
            Err(SigningError::DRIVER_SHA204_STATUS_EXECUTION)
        );
        assert_eq!(dev.receive(&mut rx), Ok(RSP_SIZE_MIN));
    }

    #[test]
    fn test_receive_rejects_short_packet() {
        let mut bus = ScriptedBus::default();
        bus.responses.push_back(Ok(vec![0x23, 0x01, 0x02]));
        let mut dev = Sha204::new(bus);
        let mut rx = [0u8; RSP_SIZE_MAX];
        assert_eq!(
            dev.receive(&mut rx),
            Err(SigningError::DRIVER_SHA204_BAD_SIZE)
        );
    }

    #[test]
    fn test_execute_polls_until_response() {
        let mut bus = ScriptedBus::default();
        bus.responses
            .push_back(Err(SigningError::DRIVER_SWI_RX_TIMEOUT));
        bus.responses.push_back(Ok(packet(&[0x5A; 32])));
        let mut dev = Sha204::new(bus);
        let mut tx = [0u8; CMD_SIZE_MAX];
        let mut rx = [0u8; RSP_SIZE_MAX];

        let data = dev
            .execute(&mut tx, &mut rx, Command::Random, 0, 0, &[])
            .unwrap();
        assert_eq!(data, &[0x5A; 32]);
        assert_eq!(
            dev.bus.slept_ms,
            Command::Random.max_exec_ms() + RESPONSE_POLL_INTERVAL_MS
        );
    }

    #[test]
    fn test_execute_times_out() {
        let mut dev = Sha204::new(ScriptedBus::default());
        let mut tx = [0u8; CMD_SIZE_MAX];
        let mut rx = [0u8; RSP_SIZE_MAX];
        assert_eq!(
            dev.execute(&mut tx, &mut rx, Command::Random, 0, 0, &[]),
            Err(SigningError::DRIVER_SHA204_TIMEOUT)
        );
    }
}
