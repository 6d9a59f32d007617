/*++

Licensed under the Apache-2.0 license.

File Name:

    swi.rs

Abstract:

    File contains the single-wire interface (SWI) physical layer: a
    bit-banged, half-duplex token transport over one open-drain IO pin.

    Each bit is one token. A logic 1 is a single low pulse of one bit time
    followed by seven bit times high. A logic 0 is two low pulses separated
    by one bit time high. Bytes are sent LSB first, and every transfer starts
    with a flag byte that tells the device what follows.

--*/

use crate::{SigningError, SigningResult};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// One bit time at 230.4 kbaud.
const BIT_NS: u32 = 4_340;

/// High time after the start pulse of a logic 1 token.
const ONE_TAIL_NS: u32 = 7 * BIT_NS;

/// High time after the second pulse of a logic 0 token.
const ZERO_TAIL_NS: u32 = 5 * BIT_NS;

/// Wake pulse low time. The device needs at least 60 us.
const WAKE_LOW_US: u32 = 80;

/// Time the device needs after the wake pulse before it accepts flags.
const WAKE_HIGH_US: u32 = 2_500;

/// Poll interval while waiting for a line transition.
const SAMPLE_NS: u32 = 500;

/// Longest wait for the start pulse of a token. Covers the device turnaround
/// time after a transmit flag.
const START_PULSE_TIMEOUT_NS: u32 = 250_000;

/// Longest a single low pulse may last.
const PULSE_TIMEOUT_NS: u32 = 3 * BIT_NS;

/// Window after the start pulse in which a second pulse marks a logic 0.
const ZERO_WINDOW_NS: u32 = 2 * BIT_NS;

/// Flag byte that starts every host transfer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum SwiFlag {
    /// A command packet follows.
    Command = 0x77,
    /// The device may send its pending response.
    Transmit = 0x88,
    /// Enter idle; TempKey survives.
    Idle = 0xBB,
    /// Enter sleep; all volatile state is lost.
    Sleep = 0xCC,
}

impl From<SwiFlag> for u8 {
    fn from(flag: SwiFlag) -> Self {
        flag as u8
    }
}

/// Byte-level access to a device on the single-wire bus.
///
/// Implemented by [`SwiPhy`] on real pins and by the hardware model in tests.
pub trait SwiBus {
    /// Hold the line low long enough to wake the device, release it and wait
    /// until the device is ready for a flag.
    fn wake_pulse(&mut self) -> SigningResult<()>;

    /// Send `flag` followed by `bytes` as one uninterrupted token stream.
    fn send(&mut self, flag: SwiFlag, bytes: &[u8]) -> SigningResult<()>;

    /// Send the transmit flag and read up to `buf.len()` bytes.
    ///
    /// # Returns
    ///
    /// * `usize` - Number of complete bytes received before the line went quiet
    fn receive(&mut self, buf: &mut [u8]) -> SigningResult<usize>;

    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Bit-banged SWI transport.
///
/// `P` must be an open-drain pin with a pull-up: driving it high releases the
/// line so the device can pull it low.
pub struct SwiPhy<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> SwiPhy<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    /// Give back the pin and the delay provider.
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn drive_low(&mut self) -> SigningResult<()> {
        self.pin
            .set_low()
            .map_err(|_| SigningError::DRIVER_SWI_PIN)
    }

    fn drive_high(&mut self) -> SigningResult<()> {
        self.pin
            .set_high()
            .map_err(|_| SigningError::DRIVER_SWI_PIN)
    }

    fn pulse(&mut self) -> SigningResult<()> {
        self.drive_low()?;
        self.delay.delay_ns(BIT_NS);
        self.drive_high()
    }

    fn send_byte(&mut self, byte: u8) -> SigningResult<()> {
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                self.pulse()?;
                self.delay.delay_ns(ONE_TAIL_NS);
            } else {
                self.pulse()?;
                self.delay.delay_ns(BIT_NS);
                self.pulse()?;
                self.delay.delay_ns(ZERO_TAIL_NS);
            }
        }
        Ok(())
    }

    /// Poll until the line reads `high`, for at most `timeout_ns`.
    fn wait_level(&mut self, high: bool, timeout_ns: u32) -> SigningResult<bool> {
        let mut waited = 0;
        loop {
            let level = self
                .pin
                .is_high()
                .map_err(|_| SigningError::DRIVER_SWI_PIN)?;
            if level == high {
                return Ok(true);
            }
            if waited >= timeout_ns {
                return Ok(false);
            }
            self.delay.delay_ns(SAMPLE_NS);
            waited += SAMPLE_NS;
        }
    }

    fn receive_bytes(&mut self, buf: &mut [u8]) -> SigningResult<usize> {
        for (i, slot) in buf.iter_mut().enumerate() {
            let mut byte = 0u8;
            for bit in 0..8 {
                if !self.wait_level(false, START_PULSE_TIMEOUT_NS)? {
                    if i == 0 && bit == 0 {
                        return Err(SigningError::DRIVER_SWI_RX_TIMEOUT);
                    }
                    return Ok(i);
                }
                if !self.wait_level(true, PULSE_TIMEOUT_NS)? {
                    // Line held low.
                    return Err(SigningError::DRIVER_SWI_RX_TIMEOUT);
                }
                if self.wait_level(false, ZERO_WINDOW_NS)? {
                    if !self.wait_level(true, PULSE_TIMEOUT_NS)? {
                        return Err(SigningError::DRIVER_SWI_RX_TIMEOUT);
                    }
                } else {
                    byte |= 1 << bit;
                }
            }
            *slot = byte;
        }
        Ok(buf.len())
    }
}

impl<P, D> SwiBus for SwiPhy<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn wake_pulse(&mut self) -> SigningResult<()> {
        self.drive_low()?;
        self.delay.delay_us(WAKE_LOW_US);
        self.drive_high()?;
        self.delay.delay_us(WAKE_HIGH_US);
        Ok(())
    }

    fn send(&mut self, flag: SwiFlag, bytes: &[u8]) -> SigningResult<()> {
        critical_section::with(|_| {
            self.send_byte(flag.into())?;
            bytes.iter().try_for_each(|&b| self.send_byte(b))
        })
    }

    fn receive(&mut self, buf: &mut [u8]) -> SigningResult<usize> {
        if buf.is_empty() {
            return Err(SigningError::DRIVER_SWI_RX_EMPTY_BUFFER);
        }
        critical_section::with(|_| {
            self.send_byte(SwiFlag::Transmit.into())?;
            self.receive_bytes(buf)
        })
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
