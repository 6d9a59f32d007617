/*++

Licensed under the Apache-2.0 license.

File Name:

    crc16.rs

Abstract:

    File contains the CRC-16 used on the ATSHA204 link: polynomial 0x8005,
    initial value zero, data bits consumed least significant first, no final
    reflection. Computed here as a plain MSB-first CRC over bit-reversed bytes.

--*/

/// CRC-16
pub struct Crc16;

impl Crc16 {
    const POLY: u16 = 0x8005;

    /// Compute the CRC of `data`
    pub fn compute(data: &[u8]) -> u16 {
        data.iter().fold(0u16, |crc, byte| {
            let mut crc = crc ^ ((byte.reverse_bits() as u16) << 8);
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ Self::POLY
                } else {
                    crc << 1
                };
            }
            crc
        })
    }

    /// CRC of `data` in wire order (little endian)
    pub fn bytes(data: &[u8]) -> [u8; 2] {
        Self::compute(data).to_le_bytes()
    }

    /// Check a packet whose last two bytes are its CRC
    pub fn verify(packet: &[u8]) -> bool {
        match packet.len().checked_sub(2) {
            Some(split) => Self::bytes(&packet[..split]) == packet[split..],
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_token() {
        assert_eq!(Crc16::compute(&[0x04, 0x11]), 0x4333);
        assert!(Crc16::verify(&[0x04, 0x11, 0x33, 0x43]));
    }

    #[test]
    fn test_verify_short() {
        assert!(!Crc16::verify(&[0x00]));
        assert!(Crc16::verify(&[0x00, 0x00]));
    }
}
