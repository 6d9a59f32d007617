/*++

Licensed under the Apache-2.0 license.

File Name:

    crc.rs

Abstract:

    File contains the CRC-16 used to protect SHA204 packets.

--*/

const CRC16_POLY: u16 = 0x8005;

/// CRC-16 over `data`: polynomial 0x8005, zero seed, each byte fed LSB first.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for d in data {
        for i in 0..8 {
            let data_bit = (d >> i) & 1;
            let crc_bit = (crc >> 15) as u8;
            crc <<= 1;
            if data_bit != crc_bit {
                crc ^= CRC16_POLY;
            }
        }
    }
    crc
}

/// CRC-16 in wire order (low byte first).
pub fn crc16_bytes(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}

/// Checks a packet whose last two bytes are its CRC.
pub fn crc16_check(packet: &[u8]) -> bool {
    match packet.len().checked_sub(2) {
        Some(split) => {
            let (body, crc) = packet.split_at(split);
            crc16_bytes(body) == [crc[0], crc[1]]
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_token() {
        assert_eq!(crc16_bytes(&[0x04, 0x11]), [0x33, 0x43]);
        assert!(crc16_check(&[0x04, 0x11, 0x33, 0x43]));
    }

    #[test]
    fn test_check_rejects_corruption() {
        assert!(!crc16_check(&[0x04, 0x11, 0x33, 0x42]));
        assert!(!crc16_check(&[0x04, 0x10, 0x33, 0x43]));
        assert!(!crc16_check(&[0x04]));
    }
}
