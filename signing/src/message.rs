/*++

Licensed under the Apache-2.0 license.

File Name:

    message.rs

Abstract:

    File contains the message record the transport hands to the signing
    backend, and the constants the signing protocol uses from it.

--*/

use crate::{SigningError, SigningResult};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Largest application payload.
pub const MAX_PAYLOAD: usize = 32;

/// Signature field: one tag byte followed by the MAC suffix.
pub const SIGNATURE_CAPACITY: usize = 25;

/// MAC bytes carried in a signed message.
pub const MAC_SUFFIX_LEN: usize = SIGNATURE_CAPACITY - 1;

/// Tag of an unsigned message.
pub const SIGNING_TAG_NONE: u8 = 0;

/// Tag of HMAC-SHA256 with serial binding.
pub const SIGNING_TAG_HMAC_SHA256: u8 = 1;

pub const C_PRESENTATION: u8 = 0;
pub const C_SET: u8 = 1;
pub const C_REQ: u8 = 2;
pub const C_INTERNAL: u8 = 3;
pub const C_STREAM: u8 = 4;

/// Internal: the sender wants signed messages.
pub const I_REQUEST_SIGNING: u8 = 15;

/// Internal: ask the destination for a nonce.
pub const I_GET_NONCE: u8 = 16;

/// Internal: nonce for the requester.
pub const I_GET_NONCE_RESPONSE: u8 = 17;

#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable,
)]
pub struct MessageHeader {
    /// Node the message was last relayed by
    pub last: u8,
    pub sender: u8,
    pub destination: u8,
    pub command: u8,
    pub msg_type: u8,
    pub sensor: u8,
    /// Payload bytes in use
    pub length: u8,
}

/// The part of the header a signature covers.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoBytes, Immutable)]
pub struct SignedHeader {
    pub sender: u8,
    pub destination: u8,
    pub command: u8,
    pub msg_type: u8,
}

impl From<&MessageHeader> for SignedHeader {
    fn from(header: &MessageHeader) -> Self {
        Self {
            sender: header.sender,
            destination: header.destination,
            command: header.command,
            msg_type: header.msg_type,
        }
    }
}

/// A message as it travels between nodes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: [u8; MAX_PAYLOAD],
    pub signature: [u8; SIGNATURE_CAPACITY],
}

impl Message {
    pub fn new(sender: u8, destination: u8, command: u8, msg_type: u8) -> Self {
        Self {
            header: MessageHeader {
                last: sender,
                sender,
                destination,
                command,
                msg_type,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Reassemble a message received off the air.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        Self::read_from_bytes(bytes).ok()
    }

    /// Payload bytes in use.
    pub fn payload(&self) -> SigningResult<&[u8]> {
        self.payload
            .get(..usize::from(self.header.length))
            .ok_or(SigningError::SIGNING_PAYLOAD_LENGTH)
    }

    pub fn set_payload(&mut self, data: &[u8]) -> SigningResult<()> {
        let len = u8::try_from(data.len()).map_err(|_| SigningError::SIGNING_PAYLOAD_LENGTH)?;
        self.payload
            .get_mut(..data.len())
            .ok_or(SigningError::SIGNING_PAYLOAD_LENGTH)?
            .copy_from_slice(data);
        self.payload[data.len()..].fill(0);
        self.header.length = len;
        Ok(())
    }

    pub fn signing_tag(&self) -> u8 {
        self.signature[0]
    }

    pub fn mac_suffix(&self) -> &[u8] {
        &self.signature[1..]
    }

    /// Fill the signature field with `tag` and the leading bytes of `mac`.
    pub fn set_signature(&mut self, tag: u8, mac: &[u8]) {
        self.signature.fill(0);
        self.signature[0] = tag;
        let len = mac.len().min(MAC_SUFFIX_LEN);
        self.signature[1..=len].copy_from_slice(&mac[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout() {
        let mut msg = Message::new(3, 0, C_SET, 2);
        msg.set_payload(b"21.5").unwrap();
        let bytes = msg.as_bytes();
        assert_eq!(bytes.len(), 7 + MAX_PAYLOAD + SIGNATURE_CAPACITY);
        assert_eq!(&bytes[..7], &[3, 3, 0, C_SET, 2, 0, 4]);
        assert_eq!(Message::from_wire(bytes), Some(msg));
        assert_eq!(Message::from_wire(&bytes[1..]), None);
    }

    #[test]
    fn test_payload_length_checked() {
        let mut msg = Message::default();
        assert_eq!(
            msg.set_payload(&[0u8; MAX_PAYLOAD + 1]),
            Err(SigningError::SIGNING_PAYLOAD_LENGTH)
        );
        msg.header.length = MAX_PAYLOAD as u8 + 1;
        assert_eq!(msg.payload(), Err(SigningError::SIGNING_PAYLOAD_LENGTH));
    }

    #[test]
    fn test_signed_header_image() {
        let msg = Message::new(7, 9, C_INTERNAL, I_GET_NONCE);
        assert_eq!(
            SignedHeader::from(&msg.header).as_bytes(),
            &[7, 9, C_INTERNAL, I_GET_NONCE]
        );
    }

    #[test]
    fn test_set_signature_truncates_mac() {
        let mut msg = Message::default();
        msg.set_signature(SIGNING_TAG_HMAC_SHA256, &[0xAB; 32]);
        assert_eq!(msg.signing_tag(), SIGNING_TAG_HMAC_SHA256);
        assert_eq!(msg.mac_suffix(), &[0xAB; MAC_SUFFIX_LEN]);
    }
}
