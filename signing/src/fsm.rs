/*++

Licensed under the Apache-2.0 license.

File Name:

    fsm.rs

Abstract:

    File contains the signing state machine. A verifier issues a nonce and
    waits a bounded time for a message signed over it; a signer stores the
    nonce it received and signs exactly one message with it.

--*/

use crate::config::SigningConfig;
use crate::message::{Message, SignedHeader, MAC_SUFFIX_LEN, SIGNING_TAG_HMAC_SHA256};
use crate::nonce::{Nonce, NONCE_SIZE};
use crate::{SigningError, SigningResult};
use constant_time_eq::constant_time_eq;
use meshsig_drivers::{CryptoPrimitives, MonotonicClock, Serial, Sha256, MAC_SIZE};
use zerocopy::IntoBytes;
use zeroize::Zeroize;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SigningState {
    /// No nonce held.
    Idle,

    /// This node issued a nonce and waits for the signed message.
    NoncePending,

    /// This node holds a peer's nonce and may sign one message with it.
    SignReady,
}

/// Signing state machine over a set of crypto primitives.
pub struct SigningFsm<P, C> {
    primitives: P,
    clock: C,
    config: SigningConfig,
    sha256: Sha256,
    state: SigningState,
    current_nonce: Nonce,

    /// Clock reading when the pending nonce was issued
    timestamp: u32,

    /// Own serial, read once
    serial: Option<Serial>,

    /// MAC input reduced to the challenge width
    mac_input: [u8; MAC_SIZE],
}

impl<P: CryptoPrimitives, C: MonotonicClock> SigningFsm<P, C> {
    /// Create the state machine and run the self tests of the software
    /// primitives it relies on.
    pub fn new(primitives: P, clock: C, config: SigningConfig) -> SigningResult<Self> {
        let mut sha256 = Sha256::new();
        meshsig_kat::execute_kats(&mut sha256)?;
        Ok(Self {
            primitives,
            clock,
            config,
            sha256,
            state: SigningState::Idle,
            current_nonce: Nonce::default(),
            timestamp: 0,
            serial: None,
            mac_input: [0u8; MAC_SIZE],
        })
    }

    pub fn state(&self) -> SigningState {
        self.state
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    pub fn current_nonce(&self) -> &[u8; NONCE_SIZE] {
        self.current_nonce.as_bytes()
    }

    pub fn primitives(&self) -> &P {
        &self.primitives
    }

    pub fn primitives_mut(&mut self) -> &mut P {
        &mut self.primitives
    }

    fn own_serial(&mut self) -> SigningResult<Serial> {
        match self.serial {
            Some(serial) => Ok(serial),
            None => {
                let serial = self.primitives.read_serial()?;
                self.serial = Some(serial);
                Ok(serial)
            }
        }
    }

    fn clear(&mut self) {
        self.current_nonce.zeroize();
        self.state = SigningState::Idle;
    }

    /// Issue a nonce into `msg` and start the verification window.
    ///
    /// Replaces any nonce held before. On failure nothing changes.
    pub fn get_nonce(&mut self, msg: &mut Message) -> SigningResult<()> {
        let mut random = self.primitives.random()?;
        let serial = self.own_serial();
        let nonce = serial.map(|serial| Nonce::issue(&random, &serial));
        random.zeroize();
        let nonce = nonce?;

        msg.set_payload(nonce.as_bytes())?;
        msg.set_signature(SIGNING_TAG_HMAC_SHA256, &[]);

        self.current_nonce = nonce;
        self.timestamp = self.clock.now_ms();
        self.state = SigningState::NoncePending;
        Ok(())
    }

    /// Returns false once the verification window of the pending nonce has
    /// elapsed, and drops that nonce. True when nothing is pending.
    pub fn check_timer(&mut self) -> bool {
        if self.state != SigningState::NoncePending {
            return true;
        }
        if self.clock.elapsed_ms(self.timestamp) > self.config.verification_window_ms {
            self.clear();
            return false;
        }
        true
    }

    /// Store the nonce a peer sent in `msg`.
    pub fn put_nonce(&mut self, msg: &Message) -> SigningResult<()> {
        // An expired verification is dropped here.
        if self.check_timer() && self.state == SigningState::NoncePending {
            return Err(SigningError::SIGNING_VERIFICATION_PENDING);
        }

        if msg.signing_tag() != SIGNING_TAG_HMAC_SHA256 {
            return Err(SigningError::SIGNING_SCHEME_MISMATCH);
        }
        let nonce = Nonce::parse(msg.payload()?)?;
        self.config
            .whitelist()
            .check(msg.header.sender, &nonce.serial())?;

        self.current_nonce = nonce;
        self.state = SigningState::SignReady;
        Ok(())
    }

    /// Sign `msg` with the stored peer nonce. The nonce is used up whatever
    /// the outcome.
    pub fn sign_msg(&mut self, msg: &mut Message) -> SigningResult<()> {
        if self.state != SigningState::SignReady {
            return Err(SigningError::SIGNING_NO_NONCE);
        }
        let result = self.sign_with_nonce(msg);
        self.clear();
        result
    }

    fn sign_with_nonce(&mut self, msg: &mut Message) -> SigningResult<()> {
        if self.current_nonce.is_zero() {
            return Err(SigningError::SIGNING_NO_NONCE);
        }
        let mut mac = self.calculate_signature(msg)?;
        msg.set_signature(SIGNING_TAG_HMAC_SHA256, &mac[..MAC_SUFFIX_LEN]);
        mac.zeroize();
        Ok(())
    }

    /// Check the signature of `msg` against the pending nonce. Ends the
    /// verification whatever the outcome.
    pub fn verify_msg(&mut self, msg: &Message) -> SigningResult<()> {
        if self.state != SigningState::NoncePending {
            return Err(SigningError::SIGNING_NO_PENDING_VERIFICATION);
        }
        if !self.check_timer() {
            return Err(SigningError::SIGNING_REPLAY_WINDOW_EXPIRED);
        }
        let result = self.verify_with_nonce(msg);
        self.clear();
        result
    }

    fn verify_with_nonce(&mut self, msg: &Message) -> SigningResult<()> {
        if msg.signing_tag() != SIGNING_TAG_HMAC_SHA256 {
            return Err(SigningError::SIGNING_SCHEME_MISMATCH);
        }
        let mut mac = self.calculate_signature(msg)?;
        let matches = constant_time_eq(&mac[..MAC_SUFFIX_LEN], msg.mac_suffix());
        mac.zeroize();
        if !matches {
            return Err(SigningError::SIGNING_VERIFICATION_MISMATCH);
        }
        Ok(())
    }

    /// HMAC over `nonce || signed header || payload`, digested to the
    /// challenge width when longer.
    fn calculate_signature(&mut self, msg: &Message) -> SigningResult<[u8; MAC_SIZE]> {
        let Self {
            primitives,
            sha256,
            current_nonce,
            mac_input,
            ..
        } = self;

        let header = SignedHeader::from(&msg.header);
        let parts = [
            current_nonce.as_bytes().as_slice(),
            header.as_bytes(),
            msg.payload()?,
        ];
        let total: usize = parts.iter().map(|part| part.len()).sum();

        if total > MAC_SIZE {
            let mut op = sha256.digest_init()?;
            for part in parts {
                op.update(part)?;
            }
            *mac_input = op.finalize()?;
        } else {
            mac_input.fill(0);
            let mut offset = 0;
            for part in parts {
                mac_input[offset..offset + part.len()].copy_from_slice(part);
                offset += part.len();
            }
        }

        let mac = primitives.hmac_sha256(mac_input);
        mac_input.zeroize();
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{C_INTERNAL, C_SET, I_GET_NONCE_RESPONSE, SIGNING_TAG_NONE};
    use crate::whitelist::WhitelistEntry;
    use core::cell::Cell;
    use hmac::{Hmac, Mac};
    use sha2::{Digest, Sha256 as RefSha256};

    const KEY: [u8; 32] = [0x33; 32];

    /// Software primitives with a fixed random stream that count chip calls.
    struct FakePrimitives {
        serial: Serial,
        counter: u8,
        calls: u32,
        fail: bool,
    }

    impl FakePrimitives {
        fn new(serial_tail: u8) -> Self {
            Self {
                serial: [0x01, 0x23, 0, 0, 0, 0, 0, serial_tail, 0xEE],
                counter: 0,
                calls: 0,
                fail: false,
            }
        }

        fn check(&mut self) -> SigningResult<()> {
            self.calls += 1;
            if self.fail {
                return Err(SigningError::DRIVER_SHA204_NO_CHIP);
            }
            Ok(())
        }
    }

    impl CryptoPrimitives for FakePrimitives {
        fn random(&mut self) -> SigningResult<[u8; 32]> {
            self.check()?;
            self.counter = self.counter.wrapping_add(1);
            Ok([self.counter; 32])
        }

        fn hmac_sha256(&mut self, challenge: &[u8; 32]) -> SigningResult<[u8; 32]> {
            self.check()?;
            let mut mac = <Hmac<RefSha256> as Mac>::new_from_slice(&KEY).unwrap();
            mac.update(challenge);
            Ok(mac.finalize().into_bytes().into())
        }

        fn read_serial(&mut self) -> SigningResult<Serial> {
            self.check()?;
            Ok(self.serial)
        }
    }

    struct TestClock(Cell<u32>);

    impl MonotonicClock for TestClock {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    impl TestClock {
        fn advance(&self, ms: u32) {
            self.0.set(self.0.get().wrapping_add(ms));
        }
    }

    fn fsm<'c>(
        serial_tail: u8,
        clock: &'c TestClock,
        config: SigningConfig,
    ) -> SigningFsm<FakePrimitives, &'c TestClock> {
        SigningFsm::new(FakePrimitives::new(serial_tail), clock, config).unwrap()
    }

    fn reading() -> Message {
        let mut msg = Message::new(2, 1, C_SET, 0);
        msg.set_payload(b"23.4").unwrap();
        msg
    }

    /// Verifier issues a nonce, signer stores it.
    fn exchange(
        verifier: &mut SigningFsm<FakePrimitives, &TestClock>,
        signer: &mut SigningFsm<FakePrimitives, &TestClock>,
    ) {
        let mut nonce_msg = Message::new(1, 2, C_INTERNAL, I_GET_NONCE_RESPONSE);
        verifier.get_nonce(&mut nonce_msg).unwrap();
        signer.put_nonce(&nonce_msg).unwrap();
    }

    #[test]
    fn test_sign_then_verify() {
        let clock = TestClock(Cell::new(100));
        let mut verifier = fsm(1, &clock, SigningConfig::DEFAULT);
        let mut signer = fsm(2, &clock, SigningConfig::DEFAULT);

        exchange(&mut verifier, &mut signer);
        assert_eq!(verifier.state(), SigningState::NoncePending);
        assert_eq!(signer.state(), SigningState::SignReady);

        let mut msg = reading();
        signer.sign_msg(&mut msg).unwrap();
        assert_eq!(msg.signing_tag(), SIGNING_TAG_HMAC_SHA256);
        assert_eq!(signer.current_nonce(), &[0u8; NONCE_SIZE]);
        assert_eq!(signer.state(), SigningState::Idle);

        assert_eq!(verifier.verify_msg(&msg), Ok(()));
        assert_eq!(verifier.state(), SigningState::Idle);
        assert_eq!(verifier.current_nonce(), &[0u8; NONCE_SIZE]);
    }

    #[test]
    fn test_mac_matches_reference() {
        let clock = TestClock(Cell::new(0));
        let mut verifier = fsm(1, &clock, SigningConfig::DEFAULT);
        let mut signer = fsm(2, &clock, SigningConfig::DEFAULT);

        let mut nonce_msg = Message::new(1, 2, C_INTERNAL, I_GET_NONCE_RESPONSE);
        verifier.get_nonce(&mut nonce_msg).unwrap();
        let nonce = nonce_msg.payload().unwrap().to_vec();
        signer.put_nonce(&nonce_msg).unwrap();

        let mut msg = reading();
        signer.sign_msg(&mut msg).unwrap();

        let mut sha = RefSha256::new();
        sha.update(&nonce);
        sha.update([2, 1, C_SET, 0]);
        sha.update(b"23.4");
        let challenge = sha.finalize();
        let mut mac = <Hmac<RefSha256> as Mac>::new_from_slice(&KEY).unwrap();
        mac.update(&challenge);
        let expected = mac.finalize().into_bytes();

        assert_eq!(msg.mac_suffix(), &expected[..MAC_SUFFIX_LEN]);
    }

    #[test]
    fn test_second_sign_fails() {
        let clock = TestClock(Cell::new(0));
        let mut verifier = fsm(1, &clock, SigningConfig::DEFAULT);
        let mut signer = fsm(2, &clock, SigningConfig::DEFAULT);
        exchange(&mut verifier, &mut signer);

        let mut msg = reading();
        signer.sign_msg(&mut msg).unwrap();
        assert_eq!(
            signer.sign_msg(&mut msg),
            Err(SigningError::SIGNING_NO_NONCE)
        );
    }

    #[test]
    fn test_timer_expiry() {
        let clock = TestClock(Cell::new(u32::MAX - 1000));
        let mut verifier = fsm(1, &clock, SigningConfig::DEFAULT);
        let mut signer = fsm(2, &clock, SigningConfig::DEFAULT);
        exchange(&mut verifier, &mut signer);

        let mut msg = reading();
        signer.sign_msg(&mut msg).unwrap();

        clock.advance(5_000);
        assert!(verifier.check_timer());
        clock.advance(1);
        assert!(!verifier.check_timer());
        assert_eq!(verifier.state(), SigningState::Idle);
        assert_eq!(verifier.current_nonce(), &[0u8; NONCE_SIZE]);
        assert_eq!(
            verifier.verify_msg(&msg),
            Err(SigningError::SIGNING_NO_PENDING_VERIFICATION)
        );
    }

    #[test]
    fn test_verify_after_window_without_poll() {
        let clock = TestClock(Cell::new(0));
        let config = SigningConfig::DEFAULT.with_verification_window_ms(50);
        let mut verifier = fsm(1, &clock, config);
        let mut signer = fsm(2, &clock, config);
        exchange(&mut verifier, &mut signer);

        let mut msg = reading();
        signer.sign_msg(&mut msg).unwrap();
        clock.advance(51);
        assert_eq!(
            verifier.verify_msg(&msg),
            Err(SigningError::SIGNING_REPLAY_WINDOW_EXPIRED)
        );
    }

    #[test]
    fn test_tag_mismatch_skips_chip() {
        let clock = TestClock(Cell::new(0));
        let mut verifier = fsm(1, &clock, SigningConfig::DEFAULT);
        let mut signer = fsm(2, &clock, SigningConfig::DEFAULT);
        exchange(&mut verifier, &mut signer);

        let mut msg = reading();
        signer.sign_msg(&mut msg).unwrap();
        msg.signature[0] = SIGNING_TAG_NONE;

        let calls = verifier.primitives().calls;
        assert_eq!(
            verifier.verify_msg(&msg),
            Err(SigningError::SIGNING_SCHEME_MISMATCH)
        );
        assert_eq!(verifier.primitives().calls, calls);
        assert_eq!(verifier.state(), SigningState::Idle);
    }

    #[test]
    fn test_replay_rejected() {
        let clock = TestClock(Cell::new(0));
        let mut verifier = fsm(1, &clock, SigningConfig::DEFAULT);
        let mut signer = fsm(2, &clock, SigningConfig::DEFAULT);
        exchange(&mut verifier, &mut signer);

        let mut msg = reading();
        signer.sign_msg(&mut msg).unwrap();
        assert_eq!(verifier.verify_msg(&msg), Ok(()));
        assert_eq!(
            verifier.verify_msg(&msg),
            Err(SigningError::SIGNING_NO_PENDING_VERIFICATION)
        );

        // A fresh nonce does not validate the old signature either.
        let mut nonce_msg = Message::new(1, 2, C_INTERNAL, I_GET_NONCE_RESPONSE);
        verifier.get_nonce(&mut nonce_msg).unwrap();
        assert_eq!(
            verifier.verify_msg(&msg),
            Err(SigningError::SIGNING_VERIFICATION_MISMATCH)
        );
    }

    #[test]
    fn test_get_nonce_failure_keeps_state() {
        let clock = TestClock(Cell::new(0));
        let mut verifier = fsm(1, &clock, SigningConfig::DEFAULT);
        let mut nonce_msg = Message::new(1, 2, C_INTERNAL, I_GET_NONCE_RESPONSE);
        verifier.get_nonce(&mut nonce_msg).unwrap();
        let pending = *verifier.current_nonce();

        verifier.primitives_mut().fail = true;
        let mut other = Message::new(1, 3, C_INTERNAL, I_GET_NONCE_RESPONSE);
        assert_eq!(
            verifier.get_nonce(&mut other),
            Err(SigningError::DRIVER_SHA204_NO_CHIP)
        );
        assert_eq!(verifier.state(), SigningState::NoncePending);
        assert_eq!(verifier.current_nonce(), &pending);
        assert_eq!(other.header.length, 0);
    }

    #[test]
    fn test_put_nonce_while_verifying() {
        let clock = TestClock(Cell::new(0));
        let mut a = fsm(1, &clock, SigningConfig::DEFAULT);
        let mut b = fsm(2, &clock, SigningConfig::DEFAULT);

        let mut from_a = Message::new(1, 2, C_INTERNAL, I_GET_NONCE_RESPONSE);
        a.get_nonce(&mut from_a).unwrap();
        let mut from_b = Message::new(2, 1, C_INTERNAL, I_GET_NONCE_RESPONSE);
        b.get_nonce(&mut from_b).unwrap();

        assert_eq!(
            a.put_nonce(&from_b),
            Err(SigningError::SIGNING_VERIFICATION_PENDING)
        );
        clock.advance(DEFAULT_WINDOW + 1);
        assert_eq!(a.put_nonce(&from_b), Ok(()));
        assert_eq!(a.state(), SigningState::SignReady);
    }

    const DEFAULT_WINDOW: u32 = crate::config::DEFAULT_VERIFICATION_WINDOW_MS;

    #[test]
    fn test_whitelist() {
        static ENTRIES: [WhitelistEntry; 1] = [WhitelistEntry {
            node_id: 1,
            serial: [0x01, 0x23, 0, 0, 0, 0, 0, 1, 0xEE],
        }];
        let clock = TestClock(Cell::new(0));
        let signer_config = SigningConfig::DEFAULT.with_whitelist(&ENTRIES);
        let mut verifier = fsm(1, &clock, SigningConfig::DEFAULT);
        let mut impostor = fsm(9, &clock, SigningConfig::DEFAULT);
        let mut signer = fsm(2, &clock, signer_config);

        let mut nonce_msg = Message::new(1, 2, C_INTERNAL, I_GET_NONCE_RESPONSE);
        verifier.get_nonce(&mut nonce_msg).unwrap();
        assert_eq!(signer.put_nonce(&nonce_msg), Ok(()));

        // Right node id, wrong chip.
        let mut forged = Message::new(1, 2, C_INTERNAL, I_GET_NONCE_RESPONSE);
        impostor.get_nonce(&mut forged).unwrap();
        let mut signer = fsm(2, &clock, signer_config);
        assert_eq!(
            signer.put_nonce(&forged),
            Err(SigningError::SIGNING_WHITELIST_REJECT)
        );
        assert_eq!(signer.state(), SigningState::Idle);
    }

    #[test]
    fn test_put_nonce_rejects_bad_input() {
        let clock = TestClock(Cell::new(0));
        let mut signer = fsm(2, &clock, SigningConfig::DEFAULT);

        let mut msg = Message::new(1, 2, C_INTERNAL, I_GET_NONCE_RESPONSE);
        msg.set_payload(&[0u8; NONCE_SIZE]).unwrap();
        msg.set_signature(SIGNING_TAG_HMAC_SHA256, &[]);
        assert_eq!(
            signer.put_nonce(&msg),
            Err(SigningError::SIGNING_MALFORMED_NONCE)
        );

        msg.set_signature(SIGNING_TAG_NONE, &[]);
        assert_eq!(
            signer.put_nonce(&msg),
            Err(SigningError::SIGNING_SCHEME_MISMATCH)
        );
    }

    #[test]
    fn test_sign_without_nonce() {
        let clock = TestClock(Cell::new(0));
        let mut signer = fsm(2, &clock, SigningConfig::DEFAULT);
        let mut msg = reading();
        assert_eq!(
            signer.sign_msg(&mut msg),
            Err(SigningError::SIGNING_NO_NONCE)
        );
        assert_eq!(msg.signing_tag(), SIGNING_TAG_NONE);
    }
}
