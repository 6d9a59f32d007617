/*++

Licensed under the Apache-2.0 license.

File Name:

    backend.rs

Abstract:

    File contains the signing façade the transport calls: one capability set
    implemented by the ATSHA204 backend, the software backend and the
    backend that does not sign.

--*/

use crate::config::SigningConfig;
use crate::fsm::SigningFsm;
use crate::message::{Message, C_INTERNAL, I_REQUEST_SIGNING, SIGNING_TAG_NONE};
use crate::{kind_name, SigningResult};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use meshsig_drivers::{
    Atsha204, CryptoPrimitives, HexBytes, MonotonicClock, Serial, SoftAtsha204, SwiBus, SwiPhy,
    SOFT_KEY_SIZE,
};
use meshsig_kat::SoftHmacKat;
use rand_core::RngCore;

/// Operations the transport invokes around every message.
///
/// A `false` return means the message must be dropped.
pub trait Signer {
    /// Fill `msg` with a fresh nonce for the requesting peer.
    fn get_nonce(&mut self, msg: &mut Message) -> bool;

    /// Poll the replay window. False when a pending verification just
    /// expired.
    fn check_timer(&mut self) -> bool;

    /// Store the nonce a peer sent.
    fn put_nonce(&mut self, msg: &Message) -> bool;

    /// Sign `msg` with the stored nonce.
    fn sign_msg(&mut self, msg: &mut Message) -> bool;

    /// Check the signature of `msg` against the issued nonce.
    fn verify_msg(&mut self, msg: &Message) -> bool;

    /// Whether peers are asked to sign what they send here.
    fn request_signatures(&self) -> bool;

    /// Build the internal message that advertises [`Signer::request_signatures`]
    /// to `destination`.
    fn presentation(&self, sender: u8, destination: u8) -> Message {
        let mut msg = Message::new(sender, destination, C_INTERNAL, I_REQUEST_SIGNING);
        msg.payload[0] = u8::from(self.request_signatures());
        msg.header.length = 1;
        msg
    }
}

fn report(op: &str, result: SigningResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            sig_debug!(
                "signing: {} failed: {} {}",
                op,
                kind_name(err.kind()),
                HexBytes(&u32::from(err).to_be_bytes())
            );
            false
        }
    }
}

impl<P: CryptoPrimitives, C: MonotonicClock> Signer for SigningFsm<P, C> {
    fn get_nonce(&mut self, msg: &mut Message) -> bool {
        report("get_nonce", SigningFsm::get_nonce(self, msg))
    }

    fn check_timer(&mut self) -> bool {
        let alive = SigningFsm::check_timer(self);
        if !alive {
            sig_debug!("signing: verification window expired");
        }
        alive
    }

    fn put_nonce(&mut self, msg: &Message) -> bool {
        report("put_nonce", SigningFsm::put_nonce(self, msg))
    }

    fn sign_msg(&mut self, msg: &mut Message) -> bool {
        report("sign_msg", SigningFsm::sign_msg(self, msg))
    }

    fn verify_msg(&mut self, msg: &Message) -> bool {
        report("verify_msg", SigningFsm::verify_msg(self, msg))
    }

    fn request_signatures(&self) -> bool {
        self.config().request_signatures
    }
}

/// Backend for nodes built without signing. Leaves messages unsigned and
/// accepts whatever it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSigning;

impl Signer for NoSigning {
    fn get_nonce(&mut self, msg: &mut Message) -> bool {
        msg.header.length = 0;
        msg.set_signature(SIGNING_TAG_NONE, &[]);
        true
    }

    fn check_timer(&mut self) -> bool {
        true
    }

    fn put_nonce(&mut self, _msg: &Message) -> bool {
        true
    }

    fn sign_msg(&mut self, msg: &mut Message) -> bool {
        msg.set_signature(SIGNING_TAG_NONE, &[]);
        true
    }

    fn verify_msg(&mut self, _msg: &Message) -> bool {
        true
    }

    /// A node that cannot verify never asks for signatures.
    fn request_signatures(&self) -> bool {
        false
    }
}

/// The signing backend selected for this node.
pub enum SigningBackend<B, R, C> {
    /// Keys and random numbers from an ATSHA204 on the single-wire bus.
    Atsha204(SigningFsm<Atsha204<B>, C>),

    /// The same scheme computed in software with a provisioned key.
    Software(SigningFsm<SoftAtsha204<R>, C>),

    None(NoSigning),
}

impl<B: SwiBus, R: RngCore, C: MonotonicClock> SigningBackend<B, R, C> {
    /// Backend on an ATSHA204 reached through `bus`.
    pub fn atsha204(bus: B, clock: C, config: SigningConfig) -> SigningResult<Self> {
        let fsm = SigningFsm::new(Atsha204::new(bus), clock, config)?;
        Ok(Self::Atsha204(fsm))
    }

    /// Software backend. Runs the HMAC self test before use.
    pub fn software(
        key: [u8; SOFT_KEY_SIZE],
        serial: Serial,
        rng: R,
        clock: C,
        config: SigningConfig,
    ) -> SigningResult<Self> {
        SoftHmacKat::default().execute()?;
        let fsm = SigningFsm::new(SoftAtsha204::new(key, serial, rng), clock, config)?;
        Ok(Self::Software(fsm))
    }

    pub fn none() -> Self {
        Self::None(NoSigning)
    }

    fn signer(&self) -> &dyn Signer {
        match self {
            Self::Atsha204(fsm) => fsm,
            Self::Software(fsm) => fsm,
            Self::None(none) => none,
        }
    }

    fn signer_mut(&mut self) -> &mut dyn Signer {
        match self {
            Self::Atsha204(fsm) => fsm,
            Self::Software(fsm) => fsm,
            Self::None(none) => none,
        }
    }
}

impl<P, D, R, C> SigningBackend<SwiPhy<P, D>, R, C>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    R: RngCore,
    C: MonotonicClock,
{
    /// Backend on an ATSHA204 whose IO line is `pin`.
    pub fn atsha204_on_pin(
        pin: P,
        delay: D,
        clock: C,
        config: SigningConfig,
    ) -> SigningResult<Self> {
        Self::atsha204(SwiPhy::new(pin, delay), clock, config)
    }
}

impl<B: SwiBus, R: RngCore, C: MonotonicClock> Signer for SigningBackend<B, R, C> {
    fn get_nonce(&mut self, msg: &mut Message) -> bool {
        self.signer_mut().get_nonce(msg)
    }

    fn check_timer(&mut self) -> bool {
        self.signer_mut().check_timer()
    }

    fn put_nonce(&mut self, msg: &Message) -> bool {
        self.signer_mut().put_nonce(msg)
    }

    fn sign_msg(&mut self, msg: &mut Message) -> bool {
        self.signer_mut().sign_msg(msg)
    }

    fn verify_msg(&mut self, msg: &Message) -> bool {
        self.signer_mut().verify_msg(msg)
    }

    fn request_signatures(&self) -> bool {
        self.signer().request_signatures()
    }
}
