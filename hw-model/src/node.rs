/*++

Licensed under the Apache-2.0 license.

File Name:

    node.rs

Abstract:

    File contains a mesh node under test: a signing backend wired to its own
    emulated chip and virtual clock.

--*/

use std::cell::{Cell, Ref, RefMut};
use std::error::Error;
use std::rc::Rc;

use meshsig_drivers::SwiPhy;
use meshsig_emu_periph::Atsha204Chip;
use meshsig_signing::{Message, Signer, SigningBackend};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::pins::{EmuDelay, EmuPin, ModelClock};
use crate::{new_wire, BackendKind, InitParams, SharedWire};

pub type NodeBackend = SigningBackend<SwiPhy<EmuPin, EmuDelay>, StdRng, ModelClock>;

pub struct Node {
    id: u8,
    wire: SharedWire,
    stuck_high: Rc<Cell<bool>>,
    backend: NodeBackend,
}

impl Node {
    pub fn init(params: InitParams) -> Result<Self, Box<dyn Error>> {
        let wire = new_wire(params.chip.clone());
        let pin = EmuPin::new(wire.clone());
        let stuck_high = pin.stuck_high();
        let clock = ModelClock::new(wire.clone());

        let backend = match params.backend {
            BackendKind::Atsha204 => NodeBackend::atsha204_on_pin(
                pin,
                EmuDelay::new(wire.clone()),
                clock,
                params.config,
            ),
            BackendKind::Software => NodeBackend::software(
                params.chip.key,
                params.chip.serial,
                StdRng::seed_from_u64(params.chip.rng_seed),
                clock,
                params.config,
            ),
            BackendKind::None => Ok(NodeBackend::none()),
        }
        .map_err(|err| format!("signing backend init failed: {err:?}"))?;

        Ok(Self {
            id: params.node_id,
            wire,
            stuck_high,
            backend,
        })
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn backend(&mut self) -> &mut NodeBackend {
        &mut self.backend
    }

    /// Message from this node to `destination`.
    pub fn message(&self, destination: u8, command: u8, msg_type: u8) -> Message {
        Message::new(self.id, destination, command, msg_type)
    }

    pub fn chip(&self) -> Ref<'_, Atsha204Chip> {
        Ref::map(self.wire.borrow(), |wire| wire.chip())
    }

    pub fn chip_mut(&self) -> RefMut<'_, Atsha204Chip> {
        RefMut::map(self.wire.borrow_mut(), |wire| wire.chip_mut())
    }

    /// Short the IO line high, or release it.
    pub fn hold_line_high(&self, stuck: bool) {
        self.stuck_high.set(stuck);
    }

    /// Let virtual time pass.
    pub fn advance_ms(&self, ms: u64) {
        self.wire.borrow_mut().advance_ns(ms * 1_000_000);
    }

    pub fn now_ms(&self) -> u64 {
        self.wire.borrow().now_ns() / 1_000_000
    }
}

impl Signer for Node {
    fn get_nonce(&mut self, msg: &mut Message) -> bool {
        self.backend.get_nonce(msg)
    }

    fn check_timer(&mut self) -> bool {
        self.backend.check_timer()
    }

    fn put_nonce(&mut self, msg: &Message) -> bool {
        self.backend.put_nonce(msg)
    }

    fn sign_msg(&mut self, msg: &mut Message) -> bool {
        self.backend.sign_msg(msg)
    }

    fn verify_msg(&mut self, msg: &Message) -> bool {
        self.backend.verify_msg(msg)
    }

    fn request_signatures(&self) -> bool {
        self.backend.request_signatures()
    }
}
