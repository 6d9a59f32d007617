/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the hardware model used by tests: adapters that let the
    signing drivers run against the emulated ATSHA204 in virtual time.

--*/

use std::cell::RefCell;
use std::rc::Rc;

use meshsig_emu_periph::{Atsha204Chip, Atsha204Params, SwiWire};
use meshsig_signing::SigningConfig;

mod model_bus;
mod node;
mod pins;

pub use model_bus::ModelBus;
pub use node::{Node, NodeBackend};
pub use pins::{EmuDelay, EmuPin, ModelClock};

/// Wire shared between the pin, the delay provider and the clock of one node.
pub type SharedWire = Rc<RefCell<SwiWire>>;

/// Create a wire with a freshly provisioned chip on it.
pub fn new_wire(chip: Atsha204Params) -> SharedWire {
    Rc::new(RefCell::new(SwiWire::new(Atsha204Chip::new(chip))))
}

/// Which signing backend a [`Node`] runs.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum BackendKind {
    /// ATSHA204 on the emulated wire, driven through the bit-banged phy
    #[default]
    Atsha204,

    /// Software primitives provisioned with the chip's key and serial
    Software,

    /// No signing
    None,
}

#[derive(Debug, Clone)]
pub struct InitParams {
    // Node id on the mesh
    pub node_id: u8,

    // Provisioning of the node's chip. The software backend uses the same key,
    // serial and seed.
    pub chip: Atsha204Params,

    pub config: SigningConfig,

    pub backend: BackendKind,
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            node_id: 0,
            chip: Atsha204Params::default(),
            config: SigningConfig::DEFAULT,
            backend: BackendKind::default(),
        }
    }
}
