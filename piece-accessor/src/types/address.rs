pub use fvm_shared::address::Address;
use fvm_shared::address::Network;

use crate::error::{Error, Result};
use crate::types::ActorID;

/// Parses an actor address of either network (`f…` on mainnet, `t…` on testnets).
pub fn parse_address(s: &str) -> Result<Address> {
    let network = if s.starts_with('t') {
        Network::Testnet
    } else {
        Network::Mainnet
    };
    network
        .parse_address(s)
        .map_err(|e| Error::InvalidAddress(s.to_string(), e))
}

/// The numeric actor ID behind an ID address.
pub fn actor_id(address: &Address) -> Result<ActorID> {
    address
        .id()
        .map_err(|e| Error::InvalidAddress(address.to_string(), e))
}
