use std::fmt;

pub use fvm_shared::clock::ChainEpoch;
pub use fvm_shared::sector::{RegisteredSealProof, SectorNumber, SectorSize};
pub use fvm_shared::ActorID;

use crate::error::{Error, Result};
use crate::types::{PaddedBytesAmount, UnpaddedBytesAmount};

/// Resolves a seal proof code as the chain reports it.
pub fn seal_proof_from_code(code: i64) -> Result<RegisteredSealProof> {
    match RegisteredSealProof::from(code) {
        proof @ RegisteredSealProof::Invalid(_) => Err(Error::UnsupportedProof(proof)),
        proof => Ok(proof),
    }
}

/// Size of the sectors sealed with `proof`.
pub fn sector_size(proof: RegisteredSealProof) -> Result<SectorSize> {
    proof
        .sector_size()
        .map_err(|_| Error::UnsupportedProof(proof))
}

impl From<SectorSize> for PaddedBytesAmount {
    fn from(x: SectorSize) -> Self {
        PaddedBytesAmount(x as u64)
    }
}

impl From<SectorSize> for UnpaddedBytesAmount {
    fn from(x: SectorSize) -> Self {
        UnpaddedBytesAmount::from(PaddedBytesAmount::from(x))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectorId {
    pub miner: ActorID,
    pub number: SectorNumber,
}

impl SectorId {
    /// The name sector files are stored under, e.g. `s-t01000-7`.
    pub fn file_name(&self) -> String {
        format!("s-t0{}-{}", self.miner, self.number)
    }
}

impl fmt::Display for SectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Everything the sealing pipeline needs to know to address a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRef {
    pub id: SectorId,
    pub proof_type: RegisteredSealProof,
}

impl SectorRef {
    pub fn sector_size(&self) -> Result<SectorSize> {
        sector_size(self.proof_type)
    }
}
