//! Collaborators the accessor and the recovery procedure consume but do not implement.

use std::io::Read;

use anyhow::Result;

use crate::types::{
    Address, OnChainSectorInfo, PieceCid, PieceInfo, PieceStoreInfo, SectorExpiration,
    SectorNumber, SectorRef, SectorStatus, UnpaddedBytesAmount,
};

/// The local piece index: deal metadata keyed by piece CID.
pub trait PieceStore: Send + Sync {
    fn get_piece_info(&self, piece_cid: &PieceCid) -> Result<PieceStoreInfo>;
}

/// Local (off-chain) sector state as the storage node tracks it.
pub trait SectorStatusProvider: Send + Sync {
    fn sectors_status(&self, sector: SectorNumber) -> Result<SectorStatus>;
}

/// On-chain sector state.
pub trait StateOracle: Send + Sync {
    /// `None` when the sector is not on chain.
    fn sector_info(
        &self,
        miner: &Address,
        sector: SectorNumber,
    ) -> Result<Option<OnChainSectorInfo>>;

    fn sector_expiration(
        &self,
        miner: &Address,
        sector: SectorNumber,
    ) -> Result<SectorExpiration>;
}

/// The storage node as the recovery procedure sees it.
pub trait MinerNode: SectorStatusProvider {
    fn actor_address(&self) -> Result<Address>;
}

/// The sealing pipeline's piece-ingestion entry point.
pub trait SealingPipeline {
    /// Reads `piece_size` unpadded bytes from `source` into `sector`, after the pieces
    /// already there, and returns the piece commitment.
    fn add_piece(
        &self,
        sector: &SectorRef,
        existing_piece_sizes: &[UnpaddedBytesAmount],
        piece_size: UnpaddedBytesAmount,
        source: &mut dyn Read,
    ) -> Result<PieceInfo>;
}
