use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::interfaces::{SectorStatusProvider, StateOracle};
use crate::types::{
    Address, ChainOverlay, Piece, SectorNumber, SectorStatusReport, UnpaddedByteIndex,
};

/// Finds the piece a sector-addressed read refers to.
pub struct PieceLocator {
    miner: Address,
    sectors: Arc<dyn SectorStatusProvider>,
    oracle: Arc<dyn StateOracle>,
}

impl PieceLocator {
    pub fn new(
        miner: Address,
        sectors: Arc<dyn SectorStatusProvider>,
        oracle: Arc<dyn StateOracle>,
    ) -> Self {
        PieceLocator {
            miner,
            sectors,
            oracle,
        }
    }

    pub fn miner(&self) -> &Address {
        &self.miner
    }

    /// Picks the piece at `piece_offset` within `sector` from its local status.
    pub fn locate(&self, sector: SectorNumber, piece_offset: UnpaddedByteIndex) -> Result<Piece> {
        let report = self.status_of(sector, false)?;
        let pieces = report.status.pieces;
        if pieces.len() > 2 {
            warn!(
                "sector {} holds {} pieces; only the first two are addressable",
                sector,
                pieces.len()
            );
        }

        let piece = select_piece(&pieces, piece_offset)
            .cloned()
            .ok_or(Error::EmptySector(sector))?;
        debug!(
            "sector {} offset {} resolved to piece {}",
            sector, piece_offset.0, piece.piece_cid
        );
        Ok(piece)
    }

    /// Local sector status, overlaid with on-chain state when `include_on_chain` is set.
    ///
    /// Only the local lookup can fail; an unreachable oracle leaves the local snapshot in
    /// place and is reported through [`ChainOverlay::Unavailable`].
    pub fn status_of(
        &self,
        sector: SectorNumber,
        include_on_chain: bool,
    ) -> Result<SectorStatusReport> {
        let status = self
            .sectors
            .sectors_status(sector)
            .map_err(|source| Error::SectorStatus { sector, source })?;

        if !include_on_chain {
            return Ok(SectorStatusReport::local(status));
        }

        let info = match self.oracle.sector_info(&self.miner, sector) {
            Ok(info) => info,
            Err(err) => {
                warn!("on-chain info for sector {} unavailable: {:#}", sector, err);
                return Ok(SectorStatusReport {
                    status,
                    chain: ChainOverlay::Unavailable(format!("{:#}", err)),
                });
            }
        };

        let report = SectorStatusReport::with_chain_info(status, info, || {
            self.oracle.sector_expiration(&self.miner, sector)
        });
        if let ChainOverlay::Partial(reason) = &report.chain {
            warn!("expiration of sector {} unavailable: {}", sector, reason);
        }
        Ok(report)
    }
}

/// Slot 1 when the offset is past the start and a second piece exists, otherwise slot 0.
pub fn select_piece(pieces: &[Piece], piece_offset: UnpaddedByteIndex) -> Option<&Piece> {
    match pieces {
        [_, second, ..] if piece_offset.0 > 0 => Some(second),
        _ => pieces.first(),
    }
}
