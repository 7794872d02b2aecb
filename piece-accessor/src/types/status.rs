use num_bigint::BigInt;

use crate::types::{ChainEpoch, Piece, RegisteredSealProof, SectorNumber};

/// Snapshot of a sector as the storage node sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorStatus {
    pub sector: SectorNumber,
    pub pieces: Vec<Piece>,
    pub seal_proof: RegisteredSealProof,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    pub deal_weight: BigInt,
    pub verified_deal_weight: BigInt,
    pub initial_pledge: BigInt,
    pub on_time: ChainEpoch,
    pub early: ChainEpoch,
}

impl SectorStatus {
    /// A local-tier snapshot with no chain-derived fields set.
    pub fn new(sector: SectorNumber, seal_proof: RegisteredSealProof, pieces: Vec<Piece>) -> Self {
        SectorStatus {
            sector,
            pieces,
            seal_proof,
            activation: 0,
            expiration: 0,
            deal_weight: BigInt::default(),
            verified_deal_weight: BigInt::default(),
            initial_pledge: BigInt::default(),
            on_time: 0,
            early: 0,
        }
    }

    fn overlay_info(&mut self, info: OnChainSectorInfo) {
        self.seal_proof = info.seal_proof;
        self.activation = info.activation;
        self.expiration = info.expiration;
        self.deal_weight = info.deal_weight;
        self.verified_deal_weight = info.verified_deal_weight;
        self.initial_pledge = info.initial_pledge;
    }

    fn overlay_expiration(&mut self, expiration: SectorExpiration) {
        self.on_time = expiration.on_time;
        self.early = expiration.early;
    }
}

/// Sector fields as recorded on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainSectorInfo {
    pub seal_proof: RegisteredSealProof,
    pub activation: ChainEpoch,
    pub expiration: ChainEpoch,
    pub deal_weight: BigInt,
    pub verified_deal_weight: BigInt,
    pub initial_pledge: BigInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorExpiration {
    pub on_time: ChainEpoch,
    pub early: ChainEpoch,
}

/// How much of the on-chain tier made it into a [`SectorStatusReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOverlay {
    /// Only the local tier was asked for.
    NotRequested,
    /// Sector info and expiration both came from the chain.
    Applied,
    /// The oracle does not know the sector; the local tier stands.
    NotOnChain,
    /// Sector info was applied but the expiration lookup failed.
    Partial(String),
    /// The oracle could not be reached; the local tier stands.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorStatusReport {
    pub status: SectorStatus,
    pub chain: ChainOverlay,
}

impl SectorStatusReport {
    pub fn local(status: SectorStatus) -> Self {
        SectorStatusReport {
            status,
            chain: ChainOverlay::NotRequested,
        }
    }

    /// Overlays on-chain sector info; `None` means the sector is not on chain.
    pub(crate) fn with_chain_info(
        mut status: SectorStatus,
        info: Option<OnChainSectorInfo>,
        expiration: impl FnOnce() -> anyhow::Result<SectorExpiration>,
    ) -> Self {
        let info = match info {
            Some(info) => info,
            None => {
                return SectorStatusReport {
                    status,
                    chain: ChainOverlay::NotOnChain,
                }
            }
        };
        status.overlay_info(info);

        let chain = match expiration() {
            Ok(expiration) => {
                status.overlay_expiration(expiration);
                ChainOverlay::Applied
            }
            Err(err) => ChainOverlay::Partial(format!("{:#}", err)),
        };

        SectorStatusReport { status, chain }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self.chain, ChainOverlay::Applied | ChainOverlay::Partial(_))
    }
}
