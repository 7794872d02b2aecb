use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, ensure, Result};
use cid::multihash::Multihash;
use cid::Cid;

use crate::types::{PaddedBytesAmount, SectorNumber, UnpaddedBytesAmount};

/// Multicodec of an unsealed-data commitment (CommP / CommD).
pub const FIL_COMMITMENT_UNSEALED: u64 = 0xf101;
/// Multihash code of the 254-bit-truncated, padded SHA-256 tree.
pub const SHA2_256_TRUNC254_PADDED: u64 = 0x1012;

/// Raw 32-byte piece commitment.
pub type Commitment = [u8; 32];

/// Content identifier of a piece: the only key used to locate its remote archive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceCid(Cid);

impl PieceCid {
    pub fn new(cid: Cid) -> Self {
        PieceCid(cid)
    }

    /// Wraps a raw piece commitment into its piece CID.
    pub fn from_commitment(commitment: &Commitment) -> Result<Self> {
        let hash = Multihash::<64>::wrap(SHA2_256_TRUNC254_PADDED, commitment)
            .map_err(|e| anyhow!("failed to wrap commitment: {}", e))?;
        Ok(PieceCid(Cid::new_v1(FIL_COMMITMENT_UNSEALED, hash)))
    }

    /// Extracts the raw commitment, if this CID carries one.
    pub fn commitment(&self) -> Result<Commitment> {
        ensure!(
            self.0.codec() == FIL_COMMITMENT_UNSEALED,
            "{} is not an unsealed commitment",
            self.0
        );
        let hash = self.0.hash();
        ensure!(
            hash.code() == SHA2_256_TRUNC254_PADDED && hash.digest().len() == 32,
            "{} does not carry a truncated sha256 digest",
            self.0
        );

        let mut commitment = [0u8; 32];
        commitment.copy_from_slice(hash.digest());
        Ok(commitment)
    }

    pub fn cid(&self) -> &Cid {
        &self.0
    }
}

impl From<Cid> for PieceCid {
    fn from(cid: Cid) -> Self {
        PieceCid(cid)
    }
}

impl FromStr for PieceCid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Cid::try_from(s)
            .map(PieceCid)
            .map_err(|e| anyhow!("invalid piece cid {:?}: {}", s, e))
    }
}

impl fmt::Display for PieceCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for PieceCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PieceCid({})", self.0)
    }
}

/// The deal a piece in a sector was onboarded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealRef {
    pub deal_id: u64,
    pub start_epoch: i64,
    pub end_epoch: i64,
}

/// A piece as recorded in a sector; the order of pieces within a sector is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub piece_cid: PieceCid,
    pub size: PaddedBytesAmount,
    pub deal: Option<DealRef>,
}

impl Piece {
    pub fn unpadded_size(&self) -> UnpaddedBytesAmount {
        self.size.into()
    }
}

/// Result of ingesting a piece into the sealing pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceInfo {
    pub piece_cid: PieceCid,
    pub size: PaddedBytesAmount,
}

/// One deal referencing a piece, as held by the local piece index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealInfo {
    pub deal_id: u64,
    pub sector: SectorNumber,
    pub offset: PaddedBytesAmount,
    pub length: PaddedBytesAmount,
}

/// Deal metadata for a piece, as held by the local piece index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceStoreInfo {
    pub piece_cid: PieceCid,
    pub deals: Vec<DealInfo>,
}
