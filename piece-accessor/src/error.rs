use std::sync::Arc;

use crate::types::{PieceCid, RegisteredSealProof, SectorNumber};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the accessor, the fetcher and the recovery procedure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("remote store endpoint is not configured (set {0})")]
    MissingEndpoint(&'static str),
    #[error("invalid remote store endpoint {0:?}: {1}")]
    InvalidEndpoint(String, String),
    #[error("archive not found: {0}")]
    NotFound(String),
    #[error("permission denied fetching {0}")]
    PermissionDenied(String),
    #[error("fetching {url} failed with status {status}")]
    FetchFailed { url: String, status: u16 },
    #[error("fetching {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("operation cancelled")]
    Cancelled,
    #[error("no storage deals found for piece {0}")]
    NoDeals(PieceCid),
    #[error("sector {0} holds no pieces")]
    EmptySector(SectorNumber),
    #[error("no sector numbers supplied")]
    NoSectors,
    #[error("unsupported seal proof type {0:?}")]
    UnsupportedProof(RegisteredSealProof),
    #[error("invalid actor address {0:?}: {1}")]
    InvalidAddress(String, #[source] fvm_shared::address::Error),
    #[error(transparent)]
    Barrier(Arc<Error>),
    #[error("failed to fetch piece info for piece {cid}: {source}")]
    PieceStore {
        cid: PieceCid,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to get status of sector {sector}: {source}")]
    SectorStatus {
        sector: SectorNumber,
        #[source]
        source: anyhow::Error,
    },
    #[error("storage node request failed: {0}")]
    Node(#[source] anyhow::Error),
    #[error("sealing pipeline failed: {0}")]
    Sealing(#[source] anyhow::Error),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Configuration errors are fatal; retrying the same call cannot succeed.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::MissingEndpoint(_) | Error::InvalidEndpoint(..))
    }

    pub(crate) fn io<C: Into<String>>(context: C) -> impl FnOnce(std::io::Error) -> Error {
        let context = context.into();
        move |source| Error::Io { context, source }
    }
}
