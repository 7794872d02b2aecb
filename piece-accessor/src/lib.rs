#![deny(clippy::all, clippy::perf, clippy::correctness, rust_2018_idioms)]
#![warn(clippy::unwrap_used)]

//! A storage node's piece retrieval path, served from a remote archive store instead of
//! local sealed sectors.

pub mod accessor;
pub mod cancel;
pub mod error;
pub mod fetcher;
pub mod interfaces;
pub mod locator;
pub mod readiness;
pub mod recovery;
pub mod settings;
pub mod throttle;
pub mod types;

pub use accessor::{MinerApi, RemoteMinerApi, RemoteSectorAccessor, SectorAccessor};
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use fetcher::{ArchiveFetcher, ArchiveReader};
pub use interfaces::{MinerNode, PieceStore, SealingPipeline, SectorStatusProvider, StateOracle};
pub use locator::PieceLocator;
pub use readiness::ReadyBarrier;
pub use recovery::{
    recover_sector, recover_sectors, ArchiveSource, LocalArchive, RecoveredSector,
    RecoveryParams, RemoteArchive,
};
pub use settings::{RemoteStoreConfig, Settings, SETTINGS};
pub use throttle::{Permit, Throttle};
