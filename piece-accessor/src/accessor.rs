use std::io::Read;
use std::sync::Arc;

use log::{debug, info};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::fetcher::{ArchiveFetcher, ArchiveReader};
use crate::interfaces::PieceStore;
use crate::locator::PieceLocator;
use crate::readiness::ReadyBarrier;
use crate::settings::{RemoteStoreConfig, Settings};
use crate::throttle::Throttle;
use crate::types::{PieceCid, SectorNumber, UnpaddedByteIndex, UnpaddedBytesAmount};

/// Content-addressed access to unsealed pieces.
pub trait MinerApi: Send + Sync {
    fn fetch_unsealed_piece(&self, piece_cid: &PieceCid, cancel: &CancelToken)
        -> Result<ArchiveReader>;

    fn get_unpadded_car_size(&self, piece_cid: &PieceCid) -> Result<u64>;

    fn is_unsealed(&self, piece_cid: &PieceCid) -> Result<bool>;

    /// Marks the accessor ready. Must be called exactly once.
    fn start(&self) -> Result<()>;
}

/// Sector-addressed access to unsealed pieces.
pub trait SectorAccessor: Send + Sync {
    fn unseal_sector_at(
        &self,
        sector: SectorNumber,
        piece_offset: UnpaddedByteIndex,
        length: UnpaddedBytesAmount,
        cancel: &CancelToken,
    ) -> Result<ArchiveReader>;

    /// Like [`SectorAccessor::unseal_sector_at`], for callers that only stream.
    fn unseal_sector(
        &self,
        sector: SectorNumber,
        piece_offset: UnpaddedByteIndex,
        length: UnpaddedBytesAmount,
        cancel: &CancelToken,
    ) -> Result<Box<dyn Read + Send>> {
        let reader = self.unseal_sector_at(sector, piece_offset, length, cancel)?;
        Ok(Box::new(reader))
    }

    fn is_unsealed(
        &self,
        sector: SectorNumber,
        offset: UnpaddedByteIndex,
        length: UnpaddedBytesAmount,
    ) -> Result<bool>;
}

/// Serves every piece from the remote archive store.
pub struct RemoteMinerApi {
    piece_store: Arc<dyn PieceStore>,
    sectors: Arc<dyn SectorAccessor>,
    fetcher: ArchiveFetcher,
    throttle: Throttle,
    ready: ReadyBarrier,
}

impl RemoteMinerApi {
    pub fn new(
        piece_store: Arc<dyn PieceStore>,
        sectors: Arc<dyn SectorAccessor>,
        fetcher: ArchiveFetcher,
        fetch_concurrency: usize,
    ) -> Self {
        RemoteMinerApi {
            piece_store,
            sectors,
            fetcher,
            throttle: Throttle::from_concurrency(fetch_concurrency),
            ready: ReadyBarrier::new(),
        }
    }

    pub fn with_settings(
        settings: &Settings,
        piece_store: Arc<dyn PieceStore>,
        sectors: Arc<dyn SectorAccessor>,
    ) -> Result<Self> {
        let fetcher = ArchiveFetcher::new(RemoteStoreConfig::from_settings(settings)?)?;
        Ok(Self::new(
            piece_store,
            sectors,
            fetcher,
            settings.fetch_concurrency,
        ))
    }

    /// The sector-addressed half of the accessor.
    pub fn sectors(&self) -> &Arc<dyn SectorAccessor> {
        &self.sectors
    }

    pub fn ready(&self) -> &ReadyBarrier {
        &self.ready
    }
}

impl MinerApi for RemoteMinerApi {
    fn fetch_unsealed_piece(
        &self,
        piece_cid: &PieceCid,
        cancel: &CancelToken,
    ) -> Result<ArchiveReader> {
        self.ready.await_ready()?;

        let _permit = self.throttle.acquire(cancel)?;
        debug!("fetching unsealed piece {}", piece_cid);
        self.fetcher.fetch(piece_cid, cancel)
    }

    fn get_unpadded_car_size(&self, piece_cid: &PieceCid) -> Result<u64> {
        self.ready.await_ready()?;

        let info = self
            .piece_store
            .get_piece_info(piece_cid)
            .map_err(|source| Error::PieceStore {
                cid: *piece_cid,
                source,
            })?;

        info.deals
            .first()
            .map(|deal| u64::from(deal.length))
            .ok_or(Error::NoDeals(*piece_cid))
    }

    fn is_unsealed(&self, _piece_cid: &PieceCid) -> Result<bool> {
        Ok(true)
    }

    fn start(&self) -> Result<()> {
        info!("remote piece accessor ready");
        self.ready.fire_ready(Ok(()));
        Ok(())
    }
}

/// Resolves sector reads to a piece, then fetches that piece's archive.
pub struct RemoteSectorAccessor {
    locator: PieceLocator,
    fetcher: ArchiveFetcher,
    throttle: Throttle,
}

impl RemoteSectorAccessor {
    pub fn new(locator: PieceLocator, fetcher: ArchiveFetcher, unseal_concurrency: usize) -> Self {
        RemoteSectorAccessor {
            locator,
            fetcher,
            throttle: Throttle::from_concurrency(unseal_concurrency),
        }
    }

    pub fn with_settings(settings: &Settings, locator: PieceLocator) -> Result<Self> {
        let fetcher = ArchiveFetcher::new(RemoteStoreConfig::from_settings(settings)?)?;
        Ok(Self::new(locator, fetcher, settings.unseal_concurrency))
    }

    pub fn locator(&self) -> &PieceLocator {
        &self.locator
    }
}

impl SectorAccessor for RemoteSectorAccessor {
    fn unseal_sector_at(
        &self,
        sector: SectorNumber,
        piece_offset: UnpaddedByteIndex,
        length: UnpaddedBytesAmount,
        cancel: &CancelToken,
    ) -> Result<ArchiveReader> {
        debug!(
            "get sector {}, piece offset {}, length {}",
            sector, piece_offset.0, length.0
        );

        let piece = self.locator.locate(sector, piece_offset)?;
        let _permit = self.throttle.acquire(cancel)?;
        self.fetcher.fetch(&piece.piece_cid, cancel)
    }

    fn is_unsealed(
        &self,
        _sector: SectorNumber,
        _offset: UnpaddedByteIndex,
        _length: UnpaddedBytesAmount,
    ) -> Result<bool> {
        Ok(true)
    }
}
