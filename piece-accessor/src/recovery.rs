//! Rebuilds a sector's unsealed data by streaming its piece archive back through the
//! sealing pipeline.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use fr32::Fr32UnpadReader;
use log::{info, warn};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::fetcher::ArchiveFetcher;
use crate::interfaces::{MinerNode, SealingPipeline};
use crate::settings::DEFAULT_ARCHIVE_EXTENSION;
use crate::types::{
    actor_id, sector_size, PaddedBytesAmount, PieceCid, PieceInfo, SectorId, SectorNumber,
    SectorRef, UnpaddedBytesAmount,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryParams {
    /// Recovered in order; the first failure stops the run.
    pub sectors: Vec<SectorNumber>,
    /// Parent of the per-sector scratch directories. A leading `~` is expanded.
    pub staging_path: PathBuf,
    /// Keep the scratch directory of a failed sector for inspection.
    pub keep_on_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredSector {
    pub sector: SectorNumber,
    pub piece: PieceInfo,
    /// Holds the rebuilt unsealed sector.
    pub scratch_dir: PathBuf,
}

/// Where a piece's archive bytes come from.
pub trait ArchiveSource {
    fn open(&self, piece_cid: &PieceCid) -> Result<Box<dyn Read + '_>>;
}

/// Archives on local disk: either one archive file, or a directory of `<cid>.<ext>` files.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    path: PathBuf,
    extension: String,
}

impl LocalArchive {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        LocalArchive {
            path: path.into(),
            extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
        }
    }

    pub fn with_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = extension.into();
        self
    }

    fn archive_path(&self, piece_cid: &PieceCid) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{}.{}", piece_cid, self.extension))
        } else {
            self.path.clone()
        }
    }
}

impl ArchiveSource for LocalArchive {
    fn open(&self, piece_cid: &PieceCid) -> Result<Box<dyn Read + '_>> {
        let path = self.archive_path(piece_cid);
        info!("reading archive of piece {} from {:?}", piece_cid, path);
        let file = File::open(&path)
            .map_err(Error::io(format!("failed to open archive {:?}", path)))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Archives fetched from the remote store.
#[derive(Debug, Clone)]
pub struct RemoteArchive {
    fetcher: ArchiveFetcher,
    cancel: CancelToken,
}

impl RemoteArchive {
    pub fn new(fetcher: ArchiveFetcher) -> Self {
        RemoteArchive {
            fetcher,
            cancel: CancelToken::new(),
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

impl ArchiveSource for RemoteArchive {
    fn open(&self, piece_cid: &PieceCid) -> Result<Box<dyn Read + '_>> {
        let reader = self.fetcher.fetch(piece_cid, &self.cancel)?;
        Ok(Box::new(reader))
    }
}

/// Recovers every sector in `params`, stopping at the first failure.
///
/// `new_sealer` builds a sealing pipeline rooted at a sector's scratch directory.
pub fn recover_sectors<N, A, F, S>(
    node: &N,
    archive: &A,
    params: &RecoveryParams,
    new_sealer: F,
) -> Result<Vec<RecoveredSector>>
where
    N: MinerNode + ?Sized,
    A: ArchiveSource + ?Sized,
    F: Fn(&Path) -> anyhow::Result<S>,
    S: SealingPipeline,
{
    if params.sectors.is_empty() {
        return Err(Error::NoSectors);
    }

    params
        .sectors
        .iter()
        .map(|&sector| recover_sector(node, archive, params, sector, &new_sealer))
        .collect()
}

pub fn recover_sector<N, A, F, S>(
    node: &N,
    archive: &A,
    params: &RecoveryParams,
    sector: SectorNumber,
    new_sealer: F,
) -> Result<RecoveredSector>
where
    N: MinerNode + ?Sized,
    A: ArchiveSource + ?Sized,
    F: Fn(&Path) -> anyhow::Result<S>,
    S: SealingPipeline,
{
    info!("recover_sector:start: sector {}", sector);

    let status = node
        .sectors_status(sector)
        .map_err(|source| Error::SectorStatus { sector, source })?;

    let staging = expand_home(&params.staging_path);
    fs::create_dir_all(&staging)
        .map_err(Error::io(format!("failed to create staging path {:?}", staging)))?;
    let scratch = tempfile::Builder::new()
        .prefix(&format!("recover-{}", sector))
        .tempdir_in(&staging)
        .map_err(Error::io(format!("failed to create scratch dir in {:?}", staging)))?;

    let result = (|| -> Result<PieceInfo> {
        let sealer = new_sealer(scratch.path()).map_err(Error::Sealing)?;

        let sector_size = sector_size(status.seal_proof)?;
        let padded_size = PaddedBytesAmount::from(sector_size);
        let unpadded_size = UnpaddedBytesAmount::from(sector_size);

        let piece = status.pieces.first().ok_or(Error::EmptySector(sector))?;
        let source = archive.open(&piece.piece_cid)?;
        // Short archives are zero-filled up to the full piece size.
        let mut data = Fr32UnpadReader::new(source, u64::from(padded_size))
            .chain(io::repeat(0))
            .take(u64::from(unpadded_size));

        let address = node.actor_address().map_err(Error::Node)?;
        let miner = actor_id(&address)?;
        let sector_ref = SectorRef {
            id: SectorId {
                miner,
                number: status.sector,
            },
            proof_type: status.seal_proof,
        };

        sealer
            .add_piece(&sector_ref, &[], unpadded_size, &mut data)
            .map_err(Error::Sealing)
    })();

    match result {
        Ok(piece) => {
            let scratch_dir = scratch.into_path();
            info!(
                "recover_sector:finish: sector {} piece {} in {:?}",
                sector, piece.piece_cid, scratch_dir
            );
            Ok(RecoveredSector {
                sector,
                piece,
                scratch_dir,
            })
        }
        Err(err) if params.keep_on_failure => {
            warn!(
                "recovery of sector {} failed, keeping {:?}",
                sector,
                scratch.into_path()
            );
            Err(err)
        }
        Err(err) => Err(err),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let rest = match path.strip_prefix("~") {
        Ok(rest) => rest,
        Err(_) => return path.to_path_buf(),
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => {
            warn!("cannot expand {:?}: no home directory", path);
            path.to_path_buf()
        }
    }
}
