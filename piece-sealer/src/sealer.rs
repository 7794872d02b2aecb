use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use log::info;
use piece_accessor::interfaces::SealingPipeline;
use piece_accessor::types::{PaddedBytesAmount, PieceInfo, SectorRef, UnpaddedBytesAmount};

use crate::commitments::add_piece;
use crate::pieces::sum_piece_bytes_with_alignment;

pub const UNSEALED_DIR: &str = "unsealed";

/// A sealing pipeline that keeps its sector files under a single root directory.
#[derive(Debug, Clone)]
pub struct BasicFsSealer {
    root: PathBuf,
}

impl BasicFsSealer {
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        let unsealed = root.join(UNSEALED_DIR);
        fs::create_dir_all(&unsealed)
            .with_context(|| format!("failed to create {:?}", unsealed))?;

        Ok(BasicFsSealer { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unsealed_path(&self, sector: &SectorRef) -> PathBuf {
        self.root.join(UNSEALED_DIR).join(sector.id.file_name())
    }
}

impl SealingPipeline for BasicFsSealer {
    fn add_piece(
        &self,
        sector: &SectorRef,
        existing_piece_sizes: &[UnpaddedBytesAmount],
        piece_size: UnpaddedBytesAmount,
        source: &mut dyn Read,
    ) -> Result<PieceInfo> {
        let max_piece_size = UnpaddedBytesAmount::from(sector.sector_size()?);
        let offset = sum_piece_bytes_with_alignment(existing_piece_sizes);
        ensure!(
            offset + piece_size <= max_piece_size,
            "piece of {} bytes does not fit in sector {} after {} bytes",
            piece_size.0,
            sector.id,
            offset.0
        );

        let path = self.unsealed_path(sector);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open unsealed sector file {:?}", path))?;

        let expected_len = u64::from(PaddedBytesAmount::from(offset));
        let len = file.metadata()?.len();
        ensure!(
            len == expected_len,
            "unsealed sector file {:?} is {} bytes, expected {}",
            path,
            len,
            expected_len
        );

        let (piece, written) = add_piece(source, &file, piece_size, existing_piece_sizes)?;
        file.sync_all()
            .with_context(|| format!("failed to sync {:?}", path))?;

        info!(
            "added piece {} to sector {} ({} bytes with alignment)",
            piece.piece_cid, sector.id, written.0
        );
        Ok(piece)
    }
}
