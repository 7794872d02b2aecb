use std::io::{self, BufReader, BufWriter, Read, Write};

use anyhow::{ensure, Context, Result};
use fr32::Fr32Reader;
use log::info;
use piece_accessor::types::{
    Commitment, PaddedBytesAmount, PieceCid, PieceInfo, UnpaddedBytesAmount,
};

use crate::commitment_reader::CommitmentReader;
use crate::pieces::{get_piece_alignment, sum_piece_bytes_with_alignment, MINIMUM_PIECE_SIZE};

/// Generates the piece commitment of the first `piece_size` bytes of `source`.
pub fn generate_piece_commitment<R: Read>(
    source: R,
    piece_size: UnpaddedBytesAmount,
) -> Result<PieceInfo> {
    info!("generate_piece_commitment:start");
    let result = add_piece(source, io::sink(), piece_size, &[]).map(|(info, _)| info);
    info!("generate_piece_commitment:finish");
    result
}

/// Aligns the piece after `piece_lengths`, bit-pads it, and writes the result to `target`.
/// Returns the piece's commitment and the number of unpadded bytes written, alignment
/// included.
///
/// # Arguments
///
/// * `source` - unprocessed piece bytes; only the first `piece_size` bytes are read.
/// * `target` - receives the alignment and the bit-padded piece.
/// * `piece_size` - unpadded size of the piece.
/// * `piece_lengths` - unpadded sizes of the pieces already in the sector, in order.
pub fn add_piece<R, W>(
    source: R,
    target: W,
    piece_size: UnpaddedBytesAmount,
    piece_lengths: &[UnpaddedBytesAmount],
) -> Result<(PieceInfo, UnpaddedBytesAmount)>
where
    R: Read,
    W: Write,
{
    info!("add_piece:start");

    let result = (|| -> Result<(PieceInfo, UnpaddedBytesAmount)> {
        ensure_piece_size(piece_size)?;

        let source = BufReader::new(source.take(u64::from(piece_size)));
        let mut target = BufWriter::new(target);

        let written_bytes = sum_piece_bytes_with_alignment(piece_lengths);
        let piece_alignment = get_piece_alignment(written_bytes, piece_size);

        write_zeroes(&mut target, piece_alignment.left_bytes)?;

        let mut commitment_reader = CommitmentReader::new(Fr32Reader::new(source));
        let n = io::copy(&mut commitment_reader, &mut target)
            .context("failed to write and preprocess bytes")?;

        ensure!(n != 0, "add_piece: read 0 bytes before EOF from source");
        let n = UnpaddedBytesAmount::from(PaddedBytesAmount(n));
        ensure!(
            n == piece_size,
            "add_piece: invalid bytes amount written ({} of {})",
            n.0,
            piece_size.0
        );

        write_zeroes(&mut target, piece_alignment.right_bytes)?;
        target.flush().context("failed to flush target")?;

        let commitment = commitment_reader.finish()?;
        let written = piece_alignment.sum(piece_size);

        Ok((piece_info(&commitment, piece_size)?, written))
    })();

    info!("add_piece:finish");
    result
}

pub fn piece_info(commitment: &Commitment, piece_size: UnpaddedBytesAmount) -> Result<PieceInfo> {
    Ok(PieceInfo {
        piece_cid: PieceCid::from_commitment(commitment)?,
        size: piece_size.into(),
    })
}

fn write_zeroes<W: Write>(target: &mut W, unpadded: UnpaddedBytesAmount) -> Result<()> {
    let padded = PaddedBytesAmount::from(unpadded);
    io::copy(&mut io::repeat(0).take(u64::from(padded)), target)
        .context("failed to write alignment")?;
    Ok(())
}

fn ensure_piece_size(piece_size: UnpaddedBytesAmount) -> Result<()> {
    ensure!(
        piece_size >= UnpaddedBytesAmount(MINIMUM_PIECE_SIZE),
        "Piece must be at least {} bytes",
        MINIMUM_PIECE_SIZE
    );

    let padded_piece_size: PaddedBytesAmount = piece_size.into();
    ensure!(
        u64::from(padded_piece_size).is_power_of_two(),
        "Bit-padded piece size must be a power of 2 ({:?})",
        padded_piece_size,
    );

    Ok(())
}
