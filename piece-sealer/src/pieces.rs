use piece_accessor::types::UnpaddedBytesAmount;

/// Smallest piece the pipeline accepts: one 128 byte padded leaf pair, unpadded.
pub const MINIMUM_PIECE_SIZE: u64 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceAlignment {
    pub left_bytes: UnpaddedBytesAmount,
    pub right_bytes: UnpaddedBytesAmount,
}

impl PieceAlignment {
    pub fn sum(&self, piece_size: UnpaddedBytesAmount) -> UnpaddedBytesAmount {
        self.left_bytes + piece_size + self.right_bytes
    }
}

/// Bytes taken by `pieces`, written in order, including their alignment.
pub fn sum_piece_bytes_with_alignment(pieces: &[UnpaddedBytesAmount]) -> UnpaddedBytesAmount {
    pieces.iter().fold(UnpaddedBytesAmount(0), |acc, piece_bytes| {
        acc + get_piece_alignment(acc, *piece_bytes).sum(*piece_bytes)
    })
}

/// Alignment needed to write `piece_bytes` after `written_bytes`, so that the piece
/// fills a whole power-of-two subtree of the sector.
pub fn get_piece_alignment(
    written_bytes: UnpaddedBytesAmount,
    piece_bytes: UnpaddedBytesAmount,
) -> PieceAlignment {
    let mut piece_bytes_needed = MINIMUM_PIECE_SIZE;
    while piece_bytes_needed < u64::from(piece_bytes) {
        piece_bytes_needed *= 2;
    }

    let encroaching = u64::from(written_bytes) % piece_bytes_needed;
    let left_bytes = if encroaching > 0 {
        piece_bytes_needed - encroaching
    } else {
        0
    };
    let right_bytes = piece_bytes_needed - u64::from(piece_bytes);

    PieceAlignment {
        left_bytes: UnpaddedBytesAmount(left_bytes),
        right_bytes: UnpaddedBytesAmount(right_bytes),
    }
}
