use std::io::{self, Read};

use anyhow::{ensure, Result};
use piece_accessor::types::Commitment;
use rayon::prelude::*;
use sha2::{Digest, Sha256};

const NODE_SIZE: usize = 32;

/// SHA-256 of `data`, with the top two bits cleared so the result is a field element.
pub fn trimmed_hash(data: &[u8]) -> Commitment {
    let mut res = [0u8; NODE_SIZE];
    res.copy_from_slice(&Sha256::digest(data));
    fr32::trim_to_fr32(&mut res);
    res
}

/// Parent of two nodes in a piece tree.
pub fn piece_hash(a: &[u8], b: &[u8]) -> Commitment {
    let mut buf = [0u8; NODE_SIZE * 2];
    buf[..NODE_SIZE].copy_from_slice(a);
    buf[NODE_SIZE..].copy_from_slice(b);
    trimmed_hash(&buf)
}

/// Calculates the piece commitment of the data piped through it.
/// Data must be bit padded and a power of 2 bytes long.
pub struct CommitmentReader<R> {
    source: R,
    buffer: [u8; NODE_SIZE * 2],
    buffer_pos: usize,
    current_tree: Vec<Commitment>,
}

impl<R: Read> CommitmentReader<R> {
    pub fn new(source: R) -> Self {
        CommitmentReader {
            source,
            buffer: [0u8; NODE_SIZE * 2],
            buffer_pos: 0,
            current_tree: Vec::new(),
        }
    }

    /// Hashes the buffered pair of leaves once both are complete.
    fn try_hash(&mut self) {
        if self.buffer_pos < self.buffer.len() {
            return;
        }

        self.current_tree.push(trimmed_hash(&self.buffer));
        self.buffer_pos = 0;
    }

    pub fn finish(self) -> Result<Commitment> {
        ensure!(self.buffer_pos == 0, "not enough inputs provided");
        ensure!(!self.current_tree.is_empty(), "no inputs provided");
        ensure!(
            self.current_tree.len().is_power_of_two(),
            "input is not a power of two nodes long"
        );

        let mut current_row = self.current_tree;
        while current_row.len() > 1 {
            current_row = current_row
                .par_chunks(2)
                .map(|chunk| piece_hash(&chunk[0], &chunk[1]))
                .collect::<Vec<_>>();
        }

        Ok(current_row[0])
    }
}

impl<R: Read> Read for CommitmentReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.buffer_pos;
        let left = self.buffer.len() - self.buffer_pos;
        let end = start + std::cmp::min(left, buf.len());

        let r = self.source.read(&mut self.buffer[start..end])?;
        buf[..r].copy_from_slice(&self.buffer[start..start + r]);

        self.buffer_pos += r;
        self.try_hash();

        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use fr32::Fr32Reader;
    use pretty_assertions::assert_eq;

    /// Piece commitments of all-zero pieces of 128 and 256 padded bytes.
    const ZERO_COMM_128: &str = "3731bb99ac689f66eef5973e4a94da188f4ddcae580724fc6f3fd60dfd488333";
    const ZERO_COMM_256: &str = "642a607ef886b004bf2c1978463ae1d4693ac0f410eb2d1b7a47fe205e5e750f";

    fn commitment_of(padded: &[u8]) -> Result<Commitment> {
        let mut reader = CommitmentReader::new(Cursor::new(padded));
        io::copy(&mut reader, &mut io::sink())?;
        reader.finish()
    }

    #[test]
    fn zero_piece_commitments() {
        let comm = commitment_of(&[0u8; 128]).expect("commitment");
        assert_eq!(hex::encode(comm), ZERO_COMM_128);

        let comm = commitment_of(&[0u8; 256]).expect("commitment");
        assert_eq!(hex::encode(comm), ZERO_COMM_256);
    }

    #[test]
    fn passes_data_through() {
        let source = vec![255u8; 127 * 8];
        let mut padded = Vec::new();
        Fr32Reader::new(Cursor::new(&source))
            .read_to_end(&mut padded)
            .expect("pad");

        let mut reader = CommitmentReader::new(Cursor::new(&padded));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).expect("read");
        assert_eq!(out, padded);

        let comm = reader.finish().expect("commitment");
        assert_eq!(comm[31] & 0b1100_0000, 0);
    }

    #[test]
    fn rejects_partial_input() {
        assert!(commitment_of(&[0u8; 100]).is_err());
        assert!(commitment_of(&[0u8; 192]).is_err());
        assert!(commitment_of(&[]).is_err());
    }
}
