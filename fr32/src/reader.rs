use std::cmp::min;
use std::io::{self, Read};

use crate::convert::to_unpadded_bytes;

/// The number of Frs per Block.
const NUM_FRS_PER_BLOCK: usize = 4;
/// The amount of bits in an Fr when not padded.
const IN_BITS_FR: usize = 254;
/// The amount of bits in an Fr when padded.
const OUT_BITS_FR: usize = 256;

const NUM_BYTES_UNPADDED_BLOCK: usize = NUM_FRS_PER_BLOCK * IN_BITS_FR / 8;
const NUM_BYTES_PADDED_BLOCK: usize = NUM_FRS_PER_BLOCK * OUT_BITS_FR / 8;

const NUM_U128S_PER_BLOCK: usize = NUM_BYTES_PADDED_BLOCK / 16;

const MASK_SKIP_HIGH_2: u128 = u128::MAX >> 2;

type Block = [u128; NUM_U128S_PER_BLOCK];

fn load_block(bytes: &[u8; NUM_BYTES_PADDED_BLOCK]) -> Block {
    let mut words = [0u128; NUM_U128S_PER_BLOCK];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(16)) {
        let mut le = [0u8; 16];
        le.copy_from_slice(chunk);
        *word = u128::from_le_bytes(le);
    }
    words
}

fn store_block(words: &Block, bytes: &mut [u8; NUM_BYTES_PADDED_BLOCK]) {
    for (word, chunk) in words.iter().zip(bytes.chunks_exact_mut(16)) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Reads the 254 bits starting at `bit_offset`, returned as (low 128 bits, high 126 bits).
#[inline]
fn extract_fr(words: &Block, bit_offset: usize) -> (u128, u128) {
    let w = bit_offset / 128;
    let s = bit_offset % 128;

    if s == 0 {
        return (words[w], words[w + 1] & MASK_SKIP_HIGH_2);
    }

    let after = if w + 2 < NUM_U128S_PER_BLOCK {
        words[w + 2]
    } else {
        0
    };
    let lo = (words[w] >> s) | (words[w + 1] << (128 - s));
    let hi = ((words[w + 1] >> s) | (after << (128 - s))) & MASK_SKIP_HIGH_2;

    (lo, hi)
}

/// Writes 254 bits, given as (low 128 bits, high 126 bits), starting at `bit_offset`.
#[inline]
fn deposit_fr(words: &mut Block, bit_offset: usize, lo: u128, hi: u128) {
    let w = bit_offset / 128;
    let s = bit_offset % 128;

    if s == 0 {
        words[w] |= lo;
        words[w + 1] |= hi;
        return;
    }

    words[w] |= lo << s;
    words[w + 1] |= (lo >> (128 - s)) | (hi << s);
    if w + 2 < NUM_U128S_PER_BLOCK {
        words[w + 2] |= hi >> (128 - s);
    }
}

/// Division of x by y, rounding up.
/// x must be > 0
#[inline]
const fn div_ceil(x: usize, y: usize) -> usize {
    1 + ((x - 1) / y)
}

/// Fills `buf` from `source` until it is full or the source is exhausted.
fn fill_from<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut bytes_read = 0;
    while bytes_read < buf.len() {
        match source.read(&mut buf[bytes_read..]) {
            Ok(0) => break,
            Ok(n) => bytes_read += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(bytes_read)
}

/// An `io::Reader` that converts unpadded input into valid `Fr32` padded output.
pub struct Fr32Reader<R> {
    /// The source being padded.
    source: R,
    /// Raw input block; the final byte always stays zero.
    in_buffer: [u8; NUM_BYTES_PADDED_BLOCK],
    /// Padded output block.
    out_buffer: [u8; NUM_BYTES_PADDED_BLOCK],
    out_offset: usize,
    out_len: usize,
    done: bool,
}

impl<R: Read> Fr32Reader<R> {
    pub fn new(source: R) -> Self {
        Fr32Reader {
            source,
            in_buffer: [0; NUM_BYTES_PADDED_BLOCK],
            out_buffer: [0; NUM_BYTES_PADDED_BLOCK],
            out_offset: 0,
            out_len: 0,
            done: false,
        }
    }

    /// Loads and pads the next block, returning false once the source is exhausted.
    fn next_block(&mut self) -> io::Result<bool> {
        let bytes_read = fill_from(
            &mut self.source,
            &mut self.in_buffer[..NUM_BYTES_UNPADDED_BLOCK],
        )?;
        if bytes_read == 0 {
            return Ok(false);
        }
        for val in &mut self.in_buffer[bytes_read..] {
            *val = 0;
        }

        let input = load_block(&self.in_buffer);
        let mut output = [0u128; NUM_U128S_PER_BLOCK];
        for fr in 0..NUM_FRS_PER_BLOCK {
            let (lo, hi) = extract_fr(&input, fr * IN_BITS_FR);
            output[2 * fr] = lo;
            output[2 * fr + 1] = hi;
        }
        store_block(&output, &mut self.out_buffer);

        self.out_offset = 0;
        self.out_len = div_ceil(bytes_read * 8, IN_BITS_FR) * (OUT_BITS_FR / 8);

        Ok(true)
    }
}

impl<R: Read> Read for Fr32Reader<R> {
    fn read(&mut self, target: &mut [u8]) -> io::Result<usize> {
        if self.done || target.is_empty() {
            return Ok(0);
        }

        let mut bytes_read = 0;
        while bytes_read < target.len() {
            if self.out_offset == self.out_len && !self.next_block()? {
                self.done = true;
                break;
            }

            let len = min(self.out_len - self.out_offset, target.len() - bytes_read);
            target[bytes_read..bytes_read + len]
                .copy_from_slice(&self.out_buffer[self.out_offset..self.out_offset + len]);
            bytes_read += len;
            self.out_offset += len;
        }

        Ok(bytes_read)
    }
}

/// An `io::Reader` that strips `Fr32` padding, yielding the raw bytes carried by at most
/// `padded_size` bytes of padded input.
pub struct Fr32UnpadReader<R> {
    source: io::Take<R>,
    in_buffer: [u8; NUM_BYTES_PADDED_BLOCK],
    out_buffer: [u8; NUM_BYTES_PADDED_BLOCK],
    out_offset: usize,
    out_len: usize,
    done: bool,
}

impl<R: Read> Fr32UnpadReader<R> {
    pub fn new(source: R, padded_size: u64) -> Self {
        Fr32UnpadReader {
            source: source.take(padded_size),
            in_buffer: [0; NUM_BYTES_PADDED_BLOCK],
            out_buffer: [0; NUM_BYTES_PADDED_BLOCK],
            out_offset: 0,
            out_len: 0,
            done: false,
        }
    }

    fn next_block(&mut self) -> io::Result<bool> {
        let bytes_read = fill_from(&mut self.source, &mut self.in_buffer)?;
        if bytes_read == 0 {
            return Ok(false);
        }
        for val in &mut self.in_buffer[bytes_read..] {
            *val = 0;
        }

        let input = load_block(&self.in_buffer);
        let mut output = [0u128; NUM_U128S_PER_BLOCK];
        for fr in 0..NUM_FRS_PER_BLOCK {
            let lo = input[2 * fr];
            let hi = input[2 * fr + 1] & MASK_SKIP_HIGH_2;
            deposit_fr(&mut output, fr * IN_BITS_FR, lo, hi);
        }
        store_block(&output, &mut self.out_buffer);

        self.out_offset = 0;
        self.out_len = to_unpadded_bytes(bytes_read as u64) as usize;

        Ok(true)
    }
}

impl<R: Read> Read for Fr32UnpadReader<R> {
    fn read(&mut self, target: &mut [u8]) -> io::Result<usize> {
        if self.done || target.is_empty() {
            return Ok(0);
        }

        let mut bytes_read = 0;
        while bytes_read < target.len() {
            if self.out_offset == self.out_len && !self.next_block()? {
                self.done = true;
                break;
            }

            let len = min(self.out_len - self.out_offset, target.len() - bytes_read);
            target[bytes_read..bytes_read + len]
                .copy_from_slice(&self.out_buffer[self.out_offset..self.out_offset + len]);
            bytes_read += len;
            self.out_offset += len;
        }

        Ok(bytes_read)
    }
}
