use std::io::{self, Read, Write};

use bit_vec::BitVec;
use log::{debug, warn};

use crate::{
    chunk::ChunkKey,
    code_table::{bit_string, DecodeTable},
    error::{FormatFault, HuffmanError, Result},
};

/// Packs codewords MSB-first into a byte sink.
///
/// Completed bytes are staged in `pending` and handed to the sink whenever it
/// fills up; the partially filled byte is carried in `current` so codewords
/// can straddle any byte or buffer boundary.
pub struct BitPacker<W: Write> {
    out: W,
    current: u8,
    used: u8,
    pending: Vec<u8>,
    capacity: usize,
    written: u64,
}

impl<W: Write> BitPacker<W> {
    pub fn new(out: W, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            out,
            current: 0,
            used: 0,
            pending: Vec::with_capacity(capacity),
            capacity,
            written: 0,
        }
    }

    #[inline]
    pub fn put(&mut self, bit: bool) -> io::Result<()> {
        self.current = (self.current << 1) | bit as u8;
        self.used += 1;

        if self.used == 8 {
            self.pending.push(self.current);
            self.current = 0;
            self.used = 0;

            if self.pending.len() == self.capacity {
                self.flush_pending()?;
            }
        }
        Ok(())
    }

    pub fn put_code(&mut self, code: &BitVec) -> io::Result<()> {
        for bit in code.iter() {
            self.put(bit)?;
        }
        Ok(())
    }

    /// Pads the last byte on the right with zero bits, writes everything out
    /// and returns the sink together with the number of payload bytes.
    pub fn finish(mut self) -> io::Result<(W, u64)> {
        if self.used > 0 {
            self.pending.push(self.current << (8 - self.used));
            self.current = 0;
            self.used = 0;
        }
        self.flush_pending()?;
        self.out.flush()?;
        Ok((self.out, self.written))
    }

    fn flush_pending(&mut self) -> io::Result<()> {
        self.out.write_all(&self.pending)?;
        self.written += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }
}

/// Greedy bit-by-bit decoder.
///
/// Bits accumulate into a candidate codeword until it names a dictionary
/// entry; the entry is emitted and the candidate starts over. Since the code
/// is prefix-free the first match is the only possible one.
pub struct Decoder<'t> {
    table: &'t DecodeTable,
    candidate: BitVec,
    remaining: u64,
}

impl<'t> Decoder<'t> {
    pub fn new(table: &'t DecodeTable, original_len: u64) -> Self {
        Self {
            table,
            candidate: BitVec::with_capacity(table.max_code_len()),
            remaining: original_len,
        }
    }

    /// Bytes still owed to the output.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Feeds one payload bit, returning the chunk it completes, if any.
    pub fn push_bit(&mut self, bit: bool) -> Result<Option<&'t ChunkKey>> {
        self.candidate.push(bit);

        let table: &'t DecodeTable = self.table;
        let Some(chunk) = table.get(&self.candidate) else {
            if self.candidate.len() >= table.max_code_len() {
                return Err(FormatFault::UnmatchedBits(bit_string(&self.candidate)).into());
            }
            return Ok(None);
        };

        let chunk_len = chunk.len() as u64;
        if chunk_len > self.remaining {
            return Err(FormatFault::Overrun {
                chunk_len: chunk.len(),
                remaining: self.remaining,
            }
            .into());
        }

        self.remaining -= chunk_len;
        self.candidate.truncate(0);
        Ok(Some(chunk))
    }
}

/// Decodes the payload read from `source` into `sink` until `original_len`
/// bytes have been written. Returns the number of payload bytes consumed.
pub fn unpack<R: Read, W: Write>(
    mut source: R,
    sink: &mut W,
    table: &DecodeTable,
    original_len: u64,
    buffer_size: usize,
) -> Result<u64> {
    let mut decoder = Decoder::new(table, original_len);
    let mut buf = vec![0; buffer_size.max(1)];
    let mut consumed = 0u64;
    let mut unused = 0usize;

    'payload: while !decoder.is_done() {
        let read = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(HuffmanError::Io(err)),
        };

        for (index, &byte) in buf[..read].iter().enumerate() {
            consumed += 1;
            for shift in (0..8).rev() {
                if let Some(chunk) = decoder.push_bit((byte >> shift) & 1 == 1)? {
                    sink.write_all(chunk.as_bytes())?;
                }
                if decoder.is_done() {
                    unused = read - index - 1;
                    break 'payload;
                }
            }
        }
    }

    if !decoder.is_done() {
        return Err(FormatFault::PayloadExhausted {
            remaining: decoder.remaining(),
        }
        .into());
    }
    debug!("decoded {} bytes from {} payload bytes", original_len, consumed);

    let mut extra = [0u8; 1];
    if unused > 0 || matches!(source.read(&mut extra), Ok(n) if n > 0) {
        warn!("container has bytes after the end of the payload; ignoring them");
    }

    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use bit_vec::BitVec;
    use rstest::rstest;

    use crate::{
        chunk::ChunkKey,
        code_table::DecodeTable,
        error::{FormatFault, HuffmanError},
    };

    use super::{unpack, BitPacker, Decoder};

    fn code(bits: &str) -> BitVec {
        bits.chars().map(|ch| ch == '1').collect()
    }

    fn table(entries: &[(&str, &str)]) -> DecodeTable {
        let mut table = DecodeTable::default();
        for (entry, (bits, chunk)) in entries.iter().enumerate() {
            table
                .insert(entry, code(bits), ChunkKey::from(chunk.as_bytes()))
                .unwrap();
        }
        table
    }

    #[rstest]
    #[case(&["110", "11"], vec![0b1101_1000])]
    #[case(&["0", "0", "0", "1"], vec![0b0001_0000])]
    #[case(&["10101010"], vec![0b1010_1010])]
    #[case(&["1111", "00000", "1"], vec![0b1111_0000, 0b0100_0000])]
    #[case(&[], vec![])]
    fn test_packing(#[case] codes: &[&str], #[case] expected: Vec<u8>) {
        let mut packer = BitPacker::new(Vec::new(), 4);
        for bits in codes {
            packer.put_code(&code(bits)).unwrap();
        }
        let (out, written) = packer.finish().unwrap();

        assert_eq!(out, expected);
        assert_eq!(written, expected.len() as u64);
    }

    #[test]
    fn test_packing_across_staging_capacity() {
        let mut packer = BitPacker::new(Vec::new(), 1);
        for _ in 0..3 {
            packer.put_code(&code("1010")).unwrap();
        }
        let (out, written) = packer.finish().unwrap();

        assert_eq!(out, vec![0b1010_1010, 0b1010_0000]);
        assert_eq!(written, 2);
    }

    #[test]
    fn test_decoder_emits_on_match() {
        let table = table(&[("0", "B"), ("1", "A")]);
        let mut decoder = Decoder::new(&table, 2);

        assert_eq!(decoder.push_bit(true).unwrap().unwrap().as_bytes(), b"A");
        assert_eq!(decoder.remaining(), 1);
        assert_eq!(decoder.push_bit(false).unwrap().unwrap().as_bytes(), b"B");
        assert!(decoder.is_done());
    }

    #[test]
    fn test_decoder_rejects_unknown_bits() {
        let table = table(&[("00", "a"), ("01", "b"), ("10", "c")]);
        let mut decoder = Decoder::new(&table, 10);

        assert!(decoder.push_bit(true).unwrap().is_none());
        let err = decoder.push_bit(true).unwrap_err();
        assert!(matches!(
            err,
            HuffmanError::Format(FormatFault::UnmatchedBits(bits)) if bits == "11"
        ));
    }

    #[test]
    fn test_short_final_chunk_uses_its_own_length() {
        // "abc" + "abc" + "a": the final chunk is shorter than the chunk size
        let table = table(&[("0", "abc"), ("1", "a")]);
        let mut out = Vec::new();

        unpack(&[0b0010_0000][..], &mut out, &table, 7, 16).unwrap();

        assert_eq!(out, b"abcabca");
    }

    #[test]
    fn test_padding_is_discarded() {
        let table = table(&[("0", "A"), ("1", "B")]);
        let mut out = Vec::new();

        let consumed = unpack(&[0b0001_0000][..], &mut out, &table, 4, 1).unwrap();

        assert_eq!(out, b"AAAB");
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_truncated_payload_is_reported() {
        let table = table(&[("0", "A"), ("1", "B")]);
        let mut out = Vec::new();

        let err = unpack(&[0b0000_0000][..], &mut out, &table, 9, 4).unwrap_err();

        assert!(matches!(
            err,
            HuffmanError::Format(FormatFault::PayloadExhausted { remaining: 1 })
        ));
    }

    #[test]
    fn test_overrun_is_reported() {
        let table = table(&[("0", "AAAA"), ("1", "B")]);
        let mut out = Vec::new();

        let err = unpack(&[0b0000_0000][..], &mut out, &table, 6, 4).unwrap_err();

        assert!(matches!(
            err,
            HuffmanError::Format(FormatFault::Overrun {
                chunk_len: 4,
                remaining: 2
            })
        ));
    }
}
