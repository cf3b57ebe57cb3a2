//! On-disk layout of a compressed file.
//!
//! ```text
//! i64  original file size
//! i32  dictionary entry count
//! per entry:
//!   i32  chunk length, followed by the chunk bytes
//!   i32  codeword length in bits, followed by ceil(bits / 8) bytes
//! payload: every codeword in chunk order, MSB-first
//! ```
//!
//! Integers are big-endian. Codewords and the payload are zero-padded on the
//! right to a whole byte.

use std::io::{Read, Write};

use bit_vec::BitVec;
use log::debug;

use crate::{
    bits::BitPacker,
    chunk::{ChunkKey, ChunkReader},
    code_table::{CodeTable, DecodeTable},
    config::Config,
    error::{FormatFault, HuffmanError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub original_len: u64,
    pub entries: usize,
}

impl Header {
    /// The whole container for an empty input.
    pub const EMPTY: Header = Header {
        original_len: 0,
        entries: 0,
    };

    pub const LEN: u64 = 12;

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<u64> {
        let original_len =
            i64::try_from(self.original_len).map_err(|_| HuffmanError::FieldOverflow {
                field: "original file size",
                value: self.original_len,
            })?;
        writer.write_all(&original_len.to_be_bytes())?;
        write_len(writer, "dictionary entry count", self.entries)?;
        Ok(Self::LEN)
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let original_len = read_i64(reader, "header")?;
        let original_len = u64::try_from(original_len).map_err(|_| FormatFault::NegativeField {
            field: "original file size",
            value: original_len,
        })?;
        let entries = read_len(reader, "header", "dictionary entry count")?;

        if (original_len == 0) != (entries == 0) {
            return Err(FormatFault::SizeMismatch {
                original_len,
                entries,
            }
            .into());
        }

        Ok(Self {
            original_len,
            entries,
        })
    }
}

/// Writes the header and the dictionary of `table`, returning the number of
/// bytes written.
pub fn write_dictionary<W: Write>(
    writer: &mut W,
    original_len: u64,
    table: &CodeTable,
) -> Result<u64> {
    let mut written = Header {
        original_len,
        entries: table.len(),
    }
    .write(writer)?;

    for (chunk, code) in table.entries() {
        let packed = code.to_bytes();
        write_len(writer, "chunk length", chunk.len())?;
        writer.write_all(chunk.as_bytes())?;
        write_len(writer, "codeword length", code.len())?;
        writer.write_all(&packed)?;
        written += 8 + (chunk.len() + packed.len()) as u64;
    }

    debug!(
        "wrote dictionary with {} entries in {} bytes",
        table.len(),
        written
    );
    Ok(written)
}

/// Reads the header and dictionary, leaving `reader` at the start of the payload.
pub fn read_dictionary<R: Read>(reader: &mut R) -> Result<(Header, DecodeTable)> {
    let header = Header::read(reader)?;
    let mut table = DecodeTable::default();

    for entry in 0..header.entries {
        let chunk_len = read_len(reader, "dictionary", "chunk length")?;
        let chunk = read_bytes(reader, chunk_len)?;

        let code_len = read_len(reader, "dictionary", "codeword length")?;
        let mut code = BitVec::from_bytes(&read_bytes(reader, code_len.div_ceil(8))?);
        code.truncate(code_len);

        table.insert(entry, code, ChunkKey::from(chunk))?;
    }

    debug!(
        "read dictionary with {} entries, longest chunk {} bytes",
        table.len(),
        table.max_chunk_len()
    );
    Ok((header, table))
}

/// Second compression pass: re-reads `source` and packs the codeword of each
/// chunk. Returns the number of payload bytes written.
pub fn write_payload<R: Read, W: Write>(
    source: R,
    sink: W,
    table: &CodeTable,
    config: &Config,
) -> Result<u64> {
    let mut chunks = ChunkReader::new(source, config.chunk_size(), config.buffer_size());
    let mut packer = BitPacker::new(sink, config.buffer_size());

    while let Some(chunk) = chunks.next_chunk()? {
        let code = table.get(chunk).ok_or_else(|| HuffmanError::MissingCodeword {
            chunk: ChunkKey::from(chunk),
        })?;
        packer.put_code(code)?;
    }

    let (_, written) = packer.finish()?;
    Ok(written)
}

fn read_i64<R: Read>(reader: &mut R, section: &'static str) -> Result<i64> {
    let mut buf = [0u8; 8];
    reader
        .read_exact(&mut buf)
        .map_err(|err| HuffmanError::from_read(err, section))?;
    Ok(i64::from_be_bytes(buf))
}

fn write_len<W: Write>(writer: &mut W, field: &'static str, len: usize) -> Result<()> {
    let value = i32::try_from(len).map_err(|_| HuffmanError::FieldOverflow {
        field,
        value: len as u64,
    })?;
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn read_len<R: Read>(reader: &mut R, section: &'static str, field: &'static str) -> Result<usize> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|err| HuffmanError::from_read(err, section))?;
    let value = i32::from_be_bytes(buf);
    usize::try_from(value).map_err(|_| {
        FormatFault::NegativeField {
            field,
            value: value.into(),
        }
        .into()
    })
}

/// Reads exactly `len` bytes without trusting `len` for the allocation.
fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(FormatFault::Truncated("dictionary").into());
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use crate::{
        chunk::ChunkKey,
        code_table::CodeTable,
        config::Config,
        error::{FormatFault, HuffmanError},
        frequency::FrequencyMap,
    };

    use super::{read_dictionary, write_dictionary, write_payload, Header};

    fn frequencies(counts: &[(&str, u64)]) -> FrequencyMap {
        counts
            .iter()
            .map(|(chunk, count)| (ChunkKey::from(chunk.as_bytes()), *count))
            .collect()
    }

    #[test]
    fn test_dictionary_layout() {
        let table = CodeTable::from_frequencies(&frequencies(&[("A", 3), ("B", 1)])).unwrap();
        let mut out = Vec::new();
        let written = write_dictionary(&mut out, 4, &table).unwrap();
        assert_eq!(written, out.len() as u64);

        #[rustfmt::skip]
        let expected = vec![
            0, 0, 0, 0, 0, 0, 0, 4, // original size
            0, 0, 0, 2,             // entries
            0, 0, 0, 1, b'A',       // chunk
            0, 0, 0, 1, 0b1000_0000, // codeword "1"
            0, 0, 0, 1, b'B',
            0, 0, 0, 1, 0b0000_0000, // codeword "0"
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn test_dictionary_is_read_back() {
        let table = CodeTable::from_frequencies(&frequencies(&[
            ("abc", 10),
            ("xyz", 4),
            ("q", 1),
            ("mno", 3),
            ("jkl", 2),
        ]))
        .unwrap();
        let mut out = Vec::new();
        write_dictionary(&mut out, 58, &table).unwrap();

        let (header, decode) = read_dictionary(&mut Cursor::new(out)).unwrap();

        assert_eq!(
            header,
            Header {
                original_len: 58,
                entries: 5
            }
        );
        assert_eq!(decode.max_chunk_len(), 3);
        for (chunk, code) in table.entries() {
            assert_eq!(decode.get(code), Some(chunk));
        }
    }

    #[test]
    fn test_empty_header() {
        let mut out = Vec::new();
        Header::EMPTY.write(&mut out).unwrap();

        assert_eq!(out, vec![0; 12]);
        let (header, decode) = read_dictionary(&mut Cursor::new(out)).unwrap();
        assert_eq!(header, Header::EMPTY);
        assert!(decode.is_empty());
    }

    #[rstest]
    #[case(vec![0, 0, 0], FormatFault::Truncated("header"))]
    #[case(
        vec![0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 4, b'a'],
        FormatFault::Truncated("dictionary")
    )]
    #[case(
        vec![0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, b'a', 0, 0, 0, 9, 0xff],
        FormatFault::Truncated("dictionary")
    )]
    #[case(
        vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 1],
        FormatFault::NegativeField { field: "original file size", value: -1 }
    )]
    #[case(
        vec![0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0],
        FormatFault::SizeMismatch { original_len: 5, entries: 0 }
    )]
    #[case(
        vec![0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0],
        FormatFault::EmptyChunk { entry: 0 }
    )]
    #[case(
        vec![0, 0, 0, 0, 0, 0, 0, 1, 0x7f, 0xff, 0xff, 0xff],
        FormatFault::Truncated("dictionary")
    )]
    #[case(
        vec![
            0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 2,
            0, 0, 0, 1, b'a', 0, 0, 0, 1, 0b0000_0000,
            0, 0, 0, 1, b'b', 0, 0, 0, 2, 0b0100_0000,
        ],
        FormatFault::PrefixCollision { entry: 1, codeword: "01".to_string() }
    )]
    fn test_malformed_dictionary(#[case] container: Vec<u8>, #[case] expected: FormatFault) {
        let err = read_dictionary(&mut Cursor::new(container)).unwrap_err();
        match err {
            HuffmanError::Format(fault) => assert_eq!(fault, expected),
            other => panic!("expected a format fault, got {other:?}"),
        }
    }

    #[rstest]
    #[case(
        Header { original_len: 1, entries: i32::MAX as usize + 1 },
        "dictionary entry count"
    )]
    #[case(Header { original_len: u64::MAX, entries: 1 }, "original file size")]
    fn test_oversized_header_is_not_written(
        #[case] header: Header,
        #[case] expected_field: &'static str,
    ) {
        let mut out = Vec::new();
        let err = header.write(&mut out).unwrap_err();
        assert!(matches!(
            err,
            HuffmanError::FieldOverflow { field, .. } if field == expected_field
        ));
    }

    #[test]
    fn test_payload_needs_a_codeword_for_every_chunk() {
        let table = CodeTable::from_frequencies(&frequencies(&[("ab", 2), ("cd", 1)])).unwrap();
        let config = Config::new(2).unwrap();
        let mut out = Vec::new();

        let err = write_payload(&b"abcdxy"[..], &mut out, &table, &config).unwrap_err();

        match err {
            HuffmanError::MissingCodeword { chunk } => assert_eq!(chunk.as_bytes(), b"xy"),
            other => panic!("expected a missing codeword, got {other:?}"),
        }
    }
}
