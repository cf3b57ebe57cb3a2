//! Huffman coding over fixed-size byte chunks.
//!
//! The input is cut into chunks of `n` bytes, each distinct chunk becomes a
//! symbol, and the resulting prefix code is stored next to the packed payload
//! so the original bytes can be restored without any other information.

pub mod bits;
pub mod chunk;
pub mod code_table;
pub mod config;
pub mod container;
pub mod error;
pub mod frequency;
pub mod paths;
pub mod tree;

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::Path,
};

use log::{debug, info};

pub use crate::{
    config::Config,
    error::{FormatFault, HuffmanError, Result},
};
use crate::{
    code_table::CodeTable,
    container::{read_dictionary, write_dictionary, write_payload, Header},
    frequency::FrequencyMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionReport {
    pub original_len: u64,
    pub compressed_len: u64,
    pub distinct_chunks: usize,
}

impl CompressionReport {
    /// Compressed size over original size; zero for an empty input.
    pub fn ratio(&self) -> f64 {
        if self.original_len == 0 {
            return 0.0;
        }
        self.compressed_len as f64 / self.original_len as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressionReport {
    pub restored_len: u64,
    pub dictionary_entries: usize,
    pub max_chunk_len: usize,
}

/// Compresses `source` into `sink`.
///
/// The source is read twice, once to count chunks and once to emit their
/// codewords, so it must not change in between.
pub fn compress<R: Read + Seek, W: Write>(
    mut source: R,
    mut sink: W,
    config: &Config,
) -> Result<CompressionReport> {
    let frequencies = FrequencyMap::analyze(&mut source, config)?;
    let original_len = frequencies.total_len();

    let Some(table) = CodeTable::from_frequencies(&frequencies) else {
        let compressed_len = Header::EMPTY.write(&mut sink)?;
        sink.flush()?;
        return Ok(CompressionReport {
            original_len,
            compressed_len,
            distinct_chunks: 0,
        });
    };

    let dictionary_len = write_dictionary(&mut sink, original_len, &table)?;

    source.seek(SeekFrom::Start(0))?;
    let payload_len = write_payload(&mut source, &mut sink, &table, config)?;
    debug!("wrote {} payload bytes", payload_len);

    Ok(CompressionReport {
        original_len,
        compressed_len: dictionary_len + payload_len,
        distinct_chunks: table.len(),
    })
}

/// Restores the bytes of a container read from `source` into `sink`.
pub fn decompress<R: Read, W: Write>(
    source: R,
    mut sink: W,
    buffer_size: usize,
) -> Result<DecompressionReport> {
    let mut source = BufReader::with_capacity(buffer_size.max(1), source);
    let (header, table) = read_dictionary(&mut source)?;

    if header.entries > 0 {
        bits::unpack(&mut source, &mut sink, &table, header.original_len, buffer_size)?;
    }
    sink.flush()?;

    Ok(DecompressionReport {
        restored_len: header.original_len,
        dictionary_entries: table.len(),
        max_chunk_len: table.max_chunk_len(),
    })
}

/// Compresses the file at `input` into `output`. A failed run leaves no
/// output file behind.
pub fn compress_file(input: &Path, output: &Path, config: &Config) -> Result<CompressionReport> {
    let source = BufReader::with_capacity(config.buffer_size(), open_source(input)?);
    let sink = BufWriter::new(File::create(output)?);

    let report = discard_on_error(output, compress(source, sink, config))?;
    info!(
        "compressed {} into {} ({} -> {} bytes, {} distinct chunks)",
        input.display(),
        output.display(),
        report.original_len,
        report.compressed_len,
        report.distinct_chunks
    );
    Ok(report)
}

/// Decompresses the container at `input` into `output`. A failed run leaves
/// no output file behind.
pub fn decompress_file(
    input: &Path,
    output: &Path,
    buffer_size: usize,
) -> Result<DecompressionReport> {
    let source = open_source(input)?;
    let sink = BufWriter::new(File::create(output)?);

    let report = discard_on_error(output, decompress(source, sink, buffer_size))?;
    info!(
        "decompressed {} into {} ({} bytes)",
        input.display(),
        output.display(),
        report.restored_len
    );
    Ok(report)
}

fn open_source(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => HuffmanError::SourceNotFound(path.to_path_buf()),
        _ => HuffmanError::Io(err),
    })
}

fn discard_on_error<T>(output: &Path, result: Result<T>) -> Result<T> {
    if result.is_err() {
        if let Err(err) = fs::remove_file(output) {
            debug!("could not remove {}: {}", output.display(), err);
        }
    }
    result
}
