use std::{io, path::PathBuf};

use derive_more::Display;

use crate::chunk::ChunkKey;

pub type Result<T> = std::result::Result<T, HuffmanError>;

#[derive(Debug, Display)]
pub enum HuffmanError {
    #[display(fmt = "source not found: {}", "_0.display()")]
    SourceNotFound(PathBuf),

    #[display(fmt = "i/o failure: {}", _0)]
    Io(io::Error),

    /// The payload pass met a chunk that the frequency pass never saw.
    #[display(fmt = "no codeword for chunk {:?}", chunk)]
    MissingCodeword { chunk: ChunkKey },

    /// A length too large for its fixed-width container field.
    #[display(fmt = "{} {} does not fit the container format", field, value)]
    FieldOverflow { field: &'static str, value: u64 },

    #[display(fmt = "malformed container: {}", _0)]
    Format(FormatFault),
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum FormatFault {
    #[display(fmt = "container ends inside the {}", _0)]
    Truncated(&'static str),

    #[display(fmt = "{} is negative ({})", field, value)]
    NegativeField { field: &'static str, value: i64 },

    #[display(fmt = "dictionary entry {} has an empty chunk", entry)]
    EmptyChunk { entry: usize },

    #[display(fmt = "dictionary entry {} has an empty codeword", entry)]
    EmptyCodeword { entry: usize },

    #[display(fmt = "dictionary entry {} repeats codeword {:?}", entry, codeword)]
    DuplicateCodeword { entry: usize, codeword: String },

    #[display(
        fmt = "dictionary entry {} codeword {:?} shares a prefix with an earlier entry",
        entry,
        codeword
    )]
    PrefixCollision { entry: usize, codeword: String },

    #[display(
        fmt = "header declares {} bytes but {} dictionary entries",
        original_len,
        entries
    )]
    SizeMismatch { original_len: u64, entries: usize },

    #[display(fmt = "bit-string {:?} matches no dictionary entry", _0)]
    UnmatchedBits(String),

    #[display(fmt = "decoded chunk of {} bytes overruns the {} bytes left", chunk_len, remaining)]
    Overrun { chunk_len: usize, remaining: u64 },

    #[display(fmt = "payload ended with {} bytes still to decode", remaining)]
    PayloadExhausted { remaining: u64 },
}

impl HuffmanError {
    /// Maps an early end of file while parsing `section` to a format fault.
    pub(crate) fn from_read(err: io::Error, section: &'static str) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => HuffmanError::Format(FormatFault::Truncated(section)),
            _ => HuffmanError::Io(err),
        }
    }
}

impl std::error::Error for HuffmanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HuffmanError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for HuffmanError {
    fn from(err: io::Error) -> Self {
        HuffmanError::Io(err)
    }
}

impl From<FormatFault> for HuffmanError {
    fn from(fault: FormatFault) -> Self {
        HuffmanError::Format(fault)
    }
}
