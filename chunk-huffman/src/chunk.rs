use std::{
    borrow::Borrow,
    fmt,
    io::{self, Read},
};

use crate::config::align_to_chunk;

/// One symbol of the alphabet: the bytes of a single chunk.
///
/// Equality and hashing follow the byte content, so a `&[u8]` can be used to
/// look a key up without allocating.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(Box<[u8]>);

impl ChunkKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for ChunkKey {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<Vec<u8>> for ChunkKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

impl Borrow<[u8]> for ChunkKey {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkKey({})", self.0.escape_ascii())
    }
}

/// Splits a byte source into consecutive chunks of `chunk_size` bytes.
///
/// The working buffer is a whole number of chunks long. Whatever is left of a
/// buffer after its last complete chunk is moved to the front before the next
/// refill, so a chunk never depends on how the source happens to split its
/// reads. Only the final chunk of the stream can be shorter.
pub struct ChunkReader<R> {
    inner: R,
    chunk_size: usize,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
    eof: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R, chunk_size: usize, buffer_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let buffer_size = align_to_chunk(buffer_size, chunk_size);
        Self {
            inner,
            chunk_size,
            buf: vec![0; buffer_size],
            pos: 0,
            filled: 0,
            eof: false,
        }
    }

    pub fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        if self.filled - self.pos < self.chunk_size && !self.eof {
            self.refill()?;
        }

        if self.pos == self.filled {
            return Ok(None);
        }

        let start = self.pos;
        let end = self.filled.min(start + self.chunk_size);
        self.pos = end;
        Ok(Some(&self.buf[start..end]))
    }

    fn refill(&mut self) -> io::Result<()> {
        self.buf.copy_within(self.pos..self.filled, 0);
        self.filled -= self.pos;
        self.pos = 0;

        while self.filled < self.buf.len() {
            match self.inner.read(&mut self.buf[self.filled..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => self.filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        io::{self, Read},
    };

    use rstest::rstest;

    use super::{ChunkKey, ChunkReader};

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn collect_chunks<R: Read>(mut reader: ChunkReader<R>) -> Vec<Vec<u8>> {
        let mut chunks = vec![];
        while let Some(chunk) = reader.next_chunk().unwrap() {
            chunks.push(chunk.to_vec());
        }
        chunks
    }

    #[test]
    fn test_chunk_key_lookup_by_slice() {
        let mut counts = HashMap::new();
        counts.insert(ChunkKey::from(&b"ab"[..]), 2);
        assert_eq!(counts.get(&b"ab"[..]), Some(&2));
        assert_eq!(counts.get(&b"ba"[..]), None);
    }

    #[rstest]
    #[case(1, 1, 1)]
    #[case(3, 7, 2)]
    #[case(3, 9, 4)]
    #[case(4, 4, 3)]
    #[case(5, 64, 1)]
    #[case(16, 3, 5)]
    fn test_chunks_survive_short_reads(
        #[case] chunk_size: usize,
        #[case] buffer_size: usize,
        #[case] step: usize,
    ) {
        let data = (0..=200u8).collect::<Vec<_>>();
        let reader = ChunkReader::new(Trickle { data: &data, step }, chunk_size, buffer_size);

        let chunks = collect_chunks(reader);
        let expected = data.chunks(chunk_size).map(<[u8]>::to_vec).collect::<Vec<_>>();

        assert_eq!(chunks, expected);
    }

    #[test]
    fn test_last_chunk_is_shorter() {
        let reader = ChunkReader::new(&b"abcdefg"[..], 3, 6);
        let chunks = collect_chunks(reader);
        assert_eq!(chunks, vec![b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()]);
    }

    #[test]
    fn test_empty_source_has_no_chunks() {
        let reader = ChunkReader::new(&b""[..], 4, 16);
        assert!(collect_chunks(reader).is_empty());
    }
}
