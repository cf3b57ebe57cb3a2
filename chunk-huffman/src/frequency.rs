use std::{collections::HashMap, io::Read};

use log::debug;

use crate::{
    chunk::{ChunkKey, ChunkReader},
    config::Config,
    error::Result,
};

/// Occurrence counts of every distinct chunk of one input.
#[derive(Debug, Default, Clone)]
pub struct FrequencyMap {
    counts: HashMap<ChunkKey, u64>,
    total_len: u64,
}

impl FrequencyMap {
    /// Scans `source` once, counting each chunk of `config.chunk_size()` bytes.
    pub fn analyze<R: Read>(source: R, config: &Config) -> Result<Self> {
        let mut reader = ChunkReader::new(source, config.chunk_size(), config.buffer_size());
        let mut frequencies = Self::default();

        while let Some(chunk) = reader.next_chunk()? {
            frequencies.record(chunk);
        }

        debug!(
            "analyzed {} bytes into {} distinct chunks",
            frequencies.total_len,
            frequencies.counts.len()
        );
        Ok(frequencies)
    }

    pub fn record(&mut self, chunk: &[u8]) {
        match self.counts.get_mut(chunk) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(ChunkKey::from(chunk), 1);
            }
        }
        self.total_len += chunk.len() as u64;
    }

    /// Number of bytes the counted chunks add up to.
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn get(&self, chunk: &[u8]) -> Option<u64> {
        self.counts.get(chunk).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkKey, u64)> {
        self.counts.iter().map(|(chunk, &count)| (chunk, count))
    }
}

impl FromIterator<(ChunkKey, u64)> for FrequencyMap {
    fn from_iter<T: IntoIterator<Item = (ChunkKey, u64)>>(iter: T) -> Self {
        let counts = iter.into_iter().collect::<HashMap<_, _>>();
        let total_len = counts
            .iter()
            .map(|(chunk, count)| chunk.len() as u64 * count)
            .sum();
        Self { counts, total_len }
    }
}
