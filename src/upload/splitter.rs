use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// A chunk of the file being uploaded.
///
/// `stop` is the nominal end `chunk_size * (index + 1)`. For the last chunk it can lie past the
/// end of the file; readers clamp it to the file size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: u64,
    pub start: u64,
    pub stop: u64,
    /// Number of chunks in the whole file.
    pub count: u64,
}

impl ChunkRange {
    /// Bytes actually covered once the range is clamped to `size`.
    pub fn clamped_len(&self, size: u64) -> u64 {
        self.stop.min(size).saturating_sub(self.start)
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.count
    }
}

pub fn chunk_count(size: u64, chunk_size: u64) -> Result<u64, Error> {
    if chunk_size == 0 {
        return Err(Error::InvalidChunkSize);
    }
    Ok(size.div_ceil(chunk_size))
}

/// Yields the chunks of a file of `size` bytes in index order.
pub struct Splitter {
    chunk_size: u64,
    count: u64,
    next: u64,
}

impl Splitter {
    pub fn new(size: u64, chunk_size: u64) -> Result<Self, Error> {
        Ok(Splitter {
            chunk_size,
            count: chunk_count(size, chunk_size)?,
            next: 0,
        })
    }

    /// Number of chunks in the whole file, regardless of how many were already yielded.
    pub fn total(&self) -> u64 {
        self.count
    }
}

impl Iterator for Splitter {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<ChunkRange> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;

        Some(ChunkRange {
            index,
            start: self.chunk_size.saturating_mul(index),
            stop: self.chunk_size.saturating_mul(index + 1),
            count: self.count,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remain = (self.count - self.next) as usize;
        (remain, Some(remain))
    }
}

pub fn plan(size: u64, chunk_size: u64) -> Result<Vec<ChunkRange>, Error> {
    Ok(Splitter::new(size, chunk_size)?.collect())
}
