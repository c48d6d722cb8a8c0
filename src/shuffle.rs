//! Reservoir shuffle over a record stream
//!
//! Bounded-memory approximate shuffle: a buffer of `buffer_size` records is
//! filled before anything is emitted, then each pull draws a uniformly
//! random buffer slot and refills it from upstream. This matches the
//! shuffle-buffer semantics of streaming dataset libraries; it is not a
//! full-dataset shuffle.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::Result;
use crate::record::Record;
use crate::stream::RecordStream;

/// Record stream with a seeded reservoir shuffle applied
///
/// The RNG is owned by the stream and seeded explicitly; no global random
/// state is touched, so a fixed seed yields a fixed output order. With
/// `buffer_size == 1` the shuffle degenerates to a no-op and output order
/// equals input order.
pub struct ShuffledStream<S> {
    inner: S,
    buffer: Vec<Record>,
    buffer_size: usize,
    rng: StdRng,
    filled: bool,
}

impl<S: RecordStream> ShuffledStream<S> {
    /// Wrap a stream with a reservoir of `buffer_size` records
    #[must_use]
    pub fn new(inner: S, buffer_size: usize, seed: u64) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            inner,
            buffer: Vec::with_capacity(buffer_size),
            buffer_size,
            rng: StdRng::seed_from_u64(seed),
            filled: false,
        }
    }

    /// Fill the reservoir to target occupancy before emitting anything
    fn fill(&mut self) -> Result<()> {
        while self.buffer.len() < self.buffer_size {
            match self.inner.next_record() {
                Some(Ok(record)) => self.buffer.push(record),
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        self.filled = true;
        Ok(())
    }
}

impl<S: RecordStream> RecordStream for ShuffledStream<S> {
    fn next_record(&mut self) -> Option<Result<Record>> {
        if !self.filled {
            if let Err(e) = self.fill() {
                return Some(Err(e));
            }
        }
        if self.buffer.is_empty() {
            return None;
        }
        let slot = self.rng.random_range(0..self.buffer.len());
        match self.inner.next_record() {
            // Swap the drawn record out and refill its slot immediately
            Some(Ok(record)) => Some(Ok(std::mem::replace(&mut self.buffer[slot], record))),
            Some(Err(e)) => Some(Err(e)),
            // Upstream exhausted: drain the residue in random order
            None => Some(Ok(self.buffer.swap_remove(slot))),
        }
    }
}
