//! Append-only chunked fragment storage

use std::borrow::Cow;

/// One piece of markup text as pushed by the writer.
///
/// Structural tokens (`<`, `/>`, ...) are borrowed statics; names, attribute
/// lists and text are owned.
pub type Fragment = Cow<'static, str>;

/// Upper bound on the slots reserved up front for a new chunk. Larger
/// chunks grow on demand.
const PREALLOC_LIMIT: usize = 4096;

/// Ordered sequence of bounded chunks plus a running fragment count.
///
/// Every chunk except the last is exactly full. The last chunk is the
/// current one and is never full: reaching capacity starts a new one.
/// Chunks handed to an encoder are removed from the front, so chunk indices
/// are absolute (counted since creation) rather than positions in `chunks`.
#[derive(Debug)]
pub struct ChunkedBuffer {
    chunks: Vec<Vec<Fragment>>,
    capacity: usize,
    taken: usize,
    total: usize,
}

impl ChunkedBuffer {
    /// Empty buffer holding at most `capacity` fragments per chunk (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ChunkedBuffer {
            chunks: vec![Vec::with_capacity(capacity.min(PREALLOC_LIMIT))],
            capacity,
            taken: 0,
            total: 0,
        }
    }

    /// Append a fragment. Returns `true` when this push filled the current
    /// chunk and a new one was started.
    #[inline]
    pub fn push(&mut self, fragment: Fragment) -> bool {
        let capacity = self.capacity;
        let current = self.current_mut();
        current.push(fragment);
        let full = current.len() >= capacity;
        self.total += 1;

        if full {
            let next = self.fresh_chunk();
            self.chunks.push(next);
            true
        } else {
            false
        }
    }

    /// Number of fragments appended since creation (minus rolled back ones)
    pub fn total_count(&self) -> usize {
        self.total
    }

    /// Absolute index of the current chunk
    pub fn chunk_index(&self) -> usize {
        self.taken + self.chunks.len() - 1
    }

    /// Fill cursor of the current chunk
    pub fn fill(&self) -> usize {
        self.chunks.last().map_or(0, Vec::len)
    }

    /// Maximum fragments per chunk
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of chunks still held in memory
    pub fn resident_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Drop everything written after the given position.
    ///
    /// `chunk_index` and `fill` must describe a position captured from this
    /// buffer that has not been taken by [`take_complete`](Self::take_complete).
    pub fn truncate(&mut self, chunk_index: usize, fill: usize, total: usize) {
        debug_assert!(chunk_index >= self.taken, "position was already flushed");
        let relative = chunk_index.saturating_sub(self.taken);

        self.chunks.truncate(relative + 1);
        if let Some(current) = self.chunks.last_mut() {
            current.truncate(fill);
        }
        self.total = total;
    }

    /// Remove and return every full chunk, keeping the current one.
    pub fn take_complete(&mut self) -> Vec<Vec<Fragment>> {
        let complete = self.chunks.len() - 1;
        self.taken += complete;
        self.chunks.drain(..complete).collect()
    }

    /// Remove and return all chunks, the current one cut at its fill cursor.
    ///
    /// Empty chunks are skipped. The buffer is left with a fresh empty chunk.
    pub fn take_all(&mut self) -> Vec<Vec<Fragment>> {
        let resident = self.chunks.len();
        let chunks: Vec<_> = self
            .chunks
            .drain(..)
            .filter(|chunk| !chunk.is_empty())
            .collect();
        self.taken += resident;
        let next = self.fresh_chunk();
        self.chunks.push(next);
        chunks
    }

    /// Concatenate all resident fragments in order.
    pub fn concat(&self) -> String {
        let len = self.fragments().map(|f| f.len()).sum();
        let mut out = String::with_capacity(len);
        for fragment in self.fragments() {
            out.push_str(fragment);
        }
        out
    }

    /// Iterate all resident fragments in write order
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().flatten().map(|f| &**f)
    }

    fn fresh_chunk(&self) -> Vec<Fragment> {
        Vec::with_capacity(self.capacity.min(PREALLOC_LIMIT))
    }

    #[inline]
    fn current_mut(&mut self) -> &mut Vec<Fragment> {
        if self.chunks.is_empty() {
            let next = self.fresh_chunk();
            self.chunks.push(next);
        }
        let last = self.chunks.len() - 1;
        &mut self.chunks[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, count: usize) -> ChunkedBuffer {
        let mut buf = ChunkedBuffer::new(capacity);
        for i in 0..count {
            buf.push(Cow::Owned(i.to_string()));
        }
        buf
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        for capacity in [usize::MAX, 1_000_000_000_000] {
            let mut buf = ChunkedBuffer::new(capacity);
            assert!(!buf.push("a".into()));
            assert!(!buf.push("b".into()));
            assert_eq!(buf.capacity(), capacity);
            assert_eq!(buf.resident_chunks(), 1);
            assert_eq!(buf.concat(), "ab");
            assert_eq!(buf.take_all().len(), 1);
        }
    }

    #[test]
    fn test_push_rolls_over_at_capacity() {
        let mut buf = ChunkedBuffer::new(3);
        assert!(!buf.push("a".into()));
        assert!(!buf.push("b".into()));
        assert!(buf.push("c".into()));
        assert_eq!(buf.chunk_index(), 1);
        assert_eq!(buf.fill(), 0);
        assert_eq!(buf.total_count(), 3);
        assert_eq!(buf.concat(), "abc");
    }

    #[test]
    fn test_segmentation_is_unobservable() {
        let expected: String = (0..50).map(|i| i.to_string()).collect();
        for capacity in [1, 2, 7, 50, 1000] {
            assert_eq!(filled(capacity, 50).concat(), expected);
        }
    }

    #[test]
    fn test_truncate_across_chunks() {
        let mut buf = filled(4, 6);
        let (chunk, fill, total) = (buf.chunk_index(), buf.fill(), buf.total_count());
        let before = buf.concat();

        for i in 0..11 {
            buf.push(Cow::Owned(format!("x{}", i)));
        }
        buf.truncate(chunk, fill, total);

        assert_eq!(buf.concat(), before);
        assert_eq!(buf.chunk_index(), chunk);
        assert_eq!(buf.fill(), fill);
        assert_eq!(buf.total_count(), total);

        buf.push("y".into());
        assert_eq!(buf.concat(), format!("{}y", before));
    }

    #[test]
    fn test_take_complete_keeps_absolute_indices() {
        let mut buf = filled(2, 5);
        assert_eq!(buf.chunk_index(), 2);

        let taken = buf.take_complete();
        assert_eq!(taken.len(), 2);
        assert_eq!(buf.resident_chunks(), 1);
        assert_eq!(buf.chunk_index(), 2);
        assert_eq!(buf.concat(), "4");

        let (chunk, fill, total) = (buf.chunk_index(), buf.fill(), buf.total_count());
        buf.push("5".into());
        buf.push("6".into());
        buf.truncate(chunk, fill, total);
        assert_eq!(buf.concat(), "4");
        assert_eq!(buf.total_count(), 5);
    }

    #[test]
    fn test_take_all_skips_empty_trailing_chunk() {
        let mut buf = filled(2, 4);
        let chunks = buf.take_all();
        assert_eq!(chunks.len(), 2);
        assert_eq!(buf.concat(), "");
        assert_eq!(buf.chunk_index(), 3);
    }
}
