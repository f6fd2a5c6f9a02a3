use crate::catalog::ChunkLayout;
use std::ops::Range;

/// Part of `chunk` that falls inside the file range `offset..offset + length`, relative
/// to the start of the chunk.
pub fn chunk_overlap(chunk: &ChunkLayout, offset: u64, length: u64) -> Option<Range<u64>> {
    let start = offset.max(chunk.offset);
    let end = offset.saturating_add(length).min(chunk.end());

    // Requesting a range that misses the chunk entirely.
    if start >= end {
        return None;
    }
    Some(start - chunk.offset..end - chunk.offset)
}
