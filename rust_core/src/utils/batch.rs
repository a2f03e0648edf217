//! Splitting upload payloads into API-sized requests.

use crate::error::{Result, SyncError};
use std::slice::Chunks;

/// Lazily split `items` into contiguous chunks of at most `size` elements.
///
/// Each element appears in exactly one chunk, in order. An empty slice yields
/// no chunks.
pub fn chunked<T>(items: &[T], size: usize) -> Result<Chunks<'_, T>> {
    if size == 0 {
        return Err(SyncError::InvalidArgument(
            "batch size must be positive".to_string(),
        ));
    }
    Ok(items.chunks(size))
}

/// Number of chunks [`chunked`] produces for `len` items.
pub fn chunk_count(len: usize, size: usize) -> usize {
    if size == 0 {
        0
    } else {
        len.div_ceil(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_cover_input_once() {
        let items: Vec<u32> = (0..2501).collect();
        for size in [1, 7, 100, 500, 2000, 2501, 5000] {
            let chunks: Vec<&[u32]> = chunked(&items, size).unwrap().collect();
            assert_eq!(chunks.len(), chunk_count(items.len(), size));
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
            assert_eq!(chunks.concat(), items);
        }
    }

    #[test]
    fn test_exact_multiple() {
        let items = vec!["a", "b", "c", "d"];
        let chunks: Vec<&[&str]> = chunked(&items, 2).unwrap().collect();
        assert_eq!(chunks, vec![&["a", "b"][..], &["c", "d"][..]]);
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<u8> = Vec::new();
        assert_eq!(chunked(&items, 10).unwrap().count(), 0);
        assert_eq!(chunk_count(0, 10), 0);
    }

    #[test]
    fn test_zero_size_rejected() {
        let items = vec![1, 2, 3];
        assert!(matches!(
            chunked(&items, 0),
            Err(SyncError::InvalidArgument(_))
        ));
    }
}
