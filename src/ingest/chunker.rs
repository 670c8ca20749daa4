//! Fixed-window text chunking with overlap.

use crate::models::{Chunk, Document, IngestionConfig};

/// Splits documents into fixed-size overlapping windows.
///
/// Windows are measured in characters, not bytes, so multi-byte text
/// chunks the same as ASCII. Every non-final chunk is exactly
/// `chunk_size` characters and shares its trailing `chunk_overlap`
/// characters with the start of the next chunk. Reproducible windows
/// keep the derived chunk IDs stable across re-ingestion runs.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Config validation guarantees `chunk_overlap < chunk_size`; the
    /// assert keeps the window step positive even for hand-built configs.
    pub fn new(config: &IngestionConfig) -> Self {
        debug_assert!(
            config.chunk_overlap < config.chunk_size,
            "chunk_overlap must be smaller than chunk_size"
        );
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }

    /// Chunk a document into overlapping windows.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.content.chars().collect();
        let total_chars = chars.len();

        if total_chars == 0 {
            return Vec::new();
        }

        if total_chars <= self.chunk_size {
            return vec![Chunk::from_document(
                document,
                document.content.clone(),
                0,
                1,
                0,
                total_chars as u64,
            )];
        }

        let step = self.chunk_size - self.overlap;
        let total_chunks = (total_chars - self.overlap).div_ceil(step) as u32;

        let mut chunks = Vec::with_capacity(total_chunks as usize);
        let mut start = 0;
        let mut index = 0u32;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let content: String = chars[start..end].iter().collect();

            chunks.push(Chunk::from_document(
                document,
                content,
                index,
                total_chunks,
                start as u64,
                end as u64,
            ));

            if end >= total_chars {
                break;
            }
            start += step;
            index += 1;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    fn chunker(chunk_size: usize, overlap: usize) -> Chunker {
        Chunker::new(&IngestionConfig {
            chunk_size,
            chunk_overlap: overlap,
            ..Default::default()
        })
    }

    fn document(content: &str) -> Document {
        Document::new(Source::file("/test.txt"), content.to_string(), None)
    }

    #[test]
    #[should_panic(expected = "chunk_overlap must be smaller than chunk_size")]
    fn test_overlap_equal_to_chunk_size_is_rejected() {
        chunker(100, 100);
    }

    #[test]
    fn test_empty_document() {
        let chunks = chunker(600, 200).chunk(&document(""));
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_small_document_single_chunk() {
        let chunks = chunker(600, 200).chunk(&document("Hello, world!"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, world!");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, 13);
    }

    #[test]
    fn test_exact_boundary_single_chunk() {
        let content = "a".repeat(600);
        let chunks = chunker(600, 200).chunk(&document(&content));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_offset, 600);
    }

    #[test]
    fn test_overlapping_windows() {
        let content: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunker(600, 200).chunk(&document(&content));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, 600);
        assert_eq!(chunks[1].start_offset, 400);
        assert_eq!(chunks[1].end_offset, 1000);

        // Last 200 chars of the first window appear at the start of the second.
        let chars: Vec<char> = content.chars().collect();
        let overlap: String = chars[400..600].iter().collect();
        assert!(chunks[0].content.ends_with(&overlap));
        assert!(chunks[1].content.starts_with(&overlap));
    }

    #[test]
    fn test_chunk_count_formula() {
        for total in [601, 1000, 1200, 1201, 5000] {
            let content = "x".repeat(total);
            let chunks = chunker(600, 200).chunk(&document(&content));
            let expected = (total - 200).div_ceil(400);
            assert_eq!(chunks.len(), expected, "length {total}");
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.chunk_index, i as u32);
                assert_eq!(chunk.total_chunks, chunks.len() as u32);
            }
        }
    }

    #[test]
    fn test_non_final_chunks_are_full_size() {
        let content = "y".repeat(2500);
        let chunks = chunker(600, 200).chunk(&document(&content));
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.content.chars().count(), 600);
        }
        assert_eq!(chunks.last().unwrap().end_offset, 2500);
    }

    #[test]
    fn test_multibyte_offsets_are_chars() {
        // 700 two-byte characters: byte length would overflow a 600-char window
        // if offsets were byte-based.
        let content = "é".repeat(700);
        let chunks = chunker(600, 200).chunk(&document(&content));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content.chars().count(), 600);
        assert_eq!(chunks[1].start_offset, 400);
        assert_eq!(chunks[1].end_offset, 700);
    }

    #[test]
    fn test_ids_stable_across_runs() {
        let content = "z".repeat(1500);
        let doc = document(&content);
        let a = chunker(600, 200).chunk(&doc);
        let b = chunker(600, 200).chunk(&doc);
        let ids_a: Vec<_> = a.iter().map(|c| c.id.clone()).collect();
        let ids_b: Vec<_> = b.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
    }
}
