//! Property tests for recursive chunking.

use serene_rag::chunking::{END_OFFSET_KEY, START_OFFSET_KEY};
use serene_rag::document::Document;
use serene_rag::{Chunker, RecursiveChunker};
use proptest::prelude::*;

/// Words of up to 8 letters joined by single spaces, newlines, blank lines,
/// or long runs of mixed whitespace.
fn arb_text() -> impl Strategy<Value = String> {
    let word = "[a-z]{1,8}";
    let sep = prop_oneof![
        6 => Just(" ".to_string()),
        2 => Just("\n".to_string()),
        1 => Just("\n\n".to_string()),
        1 => "[ \n\t]{3,60}",
    ];
    (word, proptest::collection::vec((sep, word), 0..150)).prop_map(|(first, rest)| {
        let mut text = first;
        for (sep, word) in rest {
            text.push_str(&sep);
            text.push_str(&word);
        }
        text
    })
}

fn span(chunk: &serene_rag::Chunk) -> (usize, usize) {
    (chunk.metadata[START_OFFSET_KEY].parse().unwrap(), chunk.metadata[END_OFFSET_KEY].parse().unwrap())
}

/// Every chunk is an exact slice of its document no longer than `chunk_size`,
/// chunks advance strictly, consecutive chunks share at least `overlap`
/// characters, and the chunks together reconstruct the document.
mod prop_chunks_cover_document {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_are_bounded_slices_that_reconstruct(
            text in arb_text(),
            chunk_size in 12usize..200,
            overlap_pct in 0usize..50,
        ) {
            let overlap = chunk_size * overlap_pct / 100;
            let doc = Document::new(text.clone()).with_metadata("source", "prop");
            let chunks = RecursiveChunker::new(chunk_size, overlap).chunk(&doc);
            let chars: Vec<char> = text.chars().collect();

            prop_assert!(!chunks.is_empty());

            let mut rebuilt = String::new();
            let mut covered = 0usize;
            let mut prev: Option<(usize, usize)> = None;

            for chunk in &chunks {
                let (start, end) = span(chunk);
                let expected: String = chars[start..end].iter().collect();
                prop_assert_eq!(&chunk.text, &expected);
                prop_assert!(end - start <= chunk_size);

                if let Some((prev_start, prev_end)) = prev {
                    prop_assert!(start > prev_start);
                    prop_assert!(start <= prev_end, "gap between {} and {}", prev_end, start);
                    prop_assert!(
                        prev_end - start >= overlap,
                        "overlap {} below {} at {}", prev_end - start, overlap, start
                    );
                } else {
                    prop_assert_eq!(start, 0);
                }

                rebuilt.extend(chars[covered.max(start)..end].iter());
                covered = end;
                prev = Some((start, end));
            }

            prop_assert_eq!(covered, chars.len());
            prop_assert_eq!(rebuilt, text);
        }

        #[test]
        fn text_within_chunk_size_is_returned_whole(
            text in "[a-zA-Z .,\n]{1,80}".prop_filter("non-blank", |t| !t.trim().is_empty()),
        ) {
            let doc = Document::new(text.clone());
            let chunks = RecursiveChunker::new(80, 20).chunk(&doc);
            prop_assert_eq!(chunks.len(), 1);
            prop_assert_eq!(&chunks[0].text, &text);
        }

        #[test]
        fn chunk_ids_are_unique_within_a_document(text in arb_text()) {
            let doc = Document::new(text).with_metadata("source", "prop");
            let chunks = RecursiveChunker::new(40, 10).chunk(&doc);
            let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), chunks.len());
        }
    }
}
