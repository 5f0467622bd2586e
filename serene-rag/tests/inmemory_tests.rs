//! Property tests for in-memory vector store search ordering.

use std::collections::HashMap;

use serene_rag::document::IndexedEntry;
use serene_rag::inmemory::InMemoryVectorStore;
use serene_rag::vectorstore::VectorStore;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        v.iter_mut().for_each(|x| *x /= norm);
        Some(v)
    })
}

fn arb_entry(dim: usize) -> impl Strategy<Value = IndexedEntry> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, text, embedding)| IndexedEntry { id, text, metadata: HashMap::new(), embedding },
    )
}

/// Searching returns at most `top_k` entries, ordered by ascending cosine
/// distance with ties broken by id, and every distance lies in `[0, 2]`.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_ascending_and_bounded_by_top_k(
            entries in proptest::collection::vec(arb_entry(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();

                let mut deduped: HashMap<String, IndexedEntry> = HashMap::new();
                for entry in &entries {
                    deduped.insert(entry.id.clone(), entry.clone());
                }
                let count = deduped.len();

                store.upsert("test", &entries).await.unwrap();
                (store.search("test", &query, top_k).await.unwrap(), count)
            });

            prop_assert_eq!(results.len(), top_k.min(unique_count));

            for result in &results {
                prop_assert!((0.0..=2.0).contains(&result.distance));
            }

            for window in results.windows(2) {
                let (a, b) = (&window[0], &window[1]);
                prop_assert!(
                    a.distance < b.distance || (a.distance == b.distance && a.entry.id < b.entry.id),
                    "results out of order: {} ({}) before {} ({})",
                    a.entry.id, a.distance, b.entry.id, b.distance,
                );
            }
        }

        #[test]
        fn last_write_wins_within_a_batch(
            first in arb_normalized_embedding(DIM),
            second in arb_normalized_embedding(DIM),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let stored = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                let batch = vec![
                    IndexedEntry { id: "dup".into(), text: "first".into(), metadata: HashMap::new(), embedding: first },
                    IndexedEntry { id: "dup".into(), text: "second".into(), metadata: HashMap::new(), embedding: second.clone() },
                ];
                store.upsert("test", &batch).await.unwrap();
                let count = store.count("test").await.unwrap();
                let hits = store.search("test", &second, 5).await.unwrap();
                (count, hits)
            });

            prop_assert_eq!(stored.0, 1);
            prop_assert_eq!(&stored.1[0].entry.text, "second");
        }
    }
}

#[tokio::test]
async fn dimension_mismatch_rejects_whole_batch() {
    let store = InMemoryVectorStore::new();
    store.create_collection("test", 3).await.unwrap();
    let batch = vec![
        IndexedEntry { id: "ok".into(), text: "ok".into(), metadata: HashMap::new(), embedding: vec![1.0, 0.0, 0.0] },
        IndexedEntry { id: "bad".into(), text: "bad".into(), metadata: HashMap::new(), embedding: vec![1.0] },
    ];

    assert!(store.upsert("test", &batch).await.is_err());
    assert_eq!(store.count("test").await.unwrap(), 0);
}

#[tokio::test]
async fn search_on_missing_collection_fails() {
    let store = InMemoryVectorStore::new();
    assert!(store.search("missing", &[1.0], 1).await.is_err());
    assert_eq!(store.count("missing").await.unwrap(), 0);
}
