use mnemo_chunk::chunk_id;
use mnemo_core::traits::Embedder;
use mnemo_core::types::{Chunk, ChunkMetadata};
use mnemo_core::Error;
use mnemo_embed::HashedEmbedder;
use mnemo_vector::VectorIndex;

const DIM: usize = 64;

fn chunk(text: &str, source: &str, chunk_index: usize) -> Chunk {
    Chunk {
        id: chunk_id(text, source, chunk_index),
        text: text.to_string(),
        metadata: ChunkMetadata {
            source: source.to_string(),
            chunk_index,
            total_chunks: 1,
            topic: "General".to_string(),
            subtopic: String::new(),
            file_type: "txt".to_string(),
        },
    }
}

async fn embed(embedder: &HashedEmbedder, chunks: &[Chunk]) -> Vec<Vec<f32>> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    embedder.embed_batch(&texts).await.expect("embed")
}

#[tokio::test]
async fn upsert_then_query_returns_the_chunk_with_near_zero_distance() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;
    let embedder = HashedEmbedder::new(DIM);

    let chunks = vec![chunk("X marks the spot", "A", 0)];
    let vectors = embed(&embedder, &chunks).await;
    index.upsert(&chunks, &vectors).await?;

    let results = index.query(&vectors[0], 1).await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "X marks the spot");
    assert_eq!(results[0].metadata.source, "A");
    assert!(results[0].distance.abs() < 1e-4);
    Ok(())
}

#[tokio::test]
async fn repeated_upsert_of_the_same_id_does_not_grow_the_collection() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;
    let embedder = HashedEmbedder::new(DIM);

    let chunks = vec![chunk("stable content", "A", 0), chunk("more content", "A", 1)];
    let vectors = embed(&embedder, &chunks).await;
    index.upsert(&chunks, &vectors).await?;
    assert_eq!(index.count().await?, 2);

    index.upsert(&chunks, &vectors).await?;
    index.upsert(&chunks, &vectors).await?;
    assert_eq!(index.count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn query_ranks_by_cosine_distance() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = VectorIndex::open(tmp.path(), "chunks", Some(256)).await?;
    let embedder = HashedEmbedder::new(256);

    let chunks = vec![
        chunk("Paris is the capital of France.", "A", 0),
        chunk("Berlin is the capital of Germany.", "B", 0),
    ];
    let vectors = embed(&embedder, &chunks).await;
    index.upsert(&chunks, &vectors).await?;

    let query = embedder
        .embed_batch(&["capital of France".to_string()])
        .await?;
    let results = index.query(&query[0], 2).await?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metadata.source, "A");
    assert!(results[0].distance < results[1].distance);
    Ok(())
}

#[tokio::test]
async fn equal_distances_rank_the_first_inserted_entry_first() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;
    let embedder = HashedEmbedder::new(DIM);

    // The same text in two sources embeds to the identical vector, so both
    // entries sit at exactly the same distance from the query.
    let first = vec![chunk("identical content", "early.txt", 0)];
    let second = vec![chunk("identical content", "late.txt", 0)];
    let vectors = embed(&embedder, &first).await;
    index.upsert(&first, &vectors).await?;
    index.upsert(&second, &vectors).await?;

    let results = index.query(&vectors[0], 2).await?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metadata.source, "early.txt");
    assert_eq!(results[1].metadata.source, "late.txt");

    // Reversed insertion order in a fresh collection reverses the ranking,
    // so the tie-break follows insertion order, not entry names.
    let tmp2 = tempfile::tempdir()?;
    let reversed = VectorIndex::open(tmp2.path(), "chunks", Some(DIM)).await?;
    reversed.upsert(&second, &vectors).await?;
    reversed.upsert(&first, &vectors).await?;
    let results = reversed.query(&vectors[0], 2).await?;
    assert_eq!(results[0].metadata.source, "late.txt");
    assert_eq!(results[1].metadata.source, "early.txt");
    Ok(())
}

#[tokio::test]
async fn count_is_zero_for_an_absent_collection() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = VectorIndex::open(tmp.path(), "never_written", Some(DIM)).await?;
    assert_eq!(index.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn query_on_an_absent_collection_is_empty_not_an_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = VectorIndex::open(tmp.path(), "never_written", Some(DIM)).await?;
    let results = index.query(&vec![0.0; DIM], 5).await?;
    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
async fn clear_empties_the_collection_and_subsequent_queries() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;
    let embedder = HashedEmbedder::new(DIM);

    let chunks = vec![chunk("ephemeral", "A", 0)];
    let vectors = embed(&embedder, &chunks).await;
    index.upsert(&chunks, &vectors).await?;
    assert_eq!(index.count().await?, 1);

    index.clear().await?;
    assert_eq!(index.count().await?, 0);
    let results = index.query(&vectors[0], 3).await?;
    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
async fn upsert_rejects_a_vector_of_the_wrong_width() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;

    let chunks = vec![chunk("bad vector", "A", 0)];
    let err = index
        .upsert(&chunks, &[vec![0.5; DIM + 3]])
        .await
        .expect_err("must fail");
    assert!(matches!(err, Error::DimensionMismatch { .. }));
    Ok(())
}

#[tokio::test]
async fn mismatched_chunk_and_vector_counts_are_rejected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;
    let chunks = vec![chunk("one", "A", 0)];
    let err = index.upsert(&chunks, &[]).await.expect_err("must fail");
    assert!(matches!(err, Error::InvalidInput(_)));
    Ok(())
}

#[tokio::test]
async fn state_survives_reopen_against_the_same_path() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let embedder = HashedEmbedder::new(DIM);
    let chunks = vec![chunk("durable fact", "A", 0)];
    let vectors = embed(&embedder, &chunks).await;

    {
        let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;
        index.upsert(&chunks, &vectors).await?;
    }

    let reopened = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;
    assert_eq!(reopened.count().await?, 1);
    let results = reopened.query(&vectors[0], 1).await?;
    assert_eq!(results[0].text, "durable fact");
    Ok(())
}

#[tokio::test]
async fn reopening_with_a_different_dimensionality_fails_fast() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let embedder = HashedEmbedder::new(DIM);
    let chunks = vec![chunk("dimension anchor", "A", 0)];
    let vectors = embed(&embedder, &chunks).await;
    {
        let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;
        index.upsert(&chunks, &vectors).await?;
    }

    let err = VectorIndex::open(tmp.path(), "chunks", Some(DIM * 2))
        .await
        .expect_err("must fail");
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: DIM,
            got: _
        }
    ));
    Ok(())
}

#[tokio::test]
async fn clear_allows_rebuilding_under_a_new_dimensionality() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let embedder = HashedEmbedder::new(DIM);
    let chunks = vec![chunk("first generation", "A", 0)];
    let vectors = embed(&embedder, &chunks).await;
    {
        let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM)).await?;
        index.upsert(&chunks, &vectors).await?;
        index.clear().await?;
    }

    // After an explicit clear the recorded dimensionality is gone, so a new
    // backend may rebuild the collection.
    let wide = HashedEmbedder::new(DIM * 2);
    let index = VectorIndex::open(tmp.path(), "chunks", Some(DIM * 2)).await?;
    let wide_vectors = embed(&wide, &chunks).await;
    index.upsert(&chunks, &wide_vectors).await?;
    assert_eq!(index.count().await?, 1);
    Ok(())
}
