#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! Persistent vector index over LanceDB.
//!
//! One named collection (table) per logical application instance, plus a
//! `<collection>_meta` table recording the established embedding
//! dimensionality so a mismatched backend fails fast instead of silently
//! corrupting similarity geometry. Upserts are idempotent by chunk id;
//! queries rank by cosine distance, ascending, with equal distances
//! broken by insertion order.

pub mod meta;
pub mod schema;

use arrow_array::{
    FixedSizeListArray, Float32Array, Int32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

use mnemo_core::types::{Chunk, ChunkMetadata, RetrievedChunk};
use mnemo_core::{Error, Result};

use crate::schema::build_chunk_schema;

pub struct VectorIndex {
    db: Connection,
    collection: String,
    /// The active backend's dimensionality, if one is available.
    expected_dim: Option<usize>,
    /// Established collection dimensionality; fixed at first write.
    dim: RwLock<Option<usize>>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("collection", &self.collection)
            .field("expected_dim", &self.expected_dim)
            .field("dim", &self.current_dim())
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Open (or create) the collection at `path`.
    ///
    /// `expected_dim` is the active embedding backend's dimensionality;
    /// `None` when the backend is unavailable, which still allows
    /// `count`/`clear`/`query`-by-raw-vector in degraded mode. A recorded
    /// dimensionality that disagrees with `expected_dim` is a hard failure:
    /// the persisted index must be rebuilt before switching backends.
    pub async fn open(path: &Path, collection: &str, expected_dim: Option<usize>) -> Result<Self> {
        let db = connect(path.to_string_lossy().as_ref())
            .execute()
            .await
            .map_err(Error::storage)?;
        let meta_table = meta_table_name(collection);
        let recorded = read_recorded_dim(&db, &meta_table).await?;
        if let (Some(recorded), Some(expected)) = (recorded, expected_dim) {
            if recorded != expected {
                return Err(Error::DimensionMismatch {
                    expected: recorded,
                    got: expected,
                });
            }
        }
        debug!(collection, ?recorded, ?expected_dim, "vector index opened");
        Ok(Self {
            db,
            collection: collection.to_string(),
            expected_dim,
            dim: RwLock::new(recorded.or(expected_dim)),
        })
    }

    /// Insert or overwrite chunks by id. Same id overwrites the prior
    /// entry (last-write-wins), so re-ingesting unchanged content does not
    /// grow the collection. Every row is stamped with a monotonic insertion
    /// sequence; an overwrite counts as a fresh insertion.
    pub async fn upsert(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::InvalidInput(format!(
                "{} chunks with {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let dim = self.establish_dim(vectors[0].len())?;
        for vector in vectors {
            if vector.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    got: vector.len(),
                });
            }
        }
        self.record_dim(dim).await?;

        let base_seq = self.next_seq().await?;
        let batch = chunks_to_record_batch(chunks, vectors, dim, base_seq)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        if self.table_exists().await? {
            let table = self.open_table().await?;
            let mut mi = table.merge_insert(&["id"]);
            mi.when_matched_update_all(None).when_not_matched_insert_all();
            mi.execute(reader).await.map_err(Error::storage)?;
        } else {
            self.db
                .create_table(&self.collection, reader)
                .execute()
                .await
                .map_err(Error::storage)?;
        }
        self.advance_seq(base_seq + chunks.len() as i64).await?;
        debug!(collection = %self.collection, n = chunks.len(), "upserted chunk batch");
        Ok(())
    }

    /// Cosine nearest-neighbor query, ascending by distance. An absent or
    /// cleared collection yields an empty result, never an error.
    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 || !self.table_exists().await? {
            return Ok(Vec::new());
        }
        if let Some(dim) = self.current_dim() {
            if vector.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    got: vector.len(),
                });
            }
        }

        let table = self.open_table().await?;
        let mut stream = table
            .vector_search(vector.to_vec())
            .map_err(Error::storage)?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(Error::storage)?;

        let mut results = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::storage)? {
            for row in 0..batch.num_rows() {
                results.push(row_to_retrieved(&batch, row)?);
            }
        }
        // Equal distances rank by insertion sequence, earliest first.
        results.sort_by(|(a, a_seq), (b, b_seq)| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a_seq.cmp(b_seq))
        });
        Ok(results.into_iter().map(|(r, _)| r).collect())
    }

    /// Current entry count; `0` for an absent or cleared collection.
    pub async fn count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }
        let table = self.open_table().await?;
        table.count_rows(None).await.map_err(Error::storage)
    }

    /// Drop the collection and its recorded dimensionality. Destructive;
    /// callers must serialize this against in-flight upserts and queries on
    /// the same collection.
    pub async fn clear(&self) -> Result<()> {
        for table in [self.collection.clone(), meta_table_name(&self.collection)] {
            let names = self
                .db
                .table_names()
                .execute()
                .await
                .map_err(Error::storage)?;
            if names.contains(&table) {
                self.db
                    .drop_table(&table, &[])
                    .await
                    .map_err(Error::storage)?;
            }
        }
        if let Ok(mut dim) = self.dim.write() {
            *dim = self.expected_dim;
        }
        info!(collection = %self.collection, "collection cleared");
        Ok(())
    }

    fn current_dim(&self) -> Option<usize> {
        self.dim.read().ok().and_then(|d| *d)
    }

    /// Fix the collection dimensionality at first write.
    fn establish_dim(&self, first_vector_len: usize) -> Result<usize> {
        let mut guard = self
            .dim
            .write()
            .map_err(|_| Error::Storage("dimension lock poisoned".to_string()))?;
        match *guard {
            Some(dim) => Ok(dim),
            None => {
                *guard = Some(first_vector_len);
                Ok(first_vector_len)
            }
        }
    }

    /// Persist the established dimensionality alongside the collection if
    /// it is not recorded yet (first write, or first write after a clear).
    async fn record_dim(&self, dim: usize) -> Result<()> {
        let meta_table = meta_table_name(&self.collection);
        if read_recorded_dim(&self.db, &meta_table).await?.is_none() {
            meta::set_meta(&self.db, &meta_table, meta::DIM_KEY, &dim.to_string()).await?;
        }
        Ok(())
    }

    /// Next unassigned insertion sequence; `0` for a fresh collection.
    async fn next_seq(&self) -> Result<i64> {
        let meta_table = meta_table_name(&self.collection);
        match meta::get_meta(&self.db, &meta_table, meta::SEQ_KEY).await? {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| Error::Storage(format!("corrupt insertion sequence: {raw}"))),
            None => Ok(0),
        }
    }

    async fn advance_seq(&self, next: i64) -> Result<()> {
        let meta_table = meta_table_name(&self.collection);
        meta::set_meta(&self.db, &meta_table, meta::SEQ_KEY, &next.to_string()).await
    }

    async fn table_exists(&self) -> Result<bool> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(Error::storage)?;
        Ok(names.contains(&self.collection))
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.db
            .open_table(&self.collection)
            .execute()
            .await
            .map_err(Error::storage)
    }
}

fn meta_table_name(collection: &str) -> String {
    format!("{collection}_meta")
}

async fn read_recorded_dim(db: &Connection, meta_table: &str) -> Result<Option<usize>> {
    match meta::get_meta(db, meta_table, meta::DIM_KEY).await? {
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| Error::Storage(format!("corrupt recorded dimensionality: {raw}"))),
        None => Ok(None),
    }
}

fn chunks_to_record_batch(
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    dim: usize,
    base_seq: i64,
) -> Result<RecordBatch> {
    let schema = build_chunk_schema(dim as i32);
    let mut ids = Vec::with_capacity(chunks.len());
    let mut texts = Vec::with_capacity(chunks.len());
    let mut sources = Vec::with_capacity(chunks.len());
    let mut file_types = Vec::with_capacity(chunks.len());
    let mut topics = Vec::with_capacity(chunks.len());
    let mut subtopics = Vec::with_capacity(chunks.len());
    let mut chunk_indices = Vec::with_capacity(chunks.len());
    let mut totals = Vec::with_capacity(chunks.len());
    let seqs: Vec<i64> = (0..chunks.len() as i64).map(|i| base_seq + i).collect();
    let mut vector_rows: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
    for (chunk, vector) in chunks.iter().zip(vectors) {
        ids.push(chunk.id.clone());
        texts.push(chunk.text.clone());
        sources.push(chunk.metadata.source.clone());
        file_types.push(chunk.metadata.file_type.clone());
        topics.push(chunk.metadata.topic.clone());
        subtopics.push(chunk.metadata.subtopic.clone());
        chunk_indices.push(chunk.metadata.chunk_index as i32);
        totals.push(chunk.metadata.total_chunks as i32);
        vector_rows.push(Some(vector.iter().map(|&x| Some(x)).collect()));
    }
    RecordBatch::try_new(
        schema,
        vec![
            std::sync::Arc::new(StringArray::from(ids)),
            std::sync::Arc::new(StringArray::from(texts)),
            std::sync::Arc::new(StringArray::from(sources)),
            std::sync::Arc::new(StringArray::from(file_types)),
            std::sync::Arc::new(StringArray::from(topics)),
            std::sync::Arc::new(StringArray::from(subtopics)),
            std::sync::Arc::new(Int32Array::from(chunk_indices)),
            std::sync::Arc::new(Int32Array::from(totals)),
            std::sync::Arc::new(Int64Array::from(seqs)),
            std::sync::Arc::new(FixedSizeListArray::from_iter_primitive::<
                arrow_array::types::Float32Type,
                _,
                _,
            >(vector_rows.into_iter(), dim as i32)),
        ],
    )
    .map_err(Error::storage)
}

fn row_to_retrieved(batch: &RecordBatch, row: usize) -> Result<(RetrievedChunk, i64)> {
    let distance = float_col(batch, "_distance")?.value(row);
    let seq = long_col(batch, "seq")?.value(row);
    let retrieved = RetrievedChunk {
        text: string_col(batch, "text")?.value(row).to_string(),
        metadata: ChunkMetadata {
            source: string_col(batch, "source")?.value(row).to_string(),
            chunk_index: int_col(batch, "chunk_index")?.value(row) as usize,
            total_chunks: int_col(batch, "total_chunks")?.value(row) as usize,
            topic: string_col(batch, "topic")?.value(row).to_string(),
            subtopic: string_col(batch, "subtopic")?.value(row).to_string(),
            file_type: string_col(batch, "file_type")?.value(row).to_string(),
        },
        distance,
    };
    Ok((retrieved, seq))
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::Storage(format!("column {name} missing or mistyped")))
}

fn int_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| Error::Storage(format!("column {name} missing or mistyped")))
}

fn long_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| Error::Storage(format!("column {name} missing or mistyped")))
}

fn float_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| Error::Storage(format!("column {name} missing or mistyped")))
}
