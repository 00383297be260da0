//! Per-collection key/value metadata table.
//!
//! Stores durable facts about a collection that must survive restarts:
//! the established embedding dimensionality and the insertion-sequence
//! counter. Keys are unique;
//! writes upsert via `merge_insert` on the key column.

use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Connection;
use std::sync::Arc;

use mnemo_core::{Error, Result};

pub const DIM_KEY: &str = "embedding_dim";
pub const SEQ_KEY: &str = "next_seq";

fn build_meta_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
        Field::new(
            "updated_at",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
    ]))
}

async fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let names = conn
        .table_names()
        .execute()
        .await
        .map_err(Error::storage)?;
    Ok(names.contains(&table.to_string()))
}

async fn ensure_meta_table(conn: &Connection, table: &str) -> Result<()> {
    if table_exists(conn, table).await? {
        return Ok(());
    }
    let schema = build_meta_schema();
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(table, Box::new(iter))
        .execute()
        .await
        .map_err(Error::storage)?;
    Ok(())
}

pub async fn set_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<()> {
    ensure_meta_table(conn, table).await?;
    let t = conn
        .open_table(table)
        .execute()
        .await
        .map_err(Error::storage)?;
    let schema = build_meta_schema();
    let rb = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec![key.to_string()])),
            Arc::new(StringArray::from(vec![value.to_string()])),
            Arc::new(TimestampMillisecondArray::from(vec![
                Utc::now().timestamp_millis(),
            ])),
        ],
    )
    .map_err(Error::storage)?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
    let mut mi = t.merge_insert(&["key"]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    mi.execute(reader).await.map_err(Error::storage)?;
    Ok(())
}

pub async fn get_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>> {
    if !table_exists(conn, table).await? {
        return Ok(None);
    }
    let t = conn
        .open_table(table)
        .execute()
        .await
        .map_err(Error::storage)?;
    let filter = format!("key = '{}'", key.replace('\'', "''"));
    let mut stream = t
        .query()
        .only_if(&filter)
        .execute()
        .await
        .map_err(Error::storage)?;
    while let Some(batch) = stream.try_next().await.map_err(Error::storage)? {
        if batch.num_rows() == 0 {
            continue;
        }
        let values = batch
            .column_by_name("value")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| Error::Storage("meta.value column missing".to_string()))?;
        return Ok(Some(values.value(0).to_string()));
    }
    Ok(None)
}
