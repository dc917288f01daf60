//! LanceDB vector database client
//!
//! One table per index directory, holding each chunk's vector, text, source
//! id, position and insertion ordinal.

use super::{ScoredChunk, VectorDatabase};
use crate::indexer::Chunk;
use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array, UInt64Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

const TABLE_NAME: &str = "chunks";

/// LanceDB vector database implementation (embedded, no server required)
pub struct LanceVectorDB {
    connection: Connection,
    table_name: String,
    db_path: String,
}

impl LanceVectorDB {
    /// Open (or create) a database rooted at `db_path`
    pub async fn with_path(db_path: &str) -> Result<Self> {
        tracing::debug!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(db_path)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            db_path: db_path.to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Create schema for the chunks table
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
            Field::new("source_id", DataType::Utf8, false),
            Field::new("sequence_index", DataType::UInt32, false),
            Field::new("offset", DataType::UInt64, false),
            Field::new("ordinal", DataType::UInt64, false),
        ]))
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;
        Ok(table_names.contains(&self.table_name))
    }

    async fn get_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .context("Failed to open table")
    }

    /// Convert embeddings and chunks to a RecordBatch
    fn create_record_batch(
        embeddings: Vec<Vec<f32>>,
        chunks: &[Chunk],
        first_ordinal: u64,
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let dimension = embeddings.first().map(|v| v.len()).unwrap_or(0);

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            embeddings
                .into_iter()
                .map(|v| Some(v.into_iter().map(Some))),
            dimension as i32,
        );
        let text_array = StringArray::from(chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>());
        let source_array =
            StringArray::from(chunks.iter().map(|c| c.source_id.as_str()).collect::<Vec<_>>());
        let sequence_array = UInt32Array::from(
            chunks
                .iter()
                .map(|c| c.sequence_index as u32)
                .collect::<Vec<_>>(),
        );
        let offset_array =
            UInt64Array::from(chunks.iter().map(|c| c.offset as u64).collect::<Vec<_>>());
        let ordinal_array = UInt64Array::from(
            (0..chunks.len() as u64)
                .map(|i| first_ordinal + i)
                .collect::<Vec<_>>(),
        );

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(vector_array),
                Arc::new(text_array),
                Arc::new(source_array),
                Arc::new(sequence_array),
                Arc::new(offset_array),
                Arc::new(ordinal_array),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
        batch
            .column_by_name(name)
            .with_context(|| format!("Missing {} column", name))?
            .as_any()
            .downcast_ref::<T>()
            .with_context(|| format!("Invalid {} column type", name))
    }

    fn read_batch(batch: &RecordBatch, out: &mut Vec<ScoredChunk>) -> Result<()> {
        let distance = Self::column::<Float32Array>(batch, "_distance")?;
        let text = Self::column::<StringArray>(batch, "text")?;
        let source = Self::column::<StringArray>(batch, "source_id")?;
        let sequence = Self::column::<UInt32Array>(batch, "sequence_index")?;
        let offset = Self::column::<UInt64Array>(batch, "offset")?;
        let ordinal = Self::column::<UInt64Array>(batch, "ordinal")?;

        for i in 0..batch.num_rows() {
            out.push(ScoredChunk {
                chunk: Chunk {
                    text: text.value(i).to_string(),
                    source_id: source.value(i).to_string(),
                    sequence_index: sequence.value(i) as usize,
                    offset: offset.value(i) as usize,
                },
                score: 1.0 / (1.0 + distance.value(i)),
                ordinal: ordinal.value(i),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl VectorDatabase for LanceVectorDB {
    async fn initialize(&self, dimension: usize) -> Result<()> {
        if self.table_exists().await? {
            tracing::debug!("Table '{}' already exists", self.table_name);
            return Ok(());
        }

        let schema = Self::create_schema(dimension);
        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches =
            RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema.clone());

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .context("Failed to create table")?;

        tracing::info!(
            "Created table '{}' (dimension {}) at {}",
            self.table_name,
            dimension,
            self.db_path
        );
        Ok(())
    }

    async fn store_chunks(
        &self,
        embeddings: Vec<Vec<f32>>,
        chunks: &[Chunk],
        first_ordinal: u64,
    ) -> Result<usize> {
        if embeddings.is_empty() {
            return Ok(0);
        }
        anyhow::ensure!(
            embeddings.len() == chunks.len(),
            "Got {} embeddings for {} chunks",
            embeddings.len(),
            chunks.len()
        );

        let schema = Self::create_schema(embeddings[0].len());
        let batch = Self::create_record_batch(embeddings, chunks, first_ordinal, schema.clone())?;
        let count = batch.num_rows();

        let table = self.get_table().await?;
        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);
        table
            .add(Box::new(batches))
            .execute()
            .await
            .context("Failed to add records to table")?;

        tracing::debug!("Stored {} chunks in {}", count, self.db_path);
        Ok(count)
    }

    async fn search(&self, query_vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredChunk>> {
        if limit == 0 || !self.table_exists().await? {
            return Ok(Vec::new());
        }

        let table = self.get_table().await?;
        let rows = table
            .count_rows(None)
            .await
            .context("Failed to count rows")?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let stream = table
            .vector_search(query_vector)
            .context("Failed to create vector search")?
            .limit(limit)
            .execute()
            .await
            .context("Failed to execute search")?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect search results")?;

        let mut results = Vec::new();
        for batch in &batches {
            Self::read_batch(batch, &mut results)?;
        }

        // Nearest first; equal scores keep insertion order
        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.ordinal.cmp(&b.ordinal))
        });
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }
        let table = self.get_table().await?;
        let rows = table
            .count_rows(None)
            .await
            .context("Failed to count rows")?;
        Ok(rows)
    }
}
