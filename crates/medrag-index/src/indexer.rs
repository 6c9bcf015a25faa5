//! Chunk set → embeddings → search index.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use medrag_core::{Chunk, Error, IndexedDocument, Result, SearchIndex};
use medrag_embed::EmbedderPool;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Progress events emitted while indexing.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexUpdate {
    BatchIndexed { batch: usize, documents: usize },
    BatchFailed { batch: usize, error: String },
    Completed { indexed: usize, failed: usize },
}

/// Configuration for the indexer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Chunks embedded and uploaded per request
    pub batch_size: usize,
    /// Drop and recreate the index before uploading
    pub recreate: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            recreate: false,
        }
    }
}

/// Outcome of an indexing run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub index_name: String,
    pub total_chunks: usize,
    pub indexed: usize,
    pub failed: usize,
    pub batches: usize,
    pub failed_batches: usize,
    /// Per-batch and per-document failure reasons
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Embeds chunk content and uploads it to a [`SearchIndex`].
pub struct DocumentIndexer {
    index: Arc<dyn SearchIndex>,
    embedder: Arc<EmbedderPool>,
    config: IndexerConfig,
    update_tx: broadcast::Sender<IndexUpdate>,
}

impl DocumentIndexer {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        embedder: Arc<EmbedderPool>,
        config: IndexerConfig,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(256);
        Self {
            index,
            embedder,
            config: IndexerConfig {
                batch_size: config.batch_size.max(1),
                ..config
            },
            update_tx,
        }
    }

    /// Subscribe to index updates.
    pub fn subscribe(&self) -> broadcast::Receiver<IndexUpdate> {
        self.update_tx.subscribe()
    }

    /// Create the index for the embedder's dimension, recreating it if configured.
    pub async fn prepare_index(&self) -> Result<()> {
        if self.config.recreate && self.index.delete_index().await? {
            info!(index = self.index.name(), "dropped existing index");
        }
        let created = self.index.create_index(self.embedder.dimension()).await?;
        info!(
            index = self.index.name(),
            created,
            dimension = self.embedder.dimension(),
            "index ready"
        );
        Ok(())
    }

    /// Embed and upload `chunks` batch by batch.
    ///
    /// A failed batch is reported and skipped; the run continues.
    pub async fn index_chunks(&self, chunks: &[Chunk]) -> Result<IndexReport> {
        let started_at = Utc::now();
        let mut report = IndexReport {
            index_name: self.index.name().to_string(),
            total_chunks: chunks.len(),
            indexed: 0,
            failed: 0,
            batches: 0,
            failed_batches: 0,
            errors: Vec::new(),
            started_at,
            finished_at: started_at,
        };

        info!(
            index = self.index.name(),
            chunks = chunks.len(),
            batch_size = self.config.batch_size,
            "indexing chunks"
        );

        for (batch_no, batch) in chunks.chunks(self.config.batch_size).enumerate() {
            report.batches += 1;
            match self.index_batch(batch).await {
                Ok(bulk) => {
                    report.indexed += bulk.indexed;
                    report.failed += bulk.failed;
                    report.errors.extend(bulk.errors);
                    let _ = self.update_tx.send(IndexUpdate::BatchIndexed {
                        batch: batch_no,
                        documents: bulk.indexed,
                    });
                }
                Err(e) => {
                    error!(batch = batch_no, error = %e, "batch failed");
                    report.failed += batch.len();
                    report.failed_batches += 1;
                    report.errors.push(format!("batch {batch_no}: {e}"));
                    let _ = self.update_tx.send(IndexUpdate::BatchFailed {
                        batch: batch_no,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.finished_at = Utc::now();
        if report.failed > 0 {
            warn!(failed = report.failed, "some chunks were not indexed");
        }
        info!(
            indexed = report.indexed,
            failed = report.failed,
            batches = report.batches,
            "indexing complete"
        );
        let _ = self.update_tx.send(IndexUpdate::Completed {
            indexed: report.indexed,
            failed: report.failed,
        });
        Ok(report)
    }

    async fn index_batch(&self, batch: &[Chunk]) -> Result<medrag_core::BulkReport> {
        let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let documents: Vec<(String, IndexedDocument)> = batch
            .iter()
            .zip(embeddings)
            .map(|(chunk, output)| {
                (
                    IndexedDocument::id_for(chunk),
                    IndexedDocument::from_chunk(chunk, output.embedding),
                )
            })
            .collect();

        Ok(self.index.upsert_documents(&documents).await?)
    }
}

/// Read a chunk set written by the chunking pipeline.
pub async fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let bytes = tokio::fs::read(path).await?;
    let chunks: Vec<Chunk> = serde_json::from_slice(&bytes)?;
    if chunks.is_empty() {
        return Err(Error::Other(format!(
            "no chunks in {}",
            path.display()
        )));
    }
    Ok(chunks)
}
