use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::error::{Result, WebsiteChatError};
use crate::models::{ChunkMetadata, EmbeddingRecord, SearchResult};

pub const EXPORT_FILE_NAME: &str = "embeddings.json";

/// Cosine similarity of two vectors, `0.0` when either has no magnitude or
/// the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    (dot_product / (magnitude_a * magnitude_b)).clamp(-1.0, 1.0)
}

/// In-memory embedding store searched by full linear scan.
pub struct VectorStore {
    embedder: Box<dyn Embedder>,
    ids: Vec<String>,
    records: HashMap<String, EmbeddingRecord>,
    export_dir: Option<PathBuf>,
}

impl VectorStore {
    pub fn new(embedder: Box<dyn Embedder>, export_dir: Option<PathBuf>) -> Self {
        Self {
            embedder,
            ids: Vec::new(),
            records: HashMap::new(),
            export_dir,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&EmbeddingRecord> {
        self.records.get(id)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn remove(&mut self, id: &str) -> Option<EmbeddingRecord> {
        let record = self.records.remove(id)?;
        self.ids.retain(|existing| existing != id);
        Some(record)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.records.clear();
    }

    /// Embeds `texts` and upserts them under `ids`. Each text is copied into
    /// its metadata. The store is left untouched if the batch is ragged or
    /// embedding fails.
    pub fn add(
        &mut self,
        ids: Vec<String>,
        texts: Vec<String>,
        metadatas: Vec<ChunkMetadata>,
    ) -> Result<()> {
        if ids.len() != texts.len() || ids.len() != metadatas.len() {
            return Err(WebsiteChatError::MismatchedBatch {
                ids: ids.len(),
                texts: texts.len(),
                metadatas: metadatas.len(),
            });
        }
        if ids.is_empty() {
            return Ok(());
        }

        let embeddings = self.embedder.embed_documents(&texts)?;
        if embeddings.len() != texts.len() {
            return Err(WebsiteChatError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        for (((id, text), mut metadata), embedding) in
            ids.into_iter().zip(texts).zip(metadatas).zip(embeddings)
        {
            metadata.text = text;
            self.upsert(id, EmbeddingRecord { embedding, metadata });
        }

        Ok(())
    }

    fn upsert(&mut self, id: String, record: EmbeddingRecord) {
        if self.records.insert(id.clone(), record).is_none() {
            self.ids.push(id);
        }
    }

    /// Returns the `limit` best matches for `query`, best first. Equal scores
    /// keep insertion order.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if self.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_query(query)?;

        let mut results: Vec<SearchResult> = self
            .ids
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(|record| SearchResult {
                metadata: record.metadata.clone(),
                score: cosine_similarity(&query_embedding, &record.embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);

        debug!("Search for {:?} returned {} results", query, results.len());
        Ok(results)
    }

    /// Writes every record to `<export_dir>/embeddings.json`. Returns the
    /// written path, or `None` when no export directory is configured.
    pub fn export(&self) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.export_dir else {
            return Ok(None);
        };

        let records: BTreeMap<&str, &EmbeddingRecord> = self
            .records
            .iter()
            .map(|(id, record)| (id.as_str(), record))
            .collect();

        fs::create_dir_all(dir)?;
        let path = dir.join(EXPORT_FILE_NAME);
        fs::write(&path, serde_json::to_string_pretty(&records)?)?;

        info!("Exported {} embeddings to {}", records.len(), path.display());
        Ok(Some(path))
    }

    /// Loads records from an exported file, overwriting ids already present.
    /// Returns how many records were read.
    pub fn import(&mut self, path: &Path) -> Result<usize> {
        let records: BTreeMap<String, EmbeddingRecord> =
            serde_json::from_str(&fs::read_to_string(path)?)?;
        let count = records.len();

        for (id, record) in records {
            self.upsert(id, record);
        }

        info!("Imported {} embeddings from {}", count, path.display());
        Ok(count)
    }
}
