use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunker::Chunker;
use crate::config::Settings;
use crate::context::{file_name, ContextAssembler};
use crate::embedding::{Embedder, FastEmbedder};
use crate::error::Result;
use crate::models::{chunk_id, ChunkMetadata, DocumentStats, RetrievedContext};
use crate::store::{VectorStore, EXPORT_FILE_NAME};

/// A document split into chunks, ready for the store.
struct ProcessedDocument {
    ids: Vec<String>,
    chunks: Vec<String>,
    metadatas: Vec<ChunkMetadata>,
}

/// Indexes a document directory and retrieves context for queries.
pub struct Retriever {
    doc_dir: PathBuf,
    store: VectorStore,
    chunker: Chunker,
    similarity_threshold: f32,
    search_limit: usize,
    /// Source name to the file whose chunks currently hold its ids.
    indexed_paths: HashMap<String, PathBuf>,
    chunk_counts: HashMap<String, usize>,
    stats: DocumentStats,
}

impl Retriever {
    pub fn new(
        doc_dir: PathBuf,
        embedder: Box<dyn Embedder>,
        chunker: Chunker,
        similarity_threshold: f32,
        search_limit: usize,
    ) -> Self {
        Self {
            store: VectorStore::new(embedder, Some(doc_dir.clone())),
            doc_dir,
            chunker,
            similarity_threshold,
            search_limit,
            indexed_paths: HashMap::new(),
            chunk_counts: HashMap::new(),
            stats: DocumentStats::default(),
        }
    }

    /// Builds a retriever backed by the configured fastembed model.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = FastEmbedder::new(
            &settings.embedding.model,
            settings.embedding.query_prefix.clone(),
            settings.embedding.cache_dir.clone(),
            settings.embedding.show_download_progress,
        )?;
        Ok(Self::with_embedder(settings, Box::new(embedder)))
    }

    pub fn with_embedder(settings: &Settings, embedder: Box<dyn Embedder>) -> Self {
        Self::new(
            settings.doc_dir.clone(),
            embedder,
            Chunker::new(settings.chunk_size),
            settings.similarity_threshold,
            settings.search_limit,
        )
    }

    pub fn doc_dir(&self) -> &Path {
        &self.doc_dir
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn stats(&self) -> &DocumentStats {
        &self.stats
    }

    fn process_document(&self, path: &Path) -> Result<ProcessedDocument> {
        let content = fs::read_to_string(path)?;
        let chunks = self.chunker.split(&content);
        let source = file_name(path).unwrap_or_default();

        let ids = (0..chunks.len()).map(|i| chunk_id(&source, i)).collect();
        let metadatas = (0..chunks.len())
            .map(|i| ChunkMetadata::new(source.clone(), i))
            .collect();

        Ok(ProcessedDocument {
            ids,
            chunks,
            metadatas,
        })
    }

    fn document_paths(&self) -> Vec<PathBuf> {
        let export_file = self.doc_dir.join(EXPORT_FILE_NAME);

        WalkDir::new(&self.doc_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping directory entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| *path != export_file)
            .collect()
    }

    /// Rebuilds the store from every file under the document directory and
    /// exports it. Files that cannot be read or embedded are logged and
    /// count as empty.
    pub fn embed_documents(&mut self) -> Result<DocumentStats> {
        self.store.clear();
        self.indexed_paths.clear();
        self.chunk_counts.clear();

        let mut stats = DocumentStats::default();
        for path in self.document_paths() {
            let (_, words) = match self.index_file(&path) {
                Ok(counts) => counts,
                Err(e) => {
                    warn!("Error processing {}: {}", path.display(), e);
                    (0, 0)
                }
            };

            stats.num_files += 1;
            stats.num_words += words;
            stats.num_words_per_file.push(words);
        }
        stats.num_chunks = self.store.len();
        stats.built_at = Some(Utc::now());

        info!(
            "Indexed {} files into {} chunks ({} words)",
            stats.num_files, stats.num_chunks, stats.num_words
        );

        self.store.export()?;
        self.stats = stats.clone();
        Ok(stats)
    }

    /// Returns `(chunks, words)` added for one file. A file sharing its name
    /// with one indexed earlier takes over that name's chunk ids; the earlier
    /// file's leftover chunks are dropped.
    fn index_file(&mut self, path: &Path) -> Result<(usize, usize)> {
        let document = self.process_document(path)?;
        let chunk_count = document.chunks.len();
        let word_count: usize = document
            .chunks
            .iter()
            .map(|chunk| chunk.split_whitespace().count())
            .sum();

        self.store
            .add(document.ids, document.chunks, document.metadatas)?;

        if let Some(name) = file_name(path) {
            let previous = self.chunk_counts.insert(name.clone(), chunk_count).unwrap_or(0);
            for stale in chunk_count..previous {
                self.store.remove(&chunk_id(&name, stale));
            }
            if let Some(shadowed) = self.indexed_paths.insert(name, path.to_path_buf()) {
                warn!("{} replaces {} in the index", path.display(), shadowed.display());
            }
        }
        debug!("Indexed {} ({} chunks)", path.display(), chunk_count);
        Ok((chunk_count, word_count))
    }

    /// Searches the store and assembles the matching documents plus the
    /// landing pages into one context.
    pub fn get_context_for_query(&self, query: &str) -> Result<RetrievedContext> {
        if self.store.is_empty() {
            return Ok(RetrievedContext::default());
        }

        let results = self.store.search(query, self.search_limit)?;
        for result in &results {
            debug!(
                "Hit {} chunk {} score {:.4}",
                result.metadata.source, result.metadata.chunk, result.score
            );
        }

        let assembler =
            ContextAssembler::new(&self.doc_dir, &self.indexed_paths, self.similarity_threshold);
        Ok(assembler.assemble(&results))
    }
}
