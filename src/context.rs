use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::{RetrievedContext, SearchResult};

/// Subdirectory whose files go into every context.
pub const LANDING_DIR: &str = "landing";

const SEPARATOR: &str = "\n\n";

pub(crate) fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().to_string())
}

/// Every file under `<doc_dir>/landing`, as `(file name, path)` in sorted
/// walk order. A missing landing directory yields nothing.
pub fn landing_page_sources(doc_dir: &Path) -> Vec<(String, PathBuf)> {
    let landing = doc_dir.join(LANDING_DIR);
    if !landing.is_dir() {
        return Vec::new();
    }

    WalkDir::new(&landing)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping landing entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| file_name(entry.path()).map(|name| (name, entry.into_path())))
        .collect()
}

/// Joins the files behind search hits and landing pages into one context.
pub struct ContextAssembler<'a> {
    doc_dir: &'a Path,
    indexed_paths: &'a HashMap<String, PathBuf>,
    similarity_threshold: f32,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(
        doc_dir: &'a Path,
        indexed_paths: &'a HashMap<String, PathBuf>,
        similarity_threshold: f32,
    ) -> Self {
        Self {
            doc_dir,
            indexed_paths,
            similarity_threshold,
        }
    }

    /// Where the file behind a search hit lives: the path it was indexed
    /// from, else the doc dir root, else the landing directory.
    fn resolve(&self, source: &str) -> Option<PathBuf> {
        if let Some(path) = self.indexed_paths.get(source) {
            return Some(path.clone());
        }
        [
            self.doc_dir.join(source),
            self.doc_dir.join(LANDING_DIR).join(source),
        ]
        .into_iter()
        .find(|path| path.is_file())
    }

    /// Builds the context for a ranked result list. Hits must score strictly
    /// above the threshold; landing pages are always appended, even when
    /// there are no hits at all.
    pub fn assemble(&self, results: &[SearchResult]) -> RetrievedContext {
        let max_score = results.iter().map(|r| r.score).reduce(f32::max);

        let mut candidates: Vec<(String, Option<PathBuf>)> = results
            .iter()
            .filter(|r| r.score > self.similarity_threshold)
            .map(|r| {
                let source = r.metadata.source.clone();
                let path = self.resolve(&source);
                (source, path)
            })
            .collect();
        debug!(
            "{} of {} results above threshold {}",
            candidates.len(),
            results.len(),
            self.similarity_threshold
        );
        candidates.extend(
            landing_page_sources(self.doc_dir)
                .into_iter()
                .map(|(name, path)| (name, Some(path))),
        );

        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        let mut contents = Vec::new();
        for (source, path) in candidates {
            if !seen.insert(source.clone()) {
                continue;
            }
            let Some(path) = path else {
                warn!("No file found for source {}", source);
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(content) => {
                    contents.push(content);
                    sources.push(source);
                }
                Err(e) => warn!("Could not read {}: {}", path.display(), e),
            }
        }

        RetrievedContext {
            context: contents.join(SEPARATOR),
            sources,
            max_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;
    use tempfile::TempDir;

    fn hit(source: &str, score: f32) -> SearchResult {
        SearchResult {
            metadata: ChunkMetadata::new(source, 0),
            score,
        }
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_landing_sources_are_recursive() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "landing/index.md", "Welcome page.");
        write(dir.path(), "landing/nested/about.md", "About us.");
        write(dir.path(), "other.md", "Not landing.");

        let mut names: Vec<String> = landing_page_sources(dir.path())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["about.md", "index.md"]);

        let empty = TempDir::new()?;
        assert!(landing_page_sources(empty.path()).is_empty());
        Ok(())
    }

    #[test]
    fn test_filters_by_threshold_and_appends_landing() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "a.md", "The sky is blue.");
        write(dir.path(), "b.md", "Unrelated.");
        write(dir.path(), "landing/index.md", "Welcome page.");
        let indexed = HashMap::new();

        let assembler = ContextAssembler::new(dir.path(), &indexed, 0.6);
        let context = assembler.assemble(&[hit("a.md", 0.9), hit("b.md", 0.6)]);

        assert_eq!(context.sources, vec!["a.md", "index.md"]);
        assert_eq!(context.context, "The sky is blue.\n\nWelcome page.");
        assert_eq!(context.max_score, Some(0.9));
        Ok(())
    }

    #[test]
    fn test_landing_only_when_nothing_passes() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "a.md", "The sky is blue.");
        write(dir.path(), "landing/index.md", "Welcome page.");
        let indexed = HashMap::new();

        let assembler = ContextAssembler::new(dir.path(), &indexed, 0.6);
        let context = assembler.assemble(&[hit("a.md", 0.2)]);

        assert_eq!(context.sources, vec!["index.md"]);
        assert_eq!(context.context, "Welcome page.");
        assert_eq!(context.max_score, Some(0.2));
        Ok(())
    }

    #[test]
    fn test_duplicate_sources_are_read_once() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "index.md", "Welcome page.");
        write(dir.path(), "landing/index.md", "Welcome page.");
        let indexed = HashMap::new();

        let assembler = ContextAssembler::new(dir.path(), &indexed, 0.0);
        let context = assembler.assemble(&[hit("index.md", 0.8), hit("index.md", 0.7)]);

        assert_eq!(context.sources, vec!["index.md"]);
        assert_eq!(context.context, "Welcome page.");
        Ok(())
    }

    #[test]
    fn test_nested_source_resolves_through_index() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "guides/deep.md", "Deep content.");
        let mut indexed = HashMap::new();
        indexed.insert("deep.md".to_string(), dir.path().join("guides/deep.md"));

        let assembler = ContextAssembler::new(dir.path(), &indexed, 0.5);
        let context = assembler.assemble(&[hit("deep.md", 0.7)]);

        assert_eq!(context.context, "Deep content.");
        Ok(())
    }

    #[test]
    fn test_missing_source_is_skipped() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let indexed = HashMap::new();

        let assembler = ContextAssembler::new(dir.path(), &indexed, 0.5);
        let context = assembler.assemble(&[hit("gone.md", 0.9)]);

        assert!(context.is_empty());
        assert!(context.sources.is_empty());
        assert_eq!(context.max_score, Some(0.9));
        Ok(())
    }

    #[test]
    fn test_no_results_still_includes_landing() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "landing/index.md", "Welcome page.");
        let indexed = HashMap::new();

        let context = ContextAssembler::new(dir.path(), &indexed, 0.6).assemble(&[]);
        assert_eq!(context.context, "Welcome page.");
        assert_eq!(context.sources, vec!["index.md"]);
        assert_eq!(context.max_score, None);
        Ok(())
    }
}
