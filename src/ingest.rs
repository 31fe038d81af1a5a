//! Ingestion orchestration.
//!
//! Drives the per-file decision policy that keeps the vector index
//! consistent with the files on disk: unseen files are indexed, unchanged
//! files are skipped without touching the index or the tracking store,
//! and changed files have their stale chunks removed before any new
//! content is added. A file counts as indexed only once its tracking
//! entry is persisted.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Config, DocumentsConfig};
use crate::embedding::{self, Embedder};
use crate::error::Error;
use crate::extract;
use crate::hash;
use crate::index::{self, VectorIndex};
use crate::tracking::TrackingStore;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// First time this filename was seen.
    Indexed { chunks: usize },
    /// The filename was tracked under a different fingerprint; old chunks
    /// were removed (best-effort) and the new content indexed.
    Reindexed { chunks: usize, removed: usize },
    /// Tracked with an identical fingerprint; nothing was done.
    Skipped,
}

pub struct Indexer<'a> {
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
    tracking: &'a mut TrackingStore,
}

impl<'a> Indexer<'a> {
    pub fn new(
        index: &'a dyn VectorIndex,
        embedder: &'a dyn Embedder,
        tracking: &'a mut TrackingStore,
    ) -> Self {
        Self {
            index,
            embedder,
            tracking,
        }
    }

    /// Fingerprint one file and bring the index and tracking store up to
    /// date with it.
    pub async fn process_file(&mut self, path: &Path) -> Result<FileOutcome> {
        let filename = file_name_of(path)?;
        let fingerprint = hash::fingerprint(path)?;

        // Unchanged files skip extraction and embedding entirely.
        if self.is_current(&filename, &fingerprint) {
            return Ok(FileOutcome::Skipped);
        }

        let pages = extract::pdf_pages(path)?;
        self.sync_document(&filename, &fingerprint, pages).await
    }

    fn is_current(&self, filename: &str, fingerprint: &str) -> bool {
        self.tracking
            .get(filename)
            .is_some_and(|t| t.fingerprint == fingerprint)
    }

    /// The full decision policy, on already-extracted page texts.
    ///
    /// Blank pages are dropped. A file whose pages are all blank is still
    /// tracked (with no chunks) so re-runs skip it.
    pub async fn sync_document(
        &mut self,
        filename: &str,
        fingerprint: &str,
        pages: Vec<String>,
    ) -> Result<FileOutcome> {
        if self.is_current(filename, fingerprint) {
            return Ok(FileOutcome::Skipped);
        }

        let previous = self.tracking.get(filename).cloned();

        // Stale chunks go before any new content is added, so the index
        // never holds both versions of a file without at least an
        // attempted cleanup. Partial failures are surfaced, not fatal.
        let mut removed = 0;
        if let Some(prev) = &previous {
            removed = prev.chunk_ids.len();
            match self.index.delete_chunks(&prev.chunk_ids).await {
                Ok(()) => {}
                Err(Error::PartialDeletion { failed }) => {
                    tracing::warn!(
                        file = filename,
                        "{} stale chunk(s) could not be deleted: {}",
                        failed.len(),
                        failed.join(", ")
                    );
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("removing stale chunks of {}", filename)));
                }
            }
        }

        let texts: Vec<String> = pages
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let mut chunk_ids = Vec::with_capacity(texts.len());
        if !texts.is_empty() {
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .with_context(|| format!("embedding pages of {}", filename))?;
            if vectors.len() != texts.len() {
                bail!(
                    "{}: embedding returned {} vectors for {} pages",
                    filename,
                    vectors.len(),
                    texts.len()
                );
            }

            for (text, vector) in texts.iter().zip(vectors.iter()) {
                let id = self
                    .index
                    .add_chunk(text, vector)
                    .await
                    .with_context(|| format!("indexing a page of {}", filename))?;
                chunk_ids.push(id);
            }
        }

        let chunks = chunk_ids.len();
        self.tracking
            .upsert(filename, fingerprint, chunk_ids)
            .with_context(|| {
                format!(
                    "recording {} in the tracking store; its chunks remain in the index until a clear",
                    filename
                )
            })?;

        Ok(match previous {
            Some(_) => FileOutcome::Reindexed { chunks, removed },
            None => FileOutcome::Indexed { chunks },
        })
    }

    /// Delete a tracked file's chunks from the index and drop its tracking
    /// entry. Returns false when the filename was never tracked.
    pub async fn remove_file(&mut self, filename: &str) -> Result<bool> {
        let Some(tracked) = self.tracking.get(filename).cloned() else {
            return Ok(false);
        };

        match self.index.delete_chunks(&tracked.chunk_ids).await {
            Ok(()) => {}
            Err(Error::PartialDeletion { failed }) => {
                tracing::warn!(
                    file = filename,
                    "{} chunk(s) could not be deleted: {}",
                    failed.len(),
                    failed.join(", ")
                );
            }
            Err(e) => {
                return Err(
                    anyhow::Error::new(e).context(format!("removing chunks of {}", filename))
                );
            }
        }

        self.tracking.remove(filename)?;
        Ok(true)
    }

    /// Full reset: recreate the index empty and clear all tracking.
    pub async fn clear_all(&mut self) -> Result<()> {
        self.index
            .recreate_index()
            .await
            .context("recreating the index")?;
        self.tracking.clear()?;
        Ok(())
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("path has no filename: {}", path.display()))
}

/// Scan the documents directory for files matching the include globs.
///
/// Filenames are the identity key throughout, so a second file carrying
/// an already-seen name anywhere under the directory is reported and
/// skipped rather than silently treated as a modification of the first.
pub fn scan_documents(config: &DocumentsConfig) -> Result<Vec<PathBuf>> {
    let root = &config.dir;
    if !root.exists() {
        bail!("documents directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;
    let exclude_set = build_globset(&config.exclude_globs)?;

    let mut paths = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        paths.push(path.to_path_buf());
    }

    // Deterministic ordering
    paths.sort();

    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(paths.len());
    for path in paths {
        let name = file_name_of(&path)?;
        if seen.insert(name.clone()) {
            unique.push(path);
        } else {
            tracing::warn!(
                file = %path.display(),
                "duplicate filename {} in input set; skipping this copy",
                name
            );
        }
    }

    Ok(unique)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Index every matching file in the documents directory, one at a time.
/// A failure on one file is reported with its name and the batch moves
/// on to the next.
pub async fn run_index(config: &Config) -> Result<()> {
    let gateway = index::create_index(&config.index)?;
    let embedder = embedding::create_embedder(&config.embedding)?;
    let mut tracking = TrackingStore::load(&config.documents.tracking_path)?;

    gateway.ensure_index().await.context("creating the index")?;

    let files = scan_documents(&config.documents)?;
    let total = files.len();

    let mut indexer = Indexer::new(gateway.as_ref(), embedder.as_ref(), &mut tracking);

    let mut indexed = 0u64;
    let mut reindexed = 0u64;
    let mut skipped = 0u64;
    let mut failed = 0u64;

    for path in &files {
        let name = file_name_of(path)?;
        match indexer.process_file(path).await {
            Ok(FileOutcome::Skipped) => {
                println!("  unchanged, skipping: {}", name);
                skipped += 1;
            }
            Ok(FileOutcome::Indexed { chunks }) => {
                println!("  indexed: {} ({} pages)", name, chunks);
                indexed += 1;
            }
            Ok(FileOutcome::Reindexed { chunks, removed }) => {
                println!(
                    "  re-indexed: {} ({} pages, {} old chunks removed)",
                    name, chunks, removed
                );
                reindexed += 1;
            }
            Err(e) => {
                eprintln!("  error: {}: {:#}", name, e);
                failed += 1;
            }
        }
    }

    println!("index {}", config.documents.dir.display());
    println!("  files found: {}", total);
    println!("  indexed: {}", indexed);
    println!("  re-indexed: {}", reindexed);
    println!("  skipped (unchanged): {}", skipped);
    println!("  failed: {}", failed);
    println!("ok");

    Ok(())
}

/// Remove one file from the index and the tracking store.
pub async fn run_remove(config: &Config, filename: &str) -> Result<()> {
    let gateway = index::create_index(&config.index)?;
    let embedder = embedding::create_embedder(&config.embedding)?;
    let mut tracking = TrackingStore::load(&config.documents.tracking_path)?;

    let mut indexer = Indexer::new(gateway.as_ref(), embedder.as_ref(), &mut tracking);
    if indexer.remove_file(filename).await? {
        println!("removed {} and its chunks", filename);
    } else {
        println!("no record of {}", filename);
    }

    Ok(())
}

/// Drop everything: the whole index and all tracking state.
pub async fn run_clear(config: &Config) -> Result<()> {
    let gateway = index::create_index(&config.index)?;
    let embedder = embedding::create_embedder(&config.embedding)?;
    let mut tracking = TrackingStore::load(&config.documents.tracking_path)?;

    let mut indexer = Indexer::new(gateway.as_ref(), embedder.as_ref(), &mut tracking);
    indexer.clear_all().await?;

    println!("cleared index and tracking state");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn docs_config(dir: &Path) -> DocumentsConfig {
        DocumentsConfig {
            dir: dir.to_path_buf(),
            tracking_path: dir.join("file_tracking.json"),
            include_globs: vec!["**/*.pdf".to_string()],
            exclude_globs: vec![],
        }
    }

    #[test]
    fn scan_matches_globs_recursively() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("a.pdf"), b"x").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/b.pdf"), b"x").unwrap();

        let paths = scan_documents(&docs_config(tmp.path())).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn scan_skips_duplicate_filenames() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("a.pdf"), b"x").unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/a.pdf"), b"y").unwrap();

        let paths = scan_documents(&docs_config(tmp.path())).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0], tmp.path().join("a.pdf"));
    }

    #[test]
    fn scan_missing_dir_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = docs_config(&tmp.path().join("absent"));
        assert!(scan_documents(&config).is_err());
    }
}
