//! Vector index gateway.
//!
//! Defines the [`VectorIndex`] trait the ingestion and query layers depend
//! on, and two implementations:
//! - **[`HttpIndex`]** — an OpenSearch-style REST backend: one named index
//!   of `{text, vector}` documents with knn search.
//! - **[`MemoryIndex`]** — an in-process map with cosine-similarity search,
//!   selectable via `index.backend = "memory"` for development and tests.
//!
//! The gateway is constructed once at startup and passed to whoever needs
//! it; there is no implicit singleton.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::config::IndexConfig;
use crate::error::Error;

/// One retrieved chunk, in backend relevance order.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub score: f64,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the index with the configured dimension if absent; no-op if
    /// it already exists.
    async fn ensure_index(&self) -> Result<(), Error>;

    /// Insert one chunk and return the backend-assigned id.
    async fn add_chunk(&self, text: &str, vector: &[f32]) -> Result<String, Error>;

    /// Delete chunks by id, best-effort: a failure on one id never stops
    /// the remaining deletions. Failed ids are collected into
    /// [`Error::PartialDeletion`].
    async fn delete_chunks(&self, ids: &[String]) -> Result<(), Error>;

    /// k-nearest-neighbor search by vector.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, Error>;

    /// Delete the index if present, then recreate it empty.
    async fn recreate_index(&self) -> Result<(), Error>;
}

/// Build the configured gateway.
pub fn create_index(config: &IndexConfig) -> Result<Box<dyn VectorIndex>, Error> {
    match config.backend.as_str() {
        "memory" => Ok(Box::new(MemoryIndex::new(config.dimension))),
        _ => Ok(Box::new(HttpIndex::new(config)?)),
    }
}

// ============ HTTP (OpenSearch-style) backend ============

pub struct HttpIndex {
    client: reqwest::Client,
    base_url: String,
    name: String,
    dimension: usize,
}

impl HttpIndex {
    pub fn new(config: &IndexConfig) -> Result<Self, Error> {
        let base_url = config
            .url
            .clone()
            .ok_or_else(|| Error::BackendUnavailable("index.url is not configured".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            name: config.name.clone(),
            dimension: config.dimension,
        })
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.name)
    }
}

#[async_trait]
impl VectorIndex for HttpIndex {
    async fn ensure_index(&self) -> Result<(), Error> {
        let head = self
            .client
            .head(self.index_url())
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        if head.status().is_success() {
            return Ok(());
        }
        if head.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(Error::BackendUnavailable(format!(
                "index check returned {}",
                head.status()
            )));
        }

        let body = json!({
            "settings": {
                "index": { "knn": true }
            },
            "mappings": {
                "properties": {
                    "text": { "type": "text" },
                    "vector": { "type": "knn_vector", "dimension": self.dimension }
                }
            }
        });

        let resp = self
            .client
            .put(self.index_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        // A concurrent creator may win the race; treat "already exists" as
        // success by re-checking instead of parsing the error body.
        if resp.status().is_success() {
            return Ok(());
        }
        let recheck = self
            .client
            .head(self.index_url())
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;
        if recheck.status().is_success() {
            return Ok(());
        }

        Err(Error::BackendUnavailable(format!(
            "index creation returned {}",
            resp.status()
        )))
    }

    async fn add_chunk(&self, text: &str, vector: &[f32]) -> Result<String, Error> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                want: self.dimension,
                got: vector.len(),
            });
        }

        let resp = self
            .client
            .post(format!("{}/_doc", self.index_url()))
            .json(&json!({ "text": text, "vector": vector }))
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::BackendUnavailable(format!(
                "chunk insert returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;
        body.get("_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::BackendUnavailable("insert response missing _id".into()))
    }

    async fn delete_chunks(&self, ids: &[String]) -> Result<(), Error> {
        let mut failed = Vec::new();

        for id in ids {
            let result = self
                .client
                .delete(format!("{}/_doc/{}", self.index_url(), id))
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => {
                    tracing::warn!(chunk_id = %id, status = %resp.status(), "chunk delete failed");
                    failed.push(id.clone());
                }
                Err(e) => {
                    tracing::warn!(chunk_id = %id, error = %e, "chunk delete failed");
                    failed.push(id.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::PartialDeletion { failed })
        }
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, Error> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                want: self.dimension,
                got: vector.len(),
            });
        }

        let body = json!({
            "size": k,
            "query": {
                "knn": {
                    "vector": { "vector": vector, "k": k }
                }
            }
        });

        let resp = self
            .client
            .post(format!("{}/_search", self.index_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::BackendUnavailable(format!(
                "search returned {}",
                resp.status()
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        let hits = json
            .pointer("/hits/hits")
            .and_then(|h| h.as_array())
            .ok_or_else(|| Error::BackendUnavailable("search response missing hits".into()))?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let id = hit
                .get("_id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let text = hit
                .pointer("/_source/text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let score = hit.get("_score").and_then(|v| v.as_f64()).unwrap_or(0.0);
            results.push(SearchHit { id, text, score });
        }

        Ok(results)
    }

    async fn recreate_index(&self) -> Result<(), Error> {
        let resp = self
            .client
            .delete(self.index_url())
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?;

        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(Error::BackendUnavailable(format!(
                "index delete returned {}",
                resp.status()
            )));
        }

        self.ensure_index().await
    }
}

// ============ In-memory backend ============

struct StoredChunk {
    text: String,
    vector: Vec<f32>,
}

struct MemoryState {
    created: bool,
    chunks: HashMap<String, StoredChunk>,
}

pub struct MemoryIndex {
    dimension: usize,
    state: Mutex<MemoryState>,
}

impl MemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: Mutex::new(MemoryState {
                created: false,
                chunks: HashMap::new(),
            }),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.state.lock().unwrap().chunks.len()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_index(&self) -> Result<(), Error> {
        self.state.lock().unwrap().created = true;
        Ok(())
    }

    async fn add_chunk(&self, text: &str, vector: &[f32]) -> Result<String, Error> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                want: self.dimension,
                got: vector.len(),
            });
        }

        let mut state = self.state.lock().unwrap();
        if !state.created {
            return Err(Error::BackendUnavailable("index does not exist".into()));
        }

        let id = Uuid::new_v4().to_string();
        state.chunks.insert(
            id.clone(),
            StoredChunk {
                text: text.to_string(),
                vector: vector.to_vec(),
            },
        );
        Ok(id)
    }

    async fn delete_chunks(&self, ids: &[String]) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let mut failed = Vec::new();

        for id in ids {
            if state.chunks.remove(id).is_none() {
                failed.push(id.clone());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::PartialDeletion { failed })
        }
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, Error> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                want: self.dimension,
                got: vector.len(),
            });
        }

        let state = self.state.lock().unwrap();
        let mut scored: Vec<SearchHit> = state
            .chunks
            .iter()
            .map(|(id, chunk)| SearchHit {
                id: id.clone(),
                text: chunk.text.clone(),
                score: f64::from(cosine_similarity(vector, &chunk.vector)),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn recreate_index(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.chunks.clear();
        state.created = true;
        Ok(())
    }
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty or mismatched
/// vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
