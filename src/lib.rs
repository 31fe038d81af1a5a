//! # askdocs
//!
//! Ask questions over a folder of PDFs.
//!
//! askdocs ingests a directory of PDF documents page by page, embeds each
//! page, stores the chunks in a vector index, and answers natural-language
//! questions by retrieving the most relevant chunks and forwarding them
//! with the question to an LLM. Files are tracked by content hash, so
//! re-running ingestion skips unchanged files and cleanly re-indexes
//! changed ones (stale chunks removed first).
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────┐
//! │ PDF dir   │──▶│  Ingestion    │──▶│  Vector   │
//! │ (*.pdf)   │   │ hash→embed   │   │  index    │
//! └───────────┘   └──────┬───────┘   └────┬──────┘
//!                        │                │ top-k
//!                 ┌──────▼──────┐    ┌────▼──────┐
//!                 │  Tracking   │    │   Query   │──▶ LLM answer
//!                 │  (JSON)     │    │  (ask)    │
//!                 └─────────────┘    └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | error taxonomy for the tracking/index core |
//! | [`hash`] | streamed content fingerprinting |
//! | [`tracking`] | persisted filename → chunk-id mapping |
//! | [`index`] | vector index gateway (HTTP and in-memory) |
//! | [`extract`] | per-page PDF text extraction |
//! | [`embedding`] | embedding provider abstraction |
//! | [`answer`] | LLM answer provider |
//! | [`ingest`] | per-file skip/reindex/new orchestration |
//! | [`query`] | retrieval + answering, interactive loop |

pub mod answer;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod hash;
pub mod index;
pub mod ingest;
pub mod query;
pub mod tracking;
