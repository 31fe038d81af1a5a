use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub documents: DocumentsConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Where PDFs live and where the tracking state is persisted.
#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    pub dir: PathBuf,
    pub tracking_path: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// `http` (OpenSearch-style REST backend) or `memory` (in-process, for
    /// development and tests).
    #[serde(default = "default_index_backend")]
    pub backend: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_index_name")]
    pub name: String,
    pub dimension: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_index_backend() -> String {
    "http".to_string()
}
fn default_index_name() -> String {
    "askdocs".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `openai` or `ollama`.
    pub provider: String,
    pub model: String,
    pub dims: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    /// `openai` (any OpenAI-compatible chat endpoint via `url`).
    #[serde(default = "default_answer_provider")]
    pub provider: String,
    #[serde(default = "default_answer_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_answer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: default_answer_provider(),
            model: default_answer_model(),
            url: None,
            timeout_secs: default_answer_timeout_secs(),
        }
    }
}

fn default_answer_provider() -> String {
    "openai".to_string()
}
fn default_answer_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_answer_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.index.dimension == 0 {
        anyhow::bail!("index.dimension must be > 0");
    }

    match config.index.backend.as_str() {
        "memory" => {}
        "http" => {
            if config.index.url.is_none() {
                anyhow::bail!("index.url is required when index.backend is 'http'");
            }
        }
        other => anyhow::bail!("Unknown index backend: '{}'. Must be http or memory.", other),
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    if config.embedding.dims != config.index.dimension {
        anyhow::bail!(
            "embedding.dims ({}) does not match index.dimension ({})",
            config.embedding.dims,
            config.index.dimension
        );
    }

    match config.answer.provider.as_str() {
        "openai" => {}
        other => anyhow::bail!("Unknown answer provider: '{}'. Must be openai.", other),
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const VALID: &str = r#"
[documents]
dir = "./data"
tracking_path = "./data/file_tracking.json"

[index]
backend = "memory"
dimension = 384

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 384
"#;

    #[test]
    fn valid_config_loads_with_defaults() {
        let f = write_config(VALID);
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.index.name, "askdocs");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.documents.include_globs, vec!["**/*.pdf"]);
        assert_eq!(config.answer.provider, "openai");
    }

    #[test]
    fn http_backend_requires_url() {
        let f = write_config(&VALID.replace("backend = \"memory\"", "backend = \"http\""));
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("index.url"));
    }

    #[test]
    fn mismatched_dims_rejected() {
        let f = write_config(&VALID.replace("dims = 384", "dims = 768"));
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn unknown_embedding_provider_rejected() {
        let f = write_config(&VALID.replace("provider = \"ollama\"", "provider = \"bert\""));
        assert!(load_config(f.path()).is_err());
    }
}
