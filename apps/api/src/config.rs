use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::analysis::ranking::clamp_max_sections;

/// Which embedding capability backs the semantic signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Hashing,
    Remote,
    None,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hashing" | "local" => Ok(Self::Hashing),
            "remote" | "openai" => Ok(Self::Remote),
            "none" | "disabled" => Ok(Self::None),
            other => bail!("EMBEDDING_BACKEND must be hashing, remote or none (got '{other}')"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Required when `backend` is `Remote`.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub parallel: bool,
}

/// Application configuration loaded from environment variables.
/// Fails at startup on malformed values or a remote backend without a URL.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Default K when a request does not supply one. Already clamped to 1..=20.
    pub max_sections: usize,
    pub request_timeout_secs: u64,
    pub max_upload_mb: usize,
    pub refined_text_max_chars: usize,
    pub embedding: EmbeddingConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend: EmbeddingBackend = parse_or(&lookup, "EMBEDDING_BACKEND", EmbeddingBackend::Hashing)?;
        let api_url = lookup("EMBEDDING_API_URL").filter(|v| !v.trim().is_empty());
        if backend == EmbeddingBackend::Remote && api_url.is_none() {
            require(&lookup, "EMBEDDING_API_URL")?;
        }

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_sections: clamp_max_sections(parse_or(&lookup, "MAX_SECTIONS", 10)?),
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 60)?,
            max_upload_mb: parse_or(&lookup, "MAX_UPLOAD_MB", 50)?,
            refined_text_max_chars: parse_or(&lookup, "REFINED_TEXT_MAX_CHARS", 500)?,
            embedding: EmbeddingConfig {
                backend,
                api_url,
                api_key: lookup("EMBEDDING_API_KEY").filter(|v| !v.trim().is_empty()),
                model: lookup("EMBEDDING_MODEL")
                    .unwrap_or_else(|| "text-embedding-3-small".to_string()),
                timeout_secs: parse_or(&lookup, "EMBEDDING_TIMEOUT_SECS", 10)?,
                parallel: parse_or(&lookup, "EMBEDDING_PARALLEL", true)?,
            },
        })
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
    }
}
