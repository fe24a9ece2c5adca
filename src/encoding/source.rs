//! Vocabulary sources.
//!
//! A source turns a rank file name (e.g. `cl100k_base.tiktoken`) into the
//! raw file bytes. Sources are pluggable so the store can read from a local
//! directory, download from the public blob store, or serve embedded data.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use crate::error::{Result, TokCountError};

/// Default location of the published rank files.
pub const DEFAULT_BASE_URL: &str = "https://openaipublic.blob.core.windows.net/encodings";

/// Boxed future returned by [`VocabularySource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Source of rank file bytes.
pub trait VocabularySource: Send + Sync {
    /// Fetch the contents of `file`.
    fn fetch<'a>(&'a self, file: &'a str) -> FetchFuture<'a>;

    /// Short description for logging.
    fn describe(&self) -> String;
}

/// Reads rank files from a local directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Create a source rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this source reads from
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl VocabularySource for DirectorySource {
    fn fetch<'a>(&'a self, file: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let path = self.dir.join(file);
            tokio::fs::read(&path).await.map_err(|e| {
                TokCountError::VocabularyFetch(format!("{}: {e}", path.display()))
            })
        })
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.dir.display())
    }
}

/// Downloads rank files over HTTP, keeping a copy in a cache directory.
///
/// A file already present in the cache directory is read from disk and no
/// request is made.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: reqwest::Client,
    base_url: String,
    cache_dir: Option<PathBuf>,
}

impl RemoteSource {
    /// Create a source downloading from `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TokCountError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_dir: None,
        })
    }

    /// Cache downloaded files in `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// URL a rank file is downloaded from
    pub fn url_for(&self, file: &str) -> String {
        format!("{}/{}", self.base_url, file)
    }

    async fn download(&self, file: &str) -> Result<Vec<u8>> {
        let url = self.url_for(file);
        tracing::info!("Downloading vocabulary from {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Write to a temporary file first so a concurrent reader never sees a
    /// partially written cache entry.
    async fn store_cached(dir: &Path, file: &str, data: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        let tmp = dir.join(format!("{file}.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, dir.join(file)).await
    }
}

impl VocabularySource for RemoteSource {
    fn fetch<'a>(&'a self, file: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            if let Some(dir) = &self.cache_dir {
                let cached = dir.join(file);
                if let Ok(data) = tokio::fs::read(&cached).await {
                    tracing::debug!("Using cached vocabulary {}", cached.display());
                    return Ok(data);
                }
            }

            let data = self.download(file).await?;

            if let Some(dir) = &self.cache_dir {
                if let Err(e) = Self::store_cached(dir, file, &data).await {
                    tracing::warn!("Failed to cache vocabulary in {}: {}", dir.display(), e);
                }
            }

            Ok(data)
        })
    }

    fn describe(&self) -> String {
        format!("remote:{}", self.base_url)
    }
}

/// Serves rank files held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file
    pub fn with_file(mut self, file: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(file, contents);
        self
    }

    /// Add or replace a file
    pub fn insert(&mut self, file: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.insert(file.into(), contents.into());
    }
}

impl VocabularySource for MemorySource {
    fn fetch<'a>(&'a self, file: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            self.files
                .get(file)
                .cloned()
                .ok_or_else(|| TokCountError::VocabularyFetch(format!("{file}: not in memory")))
        })
    }

    fn describe(&self) -> String {
        format!("memory:{} files", self.files.len())
    }
}

/// Tries each source in order; the first success wins.
#[derive(Default)]
pub struct LayeredSource {
    sources: Vec<Box<dyn VocabularySource>>,
}

impl LayeredSource {
    /// Create an empty layered source
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source with lower priority than those already added
    pub fn with(mut self, source: impl VocabularySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no layers were added
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl VocabularySource for LayeredSource {
    fn fetch<'a>(&'a self, file: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let mut last_err = None;
            for source in &self.sources {
                match source.fetch(file).await {
                    Ok(data) => return Ok(data),
                    Err(e) => {
                        tracing::debug!("{} could not provide {}: {}", source.describe(), file, e);
                        last_err = Some(e);
                    },
                }
            }
            Err(last_err.unwrap_or_else(|| {
                TokCountError::VocabularyFetch(format!("{file}: no vocabulary sources configured"))
            }))
        })
    }

    fn describe(&self) -> String {
        let layers: Vec<String> = self.sources.iter().map(|s| s.describe()).collect();
        layers.join(" > ")
    }
}
