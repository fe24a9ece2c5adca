//! Process-wide encoding cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::OnceCell;

use super::bpe::Encoding;
use super::definition::{definition, EncodingDefinition};
use super::source::{DirectorySource, LayeredSource, RemoteSource, VocabularySource};
use super::vocab::parse_rank_file;
use crate::config::VocabConfig;
use crate::error::{Result, TokCountError};

type Slot = Arc<OnceCell<Arc<Encoding>>>;

/// Loads encodings on first use and shares them read-only afterwards.
///
/// Each encoding name gets its own initialization cell, so concurrent first
/// loads of one name build it once while loads of different names proceed
/// independently. A failed build leaves the cell empty and the next call
/// retries.
///
/// # Example
/// ```rust,ignore
/// use std::sync::Arc;
/// use tokcount::encoding::{DirectorySource, EncodingStore};
///
/// let store = Arc::new(EncodingStore::new(DirectorySource::new("/opt/vocab")));
/// let encoding = store.load("cl100k_base").await?;
/// assert_eq!(store.load_count(), 1);
/// ```
pub struct EncodingStore {
    source: Box<dyn VocabularySource>,
    slots: Mutex<HashMap<&'static str, Slot>>,
    loads: AtomicUsize,
}

impl EncodingStore {
    /// Create a store backed by `source`.
    pub fn new(source: impl VocabularySource + 'static) -> Self {
        Self {
            source: Box::new(source),
            slots: Mutex::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Create a store from vocabulary configuration.
    ///
    /// Sources are layered: the configured directory first, then the
    /// download cache with remote fallback unless running offline.
    pub fn from_config(config: &VocabConfig) -> Result<Self> {
        let mut source = LayeredSource::new();

        if let Some(dir) = &config.dir {
            source = source.with(DirectorySource::new(dir));
        }

        if config.offline {
            if let Some(cache) = &config.cache_dir {
                source = source.with(DirectorySource::new(cache));
            }
        } else {
            let mut remote = RemoteSource::new(
                config.base_url.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            if let Some(cache) = &config.cache_dir {
                remote = remote.with_cache_dir(cache);
            }
            source = source.with(remote);
        }

        if source.is_empty() {
            return Err(TokCountError::Config(
                "offline mode requires vocab.dir or vocab.cache_dir".to_string(),
            ));
        }

        Ok(Self::new(source))
    }

    /// Get the encoding named `name`, loading it on first use.
    pub async fn load(&self, name: &str) -> Result<Arc<Encoding>> {
        let def = definition(name)?;
        let slot = self.slot(def.name);

        if let Some(encoding) = slot.get() {
            tracing::debug!("Encoding cache hit: {}", def.name);
            return Ok(Arc::clone(encoding));
        }

        let encoding = slot.get_or_try_init(|| self.build(def)).await?;
        Ok(Arc::clone(encoding))
    }

    /// Number of encodings this store has built
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Names of encodings currently cached
    pub fn cached(&self) -> Vec<&'static str> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = slots
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(name, _)| *name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Description of the backing source
    pub fn source(&self) -> String {
        self.source.describe()
    }

    fn slot(&self, name: &'static str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(name).or_default())
    }

    async fn build(&self, def: &'static EncodingDefinition) -> Result<Arc<Encoding>> {
        let data = self.source.fetch(def.rank_file).await?;

        // Parsing ~100k ranks and compiling the patterns is CPU-bound.
        let encoding = tokio::task::spawn_blocking(move || {
            let ranks = parse_rank_file(&data)?;
            Encoding::from_definition(def, ranks)
        })
        .await
        .map_err(|e| {
            TokCountError::InvalidVocabulary(format!("{}: build task failed: {e}", def.name))
        })??;

        self.loads.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            encoding = def.name,
            n_vocab = encoding.n_vocab(),
            source = %self.source.describe(),
            "Loaded encoding"
        );

        Ok(Arc::new(encoding))
    }
}

impl std::fmt::Debug for EncodingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodingStore")
            .field("source", &self.source.describe())
            .field("cached", &self.cached())
            .field("loads", &self.load_count())
            .finish()
    }
}
