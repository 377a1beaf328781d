//! Localization: active language, translation tables and key lookup
//!
//! Translation documents are nested JSON objects, one per language, found at
//! `<base>/<code>.json`. Keys are dotted paths (`nav.home`). A key that cannot
//! be resolved never fails; the [`MissingKeyPolicy`] decides what is shown.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use church_auth::LocalStorage;

use crate::error::{Error, Result};

/// Storage key of the active language code
pub const LANGUAGE_STORAGE_KEY: &str = "church_lang";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Fr];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
        }
    }

    /// Name of the language in that language, for the switcher
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "Français",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "en" => Ok(Language::En),
            "fr" => Ok(Language::Fr),
            other => Err(Error::translation(format!("unsupported language '{}'", other))),
        }
    }
}

/// Outcome of resolving a dotted key against a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a str),
    NotFound,
}

/// What to show for a key the table cannot resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Show the dotted path itself
    #[default]
    ReturnPath,
    /// Show nothing
    ReturnEmpty,
}

impl MissingKeyPolicy {
    pub fn resolve(&self, path: &str, lookup: Lookup<'_>) -> String {
        match (lookup, self) {
            (Lookup::Found(text), _) => text.to_string(),
            (Lookup::NotFound, MissingKeyPolicy::ReturnPath) => path.to_string(),
            (Lookup::NotFound, MissingKeyPolicy::ReturnEmpty) => String::new(),
        }
    }
}

/// One language's translation document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslationTable {
    root: Value,
}

impl TranslationTable {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(Self::from_value(serde_json::from_str(text)?))
    }

    /// Walk the dotted `path` one key at a time; only a string leaf counts.
    pub fn lookup(&self, path: &str) -> Lookup<'_> {
        let mut node = &self.root;
        for key in path.split('.') {
            match node {
                Value::Object(map) => match map.get(key) {
                    Some(next) => node = next,
                    None => return Lookup::NotFound,
                },
                _ => return Lookup::NotFound,
            }
        }
        match node {
            Value::String(text) => Lookup::Found(text),
            _ => Lookup::NotFound,
        }
    }
}

/// Where translation documents come from
#[async_trait]
pub trait TranslationSource: Send + Sync {
    async fn load(&self, language: Language) -> Result<TranslationTable>;
}

/// Fetches `<base_url>/<code>.json` over HTTP
#[derive(Debug, Clone)]
pub struct HttpTranslationSource {
    base_url: String,
    http_client: Client,
}

impl HttpTranslationSource {
    pub fn new(base_url: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }
}

#[async_trait]
impl TranslationSource for HttpTranslationSource {
    async fn load(&self, language: Language) -> Result<TranslationTable> {
        let url = format!("{}/{}.json", self.base_url, language.code());
        debug!(%url, "fetching translations");

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::translation(format!(
                "failed to load translation file for language {} (status {})",
                language,
                response.status()
            )));
        }
        let root = response.json::<Value>().await?;
        Ok(TranslationTable::from_value(root))
    }
}

/// Reads `<dir>/<code>.json` from disk
#[derive(Debug, Clone)]
pub struct DirTranslationSource {
    dir: PathBuf,
}

impl DirTranslationSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TranslationSource for DirTranslationSource {
    async fn load(&self, language: Language) -> Result<TranslationTable> {
        let path = self.dir.join(format!("{}.json", language.code()));
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::translation(format!("cannot read {}: {}", path.display(), e))
        })?;
        TranslationTable::from_json(&text)
    }
}

#[derive(Debug)]
struct LocalizerState {
    language: Language,
    table: Option<TranslationTable>,
    /// Bumped on every language switch so late reloads can tell they are stale
    generation: u64,
}

/// Shared localization context
///
/// Cloning is cheap and every clone sees the same language and table.
#[derive(Clone)]
pub struct Localizer {
    state: Arc<RwLock<LocalizerState>>,
    source: Arc<dyn TranslationSource>,
    storage: Arc<dyn LocalStorage>,
    storage_key: String,
    policy: MissingKeyPolicy,
}

impl fmt::Debug for Localizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Localizer")
            .field("language", &self.language())
            .field("storage_key", &self.storage_key)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Localizer {
    /// Start with the persisted language, or `default_language` when none
    /// (or an unknown code) is stored. No table is loaded yet.
    pub fn new(
        source: Arc<dyn TranslationSource>,
        storage: Arc<dyn LocalStorage>,
        storage_key: &str,
        default_language: Language,
    ) -> Self {
        let language = storage
            .get_item(storage_key)
            .and_then(|code| code.parse().ok())
            .unwrap_or(default_language);

        Self {
            state: Arc::new(RwLock::new(LocalizerState {
                language,
                table: None,
                generation: 0,
            })),
            source,
            storage,
            storage_key: storage_key.to_string(),
            policy: MissingKeyPolicy::default(),
        }
    }

    pub fn with_missing_key_policy(mut self, policy: MissingKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn language(&self) -> Language {
        self.state.read().unwrap_or_else(|e| e.into_inner()).language
    }

    /// Whether any table has been loaded yet
    pub fn is_loaded(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .table
            .is_some()
    }

    /// Translate `path`; unresolved keys go through the missing-key policy
    pub fn t(&self, path: &str) -> String {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let lookup = match &state.table {
            Some(table) => table.lookup(path),
            None => Lookup::NotFound,
        };
        self.policy.resolve(path, lookup)
    }

    /// Switch language.
    ///
    /// The code is persisted right away; the new table is loaded in the
    /// background. Lookups keep using the previous table until it arrives.
    pub fn set_language(&self, language: Language) -> JoinHandle<bool> {
        if let Err(e) = self.storage.set_item(&self.storage_key, language.code()) {
            warn!(error = %e, "could not persist language choice");
        }
        let generation = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.language = language;
            state.generation += 1;
            state.generation
        };
        info!(language = %language, "language changed");

        let this = self.clone();
        tokio::spawn(async move { this.load_for(language, generation).await })
    }

    /// Load the table of the current language.
    ///
    /// Returns `false` when loading failed or when the language changed
    /// while loading; either way the previous table stays in place.
    pub async fn reload(&self) -> bool {
        let (language, generation) = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            (state.language, state.generation)
        };
        self.load_for(language, generation).await
    }

    async fn load_for(&self, language: Language, generation: u64) -> bool {
        match self.source.load(language).await {
            Ok(table) => {
                let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                if state.generation != generation {
                    debug!(language = %language, "discarding stale translation load");
                    return false;
                }
                state.table = Some(table);
                true
            }
            Err(e) => {
                warn!(language = %language, error = %e, "failed to load translations");
                false
            }
        }
    }
}
