//! Configuration for the church site client

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::i18n::Language;

/// Where the Supabase project lives
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub url: Url,
    pub anon_key: String,
}

impl SiteConfig {
    /// Validate and build a configuration
    pub fn new(url_str: &str, anon_key: impl Into<String>) -> Result<Self> {
        let url = Url::parse(url_str)?;
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self { url, anon_key })
    }

    /// Read `SUPABASE_URL` and `SUPABASE_ANON_KEY`
    pub fn from_env() -> Result<Self> {
        let url_str = std::env::var("SUPABASE_URL")
            .map_err(|_| Error::config("SUPABASE_URL environment variable not found"))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;
        Self::new(&url_str, anon_key)
    }

    /// Base URL without the trailing slash `Url` adds
    pub fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

/// Client behaviour knobs
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// HTTP request timeout
    pub request_timeout: Option<Duration>,

    /// Storage key of the cached admin session
    pub session_storage_key: String,

    /// Storage key of the active language code
    pub language_storage_key: String,

    /// URL or directory holding `<lang>.json` translation documents
    pub translations_base: String,

    /// Language used when nothing is persisted
    pub default_language: Language,

    /// Delay of the simulated payment round trip
    pub payment_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            session_storage_key: church_auth::SESSION_STORAGE_KEY.to_string(),
            language_storage_key: crate::i18n::LANGUAGE_STORAGE_KEY.to_string(),
            translations_base: "./translations".to_string(),
            default_language: Language::En,
            payment_delay: Duration::from_secs(2),
        }
    }
}

impl ClientOptions {
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn with_session_storage_key(mut self, value: &str) -> Self {
        self.session_storage_key = value.to_string();
        self
    }

    pub fn with_language_storage_key(mut self, value: &str) -> Self {
        self.language_storage_key = value.to_string();
        self
    }

    pub fn with_translations_base(mut self, value: &str) -> Self {
        self.translations_base = value.to_string();
        self
    }

    pub fn with_default_language(mut self, value: Language) -> Self {
        self.default_language = value;
        self
    }

    pub fn with_payment_delay(mut self, value: Duration) -> Self {
        self.payment_delay = value;
        self
    }
}
