//! Glorious Church site client
//!
//! Everything the church website does apart from drawing pixels: typed
//! records, the Supabase-backed gateway, localization, routes and the admin
//! session gate, page form state, the checkout and donation wizards, and the
//! admin dashboard aggregates.

pub mod admin;
pub mod config;
pub mod content;
pub mod error;
pub mod gateway;
pub mod i18n;
pub mod models;
pub mod prayer;
pub mod router;
pub mod wizard;

use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use church_auth::{Auth, AuthOptions, LocalStorage, MemoryStorage};
use church_postgrest::PostgrestClient;

use crate::config::{ClientOptions, SiteConfig};
use crate::error::Result;
use crate::gateway::PostgrestGateway;
use crate::i18n::{DirTranslationSource, HttpTranslationSource, Localizer, TranslationSource};
use crate::models::Table;
use crate::router::SessionGate;
use crate::wizard::SimulatedPayment;

/// The main entry point: one per site visitor
pub struct ChurchClient {
    config: SiteConfig,
    http_client: Client,
    storage: Arc<dyn LocalStorage>,
    auth: Auth,
    options: ClientOptions,
}

impl ChurchClient {
    /// Create a client with default options and in-memory client state
    pub fn new(config: SiteConfig) -> Result<Self> {
        Self::new_with_options(config, ClientOptions::default(), Arc::new(MemoryStorage::new()))
    }

    /// Create a client with custom options, keeping session and language in
    /// `storage`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use glorious_church::prelude::*;
    /// use church_auth::FileStorage;
    ///
    /// # fn main() -> Result<()> {
    /// let config = SiteConfig::from_env()?;
    /// let storage = Arc::new(FileStorage::open("./.church/local_storage.json"));
    /// let client = ChurchClient::new_with_options(config, ClientOptions::default(), storage)?;
    /// let gate = client.session_gate();
    /// # Ok(())
    /// # }
    /// ```
    pub fn new_with_options(
        config: SiteConfig,
        options: ClientOptions,
        storage: Arc<dyn LocalStorage>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let auth = Auth::new(
            &config.base_url(),
            &config.anon_key,
            http_client.clone(),
            AuthOptions {
                persist_session: true,
                storage_key: options.session_storage_key.clone(),
            },
        )
        .with_storage(Arc::clone(&storage));

        Ok(Self {
            config,
            http_client,
            storage,
            auth,
            options,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn storage(&self) -> Arc<dyn LocalStorage> {
        Arc::clone(&self.storage)
    }

    /// Low-level PostgREST client for one table
    pub fn from(&self, table: Table) -> PostgrestClient {
        PostgrestClient::new(
            &self.config.base_url(),
            &self.config.anon_key,
            table.as_str(),
            self.http_client.clone(),
        )
    }

    /// Gateway for page loaders and forms. Requests carry the admin's token
    /// while a session is cached, and the anonymous key otherwise.
    pub fn gateway(&self) -> PostgrestGateway {
        let gateway = PostgrestGateway::new(
            &self.config.base_url(),
            &self.config.anon_key,
            self.http_client.clone(),
        );
        match self.auth.access_token() {
            Ok(token) => gateway.with_access_token(token),
            Err(_) => gateway,
        }
    }

    pub fn session_gate(&self) -> SessionGate {
        SessionGate::new(self.storage(), &self.options.session_storage_key)
    }

    /// Localization context reading `<translations_base>/<lang>.json`,
    /// over HTTP when the base is a URL and from disk otherwise.
    pub fn localizer(&self) -> Localizer {
        let base = &self.options.translations_base;
        let source: Arc<dyn TranslationSource> =
            if base.starts_with("http://") || base.starts_with("https://") {
                Arc::new(HttpTranslationSource::new(base, self.http_client.clone()))
            } else {
                Arc::new(DirTranslationSource::new(base))
            };
        debug!(base = %base, "translation source");

        Localizer::new(
            source,
            self.storage(),
            &self.options.language_storage_key,
            self.options.default_language,
        )
    }

    /// The payment producer used by both wizards
    pub fn payments(&self) -> SimulatedPayment {
        SimulatedPayment::new(self.options.payment_delay)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::{ClientOptions, SiteConfig};
    pub use crate::error::{Error, Result};
    pub use crate::gateway::{Gateway, Query};
    pub use crate::i18n::{Language, Localizer};
    pub use crate::models::*;
    pub use crate::router::{GateDecision, Route, SessionGate};
    pub use crate::wizard::{Checkout, DonationWizard, PaymentProcessor};
    pub use crate::ChurchClient;
}
