//! Password authentication for the Glorious Church admin area
//!
//! Signs administrators in and out against the Supabase Auth (GoTrue) API
//! and keeps the resulting session as a JSON blob in a [`LocalStorage`] under
//! a fixed key, the same way the browser client caches it.

mod storage;

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;

pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};

/// Default key for the cached session blob
pub const SESSION_STORAGE_KEY: &str = "church_session";

const CLIENT_INFO: &str = concat!("glorious-church/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,

    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error body returned by GoTrue on a rejected request
#[derive(Debug, Clone, Deserialize)]
struct GoTrueErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl GoTrueErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub app_metadata: serde_json::Value,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Session returned by a successful sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix seconds; filled in from `expires_in` when the server omits it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub user: User,
}

impl Session {
    /// True once `expires_at` lies in the past. Sessions without an
    /// expiry never report expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => chrono::Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }
}

/// Sign-in credentials
#[derive(Debug, Clone, Serialize)]
pub struct SignInCredentials {
    pub email: String,
    pub password: String,
}

/// Client options
#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Write the session blob to storage on sign-in
    pub persist_session: bool,
    /// Key under which the blob lives
    pub storage_key: String,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            persist_session: true,
            storage_key: SESSION_STORAGE_KEY.to_string(),
        }
    }
}

/// Auth client
pub struct Auth {
    url: String,
    key: String,
    http_client: Client,
    options: AuthOptions,
    current_session: Arc<RwLock<Option<Session>>>,
    storage: Arc<dyn LocalStorage>,
}

impl Auth {
    /// Create a client with in-memory storage
    pub fn new(url: &str, key: &str, http_client: Client, options: AuthOptions) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            options,
            current_session: Arc::new(RwLock::new(None)),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    /// Use `storage` for the cached session blob
    pub fn with_storage(mut self, storage: Arc<dyn LocalStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn storage(&self) -> Arc<dyn LocalStorage> {
        Arc::clone(&self.storage)
    }

    pub fn storage_key(&self) -> &str {
        &self.options.storage_key
    }

    /// Sign in with email and password
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.url);
        let credentials = SignInCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };

        debug!("Signing in {}", email);
        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("X-Client-Info", CLIENT_INFO)
            .header("Content-Type", "application/json")
            .json(&credentials)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Sign-in rejected with status {}", status);
            return Err(match serde_json::from_str::<GoTrueErrorBody>(&error_text)
                .ok()
                .and_then(GoTrueErrorBody::into_message)
            {
                Some(message) if status.is_client_error() => {
                    AuthError::AuthenticationError(message)
                }
                Some(message) => AuthError::ApiError(message),
                None => AuthError::ApiError(error_text),
            });
        }

        let mut session: Session = response.json().await?;
        if session.expires_at.is_none() {
            session.expires_at = Some(chrono::Utc::now().timestamp() + session.expires_in);
        }

        if self.options.persist_session {
            let blob = serde_json::to_string(&session)?;
            self.storage.set_item(&self.options.storage_key, &blob)?;
        }
        {
            let mut guard = self
                .current_session
                .write()
                .unwrap_or_else(|e| e.into_inner());
            *guard = Some(session.clone());
        }

        info!("Signed in user {}", session.user.id);
        Ok(session)
    }

    /// Sign out.
    ///
    /// The cached session is removed whether or not the remote call
    /// succeeds; a remote failure is still reported to the caller.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.get_session().map(|s| s.access_token);

        let remote = match token {
            Some(token) => self.remote_logout(&token).await,
            None => Ok(()),
        };

        {
            let mut guard = self
                .current_session
                .write()
                .unwrap_or_else(|e| e.into_inner());
            *guard = None;
        }
        self.storage.remove_item(&self.options.storage_key)?;

        remote
    }

    async fn remote_logout(&self, token: &str) -> Result<(), AuthError> {
        let url = format!("{}/auth/v1/logout", self.url);
        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("X-Client-Info", CLIENT_INFO)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthError::ApiError(error_text));
        }
        Ok(())
    }

    /// The raw cached session blob, exactly as stored
    pub fn cached_session_blob(&self) -> Option<String> {
        self.storage.get_item(&self.options.storage_key)
    }

    /// The current session: the in-memory one, else the decoded cache.
    ///
    /// Expiry is not checked and nothing is revalidated remotely.
    pub fn get_session(&self) -> Option<Session> {
        let in_memory = self
            .current_session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if in_memory.is_some() {
            return in_memory;
        }

        let blob = self.cached_session_blob()?;
        match serde_json::from_str::<Session>(&blob) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Cached session is not a valid session: {}", e);
                None
            }
        }
    }

    /// Install a session, writing it through to storage
    pub fn set_session(&self, session: Session) -> Result<(), AuthError> {
        let blob = serde_json::to_string(&session)?;
        self.storage.set_item(&self.options.storage_key, &blob)?;
        let mut guard = self
            .current_session
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *guard = Some(session);
        Ok(())
    }

    /// Access token of the current session
    pub fn access_token(&self) -> Result<String, AuthError> {
        self.get_session()
            .map(|s| s.access_token)
            .ok_or(AuthError::MissingSession)
    }
}
