//! Profile API provider.
//!
//! The reducer never talks to the network. The [`ProfileExecutor`](crate::executor::ProfileExecutor)
//! does, through a [`ProfileApi`] injected at construction: [`HttpProfileApi`]
//! in production, [`InMemoryProfileApi`] for the demo binary and tests.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use single_entry_core::EffectError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// A user profile as stored by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Contact email
    pub email: String,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Remote profile storage
///
/// Every failure is reported as an [`EffectError`], ready to be carried by
/// a completion event.
pub trait ProfileApi: Send + Sync {
    /// Fetch the current profile
    fn load_profile(&self) -> Pin<Box<dyn Future<Output = Result<Profile, EffectError>> + Send + '_>>;

    /// Store `profile` and return what the server kept
    fn save_profile(
        &self,
        profile: Profile,
    ) -> Pin<Box<dyn Future<Output = Result<Profile, EffectError>> + Send + '_>>;
}

impl<A: ProfileApi + ?Sized> ProfileApi for Arc<A> {
    fn load_profile(&self) -> Pin<Box<dyn Future<Output = Result<Profile, EffectError>> + Send + '_>> {
        (**self).load_profile()
    }

    fn save_profile(
        &self,
        profile: Profile,
    ) -> Pin<Box<dyn Future<Output = Result<Profile, EffectError>> + Send + '_>> {
        (**self).save_profile(profile)
    }
}

/// Errors reading [`ProfileApiConfig`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `PROFILE_API_TIMEOUT_SECS` is not a positive integer
    #[error("invalid PROFILE_API_TIMEOUT_SECS `{0}`: expected a positive number of seconds")]
    InvalidTimeout(String),

    /// The HTTP client could not be built
    #[error("cannot build HTTP client: {0}")]
    Client(String),
}

/// Where and how to reach the profile server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileApiConfig {
    /// Base URL of the profile server; `None` selects the in-memory API
    pub base_url: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ProfileApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ProfileApiConfig {
    /// Load configuration from environment
    ///
    /// Reads `PROFILE_API_URL` (optional) and `PROFILE_API_TIMEOUT_SECS`
    /// (defaults to 10).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] if the timeout is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("PROFILE_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let timeout = match lookup("PROFILE_API_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidTimeout(raw))?,
            None => Self::default().timeout,
        };

        Ok(Self { base_url, timeout })
    }
}

/// Profile API over HTTP with JSON bodies
///
/// `GET {base_url}/profile` loads, `PUT {base_url}/profile` saves.
#[derive(Debug, Clone)]
pub struct HttpProfileApi {
    client: Client,
    base_url: String,
}

impl HttpProfileApi {
    /// Create a client for `base_url` with a per-request `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self) -> String {
        format!("{}/profile", self.base_url)
    }

    async fn read(response: Result<reqwest::Response, reqwest::Error>) -> Result<Profile, EffectError> {
        let response = response.map_err(|e| EffectError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<Profile>()
                .await
                .map_err(|e| EffectError::Decode(e.to_string())),
            StatusCode::NOT_FOUND => Err(EffectError::NotFound("profile".to_string())),
            status => Err(EffectError::Status {
                code: status.as_u16(),
            }),
        }
    }
}

impl ProfileApi for HttpProfileApi {
    fn load_profile(&self) -> Pin<Box<dyn Future<Output = Result<Profile, EffectError>> + Send + '_>> {
        Box::pin(async move {
            tracing::debug!(url = %self.url(), "Loading profile");
            Self::read(self.client.get(self.url()).send().await).await
        })
    }

    fn save_profile(
        &self,
        profile: Profile,
    ) -> Pin<Box<dyn Future<Output = Result<Profile, EffectError>> + Send + '_>> {
        Box::pin(async move {
            tracing::debug!(url = %self.url(), "Saving profile");
            Self::read(self.client.put(self.url()).json(&profile).send().await).await
        })
    }
}

/// Profile API kept in process memory
///
/// Rejects emails without an `@`, the way the real server does,
/// so save failures can be exercised without a network.
#[derive(Debug, Clone)]
pub struct InMemoryProfileApi {
    profile: Arc<Mutex<Option<Profile>>>,
    latency: Duration,
}

impl InMemoryProfileApi {
    /// Start with `profile` stored
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self {
            profile: Arc::new(Mutex::new(Some(profile))),
            latency: Duration::ZERO,
        }
    }

    /// Start with nothing stored; loads fail with [`EffectError::NotFound`]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            profile: Arc::new(Mutex::new(None)),
            latency: Duration::ZERO,
        }
    }

    /// Delay every call by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The stored profile, if any
    #[must_use]
    pub fn stored(&self) -> Option<Profile> {
        self.profile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl ProfileApi for InMemoryProfileApi {
    fn load_profile(&self) -> Pin<Box<dyn Future<Output = Result<Profile, EffectError>> + Send + '_>> {
        Box::pin(async move {
            self.pause().await;
            self.stored()
                .ok_or_else(|| EffectError::NotFound("profile".to_string()))
        })
    }

    fn save_profile(
        &self,
        profile: Profile,
    ) -> Pin<Box<dyn Future<Output = Result<Profile, EffectError>> + Send + '_>> {
        Box::pin(async move {
            self.pause().await;
            if !profile.email.contains('@') {
                return Err(EffectError::Status { code: 422 });
            }
            *self.profile.lock().unwrap_or_else(PoisonError::into_inner) = Some(profile.clone());
            Ok(profile)
        })
    }
}
