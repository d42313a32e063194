//! Provider types and traits

use chrono::NaiveDateTime;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::aoi::Aoi;
use crate::config::{HindcastConfig, ProviderSettings};
use crate::scene::{SceneDescriptor, Sensor};
use crate::BoxFuture;

/// Errors that can occur during provider operations.
///
/// Cloneable so mock clients can hand out the same failure repeatedly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Credentials missing or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid response data from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The provider does not serve this sensor or request
    #[error("Unsupported request: {0}")]
    Unsupported(String),

    /// Downloaded archive could not be unpacked
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        ProviderError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(e.to_string())
    }
}

/// Credentials from the `[provider]` section.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

impl Credentials {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            username: settings.username.clone(),
            password: settings.password.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    /// Username and password, or an authentication error naming `provider`.
    pub fn user_password(&self, provider: &str) -> Result<(&str, &str), ProviderError> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) => Ok((user, password)),
            _ => Err(ProviderError::Authentication(format!(
                "{} requires username and password",
                provider
            ))),
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Session obtained from [`DownloadProvider::authenticate`].
#[derive(Clone, PartialEq, Eq)]
pub enum AuthHandle {
    /// No authentication needed (offline runs, mocks).
    Anonymous,
    /// HTTP basic authentication on every request.
    Basic { username: String, password: String },
    /// Bearer or API token issued by the provider.
    Token(String),
}

impl AuthHandle {
    pub fn token(&self) -> Option<&str> {
        match self {
            AuthHandle::Token(token) => Some(token),
            _ => None,
        }
    }
}

impl fmt::Debug for AuthHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthHandle::Anonymous => write!(f, "Anonymous"),
            AuthHandle::Basic { username, .. } => write!(f, "Basic({})", username),
            AuthHandle::Token(_) => write!(f, "Token(***)"),
        }
    }
}

/// Query window and area handed to [`DownloadProvider::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub sensor: Sensor,
    /// Resolution hint in metres
    pub resolution: u32,
    pub wkt: String,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bbox: [f64; 4],
}

impl SearchCriteria {
    pub fn new(config: &HindcastConfig, aoi: &Aoi) -> Self {
        Self {
            start: config.general.start,
            end: config.general.end,
            sensor: config.general.sensor,
            resolution: config.general.resolution,
            wkt: aoi.wkt().to_string(),
            bbox: aoi.bbox(),
        }
    }

    pub(crate) fn start_rfc3339(&self) -> String {
        self.start.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }

    pub(crate) fn end_rfc3339(&self) -> String {
        self.end.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}

/// A remote catalogue that can search for and fetch Level-1 products.
///
/// Implementations retry nothing themselves; the download stage applies the
/// configured retry policy around [`fetch`](Self::fetch).
pub trait DownloadProvider: Send + Sync {
    /// Returns the provider's name for logging and identification.
    fn name(&self) -> &str;

    /// Exchanges credentials for a session handle.
    fn authenticate<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthHandle, ProviderError>>;

    /// Lists all scenes matching `criteria`, following pagination.
    fn search<'a>(
        &'a self,
        auth: &'a AuthHandle,
        criteria: &'a SearchCriteria,
    ) -> BoxFuture<'a, Result<Vec<SceneDescriptor>, ProviderError>>;

    /// Downloads `scene` so that its product ends up at `dest`.
    ///
    /// `dest` only appears once the transfer and any unpacking completed.
    fn fetch<'a>(
        &'a self,
        auth: &'a AuthHandle,
        scene: &'a SceneDescriptor,
        dest: &'a Path,
    ) -> BoxFuture<'a, Result<(), ProviderError>>;
}
