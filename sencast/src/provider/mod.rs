//! Level-1 download provider abstraction
//!
//! This module provides the [`DownloadProvider`] trait and implementations
//! for the Copernicus hub (COAH), CREODIAS, NASA EarthData, USGS EROS and
//! WEkEO HDA.
//!
//! # Factory Pattern
//!
//! For creation from configuration, use the [`ProviderFactory`]:
//!
//! ```ignore
//! use sencast::provider::ProviderFactory;
//!
//! let provider = ProviderFactory::create(&config.provider)?;
//! let auth = provider.authenticate(&credentials).await?;
//! let scenes = provider.search(&auth, &criteria).await?;
//! ```

mod archive;
mod coah;
mod creodias;
mod earthdata;
mod eros;
mod factory;
mod hda;
mod http;
mod query;
mod retry;
mod types;

pub use archive::{download_product, finalize_download, partial_path};
pub use coah::{CoahProvider, COAH_BASE_URL};
pub use creodias::{CreodiasEndpoints, CreodiasProvider};
pub use earthdata::{EarthDataProvider, CMR_BASE_URL};
pub use eros::{ErosProvider, EROS_BASE_URL};
pub use factory::{ProviderFactory, ProviderFactoryError, ProviderKind};
pub use hda::{HdaProvider, HDA_BASE_URL};
pub use http::{AsyncHttpClient, AsyncReqwestClient, RequestAuth};
pub use retry::RetryPolicy;
pub use types::{AuthHandle, Credentials, DownloadProvider, ProviderError, SearchCriteria};

#[cfg(test)]
pub use http::tests::{MockAsyncHttpClient, RecordedRequest};
