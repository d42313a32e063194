//! Provider registry for centralized provider creation.
//!
//! Maps the `[provider] type` name to a concrete [`DownloadProvider`] built
//! over the reqwest client. Unknown names are configuration errors.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::coah::CoahProvider;
use super::creodias::{CreodiasEndpoints, CreodiasProvider};
use super::earthdata::EarthDataProvider;
use super::eros::ErosProvider;
use super::hda::HdaProvider;
use super::http::AsyncReqwestClient;
use super::types::{DownloadProvider, ProviderError};
use crate::config::{ConfigurationError, ProviderSettings};

/// The provider implementations known by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Coah,
    Creodias,
    EarthData,
    Eros,
    Hda,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Coah,
        ProviderKind::Creodias,
        ProviderKind::EarthData,
        ProviderKind::Eros,
        ProviderKind::Hda,
    ];

    /// Name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coah => "coah",
            Self::Creodias => "creodias",
            Self::EarthData => "earthdata",
            Self::Eros => "eros",
            Self::Hda => "hda",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or(ConfigurationError::UnknownProvider(name))
    }
}

/// Error creating a provider from settings.
#[derive(Debug, thiserror::Error)]
pub enum ProviderFactoryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Client(#[from] ProviderError),
}

/// Factory for creating download providers from `[provider]` settings.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates the configured provider over a fresh reqwest client.
    pub fn create(
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn DownloadProvider>, ProviderFactoryError> {
        let kind: ProviderKind = settings.kind.parse()?;
        let client = AsyncReqwestClient::with_timeout(settings.timeout)?;
        let base_url = settings.base_url.clone();
        let page_size = settings.page_size;

        let provider: Arc<dyn DownloadProvider> = match kind {
            ProviderKind::Coah => Arc::new(
                match base_url {
                    Some(url) => CoahProvider::with_base_url(client, url),
                    None => CoahProvider::new(client),
                }
                .with_page_size(page_size),
            ),
            ProviderKind::Creodias => {
                let endpoints = base_url
                    .as_deref()
                    .map(CreodiasEndpoints::under)
                    .unwrap_or_default();
                Arc::new(CreodiasProvider::with_endpoints(client, endpoints).with_page_size(page_size))
            }
            ProviderKind::EarthData => Arc::new(
                match base_url {
                    Some(url) => EarthDataProvider::with_base_url(client, url),
                    None => EarthDataProvider::new(client),
                }
                .with_page_size(page_size),
            ),
            ProviderKind::Eros => Arc::new(
                match base_url {
                    Some(url) => ErosProvider::with_base_url(client, url),
                    None => ErosProvider::new(client),
                }
                .with_page_size(page_size),
            ),
            ProviderKind::Hda => Arc::new(
                match base_url {
                    Some(url) => HdaProvider::with_base_url(client, url),
                    None => HdaProvider::new(client),
                }
                .with_page_size(page_size)
                .with_polling(settings.poll_interval, settings.timeout),
            ),
        };

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!("CREODIAS".parse::<ProviderKind>().unwrap(), ProviderKind::Creodias);
        assert_eq!(" hda ".parse::<ProviderKind>().unwrap(), ProviderKind::Hda);
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_is_configuration_error() {
        match "scihub2".parse::<ProviderKind>() {
            Err(ConfigurationError::UnknownProvider(name)) => assert_eq!(name, "scihub2"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_create_each_provider() {
        for kind in ProviderKind::ALL {
            let settings = ProviderSettings {
                kind: kind.as_str().to_string(),
                ..ProviderSettings::default()
            };
            let provider = ProviderFactory::create(&settings).unwrap();
            assert_eq!(provider.name().to_lowercase(), kind.as_str());
        }
    }

    #[test]
    fn test_create_unknown_provider_fails() {
        let settings = ProviderSettings {
            kind: "ftp".to_string(),
            ..ProviderSettings::default()
        };
        assert!(matches!(
            ProviderFactory::create(&settings),
            Err(ProviderFactoryError::Configuration(_))
        ));
    }
}
