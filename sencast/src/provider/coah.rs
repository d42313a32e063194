//! Copernicus Open Access Hub (SciHub / DHuS) provider.
//!
//! Search goes through the OpenSearch endpoint with JSON output, downloads
//! through OData `Products('<uuid>')/$value`. Every request uses HTTP basic
//! authentication.

use std::path::Path;
use tracing::{debug, info};

use super::archive::download_product;
use super::http::{AsyncHttpClient, RequestAuth};
use super::query::{descriptor_or_skip, lenient_u64, one_or_many, parse_json, require_str, url_with_params};
use super::types::{AuthHandle, Credentials, DownloadProvider, ProviderError, SearchCriteria};
use crate::aoi::footprint_from_wkt;
use crate::scene::{SceneDescriptor, Sensor};
use crate::BoxFuture;

/// Default DHuS endpoint.
pub const COAH_BASE_URL: &str = "https://scihub.copernicus.eu/dhus";

/// Copernicus Open Access Hub provider.
pub struct CoahProvider<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    page_size: usize,
}

impl<C: AsyncHttpClient> CoahProvider<C> {
    pub fn new(http_client: C) -> Self {
        Self::with_base_url(http_client, COAH_BASE_URL.to_string())
    }

    /// Creates a provider against a mirror or test server.
    pub fn with_base_url(http_client: C, base_url: String) -> Self {
        Self {
            http_client,
            base_url,
            page_size: 100,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn product_type(criteria: &SearchCriteria) -> Result<&'static str, ProviderError> {
        match criteria.sensor {
            Sensor::Olci if criteria.resolution >= 1000 => Ok("OL_1_ERR___"),
            Sensor::Olci => Ok("OL_1_EFR___"),
            Sensor::Msi => Ok("S2MSI1C"),
            Sensor::OliTirs => Err(ProviderError::Unsupported(
                "COAH does not distribute Landsat products".to_string(),
            )),
        }
    }

    fn query(criteria: &SearchCriteria) -> Result<String, ProviderError> {
        Ok(format!(
            "beginposition:[{} TO {}] AND footprint:\"Intersects({})\" AND producttype:{}",
            criteria.start_rfc3339(),
            criteria.end_rfc3339(),
            criteria.wkt,
            Self::product_type(criteria)?
        ))
    }

    async fn search_pages(
        &self,
        username: &str,
        password: &str,
        criteria: &SearchCriteria,
    ) -> Result<Vec<SceneDescriptor>, ProviderError> {
        let query = Self::query(criteria)?;
        let mut scenes = Vec::new();
        let mut offset = 0usize;

        loop {
            let url = url_with_params(
                &format!("{}/search", self.base_url),
                &[
                    ("q", query.clone()),
                    ("rows", self.page_size.to_string()),
                    ("start", offset.to_string()),
                    ("orderby", "beginposition asc".to_string()),
                    ("format", "json".to_string()),
                ],
            )?;
            let body = parse_json(&self.http_client.get_with_basic(&url, username, password).await?)?;
            let feed = body
                .get("feed")
                .ok_or_else(|| ProviderError::InvalidResponse("missing 'feed'".to_string()))?;
            let total = lenient_u64(feed.get("opensearch:totalResults")).unwrap_or(0) as usize;
            let entries = one_or_many(feed.get("entry"));
            debug!(offset, total, page = entries.len(), "COAH search page");

            for entry in &entries {
                let id = require_str(entry, "id")?;
                let title = require_str(entry, "title")?;
                let footprint = one_or_many(entry.get("str"))
                    .into_iter()
                    .find(|s| s.get("name").and_then(|n| n.as_str()) == Some("footprint"))
                    .and_then(|s| s.get("content").and_then(|c| c.as_str()))
                    .and_then(footprint_from_wkt);
                if let Some(scene) = descriptor_or_skip(self.name(), id, title) {
                    scenes.push(scene.with_footprint(footprint));
                }
            }

            offset += entries.len();
            if entries.is_empty() || offset >= total {
                break;
            }
        }

        info!(provider = self.name(), scenes = scenes.len(), "Search complete");
        Ok(scenes)
    }
}

fn basic(auth: &AuthHandle) -> Result<(&str, &str), ProviderError> {
    match auth {
        AuthHandle::Basic { username, password } => Ok((username, password)),
        _ => Err(ProviderError::Authentication(
            "COAH requires basic authentication".to_string(),
        )),
    }
}

impl<C: AsyncHttpClient> DownloadProvider for CoahProvider<C> {
    fn name(&self) -> &str {
        "COAH"
    }

    fn authenticate<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthHandle, ProviderError>> {
        Box::pin(async move {
            let (username, password) = credentials.user_password(self.name())?;
            Ok(AuthHandle::Basic {
                username: username.to_string(),
                password: password.to_string(),
            })
        })
    }

    fn search<'a>(
        &'a self,
        auth: &'a AuthHandle,
        criteria: &'a SearchCriteria,
    ) -> BoxFuture<'a, Result<Vec<SceneDescriptor>, ProviderError>> {
        Box::pin(async move {
            let (username, password) = basic(auth)?;
            self.search_pages(username, password, criteria).await
        })
    }

    fn fetch<'a>(
        &'a self,
        auth: &'a AuthHandle,
        scene: &'a SceneDescriptor,
        dest: &'a Path,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let (username, password) = basic(auth)?;
            let url = format!("{}/odata/v1/Products('{}')/$value", self.base_url, scene.id);
            download_product(
                &self.http_client,
                &url,
                RequestAuth::Basic { username, password },
                dest,
            )
            .await
        })
    }
}
