//! CREODIAS provider.
//!
//! Searches the Finder RESTO catalogue, authenticates against the Keycloak
//! realm and downloads through the zipper service with the access token as
//! a query parameter.

use std::path::Path;
use tracing::{debug, info};

use super::archive::download_product;
use super::http::{AsyncHttpClient, RequestAuth};
use super::query::{descriptor_or_skip, lenient_u64, parse_json, require_str, url_with_params};
use super::types::{AuthHandle, Credentials, DownloadProvider, ProviderError, SearchCriteria};
use crate::aoi::footprint_from_geojson;
use crate::scene::{SceneDescriptor, Sensor};
use crate::BoxFuture;

const KEYCLOAK_CLIENT_ID: &str = "CLOUDFERRO_PUBLIC";

/// Service locations used by [`CreodiasProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreodiasEndpoints {
    /// RESTO collections root
    pub finder: String,
    /// OpenID Connect token endpoint
    pub token: String,
    /// Zipper download root
    pub download: String,
}

impl Default for CreodiasEndpoints {
    fn default() -> Self {
        Self {
            finder: "https://finder.creodias.eu/resto/api/collections".to_string(),
            token: "https://identity.cloudferro.com/auth/realms/Creodias-new/protocol/openid-connect/token"
                .to_string(),
            download: "https://zipper.creodias.eu/download".to_string(),
        }
    }
}

impl CreodiasEndpoints {
    /// All three services below one root, for mirrors and tests.
    pub fn under(base_url: &str) -> Self {
        Self {
            finder: format!("{}/resto/api/collections", base_url),
            token: format!("{}/auth/token", base_url),
            download: format!("{}/download", base_url),
        }
    }
}

/// CREODIAS provider.
pub struct CreodiasProvider<C: AsyncHttpClient> {
    http_client: C,
    endpoints: CreodiasEndpoints,
    page_size: usize,
}

impl<C: AsyncHttpClient> CreodiasProvider<C> {
    pub fn new(http_client: C) -> Self {
        Self::with_endpoints(http_client, CreodiasEndpoints::default())
    }

    pub fn with_endpoints(http_client: C, endpoints: CreodiasEndpoints) -> Self {
        Self {
            http_client,
            endpoints,
            page_size: 100,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn collection(criteria: &SearchCriteria) -> (&'static str, &'static str) {
        match criteria.sensor {
            Sensor::Olci if criteria.resolution >= 1000 => ("Sentinel3", "OL_1_ERR___"),
            Sensor::Olci => ("Sentinel3", "OL_1_EFR___"),
            Sensor::Msi => ("Sentinel2", "L1C"),
            Sensor::OliTirs => ("Landsat8", "L1TP"),
        }
    }

    fn search_url(&self, criteria: &SearchCriteria, page: usize) -> Result<String, ProviderError> {
        let (collection, product_type) = Self::collection(criteria);
        url_with_params(
            &format!("{}/{}/search.json", self.endpoints.finder, collection),
            &[
                ("startDate", criteria.start_rfc3339()),
                ("completionDate", criteria.end_rfc3339()),
                ("productType", product_type.to_string()),
                ("geometry", criteria.wkt.clone()),
                ("maxRecords", self.page_size.to_string()),
                ("page", page.to_string()),
                ("sortParam", "startDate".to_string()),
                ("sortOrder", "ascending".to_string()),
                ("status", "all".to_string()),
            ],
        )
    }
}

impl<C: AsyncHttpClient> DownloadProvider for CreodiasProvider<C> {
    fn name(&self) -> &str {
        "CREODIAS"
    }

    fn authenticate<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthHandle, ProviderError>> {
        Box::pin(async move {
            let (username, password) = credentials.user_password(self.name())?;
            let body = self
                .http_client
                .post_form(
                    &self.endpoints.token,
                    &[
                        ("client_id", KEYCLOAK_CLIENT_ID),
                        ("grant_type", "password"),
                        ("username", username),
                        ("password", password),
                    ],
                )
                .await?;
            let token = parse_json(&body)?;
            let access_token = require_str(&token, "access_token")
                .map_err(|_| ProviderError::Authentication("no access token issued".to_string()))?;
            debug!(provider = self.name(), "Access token obtained");
            Ok(AuthHandle::Token(access_token.to_string()))
        })
    }

    fn search<'a>(
        &'a self,
        _auth: &'a AuthHandle,
        criteria: &'a SearchCriteria,
    ) -> BoxFuture<'a, Result<Vec<SceneDescriptor>, ProviderError>> {
        Box::pin(async move {
            let mut scenes = Vec::new();
            let mut page = 1usize;

            loop {
                let url = self.search_url(criteria, page)?;
                let body = parse_json(&self.http_client.get(&url).await?)?;
                let features = body
                    .get("features")
                    .and_then(|f| f.as_array())
                    .ok_or_else(|| ProviderError::InvalidResponse("missing 'features'".to_string()))?;
                let total = lenient_u64(body.pointer("/properties/totalResults"));
                debug!(page, features = features.len(), ?total, "CREODIAS search page");

                for feature in features {
                    let id = require_str(feature, "id")?;
                    let properties = feature.get("properties").ok_or_else(|| {
                        ProviderError::InvalidResponse("feature without properties".to_string())
                    })?;
                    let title = require_str(properties, "title")?;
                    let Some(scene) = descriptor_or_skip(self.name(), id, title) else {
                        continue;
                    };
                    let footprint = feature.get("geometry").and_then(footprint_from_geojson);
                    let url = properties
                        .pointer("/services/download/url")
                        .and_then(|u| u.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{}/{}", self.endpoints.download, id));
                    scenes.push(scene.with_footprint(footprint).with_download_url(url));
                }

                let seen = (page - 1) * self.page_size + features.len();
                let more = match total {
                    Some(total) => (seen as u64) < total,
                    None => features.len() == self.page_size,
                };
                if features.is_empty() || !more {
                    break;
                }
                page += 1;
            }

            info!(provider = self.name(), scenes = scenes.len(), "Search complete");
            Ok(scenes)
        })
    }

    fn fetch<'a>(
        &'a self,
        auth: &'a AuthHandle,
        scene: &'a SceneDescriptor,
        dest: &'a Path,
    ) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let token = auth.token().ok_or_else(|| {
                ProviderError::Authentication("CREODIAS download requires a token".to_string())
            })?;
            let base = scene
                .download_url
                .clone()
                .unwrap_or_else(|| format!("{}/{}", self.endpoints.download, scene.id));
            let url = url_with_params(&base, &[("token", token.to_string())])?;
            download_product(&self.http_client, &url, RequestAuth::None, dest).await
        })
    }
}
