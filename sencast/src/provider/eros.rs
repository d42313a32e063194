//! USGS EROS provider (Machine-to-Machine API).
//!
//! Landsat 8/9 Collection 2 Level-1 bundles. Login yields an API key sent as
//! `X-Auth-Token`; a download is a download-options lookup followed by a
//! download-request that returns a one-off URL.

use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

use super::archive::download_product;
use super::http::{AsyncHttpClient, RequestAuth};
use super::query::{descriptor_or_skip, lenient_u64, parse_json, require_str};
use super::types::{AuthHandle, Credentials, DownloadProvider, ProviderError, SearchCriteria};
use crate::aoi::footprint_from_geojson;
use crate::scene::{SceneDescriptor, Sensor};
use crate::BoxFuture;

/// Default M2M endpoint.
pub const EROS_BASE_URL: &str = "https://m2m.cr.usgs.gov/api/api/json/stable";

const DATASET: &str = "landsat_ot_c2_l1";

/// USGS EROS provider.
pub struct ErosProvider<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    page_size: usize,
}

impl<C: AsyncHttpClient> ErosProvider<C> {
    pub fn new(http_client: C) -> Self {
        Self::with_base_url(http_client, EROS_BASE_URL.to_string())
    }

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

    /// POSTs to an M2M endpoint and unwraps its `data` member.
    async fn call(&self, endpoint: &str, token: Option<&str>, payload: Value) -> Result<Value, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let body = payload.to_string();
        let response = match token {
            Some(token) => {
                self.http_client
                    .post_json_with_headers(&url, &body, &[("X-Auth-Token", token)])
                    .await?
            }
            None => self.http_client.post_json(&url, &body).await?,
        };
        let mut response = parse_json(&response)?;

        if let Some(code) = response.get("errorCode").and_then(Value::as_str) {
            let message = response
                .get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let error = format!("{}: {} {}", endpoint, code, message);
            return Err(if code.starts_with("AUTH") {
                ProviderError::Authentication(error)
            } else {
                ProviderError::InvalidResponse(error)
            });
        }
        Ok(response.get_mut("data").map(Value::take).unwrap_or(Value::Null))
    }

    fn scene_filter(criteria: &SearchCriteria) -> Value {
        let [west, south, east, north] = criteria.bbox;
        json!({
            "spatialFilter": {
                "filterType": "mbr",
                "lowerLeft": {"latitude": south, "longitude": west},
                "upperRight": {"latitude": north, "longitude": east}
            },
            "acquisitionFilter": {
                "start": criteria.start.format("%Y-%m-%d").to_string(),
                "end": criteria.end.format("%Y-%m-%d").to_string()
            }
        })
    }
}

fn token(auth: &AuthHandle) -> Result<&str, ProviderError> {
    auth.token()
        .ok_or_else(|| ProviderError::Authentication("EROS requires an API session".to_string()))
}

impl<C: AsyncHttpClient> DownloadProvider for ErosProvider<C> {
    fn name(&self) -> &str {
        "EROS"
    }

    fn authenticate<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthHandle, ProviderError>> {
        Box::pin(async move {
            let username = credentials.username.as_deref().ok_or_else(|| {
                ProviderError::Authentication("EROS requires a username".to_string())
            })?;
            let data = match (credentials.api_key.as_deref(), credentials.password.as_deref()) {
                (Some(api_key), _) => {
                    self.call("login-token", None, json!({"username": username, "token": api_key}))
                        .await?
                }
                (None, Some(password)) => {
                    self.call("login", None, json!({"username": username, "password": password}))
                        .await?
                }
                (None, None) => {
                    return Err(ProviderError::Authentication(
                        "EROS requires an application token or password".to_string(),
                    ))
                }
            };
            let session = data
                .as_str()
                .ok_or_else(|| ProviderError::Authentication("login returned no API key".to_string()))?;
            Ok(AuthHandle::Token(session.to_string()))
        })
    }

    fn search<'a>(
        &'a self,
        auth: &'a AuthHandle,
        criteria: &'a SearchCriteria,
    ) -> BoxFuture<'a, Result<Vec<SceneDescriptor>, ProviderError>> {
        Box::pin(async move {
            if criteria.sensor != Sensor::OliTirs {
                return Err(ProviderError::Unsupported(format!(
                    "EROS only distributes Landsat, not {}",
                    criteria.sensor
                )));
            }
            let token = token(auth)?;
            let mut scenes = Vec::new();
            let mut starting_number = 1u64;

            loop {
                let data = self
                    .call(
                        "scene-search",
                        Some(token),
                        json!({
                            "datasetName": DATASET,
                            "maxResults": self.page_size,
                            "startingNumber": starting_number,
                            "sceneFilter": Self::scene_filter(criteria)
                        }),
                    )
                    .await?;
                let results = data
                    .get("results")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                debug!(starting_number, results = results.len(), "EROS scene-search page");

                for result in &results {
                    let entity_id = require_str(result, "entityId")?;
                    let display_id = require_str(result, "displayId")?;
                    if let Some(scene) = descriptor_or_skip(self.name(), entity_id, display_id) {
                        let footprint = result.get("spatialFootprint").and_then(footprint_from_geojson);
                        scenes.push(scene.with_footprint(footprint));
                    }
                }

                match lenient_u64(data.get("nextRecord")) {
                    Some(next) if !results.is_empty() && next > starting_number => {
                        let total = lenient_u64(data.get("totalHits")).unwrap_or(0);
                        if next > total {
                            break;
                        }
                        starting_number = next;
                    }
                    _ => break,
                }
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
            let token = token(auth)?;

            let options = self
                .call(
                    "download-options",
                    Some(token),
                    json!({"datasetName": DATASET, "entityIds": [scene.id]}),
                )
                .await?;
            let product = options
                .as_array()
                .into_iter()
                .flatten()
                .find(|o| o.get("available").and_then(Value::as_bool) == Some(true))
                .ok_or_else(|| {
                    ProviderError::InvalidResponse(format!("no downloadable product for {}", scene.id))
                })?;
            let product_id = require_str(product, "id")?;

            let request = self
                .call(
                    "download-request",
                    Some(token),
                    json!({
                        "downloads": [{"entityId": scene.id, "productId": product_id}],
                        "label": "sencast"
                    }),
                )
                .await?;
            let url = request
                .pointer("/availableDownloads/0/url")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ProviderError::InvalidResponse(format!("download of {} is still being prepared", scene.id))
                })?;

            download_product(&self.http_client, url, RequestAuth::None, dest).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;
    use chrono::NaiveDate;

    const LANDSAT: &str = "LC08_L1TP_196027_20210701_20210708_02_T1";

    fn criteria(sensor: Sensor) -> SearchCriteria {
        let day = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        SearchCriteria {
            start: day.and_hms_opt(0, 0, 0).unwrap(),
            end: day.and_hms_opt(23, 59, 59).unwrap(),
            sensor,
            resolution: 30,
            wkt: String::new(),
            bbox: [6.0, 46.0, 7.0, 46.5],
        }
    }

    fn client() -> MockAsyncHttpClient {
        MockAsyncHttpClient::new(Err(ProviderError::Http("unrouted".into())))
    }

    #[tokio::test]
    async fn test_login_token() {
        let client = client().route_json("/login-token", json!({"data": "session-key", "errorCode": null}));
        let provider = ErosProvider::with_base_url(client.clone(), "http://m2m".into());
        let credentials = Credentials {
            username: Some("alice".into()),
            password: None,
            api_key: Some("app-token".into()),
        };

        let auth = provider.authenticate(&credentials).await.unwrap();

        assert_eq!(auth, AuthHandle::Token("session-key".into()));
        assert!(client.requests()[0].body.as_deref().unwrap().contains("app-token"));
    }

    #[tokio::test]
    async fn test_error_code_maps_to_authentication() {
        let client = client().route_json(
            "/login",
            json!({"data": null, "errorCode": "AUTH_INVALID", "errorMessage": "bad"}),
        );
        let provider = ErosProvider::with_base_url(client, "http://m2m".into());
        let credentials = Credentials {
            username: Some("alice".into()),
            password: Some("wrong".into()),
            api_key: None,
        };
        assert!(matches!(
            provider.authenticate(&credentials).await,
            Err(ProviderError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_search_landsat() {
        let client = client().route_json(
            "/scene-search",
            json!({"data": {
                "results": [{"entityId": "LC81960272021182LGN00", "displayId": LANDSAT}],
                "totalHits": 1,
                "nextRecord": 2
            }}),
        );
        let provider = ErosProvider::with_base_url(client.clone(), "http://m2m".into());

        let scenes = provider
            .search(&AuthHandle::Token("k".into()), &criteria(Sensor::OliTirs))
            .await
            .unwrap();

        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].id, "LC81960272021182LGN00");
        assert_eq!(client.requests().len(), 1);
        assert_eq!(client.requests()[0].headers[0], ("X-Auth-Token".to_string(), "k".to_string()));
    }

    #[tokio::test]
    async fn test_search_rejects_sentinel() {
        let provider = ErosProvider::new(client());
        let result = provider
            .search(&AuthHandle::Token("k".into()), &criteria(Sensor::Olci))
            .await;
        assert!(matches!(result, Err(ProviderError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_fetch_requests_download_url() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join(format!("{}.tar", LANDSAT));
        let client = client()
            .route_json(
                "/download-options",
                json!({"data": [
                    {"id": "p0", "available": false},
                    {"id": "p1", "available": true}
                ]}),
            )
            .route_json(
                "/download-request",
                json!({"data": {"availableDownloads": [{"url": "http://dds/bundle.tar"}]}}),
            )
            .route("http://dds/", Ok(b"tar".to_vec()));
        let provider = ErosProvider::with_base_url(client.clone(), "http://m2m".into());
        let scene = SceneDescriptor::from_product_name("E1", LANDSAT).unwrap();

        provider
            .fetch(&AuthHandle::Token("k".into()), &scene, &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"tar");
        let requests = client.requests();
        assert!(requests[1].body.as_deref().unwrap().contains("\"productId\":\"p1\""));
        assert_eq!(requests[2].url, "http://dds/bundle.tar");
    }
}
