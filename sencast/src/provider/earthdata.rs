//! NASA EarthData provider.
//!
//! Granules are found through the CMR search API and downloaded from the
//! data link of each granule with an EarthData bearer token (or basic
//! authentication when only a username and password are configured).

use geo::{Coord, LineString, MultiPolygon, Polygon};
use std::path::Path;
use tracing::{debug, info};

use super::archive::download_product;
use super::http::{AsyncHttpClient, RequestAuth};
use super::query::{descriptor_or_skip, one_or_many, parse_json, require_str, url_with_params};
use super::types::{AuthHandle, Credentials, DownloadProvider, ProviderError, SearchCriteria};
use crate::scene::{SceneDescriptor, Sensor};
use crate::BoxFuture;

/// Default CMR search endpoint.
pub const CMR_BASE_URL: &str = "https://cmr.earthdata.nasa.gov/search";

const DATA_LINK_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/data#";

/// NASA EarthData (CMR) provider.
pub struct EarthDataProvider<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    page_size: usize,
}

impl<C: AsyncHttpClient> EarthDataProvider<C> {
    pub fn new(http_client: C) -> Self {
        Self::with_base_url(http_client, CMR_BASE_URL.to_string())
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

    fn short_names(criteria: &SearchCriteria) -> Result<&'static [&'static str], ProviderError> {
        match criteria.sensor {
            Sensor::Olci if criteria.resolution >= 1000 => Ok(&["OLCIS3A_L1_ERR", "OLCIS3B_L1_ERR"]),
            Sensor::Olci => Ok(&["OLCIS3A_L1_EFR", "OLCIS3B_L1_EFR"]),
            other => Err(ProviderError::Unsupported(format!(
                "EarthData does not distribute {} Level-1 products",
                other
            ))),
        }
    }

    fn search_url(
        &self,
        short_name: &str,
        criteria: &SearchCriteria,
        page: usize,
    ) -> Result<String, ProviderError> {
        let [west, south, east, north] = criteria.bbox;
        url_with_params(
            &format!("{}/granules.json", self.base_url),
            &[
                ("short_name", short_name.to_string()),
                (
                    "temporal",
                    format!("{},{}", criteria.start_rfc3339(), criteria.end_rfc3339()),
                ),
                ("bounding_box", format!("{},{},{},{}", west, south, east, north)),
                ("page_size", self.page_size.to_string()),
                ("page_num", page.to_string()),
                ("sort_key", "start_date".to_string()),
            ],
        )
    }
}

/// CMR polygons are rings of space-separated `lat lon` pairs.
fn footprint_from_cmr(entry: &serde_json::Value) -> Option<MultiPolygon<f64>> {
    let polygons = entry.get("polygons")?.as_array()?;
    let polygons = polygons
        .iter()
        .filter_map(|rings| {
            let ring = rings.as_array()?.first()?.as_str()?;
            let values = ring
                .split_whitespace()
                .map(|v| v.parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()?;
            let coords = values
                .chunks_exact(2)
                .map(|pair| Coord {
                    x: pair[1],
                    y: pair[0],
                })
                .collect::<Vec<_>>();
            (coords.len() >= 4).then(|| Polygon::new(LineString::new(coords), Vec::new()))
        })
        .collect::<Vec<_>>();
    (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
}

fn data_link(entry: &serde_json::Value) -> Option<String> {
    one_or_many(entry.get("links"))
        .into_iter()
        .find(|link| link.get("rel").and_then(|r| r.as_str()) == Some(DATA_LINK_REL))
        .and_then(|link| link.get("href").and_then(|h| h.as_str()))
        .map(str::to_string)
}

impl<C: AsyncHttpClient> DownloadProvider for EarthDataProvider<C> {
    fn name(&self) -> &str {
        "EarthData"
    }

    fn authenticate<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthHandle, ProviderError>> {
        Box::pin(async move {
            if let Some(token) = credentials.api_key.as_deref() {
                return Ok(AuthHandle::Token(token.to_string()));
            }
            let (username, password) = credentials.user_password(self.name())?;
            Ok(AuthHandle::Basic {
                username: username.to_string(),
                password: password.to_string(),
            })
        })
    }

    fn search<'a>(
        &'a self,
        _auth: &'a AuthHandle,
        criteria: &'a SearchCriteria,
    ) -> BoxFuture<'a, Result<Vec<SceneDescriptor>, ProviderError>> {
        Box::pin(async move {
            let mut scenes = Vec::new();

            for short_name in Self::short_names(criteria)? {
                let mut page = 1usize;
                loop {
                    let url = self.search_url(short_name, criteria, page)?;
                    let body = parse_json(&self.http_client.get(&url).await?)?;
                    let entries = one_or_many(body.pointer("/feed/entry"));
                    debug!(short_name, page, entries = entries.len(), "CMR search page");

                    for entry in &entries {
                        let id = require_str(entry, "id")?;
                        let title = entry
                            .get("producer_granule_id")
                            .and_then(|t| t.as_str())
                            .map_or_else(|| require_str(entry, "title"), Ok)?;
                        let name = title.strip_suffix(".zip").unwrap_or(title);
                        let Some(scene) = descriptor_or_skip(self.name(), id, name) else {
                            continue;
                        };
                        let scene = scene.with_footprint(footprint_from_cmr(entry));
                        scenes.push(match data_link(entry) {
                            Some(url) => scene.with_download_url(url),
                            None => scene,
                        });
                    }

                    if entries.len() < self.page_size {
                        break;
                    }
                    page += 1;
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
            let url = scene.download_url.as_deref().ok_or_else(|| {
                ProviderError::InvalidResponse(format!("granule {} has no data link", scene.id))
            })?;
            let request_auth = match auth {
                AuthHandle::Token(token) => RequestAuth::Bearer(token),
                AuthHandle::Basic { username, password } => RequestAuth::Basic { username, password },
                AuthHandle::Anonymous => RequestAuth::None,
            };
            download_product(&self.http_client, url, request_auth, dest).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;
    use chrono::NaiveDate;
    use serde_json::json;

    const OLCI: &str = "S3B_OL_1_EFR____20210701T094512_20210701T094812_20210702T141210_0179_073_350_2160_LN1_O_NT_002.SEN3";

    fn criteria(sensor: Sensor) -> SearchCriteria {
        let day = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        SearchCriteria {
            start: day.and_hms_opt(0, 0, 0).unwrap(),
            end: day.and_hms_opt(23, 59, 59).unwrap(),
            sensor,
            resolution: 300,
            wkt: String::new(),
            bbox: [6.0, 46.0, 7.0, 46.5],
        }
    }

    #[test]
    fn test_cmr_polygon_is_lat_lon() {
        let entry = json!({"polygons": [["45 5 45 8 47 8 47 5 45 5"]]});
        let footprint = footprint_from_cmr(&entry).unwrap();
        let first = footprint.0[0].exterior().0[0];
        assert_eq!(first, Coord { x: 5.0, y: 45.0 });
    }

    #[tokio::test]
    async fn test_search_queries_both_platforms() {
        let client = MockAsyncHttpClient::new(Err(ProviderError::Http("unrouted".into())))
            .route_json(
                "short_name=OLCIS3A_L1_EFR",
                json!({"feed": {"entry": []}}),
            )
            .route_json(
                "short_name=OLCIS3B_L1_EFR",
                json!({"feed": {"entry": [{
                    "id": "G123",
                    "producer_granule_id": format!("{}.zip", OLCI),
                    "links": [{"rel": DATA_LINK_REL, "href": "https://oceandata/getfile/x.zip"}],
                    "polygons": [["45 5 45 8 47 8 47 5 45 5"]]
                }]}}),
            );
        let provider = EarthDataProvider::with_base_url(client.clone(), "http://cmr".to_string());

        let scenes = provider
            .search(&AuthHandle::Anonymous, &criteria(Sensor::Olci))
            .await
            .unwrap();

        assert_eq!(client.requests().len(), 2);
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].name, OLCI);
        assert_eq!(scenes[0].download_url.as_deref(), Some("https://oceandata/getfile/x.zip"));
        assert!(client.requests()[0].url.contains("bounding_box=6%2C46%2C7%2C46.5"));
    }

    #[tokio::test]
    async fn test_msi_unsupported() {
        let provider = EarthDataProvider::new(MockAsyncHttpClient::new(Ok(Vec::new())));
        let result = provider
            .search(&AuthHandle::Anonymous, &criteria(Sensor::Msi))
            .await;
        assert!(matches!(result, Err(ProviderError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_authenticate_prefers_token() {
        let provider = EarthDataProvider::new(MockAsyncHttpClient::new(Ok(Vec::new())));
        let credentials = Credentials {
            username: Some("alice".into()),
            password: Some("secret".into()),
            api_key: Some("edl-token".into()),
        };
        assert_eq!(
            provider.authenticate(&credentials).await.unwrap(),
            AuthHandle::Token("edl-token".into())
        );
    }

    #[tokio::test]
    async fn test_fetch_without_link_fails() {
        let provider = EarthDataProvider::new(MockAsyncHttpClient::new(Ok(Vec::new())));
        let scene = SceneDescriptor::from_product_name("G1", OLCI).unwrap();
        let result = provider
            .fetch(&AuthHandle::Anonymous, &scene, Path::new("/nonexistent/x"))
            .await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }
}
