//! WEkEO Harmonised Data Access (HDA) provider.
//!
//! HDA is asynchronous on both ends: a search is a data request job that
//! has to be polled until complete, and a download is a data order that has
//! to be polled until the product is staged. Scene ids carry both halves
//! as `<jobId>|<uri>`.

use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::archive::download_product;
use super::http::{AsyncHttpClient, RequestAuth};
use super::query::{descriptor_or_skip, lenient_u64, parse_json, require_str, url_with_params};
use super::types::{AuthHandle, Credentials, DownloadProvider, ProviderError, SearchCriteria};
use crate::scene::{SceneDescriptor, Sensor};
use crate::BoxFuture;

/// Default broker endpoint.
pub const HDA_BASE_URL: &str = "https://wekeo-broker.apps.mercator.dsi.cnes.fr/databroker";

/// WEkEO HDA provider.
pub struct HdaProvider<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    page_size: usize,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl<C: AsyncHttpClient> HdaProvider<C> {
    pub fn new(http_client: C) -> Self {
        Self::with_base_url(http_client, HDA_BASE_URL.to_string())
    }

    pub fn with_base_url(http_client: C, base_url: String) -> Self {
        Self {
            http_client,
            base_url,
            page_size: 100,
            poll_interval: Duration::from_secs(10),
            poll_timeout: Duration::from_secs(600),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// How often job and order status is polled, and for how long.
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    fn dataset(criteria: &SearchCriteria) -> Result<&'static str, ProviderError> {
        match criteria.sensor {
            Sensor::Olci if criteria.resolution >= 1000 => Ok("EO:EUM:DAT:SENTINEL-3:OL_1_ERR___"),
            Sensor::Olci => Ok("EO:EUM:DAT:SENTINEL-3:OL_1_EFR___"),
            Sensor::Msi => Ok("EO:ESA:DAT:SENTINEL-2:MSI"),
            Sensor::OliTirs => Err(ProviderError::Unsupported(
                "HDA does not distribute Landsat products".to_string(),
            )),
        }
    }

    /// Polls `status_url` until it reports `completed`.
    async fn wait_for(&self, status_url: &str, token: &str, what: &str) -> Result<(), ProviderError> {
        let deadline = Instant::now() + self.poll_timeout;
        loop {
            let status = parse_json(
                &self
                    .http_client
                    .get_with_headers(status_url, &[("Authorization", token)])
                    .await?,
            )?;
            match status.get("status").and_then(Value::as_str) {
                Some("completed") => return Ok(()),
                Some("failed") => {
                    let message = status.get("message").and_then(Value::as_str).unwrap_or_default();
                    return Err(ProviderError::InvalidResponse(format!("{} failed: {}", what, message)));
                }
                state => debug!(what, ?state, "Waiting for HDA"),
            }
            if Instant::now() >= deadline {
                return Err(ProviderError::Http(format!(
                    "{} not completed within {:?}",
                    what, self.poll_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn token(auth: &AuthHandle) -> Result<&str, ProviderError> {
    auth.token()
        .ok_or_else(|| ProviderError::Authentication("HDA requires an access token".to_string()))
}

impl<C: AsyncHttpClient> DownloadProvider for HdaProvider<C> {
    fn name(&self) -> &str {
        "HDA"
    }

    fn authenticate<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<AuthHandle, ProviderError>> {
        Box::pin(async move {
            let (username, password) = credentials.user_password(self.name())?;
            let body = self
                .http_client
                .get_with_basic(&format!("{}/gettoken", self.base_url), username, password)
                .await?;
            let token = parse_json(&body)?;
            let access_token = require_str(&token, "access_token")
                .map_err(|_| ProviderError::Authentication("no access token issued".to_string()))?;
            Ok(AuthHandle::Token(access_token.to_string()))
        })
    }

    fn search<'a>(
        &'a self,
        auth: &'a AuthHandle,
        criteria: &'a SearchCriteria,
    ) -> BoxFuture<'a, Result<Vec<SceneDescriptor>, ProviderError>> {
        Box::pin(async move {
            let token = token(auth)?;
            let [west, south, east, north] = criteria.bbox;
            let request = json!({
                "datasetId": Self::dataset(criteria)?,
                "boundingBoxValues": [{"name": "bbox", "bbox": [west, south, east, north]}],
                "dateRangeSelectValues": [{
                    "name": "position",
                    "start": criteria.start_rfc3339(),
                    "end": criteria.end_rfc3339()
                }]
            });
            let job = parse_json(
                &self
                    .http_client
                    .post_json_with_headers(
                        &format!("{}/datarequest", self.base_url),
                        &request.to_string(),
                        &[("Authorization", token)],
                    )
                    .await?,
            )?;
            let job_id = require_str(&job, "jobId")?.to_string();
            self.wait_for(
                &format!("{}/datarequest/status/{}", self.base_url, job_id),
                token,
                "data request",
            )
            .await?;

            let mut scenes = Vec::new();
            let mut page = 0usize;
            loop {
                let url = url_with_params(
                    &format!("{}/datarequest/jobs/{}/result", self.base_url, job_id),
                    &[("page", page.to_string()), ("size", self.page_size.to_string())],
                )?;
                let result = parse_json(
                    &self
                        .http_client
                        .get_with_headers(&url, &[("Authorization", token)])
                        .await?,
                )?;
                let content = result
                    .get("content")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                for item in &content {
                    let filename = require_str(item, "filename")?;
                    let uri = require_str(item, "url")?;
                    let name = filename.strip_suffix(".zip").unwrap_or(filename);
                    let id = format!("{}|{}", job_id, uri);
                    if let Some(scene) = descriptor_or_skip(self.name(), &id, name) {
                        scenes.push(scene);
                    }
                }

                let total = lenient_u64(result.get("totalItems")).unwrap_or(0) as usize;
                let seen = page * self.page_size + content.len();
                if content.is_empty() || seen >= total {
                    break;
                }
                page += 1;
            }

            info!(provider = self.name(), job = %job_id, scenes = scenes.len(), "Search complete");
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
            let (job_id, uri) = scene.id.split_once('|').ok_or_else(|| {
                ProviderError::InvalidResponse(format!("malformed HDA scene id '{}'", scene.id))
            })?;

            let order = parse_json(
                &self
                    .http_client
                    .post_json_with_headers(
                        &format!("{}/dataorder", self.base_url),
                        &json!({"jobId": job_id, "uri": uri}).to_string(),
                        &[("Authorization", token)],
                    )
                    .await?,
            )?;
            let order_id = require_str(&order, "orderId")?;
            self.wait_for(
                &format!("{}/dataorder/status/{}", self.base_url, order_id),
                token,
                "data order",
            )
            .await?;

            download_product(
                &self.http_client,
                &format!("{}/dataorder/download/{}", self.base_url, order_id),
                RequestAuth::Header("Authorization", token),
                dest,
            )
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;
    use chrono::NaiveDate;

    const OLCI: &str = "S3A_OL_1_EFR____20210701T094512_20210701T094812_20210702T141210_0179_073_350_2160_LN1_O_NT_002.SEN3";

    fn criteria() -> SearchCriteria {
        let day = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        SearchCriteria {
            start: day.and_hms_opt(0, 0, 0).unwrap(),
            end: day.and_hms_opt(23, 59, 59).unwrap(),
            sensor: Sensor::Olci,
            resolution: 300,
            wkt: String::new(),
            bbox: [6.0, 46.0, 7.0, 46.5],
        }
    }

    fn provider(client: MockAsyncHttpClient) -> HdaProvider<MockAsyncHttpClient> {
        HdaProvider::with_base_url(client, "http://hda".into())
            .with_polling(Duration::ZERO, Duration::from_secs(5))
    }

    fn client() -> MockAsyncHttpClient {
        MockAsyncHttpClient::new(Err(ProviderError::Http("unrouted".into())))
    }

    #[tokio::test]
    async fn test_search_polls_job_then_reads_results() {
        let client = client()
            .route_json("/datarequest/status/", json!({"status": "started"}))
            .route_json("/datarequest/status/", json!({"status": "completed"}))
            .route_json(
                "/datarequest/jobs/",
                json!({"content": [{"filename": format!("{}.zip", OLCI), "url": "prod/1"}], "totalItems": 1}),
            )
            .route_json("/datarequest", json!({"jobId": "J1"}));
        let provider = provider(client.clone());

        let scenes = provider
            .search(&AuthHandle::Token("t".into()), &criteria())
            .await
            .unwrap();

        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].id, "J1|prod/1");
        assert_eq!(scenes[0].name, OLCI);
        let status_polls = client
            .requests()
            .iter()
            .filter(|r| r.url.contains("/status/"))
            .count();
        assert_eq!(status_polls, 2);
    }

    #[tokio::test]
    async fn test_failed_job_is_an_error() {
        let client = client()
            .route_json("/datarequest/status/", json!({"status": "failed", "message": "quota"}))
            .route_json("/datarequest", json!({"jobId": "J1"}));
        let result = provider(client)
            .search(&AuthHandle::Token("t".into()), &criteria())
            .await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(m)) if m.contains("quota")));
    }

    #[tokio::test]
    async fn test_fetch_orders_then_downloads() {
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join(OLCI);
        let client = client()
            .route_json("/dataorder/status/", json!({"status": "completed"}))
            .route("/dataorder/download/", Ok(b"product".to_vec()))
            .route_json("/dataorder", json!({"orderId": "O7"}));
        let provider = provider(client.clone());
        let scene = SceneDescriptor::from_product_name("J1|prod/1", OLCI).unwrap();

        provider
            .fetch(&AuthHandle::Token("t".into()), &scene, &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"product");
        let requests = client.requests();
        assert!(requests[0].body.as_deref().unwrap().contains("\"uri\":\"prod/1\""));
        assert_eq!(requests.last().unwrap().url, "http://hda/dataorder/download/O7");
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_id() {
        let scene = SceneDescriptor::from_product_name("no-separator", OLCI).unwrap();
        let result = provider(client())
            .fetch(&AuthHandle::Token("t".into()), &scene, Path::new("/nonexistent/x"))
            .await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }
}
