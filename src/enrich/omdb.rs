use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{EnrichError, EnrichResult};
use crate::config::OmdbConfig;

/// Looks up and fetches poster images.
#[async_trait]
pub trait PosterSource: Send + Sync {
    /// Poster image URL for a movie, if the catalog service knows one.
    async fn poster_url(&self, title: &str, year: i32) -> EnrichResult<Option<String>>;
    async fn download(&self, url: &str) -> EnrichResult<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Response", default)]
    response: String,
    #[serde(rename = "Poster", default)]
    poster: Option<String>,
}

const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

pub fn should_retry(status: u16) -> bool {
    RETRY_STATUSES.contains(&status)
}

/// Delay before retry number `attempt` (0-based): `base`, `2 * base`, ...
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt)
}

/// OMDb client with bounded retry on rate limiting and server errors.
pub struct PosterClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
    backoff: Duration,
}

impl PosterClient {
    pub fn new(config: &OmdbConfig) -> EnrichResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(EnrichError::Config("omdb.api_key"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
            backoff: Duration::from_secs(1),
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn get_with_retry(&self, url: &str, query: &[(&str, String)]) -> EnrichResult<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let result = self.client.get(url).query(query).send().await;
            let retryable = match &result {
                Ok(response) => should_retry(response.status().as_u16()),
                Err(e) => e.is_timeout() || e.is_connect(),
            };

            if !retryable || attempt >= self.max_retries {
                return Ok(result?);
            }

            let delay = backoff_delay(self.backoff, attempt);
            match &result {
                Ok(response) => warn!(url, status = response.status().as_u16(), ?delay, "Retrying request"),
                Err(e) => warn!(url, ?delay, "Retrying request after error: {}", e),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl PosterSource for PosterClient {
    async fn poster_url(&self, title: &str, year: i32) -> EnrichResult<Option<String>> {
        let query = [
            ("apikey", self.api_key.clone()),
            ("t", title.to_string()),
            ("y", year.to_string()),
        ];
        let response = self.get_with_retry(&self.base_url, &query).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::Status {
                status: status.as_u16(),
                url: self.base_url.clone(),
            });
        }

        let data: OmdbResponse = response.json().await?;
        debug!(title, year, response = %data.response, "OMDb lookup");

        match data.poster {
            Some(poster) if data.response == "True" && poster != "N/A" => Ok(Some(poster)),
            _ => Ok(None),
        }
    }

    async fn download(&self, url: &str) -> EnrichResult<Vec<u8>> {
        let response = self.get_with_retry(url, &[]).await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(EnrichError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> PosterClient {
        let config = OmdbConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            ..Default::default()
        };
        PosterClient::new(&config).unwrap().with_backoff(Duration::from_millis(1))
    }

    #[test]
    fn test_retry_policy() {
        assert!(should_retry(429));
        assert!(should_retry(503));
        assert!(!should_retry(404));
        assert!(!should_retry(200));
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            PosterClient::new(&OmdbConfig::default()),
            Err(EnrichError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_poster_lookup_retries_then_succeeds() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        return StatusCode::TOO_MANY_REQUESTS.into_response();
                    }
                    assert_eq!(params.get("apikey").map(String::as_str), Some("test-key"));
                    assert_eq!(params.get("y").map(String::as_str), Some("2008"));
                    Json(json!({"Response": "True", "Poster": "http://img/alpha.jpg"})).into_response()
                }
            }),
        );
        let base = spawn(router).await;

        let poster = client(format!("{}/", base)).poster_url("Alpha", 2008).await.unwrap();
        assert_eq!(poster.as_deref(), Some("http://img/alpha.jpg"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poster_lookup_gives_up_after_two_retries() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        );
        let base = spawn(router).await;

        let result = client(format!("{}/", base)).poster_url("Alpha", 2008).await;
        assert!(matches!(result, Err(EnrichError::Status { status: 503, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_poster() {
        let router = Router::new()
            .route("/", get(|| async { Json(json!({"Response": "True", "Poster": "N/A"})) }))
            .route("/none", get(|| async { Json(json!({"Response": "False", "Error": "Movie not found!"})) }));
        let base = spawn(router).await;

        assert_eq!(client(format!("{}/", base)).poster_url("Alpha", 2008).await.unwrap(), None);
        assert_eq!(client(format!("{}/none", base)).poster_url("Alpha", 2008).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_download() {
        let router = Router::new()
            .route("/poster.jpg", get(|| async { vec![0xffu8, 0xd8, 0xff] }))
            .route("/gone.jpg", get(|| async { StatusCode::NOT_FOUND }));
        let base = spawn(router).await;
        let client = client(base.clone());

        let bytes = client.download(&format!("{}/poster.jpg", base)).await.unwrap();
        assert_eq!(bytes, vec![0xff, 0xd8, 0xff]);
        assert!(client.download(&format!("{}/gone.jpg", base)).await.is_err());
    }
}
