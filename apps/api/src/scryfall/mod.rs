//! Scryfall client — every outbound call to the card database goes through here.
//!
//! Lookups try the exact printing (`/cards/{set}/{number}`) first and fall back
//! to a fuzzy name search. 429 and 5xx responses are retried with exponential
//! backoff; a 404 is an ordinary "not found".
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod models;

pub use models::ScryfallCard;

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ScryfallError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// What to look up: a card name, optionally pinned to one printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardQuery<'a> {
    pub name: &'a str,
    pub set_code: Option<&'a str>,
    pub set_num: Option<&'a str>,
}

impl<'a> CardQuery<'a> {
    #[cfg(test)]
    pub fn by_name(name: &'a str) -> Self {
        Self {
            name,
            set_code: None,
            set_num: None,
        }
    }
}

/// Source of card metadata and image bytes.
///
/// Carried in `AppState` as `Arc<dyn CardSource>`; tests substitute an
/// in-memory implementation.
#[async_trait]
pub trait CardSource: Send + Sync {
    /// `Ok(None)` means the card database has no match for the query.
    async fn lookup(&self, query: &CardQuery<'_>) -> Result<Option<ScryfallCard>, ScryfallError>;

    async fn download(&self, url: &str) -> Result<Bytes, ScryfallError>;
}

#[derive(Debug, Deserialize)]
struct ScryfallErrorBody {
    details: String,
}

#[derive(Clone)]
pub struct ScryfallClient {
    client: Client,
    base_url: String,
    lookup_timeout: Duration,
    download_timeout: Duration,
    retry_base_delay: Duration,
}

impl ScryfallClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.scryfall_user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.scryfall_api_url.trim_end_matches('/').to_string(),
            lookup_timeout: Duration::from_secs(config.lookup_timeout_secs),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
            retry_base_delay: RETRY_BASE_DELAY,
        })
    }

    /// Overrides the first backoff delay (doubles on each further retry).
    #[cfg(test)]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends the request built by `build`, retrying transport errors,
    /// 429 and 5xx responses.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response, ScryfallError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_error: Option<ScryfallError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "Scryfall request attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match build().send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ScryfallError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Scryfall returned {}: {}", status, body);
                last_error = Some(ScryfallError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or(ScryfallError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    async fn fetch_card(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<ScryfallCard>, ScryfallError> {
        let response = self
            .send_with_retry(|| {
                self.client
                    .get(url)
                    .query(query)
                    .header(header::ACCEPT, "application/json")
                    .timeout(self.lookup_timeout)
            })
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ScryfallErrorBody>(&body)
                .map(|e| e.details)
                .unwrap_or(body);
            return Err(ScryfallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Some(response.json().await?))
    }
}

#[async_trait]
impl CardSource for ScryfallClient {
    async fn lookup(&self, query: &CardQuery<'_>) -> Result<Option<ScryfallCard>, ScryfallError> {
        if let (Some(set_code), Some(set_num)) = (query.set_code, query.set_num) {
            let url = format!("{}/cards/{}/{}", self.base_url, set_code, set_num);
            match self.fetch_card(&url, &[]).await {
                Ok(Some(card)) => return Ok(Some(card)),
                Ok(None) => debug!(
                    "No printing {set_code}/{set_num} for '{}', falling back to name search",
                    query.name
                ),
                Err(e) => warn!(
                    "Printing lookup {set_code}/{set_num} failed: {e}; falling back to name search"
                ),
            }
        }

        let url = format!("{}/cards/named", self.base_url);
        self.fetch_card(&url, &[("fuzzy", query.name)]).await
    }

    async fn download(&self, url: &str) -> Result<Bytes, ScryfallError> {
        let response = self
            .send_with_retry(|| {
                self.client
                    .get(url)
                    .header(header::ACCEPT, "*/*")
                    .timeout(self.download_timeout)
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScryfallError::Api {
                status: status.as_u16(),
                message: format!("image download failed: {url}"),
            });
        }

        Ok(response.bytes().await?)
    }
}

/// File extension for a card image URL (`png` or `jpg`), ignoring query strings.
pub fn image_extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.to_ascii_lowercase().ends_with(".png") {
        "png"
    } else {
        "jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> ScryfallClient {
        let config = Config {
            scryfall_api_url: server.base_url(),
            ..Config::default()
        };
        ScryfallClient::new(&config)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1))
    }

    fn card_json(name: &str, png: &str) -> serde_json::Value {
        json!({
            "object": "card",
            "name": name,
            "layout": "normal",
            "image_uris": { "png": png, "normal": "unused.jpg" }
        })
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(
            image_extension("https://cards.scryfall.io/png/front/a/b.png?1562"),
            "png"
        );
        assert_eq!(
            image_extension("https://cards.scryfall.io/large/front/a/b.jpg?1562"),
            "jpg"
        );
    }

    #[tokio::test]
    async fn test_fuzzy_lookup() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/cards/named")
                    .query_param("fuzzy", "Lightning Bolt")
                    .header("accept", "application/json");
                then.status(200)
                    .json_body(card_json("Lightning Bolt", "https://img/bolt.png"));
            })
            .await;

        let card = client_for(&server)
            .lookup(&CardQuery::by_name("Lightning Bolt"))
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(card.name, "Lightning Bolt");
        assert_eq!(card.image_urls().unwrap().front, "https://img/bolt.png");
    }

    #[tokio::test]
    async fn test_exact_printing_is_tried_first() {
        let server = MockServer::start_async().await;
        let exact = server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/c21/263");
                then.status(200)
                    .json_body(card_json("Sol Ring", "https://img/c21.png"));
            })
            .await;
        let fuzzy = server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/named");
                then.status(200)
                    .json_body(card_json("Sol Ring", "https://img/other.png"));
            })
            .await;

        let query = CardQuery {
            name: "Sol Ring",
            set_code: Some("c21"),
            set_num: Some("263"),
        };
        let card = client_for(&server).lookup(&query).await.unwrap().unwrap();

        exact.assert_async().await;
        assert_eq!(fuzzy.hits_async().await, 0);
        assert_eq!(card.image_urls().unwrap().front, "https://img/c21.png");
    }

    #[tokio::test]
    async fn test_unknown_printing_falls_back_to_name() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/xyz/999");
                then.status(404).json_body(json!({
                    "object": "error",
                    "status": 404,
                    "details": "No card found with the given ID or set code and collector number."
                }));
            })
            .await;
        let fuzzy = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/cards/named")
                    .query_param("fuzzy", "Sol Ring");
                then.status(200)
                    .json_body(card_json("Sol Ring", "https://img/any.png"));
            })
            .await;

        let query = CardQuery {
            name: "Sol Ring",
            set_code: Some("xyz"),
            set_num: Some("999"),
        };
        let card = client_for(&server).lookup(&query).await.unwrap();

        fuzzy.assert_async().await;
        assert!(card.is_some());
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/named");
                then.status(404).json_body(json!({
                    "object": "error",
                    "status": 404,
                    "details": "No cards found matching “Nonexistent Card”"
                }));
            })
            .await;

        let card = client_for(&server)
            .lookup(&CardQuery::by_name("Nonexistent Card"))
            .await
            .unwrap();
        assert!(card.is_none());
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_then_reported() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/named");
                then.status(503).body("maintenance");
            })
            .await;

        let err = client_for(&server)
            .lookup(&CardQuery::by_name("Opt"))
            .await
            .unwrap_err();

        assert_eq!(mock.hits_async().await, MAX_RETRIES as usize);
        assert!(matches!(err, ScryfallError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_bad_request_surfaces_details() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/named");
                then.status(400).json_body(json!({
                    "object": "error",
                    "status": 400,
                    "details": "fuzzy parameter is required"
                }));
            })
            .await;

        let err = client_for(&server)
            .lookup(&CardQuery::by_name(""))
            .await
            .unwrap_err();
        match err {
            ScryfallError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "fuzzy parameter is required");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_download_returns_bytes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/png/front/bolt.png");
                then.status(200).body(vec![0x89, b'P', b'N', b'G']);
            })
            .await;

        let bytes = client_for(&server)
            .download(&server.url("/png/front/bolt.png"))
            .await
            .unwrap();
        assert_eq!(&bytes[..], &[0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_download_missing_image_is_error() {
        let server = MockServer::start_async().await;
        let missing = server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.jpg");
                then.status(404);
            })
            .await;

        let result = client_for(&server)
            .download(&server.url("/missing.jpg"))
            .await;
        assert!(matches!(result, Err(ScryfallError::Api { status: 404, .. })));
        assert_eq!(missing.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_until_success() {
        let server = MockServer::start_async().await;
        let limited = server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/named");
                then.status(429).json_body(json!({
                    "object": "error",
                    "status": 429,
                    "details": "Too many requests"
                }));
            })
            .await;

        let client = client_for(&server).with_retry_delay(Duration::from_millis(300));
        let lookup = tokio::spawn(async move { client.lookup(&CardQuery::by_name("Opt")).await });

        while limited.hits_async().await == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        limited.delete_async().await;
        let ok = server
            .mock_async(|when, then| {
                when.method(GET).path("/cards/named");
                then.status(200)
                    .json_body(card_json("Opt", "https://img/opt.png"));
            })
            .await;

        let card = lookup.await.unwrap().unwrap().unwrap();
        assert_eq!(card.name, "Opt");
        assert_eq!(ok.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_connection_error_is_retried() {
        // Nothing listens on the port until after the first attempt is refused.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let config = Config {
            scryfall_api_url: format!("http://{addr}"),
            ..Config::default()
        };
        let client = ScryfallClient::new(&config)
            .unwrap()
            .with_retry_delay(Duration::from_millis(500));
        let lookup = tokio::spawn(async move { client.lookup(&CardQuery::by_name("Opt")).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let app = axum::Router::new().route(
            "/cards/named",
            axum::routing::get(|| async {
                axum::Json(card_json("Opt", "https://img/opt.png"))
            }),
        );
        tokio::spawn(async move { axum::serve(listener, app).await });

        let card = lookup.await.unwrap().unwrap().unwrap();
        assert_eq!(card.name, "Opt");
    }
}
