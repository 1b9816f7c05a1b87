use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use crate::helpers::errors::PlacesError;
use crate::services::cache::ResponseCache;

/// Issues a GET and hands back the decoded JSON body.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, PlacesError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
    min_interval: Option<Duration>,
    last_request: Mutex<Option<Instant>>,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            min_interval: None,
            last_request: Mutex::new(None),
        })
    }

    /// Spaces consecutive requests at least `interval` apart.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = Some(interval);
        self
    }

    async fn wait_for_slot(&self) {
        let interval = match self.min_interval {
            Some(interval) => interval,
            None => return,
        };

        let mut last_request = self.last_request.lock().await;
        if let Some(previous) = *last_request {
            let ready_at = previous + interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}

#[async_trait]
impl JsonFetcher for ReqwestFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, PlacesError> {
        self.wait_for_slot().await;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Provider request failed with status: {}", status);
            return Err(PlacesError::Status(status.as_u16()));
        }

        let body = response.json::<Value>().await?;
        Ok(body)
    }
}

/// Decides whether a successfully fetched body is a real answer. Vendors that
/// report errors inside a 200 body plug their status check in here.
pub type BodyCheck = fn(&Value) -> Result<(), PlacesError>;

/// Short-circuits repeated requests for the same URL through a [`ResponseCache`].
pub struct CachedFetcher {
    inner: Arc<dyn JsonFetcher>,
    cache: Arc<ResponseCache>,
    validator: Option<BodyCheck>,
}

impl CachedFetcher {
    pub fn new(inner: Arc<dyn JsonFetcher>, cache: Arc<ResponseCache>) -> Self {
        Self {
            inner,
            cache,
            validator: None,
        }
    }

    /// Only bodies passing `validator` are cached; the rest are handed back untouched.
    pub fn with_validator(mut self, validator: BodyCheck) -> Self {
        self.validator = Some(validator);
        self
    }
}

#[async_trait]
impl JsonFetcher for CachedFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, PlacesError> {
        if let Some(cached) = self.cache.get(url) {
            debug!("Cache hit for: {}", redact_key(url));
            return Ok(cached);
        }

        let value = self.inner.fetch_json(url).await?;
        if let Some(validator) = self.validator {
            if let Err(e) = validator(&value) {
                debug!("Not caching {} due to: {}", redact_key(url), e);
                return Ok(value);
            }
        }
        self.cache.set(url, value.clone());
        Ok(value)
    }
}

/// Strips API keys from a URL before it reaches the logs.
pub fn redact_key(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| {
                    let secret = k.eq_ignore_ascii_case("key") || k.eq_ignore_ascii_case("apikey");
                    (k.into_owned(), if secret { "***".to_string() } else { v.into_owned() })
                })
                .collect();
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}
