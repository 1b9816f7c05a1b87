use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use crate::config::{Config, ProviderKind};
use crate::services::cache::ResponseCache;
use crate::services::cafe_service::{CafeService, Limits};
use crate::services::fetcher::{CachedFetcher, JsonFetcher, ReqwestFetcher};
use crate::services::providers::google::{google_body_status, GooglePlacesProvider};
use crate::services::providers::{build_provider, Fetchers, SearchArea};
use crate::services::retry::RetryPolicy;

pub mod cache;
pub mod cafe_service;
pub mod debounce;
pub mod fallback;
pub mod fetcher;
pub mod normalize;
pub mod providers;
pub mod retry;
pub mod tags;

pub fn build_cafe_service(config: &Config) -> anyhow::Result<CafeService> {
    let ttl = match config.cache_ttl_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let cache = Arc::new(ResponseCache::new(config.cache_capacity, ttl));

    let http: Arc<dyn JsonFetcher> = Arc::new(ReqwestFetcher::new(&config.nominatim_user_agent)?);
    let nominatim_http: Arc<dyn JsonFetcher> = Arc::new(
        ReqwestFetcher::new(&config.nominatim_user_agent)?
            .with_min_interval(Duration::from_millis(config.nominatim_interval_ms)),
    );
    let fetchers = Fetchers {
        geoapify: Arc::new(CachedFetcher::new(http.clone(), cache.clone())),
        google: Arc::new(CachedFetcher::new(http, cache.clone()).with_validator(google_body_status)),
        nominatim: Arc::new(CachedFetcher::new(nominatim_http, cache)),
    };

    let primary = build_provider(config.primary_provider, config, &fetchers);
    let secondary = config
        .secondary_provider
        .filter(|kind| *kind != config.primary_provider)
        .map(|kind| build_provider(kind, config, &fetchers));

    let uses_google = config.primary_provider == ProviderKind::Google
        || config.secondary_provider == Some(ProviderKind::Google);
    let google = if config.google_api_key.is_empty() && !uses_google {
        None
    } else {
        Some(Arc::new(GooglePlacesProvider::new(
            fetchers.google.clone(),
            config.google_api_key.clone(),
            SearchArea::from_config(config),
        )))
    };

    info!(
        "Cafe providers: primary={}, secondary={}, google enrichment={}",
        primary.name(),
        secondary.as_ref().map(|p| p.name()).unwrap_or("none"),
        google.is_some()
    );

    Ok(CafeService::new(
        primary,
        secondary,
        google,
        RetryPolicy::from_config(config),
        Limits::from_config(config),
        SearchArea::from_config(config),
    ))
}
