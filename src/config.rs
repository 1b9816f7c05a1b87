use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Geoapify,
    Google,
    Nominatim,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

#[derive(Parser, Clone, Debug)]
pub struct Config {
    #[clap(env, long, default_value = "development")]
    pub environment: String,
    #[clap(env, long, default_value = "http://localhost:3000")]
    pub origin_urls: String,
    #[clap(env, long, default_value_t = 8080)]
    pub port: u16,
    /// Favourites are kept in memory when unset.
    #[clap(env, long)]
    pub database_url: Option<String>,
    #[clap(env, long, default_value_t = 8)]
    pub database_pool_size: u32,

    #[clap(env, long, default_value = "")]
    pub geoapify_api_key: String,
    #[clap(env, long, default_value = "")]
    pub google_api_key: String,
    #[clap(env, long, default_value = "DumagueteCafeCompass/1.0")]
    pub nominatim_user_agent: String,
    #[clap(env, long, default_value_t = 1000)]
    pub nominatim_interval_ms: u64,

    #[clap(env, long, default_value = "Dumaguete City")]
    pub city_name: String,
    #[clap(env, long, default_value_t = 9.3076)]
    pub city_lat: f64,
    #[clap(env, long, default_value_t = 123.3080)]
    pub city_lon: f64,
    /// Search radius in metres around the city centre.
    #[clap(env, long, default_value_t = 5000)]
    pub search_radius: u32,

    #[clap(env, long, value_enum, default_value_t = ProviderKind::Geoapify)]
    pub primary_provider: ProviderKind,
    #[clap(env, long, value_enum)]
    pub secondary_provider: Option<ProviderKind>,

    #[clap(env, long, default_value_t = 5)]
    pub top_limit: usize,
    #[clap(env, long, default_value_t = 5)]
    pub search_limit: usize,
    #[clap(env, long, default_value_t = 30)]
    pub near_limit: usize,
    #[clap(env, long, default_value_t = 15)]
    pub tag_limit: usize,

    #[clap(env, long, default_value_t = 1024)]
    pub cache_capacity: usize,
    /// Zero disables expiry.
    #[clap(env, long, default_value_t = 86_400)]
    pub cache_ttl_secs: u64,

    #[clap(env, long, default_value_t = 3)]
    pub retry_attempts: usize,
    #[clap(env, long, default_value_t = 1000)]
    pub retry_delay_ms: u64,
    #[clap(env, long, value_enum, default_value_t = BackoffKind::Fixed)]
    pub retry_backoff: BackoffKind,

    #[clap(env, long, default_value_t = 300)]
    pub debounce_ms: u64,
}
