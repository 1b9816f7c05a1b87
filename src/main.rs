use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;
use crate::config::Config;
use crate::controller::AppState;
use crate::repositories::FavouritesRepo;
use crate::repositories::memory_repo::InMemoryFavouritesRepo;
use crate::repositories::postgres_repo::PostgresConnectionRepo;
use crate::services::build_cafe_service;
use crate::services::debounce::Debouncer;

pub mod config;
pub mod controller;
pub mod helpers;
pub mod models;
pub mod repositories;
pub mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::parse();
    info!("Starting cafe compass backend in {} mode", config.environment);

    let favourites_repo: Arc<dyn FavouritesRepo> = match &config.database_url {
        Some(database_url) => Arc::new(
            PostgresConnectionRepo::connect(database_url, config.database_pool_size).await?
        ),
        None => {
            info!("DATABASE_URL not set, favourites are kept in memory");
            Arc::new(InMemoryFavouritesRepo::new())
        }
    };

    let app_state = AppState {
        cafe_service: Arc::new(build_cafe_service(&config)?),
        favourites_repo,
        debouncer: Arc::new(Debouncer::new(Duration::from_millis(config.debounce_ms))),
    };

    controller::serve(app_state, &config).await
}
