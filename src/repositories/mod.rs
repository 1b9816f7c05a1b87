use async_trait::async_trait;
use crate::models::favourite::Favourite;

pub mod memory_repo;
pub mod postgres_repo;

/// Storage for users' favourite cafes, one record per (user, place).
#[async_trait]
pub trait FavouritesRepo: Send + Sync {
    /// Stores the favourite; an existing record for the same place is kept as is.
    async fn add_favourite(&self, favourite: Favourite) -> anyhow::Result<()>;

    async fn remove_favourite(&self, user_id: &str, place_id: &str) -> anyhow::Result<()>;

    async fn is_favourite(&self, user_id: &str, place_id: &str) -> anyhow::Result<bool>;

    async fn list_favourites(&self, user_id: &str) -> anyhow::Result<Vec<Favourite>>;

    /// Flips the favourite state in one step and returns the new one.
    /// Concurrent toggles of the same (user, place) never both report `true`.
    async fn toggle_favourite(&self, favourite: Favourite) -> anyhow::Result<bool>;
}
