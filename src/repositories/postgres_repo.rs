use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bb8_postgres::bb8::{Pool, PooledConnection};
use bb8_postgres::PostgresConnectionManager;
use bb8_postgres::tokio_postgres::{NoTls, Row};
use time::OffsetDateTime;
use tracing::{info, warn};
use crate::models::favourite::Favourite;
use crate::repositories::FavouritesRepo;

pub const RETRY_LIMIT: usize = 5;

const CREATE_FAVOURITES_TABLE: &str = "CREATE TABLE IF NOT EXISTS user_favourite_cafes (\
    user_id TEXT NOT NULL, \
    place_id TEXT NOT NULL, \
    name TEXT NOT NULL, \
    address TEXT NOT NULL, \
    timestamp TIMESTAMPTZ NOT NULL, \
    PRIMARY KEY (user_id, place_id));";

pub struct PostgresConnectionRepo {
    postgres_connection: Pool<PostgresConnectionManager<NoTls>>,
}

impl PostgresConnectionRepo {
    pub fn new(
        postgres_connection: Pool<PostgresConnectionManager<NoTls>>,
    ) -> Self {
        Self {
            postgres_connection
        }
    }

    pub async fn connect(database_url: &str, pool_size: u32) -> anyhow::Result<Self> {
        let manager = PostgresConnectionManager::new_from_stringlike(database_url, NoTls)
            .context("Invalid postgres connection string")?;
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .await
            .context("Failed to build postgres pool")?;

        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        info!("Favourites are stored in postgres");
        Ok(repo)
    }

    async fn get_postgres_connection(
        &self,
    ) -> anyhow::Result<PooledConnection<'_, PostgresConnectionManager<NoTls>>> {
        for _ in 0..RETRY_LIMIT {
            match self.postgres_connection.get().await {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    warn!("Failed to retrieve postgres connection due to: {}, retrying in 3s", e);
                    tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;
                    continue;
                }
            }
        }

        Err(anyhow!("Failed to retrieve a valid connection from postgres pool, BAILING"))
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        let conn = self.get_postgres_connection().await?;
        conn.batch_execute(CREATE_FAVOURITES_TABLE)
            .await
            .context("Failed to create favourites table")?;
        Ok(())
    }
}

#[async_trait]
impl FavouritesRepo for PostgresConnectionRepo {
    async fn add_favourite(&self, favourite: Favourite) -> anyhow::Result<()> {
        let conn = self.get_postgres_connection().await?;
        let res = conn
            .execute(
                "INSERT INTO user_favourite_cafes (user_id, place_id, name, address, timestamp) \
                VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING;",
                &[
                    &favourite.user_id,
                    &favourite.place_id,
                    &favourite.name,
                    &favourite.address,
                    &favourite.timestamp,
                ],
            )
            .await;

        if let Err(e) = res {
            warn!("Failed to favourite cafe for user: {}, due to: {}", favourite.user_id, e);
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove_favourite(&self, user_id: &str, place_id: &str) -> anyhow::Result<()> {
        let conn = self.get_postgres_connection().await?;
        let res = conn
            .execute(
                "DELETE FROM user_favourite_cafes where user_id = $1 and place_id = $2;",
                &[&user_id, &place_id],
            )
            .await;

        if let Err(e) = res {
            warn!("Failed to remove favourite cafe for user: {}, due to: {}", user_id, e);
            return Err(e.into());
        }
        Ok(())
    }

    async fn is_favourite(&self, user_id: &str, place_id: &str) -> anyhow::Result<bool> {
        let conn = self.get_postgres_connection().await?;
        let row = conn
            .query_opt(
                "SELECT 1 FROM user_favourite_cafes where user_id = $1 and place_id = $2 limit 1;",
                &[&user_id, &place_id],
            )
            .await
            .with_context(|| format!("Failed to check favourite {} for user {}", place_id, user_id))?;

        Ok(row.is_some())
    }

    async fn toggle_favourite(&self, favourite: Favourite) -> anyhow::Result<bool> {
        let mut conn = self.get_postgres_connection().await?;
        let transaction = conn
            .transaction()
            .await
            .context("Failed to open favourite toggle transaction")?;

        // serializes toggles of the same (user, place), including when no row exists yet
        transaction
            .execute("SELECT pg_advisory_xact_lock(hashtext($1));", &[&favourite.document_path()])
            .await
            .context("Failed to lock favourite for toggling")?;

        let removed = transaction
            .execute(
                "DELETE FROM user_favourite_cafes where user_id = $1 and place_id = $2;",
                &[&favourite.user_id, &favourite.place_id],
            )
            .await
            .with_context(|| format!("Failed to toggle favourite {} for user {}", favourite.place_id, favourite.user_id))?;

        if removed == 0 {
            transaction
                .execute(
                    "INSERT INTO user_favourite_cafes (user_id, place_id, name, address, timestamp) \
                    VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING;",
                    &[
                        &favourite.user_id,
                        &favourite.place_id,
                        &favourite.name,
                        &favourite.address,
                        &favourite.timestamp,
                    ],
                )
                .await
                .with_context(|| format!("Failed to toggle favourite {} for user {}", favourite.place_id, favourite.user_id))?;
        }

        transaction
            .commit()
            .await
            .context("Failed to commit favourite toggle")?;
        Ok(removed == 0)
    }

    async fn list_favourites(&self, user_id: &str) -> anyhow::Result<Vec<Favourite>> {
        let conn = self.get_postgres_connection().await?;
        let rows = conn
            .query(
                "SELECT user_id, place_id, name, address, timestamp FROM user_favourite_cafes \
                where user_id = $1 ORDER BY timestamp DESC;",
                &[&user_id],
            )
            .await
            .with_context(|| format!("Failed to retrieve favourite cafes for user: {}", user_id))?;

        Ok(rows.into_iter().map(parse_row_into_favourite).collect())
    }
}

fn parse_row_into_favourite(
    row: Row,
) -> Favourite {
    Favourite {
        user_id: row.get("user_id"),
        place_id: row.get("place_id"),
        name: row.get("name"),
        address: row.get("address"),
        timestamp: row.get::<&str, OffsetDateTime>("timestamp"),
    }
}
