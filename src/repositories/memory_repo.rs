use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use crate::models::favourite::{favourite_document_path, Favourite};
use crate::repositories::FavouritesRepo;

/// Process-local favourites keyed by document path `users/{uid}/favorites/{placeId}`.
#[derive(Default)]
pub struct InMemoryFavouritesRepo {
    documents: DashMap<String, Favourite>,
}

impl InMemoryFavouritesRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, path: &str) -> Option<Favourite> {
        self.documents.get(path).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl FavouritesRepo for InMemoryFavouritesRepo {
    async fn add_favourite(&self, favourite: Favourite) -> anyhow::Result<()> {
        self.documents.entry(favourite.document_path()).or_insert(favourite);
        Ok(())
    }

    async fn remove_favourite(&self, user_id: &str, place_id: &str) -> anyhow::Result<()> {
        self.documents.remove(&favourite_document_path(user_id, place_id));
        Ok(())
    }

    async fn is_favourite(&self, user_id: &str, place_id: &str) -> anyhow::Result<bool> {
        Ok(self.documents.contains_key(&favourite_document_path(user_id, place_id)))
    }

    async fn toggle_favourite(&self, favourite: Favourite) -> anyhow::Result<bool> {
        match self.documents.entry(favourite.document_path()) {
            Entry::Occupied(document) => {
                document.remove();
                Ok(false)
            }
            Entry::Vacant(document) => {
                document.insert(favourite);
                Ok(true)
            }
        }
    }

    async fn list_favourites(&self, user_id: &str) -> anyhow::Result<Vec<Favourite>> {
        let mut favourites: Vec<Favourite> = self
            .documents
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        favourites.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(favourites)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use super::*;

    #[tokio::test]
    async fn toggling_writes_and_removes_the_document() {
        let repo = InMemoryFavouritesRepo::new();
        let favourite = Favourite::new("uid-1", "abc123", "Kava", "Dumaguete City");

        assert!(repo.toggle_favourite(favourite.clone()).await.unwrap());
        let stored = repo.document("users/uid-1/favorites/abc123").unwrap();
        assert_eq!(stored.name, "Kava");
        assert!(repo.is_favourite("uid-1", "abc123").await.unwrap());

        assert!(!repo.toggle_favourite(favourite).await.unwrap());
        assert!(!repo.is_favourite("uid-1", "abc123").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_alternate() {
        let repo = Arc::new(InMemoryFavouritesRepo::new());

        let toggles = (0..64).map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.toggle_favourite(Favourite::new("uid-1", "abc123", "Kava", "Dumaguete City"))
                    .await
                    .unwrap()
            })
        });
        let added = futures::future::join_all(toggles)
            .await
            .into_iter()
            .filter(|result| *result.as_ref().unwrap())
            .count();

        assert_eq!(added, 32);
        assert!(!repo.is_favourite("uid-1", "abc123").await.unwrap());
    }

    #[tokio::test]
    async fn adding_twice_keeps_the_first_record() {
        let repo = InMemoryFavouritesRepo::new();
        repo.add_favourite(Favourite::new("u", "p", "First", "A")).await.unwrap();
        repo.add_favourite(Favourite::new("u", "p", "Second", "B")).await.unwrap();

        let favourites = repo.list_favourites("u").await.unwrap();
        assert_eq!(favourites.len(), 1);
        assert_eq!(favourites[0].name, "First");
    }

    #[tokio::test]
    async fn favourites_are_scoped_per_user() {
        let repo = InMemoryFavouritesRepo::new();
        repo.add_favourite(Favourite::new("u1", "p1", "A", "x")).await.unwrap();
        repo.add_favourite(Favourite::new("u2", "p2", "B", "y")).await.unwrap();

        let favourites = repo.list_favourites("u1").await.unwrap();
        assert_eq!(favourites.len(), 1);
        assert_eq!(favourites[0].place_id, "p1");
        assert!(!repo.is_favourite("u1", "p2").await.unwrap());
    }
}
