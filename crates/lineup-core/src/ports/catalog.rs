use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Content, ContentItem};

/// Read access to the content catalog backing store.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Get one content item by id
    async fn get_content(&self, content_id: &str) -> anyhow::Result<Option<Content>>;

    /// List all content in a library
    async fn list_library(&self, library_id: &str) -> anyhow::Result<Vec<Content>>;

    /// Fetch the pool for a set of libraries, metadata attached where known
    async fn fetch_pool(&self, libraries: &[String]) -> anyhow::Result<Vec<ContentItem>>;
}

/// In-memory catalog for tests and the demo server.
#[derive(Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<String, ContentItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, item: ContentItem) {
        self.items
            .write()
            .await
            .insert(item.content.id.clone(), item);
    }

    pub async fn insert_all(&self, items: Vec<ContentItem>) {
        let mut map = self.items.write().await;
        for item in items {
            map.insert(item.content.id.clone(), item);
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl ContentCatalog for InMemoryCatalog {
    async fn get_content(&self, content_id: &str) -> anyhow::Result<Option<Content>> {
        Ok(self
            .items
            .read()
            .await
            .get(content_id)
            .map(|item| item.content.clone()))
    }

    async fn list_library(&self, library_id: &str) -> anyhow::Result<Vec<Content>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.content.library_id.as_deref() == Some(library_id))
            .map(|item| item.content.clone())
            .collect())
    }

    async fn fetch_pool(&self, libraries: &[String]) -> anyhow::Result<Vec<ContentItem>> {
        let items = self.items.read().await;
        let mut pool: Vec<ContentItem> = items
            .values()
            .filter(|item| {
                libraries.is_empty()
                    || item
                        .content
                        .library_id
                        .as_ref()
                        .map(|lib| libraries.contains(lib))
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        // Stable pool order regardless of map iteration
        pool.sort_by(|a, b| a.content.id.cmp(&b.content.id));
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::item;

    #[tokio::test]
    async fn test_fetch_pool_filters_by_library() {
        let catalog = InMemoryCatalog::new();
        let mut a = item("a", "A", 90, &[]);
        a.content.library_id = Some("movies".to_string());
        let mut b = item("b", "B", 60, &[]);
        b.content.library_id = Some("shows".to_string());
        catalog.insert_all(vec![a, b]).await;

        let pool = catalog.fetch_pool(&["movies".to_string()]).await.unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id(), "a");

        // No library filter returns everything
        let pool = catalog.fetch_pool(&[]).await.unwrap();
        assert_eq!(pool.len(), 2);
    }
}
