use async_trait::async_trait;

use crate::domain::{CacheMode, Content, ContentMeta};

/// Metadata enrichment for content items. Absent metadata is a valid answer;
/// scoring degrades to neutral rather than failing.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Enrich one content item according to the requested cache mode
    async fn enrich(
        &self,
        content: &Content,
        mode: CacheMode,
    ) -> anyhow::Result<Option<ContentMeta>>;

    /// Enrich a batch; implementations may parallelize or hit a bulk cache
    async fn enrich_batch(
        &self,
        contents: &[Content],
        mode: CacheMode,
    ) -> anyhow::Result<Vec<Option<ContentMeta>>> {
        let mut out = Vec::with_capacity(contents.len());
        for content in contents {
            out.push(self.enrich(content, mode).await?);
        }
        Ok(out)
    }
}
