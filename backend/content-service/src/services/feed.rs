//! Element feed and trending read paths.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::FeedCache;
use crate::db::ContentStore;
use crate::error::Result;
use crate::models::{ContentItem, Element, TrendingRecord};
use crate::services::ranking::rank_feed;

/// A page of ranked feed items.
#[derive(Debug)]
pub struct FeedPage {
    pub items: Vec<ContentItem>,
    pub total: usize,
    pub has_more: bool,
}

pub struct FeedService {
    store: Arc<dyn ContentStore>,
    cache: Arc<FeedCache>,
    max_candidates: i64,
}

impl FeedService {
    pub fn new(store: Arc<dyn ContentStore>, cache: Arc<FeedCache>, max_candidates: i64) -> Self {
        Self {
            store,
            cache,
            max_candidates: max_candidates.max(1),
        }
    }

    /// Ranked feed for an element, paginated. The full ranked id list is
    /// cached; pages are sliced out of it.
    pub async fn get_feed(
        &self,
        element: Element,
        limit: usize,
        offset: usize,
    ) -> Result<FeedPage> {
        if let Some(ids) = self.cache.read(element) {
            let total = ids.len();
            let page_ids = page_slice(&ids, limit, offset);
            let items = self.store.find_published_by_ids(&page_ids).await?;
            return Ok(FeedPage {
                items: order_like(items, &page_ids),
                total,
                has_more: offset + limit < total,
            });
        }

        let candidates = self
            .store
            .list_published(element, self.max_candidates)
            .await?;
        let ranked = rank_feed(candidates);
        let all_ids: Vec<Uuid> = ranked.iter().map(|item| item.id).collect();
        let total = all_ids.len();

        if total > 0 {
            self.cache.write(element, all_ids);
        }

        let start = offset.min(total);
        let end = (start + limit).min(total);
        Ok(FeedPage {
            items: ranked[start..end].to_vec(),
            total,
            has_more: end < total,
        })
    }

    /// Trending records joined against current content rows; items that are
    /// no longer published drop out.
    pub async fn get_trending(
        &self,
        element: Element,
        limit: i64,
    ) -> Result<Vec<(TrendingRecord, ContentItem)>> {
        let records = self.store.top_trending(element, limit).await?;
        let ids: Vec<Uuid> = records.iter().map(|record| record.content_id).collect();
        let items = self.store.find_published_by_ids(&ids).await?;

        let joined = records
            .into_iter()
            .filter_map(|record| {
                items
                    .iter()
                    .find(|item| item.id == record.content_id)
                    .cloned()
                    .map(|item| (record, item))
            })
            .collect();

        Ok(joined)
    }
}

fn page_slice(ids: &[Uuid], limit: usize, offset: usize) -> Vec<Uuid> {
    let total = ids.len();
    let start = offset.min(total);
    let end = (start + limit).min(total);
    ids[start..end].to_vec()
}

fn order_like(items: Vec<ContentItem>, ids: &[Uuid]) -> Vec<ContentItem> {
    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(item) = items.iter().find(|item| item.id == *id) {
            ordered.push(item.clone());
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slice_bounds() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        assert_eq!(page_slice(&ids, 2, 0), ids[0..2].to_vec());
        assert_eq!(page_slice(&ids, 2, 4), ids[4..5].to_vec());
        assert!(page_slice(&ids, 2, 10).is_empty());
    }
}
