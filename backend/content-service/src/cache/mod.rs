//! In-process caches for feed and recommendation results.
//!
//! Both caches are explicitly constructed and injected into the services
//! that need them. Entries expire by TTL; mutation paths that change what
//! readers should see call the invalidate methods instead of waiting for
//! expiry.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::metrics::pipeline::CACHE_EVENTS_TOTAL;
use crate::models::Element;

/// Ranked feed ids per element.
pub struct FeedCache {
    entries: DashMap<Element, CachedFeed>,
    ttl: Duration,
}

#[derive(Clone)]
struct CachedFeed {
    content_ids: Vec<Uuid>,
    cached_at: DateTime<Utc>,
}

impl FeedCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    pub fn read(&self, element: Element) -> Option<Vec<Uuid>> {
        if let Some(entry) = self.entries.get(&element) {
            if Utc::now() - entry.cached_at < self.ttl {
                CACHE_EVENTS_TOTAL.with_label_values(&["feed", "hit"]).inc();
                return Some(entry.content_ids.clone());
            }
        }

        CACHE_EVENTS_TOTAL.with_label_values(&["feed", "miss"]).inc();
        self.entries.remove_if(&element, |_, cached| {
            Utc::now() - cached.cached_at >= self.ttl
        });
        None
    }

    pub fn write(&self, element: Element, content_ids: Vec<Uuid>) {
        self.entries.insert(
            element,
            CachedFeed {
                content_ids,
                cached_at: Utc::now(),
            },
        );
    }

    pub fn invalidate(&self, element: Element) {
        if self.entries.remove(&element).is_some() {
            CACHE_EVENTS_TOTAL
                .with_label_values(&["feed", "invalidate"])
                .inc();
        }
    }
}

/// A cached per-user recommendation list.
#[derive(Debug, Clone)]
pub struct RecommendationCacheEntry {
    pub content_ids: Vec<Uuid>,
    pub basis: String,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Recommendation lists keyed by (user, element).
pub struct RecommendationCache {
    entries: DashMap<(Uuid, Element), RecommendationCacheEntry>,
    ttl: Duration,
}

impl RecommendationCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    pub fn read(&self, user_id: Uuid, element: Element) -> Option<RecommendationCacheEntry> {
        if let Some(entry) = self.entries.get(&(user_id, element)) {
            if entry.expires_at > Utc::now() {
                CACHE_EVENTS_TOTAL
                    .with_label_values(&["recommendation", "hit"])
                    .inc();
                return Some(entry.clone());
            }
        }

        CACHE_EVENTS_TOTAL
            .with_label_values(&["recommendation", "miss"])
            .inc();
        self.entries
            .remove_if(&(user_id, element), |_, entry| entry.expires_at <= Utc::now());
        None
    }

    /// A full recompute replaces the list; partial invalidation does not
    /// exist for this cache.
    pub fn write(&self, user_id: Uuid, element: Element, content_ids: Vec<Uuid>, basis: &str) {
        let now = Utc::now();
        self.entries.insert(
            (user_id, element),
            RecommendationCacheEntry {
                content_ids,
                basis: basis.to_string(),
                computed_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drop every user's cached list for an element.
    pub fn invalidate_element(&self, element: Element) {
        self.entries.retain(|(_, cached_element), _| *cached_element != element);
        CACHE_EVENTS_TOTAL
            .with_label_values(&["recommendation", "invalidate"])
            .inc();
    }
}
