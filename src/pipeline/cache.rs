use crate::api::{ArticleCollection, ListId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Last successfully fetched collection per list.
///
/// Shared by all controllers for the lifetime of the process. There is no
/// eviction: the key space is the three list identifiers. `put` overwrites
/// (last write wins); failed fetches never reach the cache.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<ListId, Arc<ArticleCollection>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached collection for `list`, if any. No side effects.
    pub fn get(&self, list: ListId) -> Option<Arc<ArticleCollection>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&list)
            .cloned()
    }

    /// Stores `collection` for `list`, replacing any previous entry.
    pub fn put(&self, list: ListId, collection: Arc<ArticleCollection>) {
        let replaced = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(list, collection);
        tracing::debug!(list = %list, replaced = replaced.is_some(), "Cached ranked list");
    }

    pub fn contains(&self, list: ListId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&list)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::article;

    fn collection(ids: &[u64]) -> Arc<ArticleCollection> {
        Arc::new(ArticleCollection {
            status: "OK".to_string(),
            copyright: "Copyright".to_string(),
            num_results: ids.len() as u64,
            results: ids
                .iter()
                .map(|&id| Arc::new(article(id, &format!("Title {id}"))))
                .collect(),
        })
    }

    #[test]
    fn test_empty_cache() {
        let cache = ResponseCache::new();
        assert!(cache.is_empty());
        assert!(cache.get(ListId::Emailed).is_none());
        assert!(!cache.contains(ListId::Emailed));
    }

    #[test]
    fn test_get_after_put_returns_same_instance() {
        let cache = ResponseCache::new();
        let c = collection(&[1, 2, 3]);
        cache.put(ListId::Shared, Arc::clone(&c));

        let got = cache.get(ListId::Shared).unwrap();
        assert!(Arc::ptr_eq(&got, &c));
        assert!(cache.get(ListId::Viewed).is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let cache = ResponseCache::new();
        cache.put(ListId::Viewed, collection(&[1]));
        let newer = collection(&[4, 5]);
        cache.put(ListId::Viewed, Arc::clone(&newer));

        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.get(ListId::Viewed).unwrap(), &newer));
    }

    #[test]
    fn test_lists_are_independent() {
        let cache = ResponseCache::new();
        for list in ListId::ALL {
            cache.put(list, collection(&[list.index() as u64]));
        }
        assert_eq!(cache.len(), 3);
        for list in ListId::ALL {
            assert_eq!(cache.get(list).unwrap().results[0].id.0, list.index() as u64);
        }
    }
}
