//! Rendered meme cache.
//!
//! A bounded, time-limited LRU over encoded PNG bytes, keyed by a
//! structured request fingerprint. Concurrent misses for
//! the same key each render independently; only complete renders are
//! inserted.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use roastbot_core::ContentType;

/// Characters of an inline image reference kept verbatim in the key.
const IMAGE_PREFIX_CHARS: usize = 50;

/// Inline image identity: its leading characters plus a digest of the
/// whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    prefix: String,
    digest: u64,
}

/// Cache key for a render request.
///
/// Fields are kept separate so no caption, template or image reference
/// can be confused with another request's. `None` stands for the default
/// image source or template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemeKey {
    text: String,
    content_type: ContentType,
    image: Option<ImageRef>,
    template: Option<String>,
}

/// Build the cache key for a render request. Empty inputs count as absent.
pub fn fingerprint(
    text: &str,
    content_type: ContentType,
    image_data: Option<&str>,
    template: Option<&str>,
) -> MemeKey {
    let image = image_data.filter(|d| !d.is_empty()).map(|data| ImageRef {
        prefix: data.chars().take(IMAGE_PREFIX_CHARS).collect(),
        digest: xxhash_rust::xxh3::xxh3_64(data.as_bytes()),
    });
    MemeKey {
        text: text.to_string(),
        content_type,
        image,
        template: template.filter(|t| !t.is_empty()).map(str::to_string),
    }
}

/// Encoded memes keyed by [`fingerprint`].
#[derive(Clone)]
pub struct MemeCache {
    inner: Cache<MemeKey, Arc<Vec<u8>>>,
}

impl MemeCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { inner }
    }

    pub async fn get(&self, key: &MemeKey) -> Option<Arc<Vec<u8>>> {
        let hit = self.inner.get(key).await;
        if hit.is_some() {
            roastbot_core::metrics::increment("meme_cache_hits_total", 1);
        } else {
            roastbot_core::metrics::increment("meme_cache_misses_total", 1);
        }
        hit
    }

    pub async fn insert(&self, key: MemeKey, png: Arc<Vec<u8>>) {
        self.inner.insert(key, png).await;
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Apply pending evictions.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(n: u8) -> Arc<Vec<u8>> {
        Arc::new(vec![n; 4])
    }

    fn key(i: usize) -> MemeKey {
        fingerprint(&format!("caption {i}"), ContentType::Roast, None, None)
    }

    #[test]
    fn empty_inputs_match_absent_ones() {
        assert_eq!(
            fingerprint("hi", ContentType::Compliment, Some(""), Some("")),
            fingerprint("hi", ContentType::Compliment, None, None)
        );
        assert_ne!(
            fingerprint("hi", ContentType::Compliment, None, Some("drake")),
            fingerprint("hi", ContentType::Compliment, None, None)
        );
    }

    #[test]
    fn fields_cannot_bleed_into_each_other() {
        let first = fingerprint("a-roast-default-t", ContentType::Compliment, None, Some("t2"));
        let second = fingerprint("a", ContentType::Roast, None, Some("t-compliment-default-t2"));
        assert_ne!(first, second);

        let literal_default = fingerprint("hi", ContentType::Roast, None, Some("default"));
        assert_ne!(literal_default, fingerprint("hi", ContentType::Roast, None, None));
    }

    #[test]
    fn fingerprint_separates_images_sharing_a_prefix() {
        let header = "data:image/png;base64,".to_string() + &"A".repeat(60);
        let a = format!("{header}one");
        let b = format!("{header}two");
        let key_a = fingerprint("hi", ContentType::Roast, Some(&a), None);
        let key_b = fingerprint("hi", ContentType::Roast, Some(&b), None);
        assert_ne!(key_a, key_b);

        let image = key_a.image.unwrap();
        assert_eq!(image.prefix, &a[..IMAGE_PREFIX_CHARS]);
    }

    #[test]
    fn fingerprint_uses_full_text() {
        let long = "x".repeat(500);
        let longer = format!("{long}y");
        assert_ne!(
            fingerprint(&long, ContentType::Roast, None, None),
            fingerprint(&longer, ContentType::Roast, None, None)
        );
    }

    #[tokio::test]
    async fn get_returns_inserted_bytes() {
        let cache = MemeCache::new(10, Duration::from_secs(60));
        assert!(cache.get(&key(0)).await.is_none());
        cache.insert(key(0), png(7)).await;
        assert_eq!(cache.get(&key(0)).await.unwrap().as_slice(), &[7, 7, 7, 7]);
    }

    #[tokio::test]
    async fn colliding_text_and_template_do_not_share_an_entry() {
        let cache = MemeCache::new(10, Duration::from_secs(60));
        let first = fingerprint("a-roast-default-t", ContentType::Compliment, None, Some("t2"));
        let second = fingerprint("a", ContentType::Roast, None, Some("t-compliment-default-t2"));
        cache.insert(first, png(1)).await;
        assert!(cache.get(&second).await.is_none());
    }

    #[tokio::test]
    async fn evicts_least_recently_used_beyond_capacity() {
        let cache = MemeCache::new(100, Duration::from_secs(3600));
        for i in 0..100 {
            cache.insert(key(i), png(i as u8)).await;
        }
        cache.run_pending_tasks().await;

        // Touch the oldest entry so key 1 becomes least recently used.
        assert!(cache.get(&key(0)).await.is_some());
        cache.run_pending_tasks().await;

        cache.insert(key(100), png(100)).await;
        cache.run_pending_tasks().await;

        assert_eq!(cache.entry_count(), 100);
        assert!(cache.get(&key(1)).await.is_none());
        assert!(cache.get(&key(0)).await.is_some());
        assert!(cache.get(&key(100)).await.is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = MemeCache::new(10, Duration::from_millis(50));
        cache.insert(key(0), png(1)).await;
        assert!(cache.get(&key(0)).await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(&key(0)).await.is_none());
    }
}
