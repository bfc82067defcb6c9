//! Decoded-image cache.
//!
//! Keeps decoded RGBA buffers keyed by [`ImageSource::cache_key`] so drags,
//! resizes and repeated compositing do not decode the same source twice.
//! Entries are never invalidated behind the caller's back: the editor
//! evicts a key explicitly when it replaces that source. The byte and entry
//! caps only bound memory; a capped-out entry is simply decoded again on
//! the next read.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use kanvas_core::ImageSource;

/// Entry in the image cache.
#[derive(Debug)]
struct CacheEntry {
    image: Arc<RgbaImage>,
    /// Logical clock of the last access.
    last_accessed: u64,
    size_bytes: usize,
}

/// Configuration for the image cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum cache size in bytes.
    pub max_size_bytes: usize,
    /// Maximum number of entries.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 512 * 1024 * 1024, // 512 MB
            max_entries: 256,
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of capacity evictions.
    pub evictions: u64,
    /// Number of explicit invalidations.
    pub invalidations: u64,
    /// Total bytes inserted.
    pub bytes_loaded: u64,
}

/// LRU cache of decoded images.
#[derive(Debug)]
pub struct ImageCache {
    entries: HashMap<String, CacheEntry>,
    config: CacheConfig,
    current_size: usize,
    clock: u64,
    stats: CacheStats,
}

impl ImageCache {
    /// Create a new cache with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a new cache with custom configuration.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            current_size: 0,
            clock: 0,
            stats: CacheStats::default(),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Get a decoded image.
    ///
    /// Returns `None` if the source is not cached.
    pub fn get(&mut self, source: &ImageSource) -> Option<Arc<RgbaImage>> {
        let now = self.tick();
        if let Some(entry) = self.entries.get_mut(&source.cache_key()) {
            entry.last_accessed = now;
            self.stats.hits += 1;
            Some(Arc::clone(&entry.image))
        } else {
            self.stats.misses += 1;
            None
        }
    }

    /// Insert a decoded image, evicting least recently used entries if the
    /// caps are exceeded. Returns the shared handle.
    pub fn insert(&mut self, source: &ImageSource, image: RgbaImage) -> Arc<RgbaImage> {
        let key = source.cache_key();
        let size_bytes = image.as_raw().len();
        let image = Arc::new(image);

        if let Some(old) = self.entries.remove(&key) {
            self.current_size -= old.size_bytes;
        }

        self.evict_if_needed(size_bytes);

        let now = self.tick();
        self.current_size += size_bytes;
        self.stats.bytes_loaded += size_bytes as u64;
        self.entries.insert(
            key,
            CacheEntry {
                image: Arc::clone(&image),
                last_accessed: now,
                size_bytes,
            },
        );
        image
    }

    /// Drop the entry for a source that has been replaced.
    pub fn invalidate(&mut self, source: &ImageSource) -> bool {
        if let Some(entry) = self.entries.remove(&source.cache_key()) {
            self.current_size -= entry.size_bytes;
            self.stats.invalidations += 1;
            true
        } else {
            false
        }
    }

    /// Check if a source is cached.
    #[must_use]
    pub fn contains(&self, source: &ImageSource) -> bool {
        self.entries.contains_key(&source.cache_key())
    }

    /// Clear all cached images.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_size = 0;
    }

    /// Get the current number of cached images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the current cache size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.current_size
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Evict entries until a new entry of `needed_bytes` fits.
    fn evict_if_needed(&mut self, needed_bytes: usize) {
        while self.current_size + needed_bytes > self.config.max_size_bytes
            && !self.entries.is_empty()
        {
            self.evict_lru();
        }

        while self.entries.len() >= self.config.max_entries && !self.entries.is_empty() {
            self.evict_lru();
        }
    }

    /// Evict the least recently used entry.
    fn evict_lru(&mut self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest_key {
            if let Some(entry) = self.entries.remove(&key) {
                self.current_size -= entry.size_bytes;
                self.stats.evictions += 1;
                tracing::trace!(key = %key, "evicted decoded image");
            }
        }
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}
