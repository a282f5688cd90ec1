use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use image::RgbaImage;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::frame::{ContentKey, FrameImage, VideoFrame};

/// Decoded thumbnails keyed by frame content, with optional LRU bounding.
///
/// # Example
/// ```
/// use std::sync::Arc;
///
/// use engine::cache::ThumbnailCache;
/// use engine::frame::ContentKey;
/// use image::RgbaImage;
///
/// let mut cache = ThumbnailCache::new(Some(8));
/// let key = ContentKey::of(b"jpeg bytes");
/// cache.insert(key, Arc::new(RgbaImage::new(4, 2)));
///
/// assert!(cache.get(&key).is_some());
/// ```
#[derive(Debug, Default)]
pub struct ThumbnailCache {
    capacity: Option<usize>,
    entries: HashMap<ContentKey, Arc<RgbaImage>>,
    lru_order: VecDeque<ContentKey>,
    failed: HashSet<ContentKey>,
    decodes: u64,
}

impl ThumbnailCache {
    /// Creates a cache; `None` keeps every entry until [`Self::clear`].
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.filter(|capacity| *capacity > 0),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of payload decodes performed so far.
    pub fn decode_count(&self) -> u64 {
        self.decodes
    }

    /// Drops every entry, including remembered failures.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru_order.clear();
        self.failed.clear();
    }

    pub fn contains(&self, key: &ContentKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns one thumbnail and marks it as recently used.
    pub fn get(&mut self, key: &ContentKey) -> Option<Arc<RgbaImage>> {
        let image = Arc::clone(self.entries.get(key)?);
        self.touch(key);
        Some(image)
    }

    pub fn insert(&mut self, key: ContentKey, image: Arc<RgbaImage>) {
        self.entries.insert(key, image);
        self.touch(&key);
        self.evict_if_needed();
    }

    /// Resolves a thumbnail per frame, decoding misses in parallel.
    ///
    /// A payload that fails to decode yields `None` for its tiles and is not
    /// retried until the cache is cleared.
    pub fn resolve(&mut self, frames: &[VideoFrame]) -> Vec<Option<Arc<RgbaImage>>> {
        let mut pending = HashSet::new();
        let missing: Vec<&FrameImage> = frames
            .iter()
            .map(|frame| &frame.image)
            .filter(|image| {
                let key = image.key();
                !self.entries.contains_key(&key)
                    && !self.failed.contains(&key)
                    && pending.insert(key)
            })
            .collect();

        let mut fresh = HashMap::with_capacity(missing.len());
        if !missing.is_empty() {
            debug!(
                misses = missing.len(),
                hits = frames.len() - missing.len(),
                "thumbnail cache miss"
            );
            let decoded: Vec<_> = missing
                .par_iter()
                .map(|image| (image.key(), image.decode()))
                .collect();
            self.decodes += decoded.len() as u64;

            for (key, result) in decoded {
                match result {
                    Ok(pixels) => {
                        let pixels = Arc::new(pixels);
                        fresh.insert(key, Arc::clone(&pixels));
                        self.insert(key, pixels);
                    }
                    Err(error) => {
                        warn!(%key, %error, "thumbnail resolve failed; tile skipped");
                        self.failed.insert(key);
                    }
                }
            }
        }

        frames
            .iter()
            .map(|frame| {
                let key = frame.image.key();
                fresh.get(&key).cloned().or_else(|| self.get(&key))
            })
            .collect()
    }

    fn touch(&mut self, key: &ContentKey) {
        if self.capacity.is_none() {
            return;
        }
        if let Some(index) = self.lru_order.iter().position(|existing| existing == key) {
            let _ = self.lru_order.remove(index);
        }
        self.lru_order.push_back(*key);
    }

    fn evict_if_needed(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() > capacity {
            let Some(oldest) = self.lru_order.pop_front() else {
                break;
            };
            let _ = self.entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn frame(time: f64, shade: u8) -> VideoFrame {
        let pixels = RgbaImage::from_pixel(8, 4, Rgba([shade, shade, shade, 255]));
        VideoFrame {
            time,
            image: FrameImage::encode(&pixels).expect("encode"),
        }
    }

    #[test]
    fn second_resolve_reuses_decoded_thumbnails() {
        let frames = vec![frame(0.0, 10), frame(1.0, 200)];
        let mut cache = ThumbnailCache::new(None);

        let first = cache.resolve(&frames);
        let second = cache.resolve(&frames);

        assert!(first.iter().all(Option::is_some));
        assert!(second.iter().all(Option::is_some));
        assert_eq!(cache.decode_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn identical_payloads_decode_once() {
        let frames = vec![frame(0.0, 50), frame(1.0, 50), frame(2.0, 50)];
        let mut cache = ThumbnailCache::new(None);

        let tiles = cache.resolve(&frames);

        assert_eq!(tiles.len(), 3);
        assert_eq!(cache.decode_count(), 1);
    }

    #[test]
    fn broken_payload_is_skipped_without_blocking_others() {
        let broken = VideoFrame {
            time: 1.0,
            image: FrameImage::from_encoded(8, 4, vec![1u8, 2, 3]),
        };
        let frames = vec![frame(0.0, 10), broken, frame(2.0, 90)];
        let mut cache = ThumbnailCache::new(None);

        let tiles = cache.resolve(&frames);
        let again = cache.resolve(&frames);

        assert!(tiles[0].is_some());
        assert!(tiles[1].is_none());
        assert!(tiles[2].is_some());
        assert!(again[1].is_none());
        assert_eq!(cache.decode_count(), 3);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let mut cache = ThumbnailCache::new(Some(2));
        let [a, b, c] = [b"a", b"b", b"c"].map(|bytes| ContentKey::of(bytes));
        cache.insert(a, Arc::new(RgbaImage::new(1, 1)));
        cache.insert(b, Arc::new(RgbaImage::new(1, 1)));

        let _ = cache.get(&a).expect("a should be cached");
        cache.insert(c, Arc::new(RgbaImage::new(1, 1)));

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
    }

    #[test]
    fn resolve_returns_tiles_even_when_capacity_is_smaller_than_frame_set() {
        let frames = vec![frame(0.0, 10), frame(1.0, 80), frame(2.0, 160)];
        let mut cache = ThumbnailCache::new(Some(1));

        let tiles = cache.resolve(&frames);

        assert!(tiles.iter().all(Option::is_some));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_forgets_entries_and_failures() {
        let frames = vec![frame(0.0, 10)];
        let mut cache = ThumbnailCache::new(None);
        cache.resolve(&frames);

        cache.clear();

        assert!(cache.is_empty());
        cache.resolve(&frames);
        assert_eq!(cache.decode_count(), 2);
    }
}
