use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use stream_scout::cache::{DEFAULT_TTL, ResultCache};
use stream_scout::models::ResolvedVideo;

/// Clock that only moves when the test says so.
#[derive(Clone)]
struct ManualClock(Arc<Mutex<Instant>>);

impl ManualClock {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }

    fn cache(&self, ttl: Duration) -> ResultCache {
        let clock = self.clone();
        ResultCache::with_clock(ttl, Arc::new(move || *clock.0.lock().unwrap()))
    }
}

fn video(code: &str) -> ResolvedVideo {
    ResolvedVideo {
        title: Some(code.to_string()),
        duration_seconds: None,
        image_url: None,
        resolution: None,
        size_bytes: None,
        media_type: None,
        direct_url: None,
        canonical_url: format!("https://uqload.cx/embed-{code}.html"),
    }
}

#[test]
fn entry_lives_until_ttl_then_disappears() {
    let clock = ManualClock::new();
    let cache = clock.cache(Duration::from_secs(60));
    cache.set("flemmix", "https://flemmix.test/a", vec![video("a1")]);

    clock.advance(Duration::from_secs(59));
    assert_eq!(cache.get("flemmix", "https://flemmix.test/a"), Some(vec![video("a1")]));

    clock.advance(Duration::from_secs(1));
    assert_eq!(cache.get("flemmix", "https://flemmix.test/a"), None);
    // The expired read already removed it
    assert!(cache.is_empty());
}

#[test]
fn empty_result_is_a_hit() {
    let cache = ResultCache::new(DEFAULT_TTL);
    cache.set("papadustream", "https://papadu.test/x", Vec::new());
    assert_eq!(cache.get("papadustream", "https://papadu.test/x"), Some(Vec::new()));
    assert_eq!(cache.get("papadustream", "https://papadu.test/never"), None);
}

#[test]
fn same_url_on_two_providers_does_not_collide() {
    let cache = ResultCache::default();
    let url = "https://mirror.test/film/1";
    cache.set("flemmix", url, vec![video("f")]);
    cache.set("french-stream", url, vec![video("s")]);

    assert_eq!(cache.get("flemmix", url), Some(vec![video("f")]));
    assert_eq!(cache.get("french-stream", url), Some(vec![video("s")]));
    assert_eq!(cache.len(), 2);
}

#[test]
fn sweep_counts_only_expired_entries() {
    let clock = ManualClock::new();
    let cache = clock.cache(Duration::from_secs(10));
    cache.set("flemmix", "old-1", vec![video("o1")]);
    cache.set("flemmix", "old-2", Vec::new());

    clock.advance(Duration::from_secs(6));
    cache.set("flemmix", "fresh", vec![video("n")]);

    clock.advance(Duration::from_secs(4));
    assert_eq!(cache.sweep_expired(), 2);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("flemmix", "fresh"), Some(vec![video("n")]));
    assert_eq!(cache.sweep_expired(), 0);
}

#[test]
fn set_overwrites_and_restarts_the_clock() {
    let clock = ManualClock::new();
    let cache = clock.cache(Duration::from_secs(10));
    cache.set("flemmix", "u", vec![video("v1")]);

    clock.advance(Duration::from_secs(8));
    cache.set("flemmix", "u", vec![video("v2")]);

    clock.advance(Duration::from_secs(8));
    assert_eq!(cache.get("flemmix", "u"), Some(vec![video("v2")]));

    cache.clear();
    assert!(cache.is_empty());
}
