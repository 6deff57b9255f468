//! Mock entity source for testing.

use super::{EntitySource, FetchOutcome};
use async_trait::async_trait;
use mineralspace_core::RawEntity;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// In-memory entity source with a call counter.
///
/// Entities are keyed by their `id`. Unknown keys answer `NotFound`; when
/// marked unavailable every call answers `Unavailable`.
#[derive(Debug, Default)]
pub struct MockEntitySource {
    entities: BTreeMap<String, RawEntity>,
    unavailable: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl MockEntitySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this entity under its own key.
    pub fn with_entity(mut self, entity: RawEntity) -> Self {
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    /// Sleep this long before answering (simulates network latency).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `Unavailable` to every call while set.
    pub fn with_unavailable(self, unavailable: bool) -> Self {
        self.set_unavailable(unavailable);
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `fetch` calls so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitySource for MockEntitySource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, external_key: &str) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return FetchOutcome::Unavailable("mock source disabled".to_string());
        }

        self.entities
            .get(external_key)
            .cloned()
            .map(FetchOutcome::Found)
            .unwrap_or(FetchOutcome::NotFound)
    }
}
