//! # Reference Resolver
//!
//! Cache-or-fetch orchestration for mineral references.
//!
//! ```text
//! resolve(id)
//!   ├─ store hit ─────────────────────────────────────────────► CacheHit
//!   ├─ miss, local id ────────────────────────────────────────► NotFound
//!   └─ miss, external id
//!        ├─ acquire per-id permit, re-check store (hit) ──────► CacheHit
//!        └─ fetch(key)
//!             ├─ Unavailable ─────────────────────────────────► ResolutionFailed
//!             ├─ NotFound ────────────────────────────────────► NotFound
//!             └─ Found ─► normalize ─► insert
//!                                        ├─ ok ───────────────► Fetched
//!                                        └─ Conflict ─► re-get ► Reconciled
//! ```
//!
//! ## Concurrency
//!
//! Callers for the same identifier queue on a per-identifier async lock, so
//! within one process at most one fetch per id is in flight and followers
//! see the leader's row on their re-check. Different ids never contend.
//! Across processes the store's uniqueness constraint decides: the loser of
//! an insert race discards its own result and returns the persisted row.
//!
//! ## Cancellation
//!
//! Dropping a `resolve` future while the fetch is outstanding abandons the
//! result: the insert is only reached after the fetch returns, and the
//! identifier's permit is released on drop.

use crate::source::{EntitySource, FetchOutcome};
use chrono::Utc;
use mineralspace_core::{
    MineralError, MineralId, MineralReference, ReferenceStore, SpecimenRecord, SpecimenView,
    StoreSummary, normalize,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

// =============================================================================
// OUTCOMES
// =============================================================================

/// How a successful resolution was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Served from the store without a network call.
    CacheHit,
    /// Fetched, normalized and persisted by this call.
    Fetched,
    /// Fetched, but another writer persisted first; their row was returned.
    Reconciled,
}

impl ResolveOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheHit => "cache_hit",
            Self::Fetched => "fetched",
            Self::Reconciled => "reconciled",
        }
    }
}

/// A resolved record together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub record: MineralReference,
    pub outcome: ResolveOutcome,
}

// =============================================================================
// IN-FLIGHT PERMITS
// =============================================================================

type Slots = Arc<Mutex<BTreeMap<MineralId, Arc<AsyncMutex<()>>>>>;

fn lock_slots(slots: &Slots) -> MutexGuard<'_, BTreeMap<MineralId, Arc<AsyncMutex<()>>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-identifier async locks. Entries live only while someone holds or
/// waits on them.
#[derive(Debug, Default)]
struct InFlight {
    slots: Slots,
}

impl InFlight {
    async fn acquire(&self, id: &MineralId) -> InFlightPermit {
        let slot = {
            let mut slots = lock_slots(&self.slots);
            Arc::clone(slots.entry(id.clone()).or_default())
        };
        // Built before waiting so a cancelled waiter also prunes its entry.
        let mut permit = InFlightPermit {
            guard: None,
            slot: Some(Arc::clone(&slot)),
            id: id.clone(),
            slots: Arc::clone(&self.slots),
        };
        permit.guard = Some(slot.lock_owned().await);
        permit
    }

    fn len(&self) -> usize {
        lock_slots(&self.slots).len()
    }
}

struct InFlightPermit {
    guard: Option<OwnedMutexGuard<()>>,
    slot: Option<Arc<AsyncMutex<()>>>,
    id: MineralId,
    slots: Slots,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        let mut slots = lock_slots(&self.slots);
        // Release both handles first so the count below is the map plus other waiters.
        drop(self.guard.take());
        drop(self.slot.take());
        let idle = slots
            .get(&self.id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if idle {
            slots.remove(&self.id);
        }
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Resolves mineral identifiers against the store and an external source.
pub struct ReferenceResolver {
    store: Arc<dyn ReferenceStore>,
    source: Arc<dyn EntitySource>,
    in_flight: InFlight,
}

impl std::fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("source", &self.source.name())
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl ReferenceResolver {
    pub fn new(store: Arc<dyn ReferenceStore>, source: Arc<dyn EntitySource>) -> Self {
        Self {
            store,
            source,
            in_flight: InFlight::default(),
        }
    }

    /// Number of identifiers with a fetch in flight or queued.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Resolve an identifier to its reference record.
    pub async fn resolve(&self, id: &MineralId) -> Result<MineralReference, MineralError> {
        self.resolve_traced(id).await.map(|resolved| resolved.record)
    }

    /// Resolve and report how the record was obtained.
    pub async fn resolve_traced(&self, id: &MineralId) -> Result<Resolved, MineralError> {
        if let Some(record) = self.lookup(id).await? {
            tracing::debug!(mineral_id = %id, "Reference cache hit");
            return Ok(Resolved {
                record,
                outcome: ResolveOutcome::CacheHit,
            });
        }

        let Some(key) = id.external_key() else {
            tracing::debug!(mineral_id = %id, "Local reference not found");
            return Err(MineralError::NotFound(id.clone()));
        };

        let _permit = self.in_flight.acquire(id).await;

        // A caller ahead of us in the queue may have persisted it already.
        if let Some(record) = self.lookup(id).await? {
            tracing::debug!(mineral_id = %id, "Reference persisted while waiting");
            return Ok(Resolved {
                record,
                outcome: ResolveOutcome::CacheHit,
            });
        }

        tracing::info!(mineral_id = %id, source = self.source.name(), "Fetching reference");
        let entity = match self.source.fetch(key).await {
            FetchOutcome::Found(entity) => entity,
            FetchOutcome::NotFound => {
                tracing::info!(mineral_id = %id, "External source has no such entity");
                return Err(MineralError::NotFound(id.clone()));
            }
            FetchOutcome::Unavailable(reason) => {
                tracing::warn!(mineral_id = %id, %reason, "External source unavailable");
                return Err(MineralError::ResolutionFailed(format!(
                    "{} unavailable: {}",
                    self.source.name(),
                    reason
                )));
            }
        };

        let record = MineralReference::from_external(id.clone(), normalize(&entity), Utc::now());
        match self.insert(record.clone()).await {
            Ok(()) => {
                tracing::info!(mineral_id = %id, name = %record.name_en, "Persisted reference");
                Ok(Resolved {
                    record,
                    outcome: ResolveOutcome::Fetched,
                })
            }
            Err(MineralError::Conflict(_)) => {
                let winner = self.lookup(id).await?.ok_or_else(|| {
                    MineralError::Storage(format!("{id} reported a conflict but cannot be read"))
                })?;
                tracing::info!(mineral_id = %id, "Lost insert race, returning persisted reference");
                Ok(Resolved {
                    record: winner,
                    outcome: ResolveOutcome::Reconciled,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Store-only read; never touches the network.
    pub async fn lookup(&self, id: &MineralId) -> Result<Option<MineralReference>, MineralError> {
        let id = id.clone();
        self.blocking(move |store| store.get(&id)).await
    }

    /// All persisted records.
    pub async fn list(&self) -> Result<Vec<MineralReference>, MineralError> {
        self.blocking(|store| store.list()).await
    }

    /// Record counts by provenance.
    pub async fn summary(&self) -> Result<StoreSummary, MineralError> {
        self.blocking(|store| StoreSummary::of(store)).await
    }

    /// Insert a curated record. Fails with `Conflict` when the id exists.
    pub async fn add_curated(&self, record: MineralReference) -> Result<MineralReference, MineralError> {
        let record = record.into_curated();
        self.insert(record.clone()).await?;
        tracing::info!(mineral_id = %record.id, "Added curated reference");
        Ok(record)
    }

    /// Attach the persisted reference (if any) to a specimen.
    ///
    /// Uses a store lookup only; a specimen pointing at an unresolved
    /// external id gets `mineral_data: None`.
    pub async fn view_specimen(&self, specimen: SpecimenRecord) -> Result<SpecimenView, MineralError> {
        let mineral_data = self.lookup(&specimen.mineral_id).await?;
        Ok(SpecimenView::new(specimen, mineral_data))
    }

    async fn insert(&self, record: MineralReference) -> Result<(), MineralError> {
        self.blocking(move |store| store.insert(&record)).await
    }

    /// Run a store operation on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T, MineralError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ReferenceStore) -> Result<T, MineralError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| MineralError::Storage(format!("store task failed: {e}")))?
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::source::MockEntitySource;
    use mineralspace_core::{MemoryReferenceStore, RawEntity, ReferenceFields, ReferenceSource};
    use std::time::Duration;

    fn quartz_entity() -> RawEntity {
        RawEntity::new("Q123456")
            .with_label("en", "Quartz")
            .with_string_claim("P274", "SiO2")
    }

    fn resolver_with(
        store: Arc<MemoryReferenceStore>,
        source: Arc<MockEntitySource>,
    ) -> ReferenceResolver {
        ReferenceResolver::new(store, source)
    }

    #[tokio::test]
    async fn cache_hit_never_calls_source() {
        let id = MineralId::parse("quartz").unwrap();
        let store = Arc::new(MemoryReferenceStore::with_records([MineralReference::curated(
            id.clone(),
            ReferenceFields {
                name_en: "Quartz".to_string(),
                ..ReferenceFields::default()
            },
        )]));
        let source = Arc::new(MockEntitySource::new());
        let resolver = resolver_with(store, Arc::clone(&source));

        let resolved = resolver.resolve_traced(&id).await.unwrap();
        assert_eq!(resolved.outcome, ResolveOutcome::CacheHit);
        assert_eq!(resolved.record.name_en, "Quartz");
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn local_miss_is_not_found_without_fetch() {
        let source = Arc::new(MockEntitySource::new());
        let resolver = resolver_with(Arc::new(MemoryReferenceStore::new()), Arc::clone(&source));

        let err = resolver
            .resolve(&MineralId::parse("unobtainium").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, MineralError::NotFound(_)));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn external_miss_fetches_and_persists_once() {
        let store = Arc::new(MemoryReferenceStore::new());
        let source = Arc::new(MockEntitySource::new().with_entity(quartz_entity()));
        let resolver = resolver_with(Arc::clone(&store), Arc::clone(&source));
        let id = MineralId::parse("wikidata:Q123456").unwrap();

        let first = resolver.resolve_traced(&id).await.unwrap();
        assert_eq!(first.outcome, ResolveOutcome::Fetched);
        assert_eq!(first.record.id, id);
        assert_eq!(first.record.source, ReferenceSource::Wikidata);
        assert!(first.record.last_synced_at.is_some());

        let second = resolver.resolve_traced(&id).await.unwrap();
        assert_eq!(second.outcome, ResolveOutcome::CacheHit);
        assert_eq!(second.record, first.record);

        assert_eq!(source.call_count(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn quartz_example_fields() {
        let source = Arc::new(MockEntitySource::new().with_entity(quartz_entity()));
        let resolver = resolver_with(Arc::new(MemoryReferenceStore::new()), source);

        let record = resolver
            .resolve(&MineralId::parse("wikidata:Q123456").unwrap())
            .await
            .unwrap();

        assert_eq!(record.id.as_str(), "wikidata:Q123456");
        assert_eq!(record.name_en, "Quartz");
        assert_eq!(record.name_ru, "Quartz");
        assert_eq!(record.chemical_formula, "SiO2");
        assert_eq!(record.mineral_type_id, "");
        assert_eq!(record.hardness_id, "");
        assert_eq!(record.cleavage_id, "");
        assert_eq!(record.crystal_system_id, "");
        assert_eq!(record.crystal_form_id, "");
        assert!(record.source.is_external());
    }

    #[tokio::test]
    async fn unavailable_source_fails_and_stores_nothing() {
        let store = Arc::new(MemoryReferenceStore::new());
        let source = Arc::new(MockEntitySource::new().with_unavailable(true));
        let resolver = resolver_with(Arc::clone(&store), Arc::clone(&source));
        let id = MineralId::parse("wikidata:Q1").unwrap();

        let err = resolver.resolve(&id).await.unwrap_err();
        assert!(matches!(err, MineralError::ResolutionFailed(_)));
        assert!(store.get(&id).unwrap().is_none());

        // Not cached as a negative result: the next call fetches again.
        source.set_unavailable(false);
        let err = resolver.resolve(&id).await.unwrap_err();
        assert!(matches!(err, MineralError::NotFound(_)));
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn external_not_found_is_not_found() {
        let source = Arc::new(MockEntitySource::new());
        let resolver = resolver_with(Arc::new(MemoryReferenceStore::new()), Arc::clone(&source));

        let err = resolver
            .resolve(&MineralId::external("Q404"))
            .await
            .unwrap_err();
        assert!(matches!(err, MineralError::NotFound(id) if id.as_str() == "wikidata:Q404"));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolves_share_one_fetch() {
        let store = Arc::new(MemoryReferenceStore::new());
        let source = Arc::new(
            MockEntitySource::new()
                .with_entity(quartz_entity())
                .with_delay(Duration::from_millis(50)),
        );
        let resolver = Arc::new(resolver_with(Arc::clone(&store), Arc::clone(&source)));
        let id = MineralId::parse("wikidata:Q123456").unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                let id = id.clone();
                tokio::spawn(async move { resolver.resolve(&id).await })
            })
            .collect();

        let mut records = Vec::new();
        for task in tasks {
            records.push(task.await.unwrap().unwrap());
        }

        assert_eq!(source.call_count(), 1);
        assert_eq!(store.count().unwrap(), 1);
        assert!(records.iter().all(|r| *r == records[0]));
        assert_eq!(resolver.in_flight(), 0);
    }

    #[tokio::test]
    async fn cancelled_fetch_inserts_nothing() {
        let store = Arc::new(MemoryReferenceStore::new());
        let source = Arc::new(
            MockEntitySource::new()
                .with_entity(quartz_entity())
                .with_delay(Duration::from_secs(5)),
        );
        let resolver = resolver_with(Arc::clone(&store), Arc::clone(&source));
        let id = MineralId::parse("wikidata:Q123456").unwrap();

        let attempt =
            tokio::time::timeout(Duration::from_millis(50), resolver.resolve(&id)).await;
        assert!(attempt.is_err(), "resolution should have been cancelled");

        assert_eq!(source.call_count(), 1);
        assert!(store.get(&id).unwrap().is_none());
        assert_eq!(resolver.in_flight(), 0);
    }

    #[tokio::test]
    async fn specimen_view_attaches_persisted_reference_only() {
        let quartz = MineralId::parse("quartz").unwrap();
        let store = Arc::new(MemoryReferenceStore::with_records([MineralReference::curated(
            quartz.clone(),
            ReferenceFields::default(),
        )]));
        let source = Arc::new(MockEntitySource::new().with_entity(quartz_entity()));
        let resolver = resolver_with(store, Arc::clone(&source));

        let specimen = |mineral_id: MineralId| SpecimenRecord {
            id: "s-1".to_string(),
            collection_id: "c-1".to_string(),
            mineral_id,
            local_name: None,
            region: "Ural".to_string(),
            latitude: Some(56.8),
            longitude: Some(60.6),
            photo_url: None,
            found_at: None,
            description: None,
        };

        let view = resolver.view_specimen(specimen(quartz.clone())).await.unwrap();
        assert_eq!(view.mineral_data.map(|m| m.id), Some(quartz));

        let view = resolver
            .view_specimen(specimen(MineralId::external("Q123456")))
            .await
            .unwrap();
        assert!(view.mineral_data.is_none());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_waiter_releases_its_slot() {
        let in_flight = InFlight::default();
        let id = MineralId::external("Q1");

        let held = in_flight.acquire(&id).await;
        let mut waiter = Box::pin(in_flight.acquire(&id));
        assert!(
            tokio::time::timeout(Duration::from_millis(20), &mut waiter)
                .await
                .is_err()
        );

        // The lock is handed to the waiter, which is then dropped unpolled.
        drop(held);
        assert_eq!(in_flight.len(), 1);
        drop(waiter);
        assert_eq!(in_flight.len(), 0);
    }

    /// Store where another writer always wins the insert race.
    struct RacingStore {
        inner: MemoryReferenceStore,
    }

    impl ReferenceStore for RacingStore {
        fn get(&self, id: &MineralId) -> Result<Option<MineralReference>, MineralError> {
            self.inner.get(id)
        }

        fn insert(&self, record: &MineralReference) -> Result<(), MineralError> {
            let winner = MineralReference::from_external(
                record.id.clone(),
                ReferenceFields {
                    name_en: "Winner".to_string(),
                    ..ReferenceFields::default()
                },
                Utc::now(),
            );
            self.inner.insert(&winner)?;
            self.inner.insert(record)
        }

        fn list(&self) -> Result<Vec<MineralReference>, MineralError> {
            self.inner.list()
        }

        fn count(&self) -> Result<usize, MineralError> {
            self.inner.count()
        }
    }

    #[tokio::test]
    async fn lost_insert_race_returns_persisted_row() {
        let store = Arc::new(RacingStore {
            inner: MemoryReferenceStore::new(),
        });
        let source = Arc::new(MockEntitySource::new().with_entity(quartz_entity()));
        let resolver = ReferenceResolver::new(store.clone(), source);
        let id = MineralId::parse("wikidata:Q123456").unwrap();

        let resolved = resolver.resolve_traced(&id).await.unwrap();
        assert_eq!(resolved.outcome, ResolveOutcome::Reconciled);
        assert_eq!(resolved.record.name_en, "Winner");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn add_curated_conflicts_on_existing_id() {
        let resolver = resolver_with(
            Arc::new(MemoryReferenceStore::new()),
            Arc::new(MockEntitySource::new()),
        );
        let record =
            MineralReference::curated(MineralId::parse("quartz").unwrap(), ReferenceFields::default());

        resolver.add_curated(record.clone()).await.unwrap();
        let err = resolver.add_curated(record).await.unwrap_err();
        assert!(matches!(err, MineralError::Conflict(_)));
    }
}
