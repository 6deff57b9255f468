//! # External Entity Sources
//!
//! The `EntitySource` trait abstracts the knowledge base that external
//! identifiers resolve against. A source performs one lookup per call and no
//! semantic mapping: it hands back the raw entity, a confirmed miss, or
//! "unavailable".
//!
//! `Unavailable` is not a negative answer. Callers must not cache it.

mod mock;
mod wikidata;

pub use mock::MockEntitySource;
pub use wikidata::WikidataClient;

use async_trait::async_trait;
use mineralspace_core::RawEntity;

/// Result of a single lookup against an external source.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The entity exists; raw data attached.
    Found(RawEntity),
    /// The source answered and the entity does not exist.
    NotFound,
    /// Transport failure, timeout, non-2xx status or undecodable body.
    Unavailable(String),
}

/// A knowledge base queried by external key (no internal prefix).
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Look up one entity. Never retries.
    async fn fetch(&self, external_key: &str) -> FetchOutcome;
}
