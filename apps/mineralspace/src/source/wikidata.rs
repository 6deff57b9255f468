//! # Wikidata Client
//!
//! `EntitySource` over the Wikidata `wbgetentities` action API.
//!
//! One GET per lookup, bounded by the configured timeout:
//!
//! ```text
//! GET {api_url}?action=wbgetentities&ids=Q43010&format=json
//!     &languages=en|ru&props=labels|claims
//! ```
//!
//! Mapping:
//! - transport error, timeout, non-2xx, undecodable body -> `Unavailable`
//! - `entities[key].missing` or error code `no-such-entity` -> `NotFound`
//! - otherwise -> `Found`

use super::{EntitySource, FetchOutcome};
use crate::config::WikidataConfig;
use async_trait::async_trait;
use mineralspace_core::{MineralError, RawEntity};
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::BTreeMap;
use std::time::Duration;

/// Wikidata error code for ids that do not exist.
const NO_SUCH_ENTITY: &str = "no-such-entity";

/// `wbgetentities` response body.
#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: BTreeMap<String, EntitySlot>,
    #[serde(default)]
    error: Option<ApiError>,
}

/// One entry of `entities`: either flagged missing or an actual entity.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntitySlot {
    Missing {
        #[allow(dead_code)]
        missing: IgnoredAny,
    },
    Present(RawEntity),
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

/// HTTP client for Wikidata.
#[derive(Clone, Debug)]
pub struct WikidataClient {
    http: reqwest::Client,
    api_url: String,
}

impl WikidataClient {
    /// Build a client from configuration.
    pub fn new(config: &WikidataConfig) -> Result<Self, MineralError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| MineralError::Config(format!("Cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
        })
    }

    fn interpret(key: &str, body: EntitiesResponse) -> FetchOutcome {
        if let Some(error) = body.error {
            if error.code == NO_SUCH_ENTITY {
                return FetchOutcome::NotFound;
            }
            return FetchOutcome::Unavailable(format!("{}: {}", error.code, error.info));
        }

        let slot = body
            .entities
            .into_iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(key))
            .map(|(_, slot)| slot);

        match slot {
            Some(EntitySlot::Present(entity)) => FetchOutcome::Found(entity),
            Some(EntitySlot::Missing { .. }) | None => FetchOutcome::NotFound,
        }
    }
}

#[async_trait]
impl EntitySource for WikidataClient {
    fn name(&self) -> &str {
        "wikidata"
    }

    async fn fetch(&self, external_key: &str) -> FetchOutcome {
        let request = self.http.get(&self.api_url).query(&[
            ("action", "wbgetentities"),
            ("ids", external_key),
            ("format", "json"),
            ("languages", "en|ru"),
            ("props", "labels|claims"),
        ]);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("request failed: {e}")
                };
                tracing::warn!(key = external_key, %reason, "Wikidata unreachable");
                return FetchOutcome::Unavailable(reason);
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(key = external_key, status = status.as_u16(), "Wikidata returned an error status");
            return FetchOutcome::Unavailable(format!("HTTP {status}"));
        }

        match response.json::<EntitiesResponse>().await {
            Ok(body) => {
                let outcome = Self::interpret(external_key, body);
                tracing::debug!(
                    key = external_key,
                    found = matches!(outcome, FetchOutcome::Found(_)),
                    "Wikidata lookup finished"
                );
                outcome
            }
            Err(e) => {
                tracing::warn!(key = external_key, error = %e, "Undecodable Wikidata response");
                FetchOutcome::Unavailable(format!("undecodable response: {e}"))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
