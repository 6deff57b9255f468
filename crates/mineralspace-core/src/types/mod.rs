//! # Core Type Definitions
//!
//! This module contains the record types shared by every MineralSpace layer:
//! - Identifiers (`MineralId`) and the external-source prefix scheme
//! - The persisted reference record (`MineralReference`) and its provenance
//! - Normalizer output (`ReferenceFields`)
//! - Specimen records and the read-time `SpecimenView` composite
//! - Error types (`MineralError`)
//!
//! ## Identifier Scheme
//!
//! A `MineralId` is either a curated local key (`"quartz"`, `"MIN-0042"`) or an
//! external key carrying the `wikidata:` prefix (`"wikidata:Q43010"`). Only
//! external identifiers may be resolved through the knowledge base on a miss.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Prefix marking an identifier as "resolve via the external source on miss".
pub const EXTERNAL_PREFIX: &str = "wikidata:";

/// Maximum identifier length in bytes (prefix included).
pub const MAX_ID_LENGTH: usize = 256;

// =============================================================================
// MINERAL IDENTIFIER
// =============================================================================

/// Identifier of a mineral reference record.
///
/// The identifier is the primary key of the reference table and is stored
/// verbatim in the record, prefix included, so it can always be rebuilt from
/// the record alone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MineralId(String);

impl MineralId {
    /// Parse and validate an identifier.
    ///
    /// Rejects empty identifiers, identifiers longer than [`MAX_ID_LENGTH`],
    /// and identifiers containing control characters.
    pub fn parse(raw: impl Into<String>) -> Result<Self, MineralError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(MineralError::InvalidIdentifier(
                "identifier is empty".to_string(),
            ));
        }
        if raw.len() > MAX_ID_LENGTH {
            return Err(MineralError::InvalidIdentifier(format!(
                "identifier length {} exceeds maximum {} bytes",
                raw.len(),
                MAX_ID_LENGTH
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(MineralError::InvalidIdentifier(
                "identifier contains control characters".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    /// Build an external identifier from a source-specific key (`Q43010`).
    #[must_use]
    pub fn external(key: &str) -> Self {
        Self(format!("{EXTERNAL_PREFIX}{key}"))
    }

    /// The external key with the prefix stripped, or `None` for local ids.
    ///
    /// A bare prefix with nothing after it is treated as local.
    #[must_use]
    pub fn external_key(&self) -> Option<&str> {
        self.0
            .strip_prefix(EXTERNAL_PREFIX)
            .filter(|key| !key.is_empty())
    }

    /// Check whether this identifier resolves through the external source.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.external_key().is_some()
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MineralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MineralId {
    type Err = MineralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MineralId {
    type Error = MineralError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<MineralId> for String {
    fn from(id: MineralId) -> Self {
        id.0
    }
}

// =============================================================================
// PROVENANCE
// =============================================================================

/// Where a reference record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSource {
    /// Seeded out-of-band as part of the curated taxonomy.
    #[default]
    Curated,
    /// Created on first resolution from a Wikidata entity.
    #[serde(alias = "external")]
    Wikidata,
}

impl ReferenceSource {
    /// True for records created from the external knowledge base.
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(self, Self::Wikidata)
    }

    /// Lowercase tag as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Curated => "curated",
            Self::Wikidata => "wikidata",
        }
    }
}

// =============================================================================
// REFERENCE FIELDS (normalizer output)
// =============================================================================

/// The descriptive fields of a reference, without identity or provenance.
///
/// Every field uses the empty string for "unknown". Classification fields
/// hold either a curated classification key or an external identifier
/// (`wikidata:Q...`) to be resolved later through the same scheme.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReferenceFields {
    pub name_ru: String,
    pub name_en: String,
    pub chemical_formula: String,
    pub mineral_type_id: String,
    pub hardness_id: String,
    pub cleavage_id: String,
    pub crystal_system_id: String,
    pub crystal_form_id: String,
}

// =============================================================================
// MINERAL REFERENCE
// =============================================================================

/// A normalized taxonomy record for a mineral.
///
/// Once persisted a record is never overwritten; re-resolving its id is a
/// pure read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineralReference {
    pub id: MineralId,
    /// Russian display name; equals `name_en` when the source has no translation.
    #[serde(default)]
    pub name_ru: String,
    /// English display name.
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub chemical_formula: String,
    #[serde(default)]
    pub mineral_type_id: String,
    #[serde(default)]
    pub hardness_id: String,
    #[serde(default)]
    pub cleavage_id: String,
    #[serde(default)]
    pub crystal_system_id: String,
    #[serde(default)]
    pub crystal_form_id: String,
    #[serde(default)]
    pub source: ReferenceSource,
    /// Set when the record was created from the external source.
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl MineralReference {
    /// Build a record created from an external fetch.
    #[must_use]
    pub fn from_external(id: MineralId, fields: ReferenceFields, synced_at: DateTime<Utc>) -> Self {
        Self::assemble(id, fields, ReferenceSource::Wikidata, Some(synced_at))
    }

    /// Build a curated record (no sync timestamp).
    #[must_use]
    pub fn curated(id: MineralId, fields: ReferenceFields) -> Self {
        Self::assemble(id, fields, ReferenceSource::Curated, None)
    }

    /// Re-tag an incoming record as curated, dropping any sync timestamp.
    ///
    /// Used for administrative seeding, where the caller cannot claim
    /// external provenance.
    #[must_use]
    pub fn into_curated(mut self) -> Self {
        self.source = ReferenceSource::Curated;
        self.last_synced_at = None;
        self
    }

    /// The descriptive fields of this record.
    #[must_use]
    pub fn fields(&self) -> ReferenceFields {
        ReferenceFields {
            name_ru: self.name_ru.clone(),
            name_en: self.name_en.clone(),
            chemical_formula: self.chemical_formula.clone(),
            mineral_type_id: self.mineral_type_id.clone(),
            hardness_id: self.hardness_id.clone(),
            cleavage_id: self.cleavage_id.clone(),
            crystal_system_id: self.crystal_system_id.clone(),
            crystal_form_id: self.crystal_form_id.clone(),
        }
    }

    fn assemble(
        id: MineralId,
        fields: ReferenceFields,
        source: ReferenceSource,
        last_synced_at: Option<DateTime<Utc>>,
    ) -> Self {
        let ReferenceFields {
            name_ru,
            name_en,
            chemical_formula,
            mineral_type_id,
            hardness_id,
            cleavage_id,
            crystal_system_id,
            crystal_form_id,
        } = fields;
        Self {
            id,
            name_ru,
            name_en,
            chemical_formula,
            mineral_type_id,
            hardness_id,
            cleavage_id,
            crystal_system_id,
            crystal_form_id,
            source,
            last_synced_at,
        }
    }
}

// =============================================================================
// SPECIMENS
// =============================================================================

/// A collector's specimen as carried at the API boundary.
///
/// Only `mineral_id` links it to the reference table; the link is weak and
/// the reference may not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecimenRecord {
    pub id: String,
    pub collection_id: String,
    pub mineral_id: MineralId,
    #[serde(default)]
    pub local_name: Option<String>,
    pub region: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub found_at: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Read-time composite of a specimen and its reference, if one is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecimenView {
    #[serde(flatten)]
    pub specimen: SpecimenRecord,
    pub mineral_data: Option<MineralReference>,
}

impl SpecimenView {
    #[must_use]
    pub fn new(specimen: SpecimenRecord, mineral_data: Option<MineralReference>) -> Self {
        Self {
            specimen,
            mineral_data,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in MineralSpace.
///
/// Callers of resolution only ever see `NotFound` and `ResolutionFailed`
/// (plus storage failures); `Conflict` is reconciled before it escapes.
#[derive(Debug, Error)]
pub enum MineralError {
    /// No local record, and either no external prefix or the source confirms
    /// the entity does not exist.
    #[error("Mineral not found: {0}")]
    NotFound(MineralId),

    /// The external source was unreachable or returned an error.
    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),

    /// A record with the same id is already persisted.
    #[error("Reference already exists: {0}")]
    Conflict(MineralId),

    /// The identifier failed validation.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The reference store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// TESTS
// =============================================================================
