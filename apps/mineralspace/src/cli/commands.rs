//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::{Backend, Config};
use crate::resolver::ReferenceResolver;
use crate::source::WikidataClient;
use mineralspace_core::{
    MemoryReferenceStore, MineralError, MineralId, MineralReference, RedbReferenceStore,
    ReferenceStore, SeedOutcome, StoreSummary, seed_curated,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a seed file (16 MB).
const MAX_SEED_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), MineralError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| MineralError::Config(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(MineralError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve `..` and symlinks and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, MineralError> {
    let canonical = path.canonicalize().map_err(|e| {
        MineralError::Config(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(MineralError::Config(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// STORE / RESOLVER SETUP
// =============================================================================

/// Open the configured store.
pub fn open_store(config: &Config) -> Result<Arc<dyn ReferenceStore>, MineralError> {
    match config.backend {
        Backend::Redb => Ok(Arc::new(RedbReferenceStore::open(&config.database)?)),
        Backend::Memory => {
            tracing::warn!("Using the in-memory backend; nothing will be persisted");
            Ok(Arc::new(MemoryReferenceStore::new()))
        }
    }
}

/// Store plus Wikidata client, ready to resolve.
pub fn build_resolver(config: &Config) -> Result<ReferenceResolver, MineralError> {
    let store = open_store(config)?;
    let source = WikidataClient::new(&config.wikidata)?;
    Ok(ReferenceResolver::new(store, Arc::new(source)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), MineralError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| MineralError::Serialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn print_reference(record: &MineralReference) {
    for (label, value) in reference_lines(record) {
        println!("{:<18}{}", format!("{label}:"), value);
    }
}

/// Every field of a record as `(label, value)`, empty values included.
fn reference_lines(record: &MineralReference) -> Vec<(&'static str, String)> {
    vec![
        ("Id", record.id.to_string()),
        ("Name (en)", record.name_en.clone()),
        ("Name (ru)", record.name_ru.clone()),
        ("Formula", record.chemical_formula.clone()),
        ("Mineral type", record.mineral_type_id.clone()),
        ("Hardness", record.hardness_id.clone()),
        ("Cleavage", record.cleavage_id.clone()),
        ("Crystal system", record.crystal_system_id.clone()),
        ("Crystal form", record.crystal_form_id.clone()),
        ("Source", record.source.as_str().to_string()),
        (
            "Last synced",
            record
                .last_synced_at
                .map(|synced| synced.to_rfc3339())
                .unwrap_or_default(),
        ),
    ]
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(config: &Config) -> Result<(), MineralError> {
    let resolver = build_resolver(config)?;

    println!("MineralSpace Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.server.bind_addr());
    println!("  Backend:  {:?}", config.backend);
    println!("  Database: {}", config.database.display());
    println!("  Wikidata: {}", config.wikidata.api_url);
    println!();
    println!("Endpoints:");
    println!("  GET  /minerals/{{id}}   - Resolve a reference");
    println!("  GET  /minerals        - List references");
    println!("  POST /minerals        - Add a curated reference");
    println!("  POST /specimens/view  - Specimen with its reference");
    println!("  GET  /status          - Reference counts");
    println!("  GET  /health          - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config.server, resolver).await
}

// =============================================================================
// RESOLVE / SHOW / LIST COMMANDS
// =============================================================================

/// Resolve one identifier, fetching from Wikidata on a miss.
pub async fn cmd_resolve(config: &Config, json_mode: bool, raw_id: &str) -> Result<(), MineralError> {
    let id = MineralId::parse(raw_id)?;
    let resolver = build_resolver(config)?;
    let resolved = resolver.resolve_traced(&id).await?;

    if json_mode {
        return print_json(&serde_json::json!({
            "outcome": resolved.outcome.as_str(),
            "record": resolved.record,
        }));
    }

    print_reference(&resolved.record);
    println!("{:<18}{}", "Outcome:", resolved.outcome.as_str());
    Ok(())
}

/// Print a persisted reference; never touches the network.
pub fn cmd_show(config: &Config, json_mode: bool, raw_id: &str) -> Result<(), MineralError> {
    let id = MineralId::parse(raw_id)?;
    let store = open_store(config)?;
    let record = store.get(&id)?.ok_or(MineralError::NotFound(id))?;

    if json_mode {
        return print_json(&record);
    }
    print_reference(&record);
    Ok(())
}

/// List persisted references.
pub fn cmd_list(config: &Config, json_mode: bool) -> Result<(), MineralError> {
    let store = open_store(config)?;
    let records = store.list()?;

    if json_mode {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No references stored.");
        return Ok(());
    }
    for record in &records {
        println!(
            "{:<24} {:<9} {:<24} {}",
            record.id,
            record.source.as_str(),
            record.name_en,
            record.chemical_formula
        );
    }
    println!();
    println!("{} reference(s)", records.len());
    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// Read a JSON array of curated references.
pub fn read_seed_file(path: &Path) -> Result<Vec<MineralReference>, MineralError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_SEED_FILE_SIZE)?;

    let text = std::fs::read_to_string(&path)
        .map_err(|e| MineralError::Config(format!("Cannot read '{}': {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| MineralError::Serialization(format!("Invalid seed file: {}", e)))
}

/// Insert curated references, skipping ids that already exist.
pub fn cmd_seed(config: &Config, json_mode: bool, file: &Path) -> Result<(), MineralError> {
    let records = read_seed_file(file)?;
    let store = open_store(config)?;
    let outcomes = seed_curated(store.as_ref(), records)?;

    let inserted: Vec<&MineralId> = outcomes
        .iter()
        .filter_map(|o| match o {
            SeedOutcome::Inserted(id) => Some(id),
            SeedOutcome::Skipped(_) => None,
        })
        .collect();
    let skipped: Vec<&MineralId> = outcomes
        .iter()
        .filter_map(|o| match o {
            SeedOutcome::Skipped(id) => Some(id),
            SeedOutcome::Inserted(_) => None,
        })
        .collect();

    tracing::info!(inserted = inserted.len(), skipped = skipped.len(), "Seed complete");

    if json_mode {
        return print_json(&serde_json::json!({
            "inserted": inserted,
            "skipped": skipped,
        }));
    }

    println!("Inserted: {}", inserted.len());
    println!("Skipped:  {}", skipped.len());
    for id in skipped {
        println!("  already present: {}", id);
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), MineralError> {
    if config.backend == Backend::Memory {
        println!("In-memory backend needs no initialization.");
        return Ok(());
    }

    let path = &config.database;
    if path.exists() {
        if !force {
            return Err(MineralError::Config(format!(
                "Database already exists at '{}'. Use --force to overwrite.",
                path.display()
            )));
        }
        std::fs::remove_file(path)
            .map_err(|e| MineralError::Storage(format!("Cannot remove existing database: {}", e)))?;
        tracing::warn!(database = %path.display(), "Removed existing database");
    }

    RedbReferenceStore::open(path)?;
    println!("Initialized empty database at {}", path.display());
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show reference counts.
pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), MineralError> {
    let store = open_store(config)?;
    let summary = StoreSummary::of(store.as_ref())?;

    if json_mode {
        return print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend,
            "reference_count": summary.total,
            "curated_count": summary.curated,
            "external_count": summary.external,
        }));
    }

    println!("MineralSpace Status");
    println!("===================");
    println!("Database: {}", config.database.display());
    println!("Backend:  {:?}", config.backend);
    println!();
    println!("References: {}", summary.total);
    println!("  curated:  {}", summary.curated);
    println!("  wikidata: {}", summary.external);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
