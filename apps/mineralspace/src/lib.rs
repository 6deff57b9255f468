//! # MineralSpace
//!
//! Application crate: the async half of MineralSpace.
//!
//! - `source`: external entity sources (Wikidata client, test double)
//! - `resolver`: single-fetch, persist-once resolution over a `ReferenceStore`
//! - `api`: axum HTTP surface
//! - `cli`: clap command line
//! - `config`: TOML + environment configuration
//!
//! The reference model, normalizer and stores live in `mineralspace-core`.

pub mod api;
pub mod cli;
pub mod config;
pub mod resolver;
pub mod source;

pub use resolver::{ReferenceResolver, ResolveOutcome, Resolved};
