//! Pagesweep core library.
//!
//! This crate analyzes a web page together with the scripts and stylesheets
//! it references, and aggregates every verifier finding into one normalized
//! violation list.
//!
//! High-level modules:
//! - `join`: Fan-out/fan-in primitive that fires a continuation once.
//! - `analyze`: Orchestration of the per-category and per-resource work.
//! - `normalize`: Raw verifier findings to `Violation` records.
//! - `suppress`: Resource exclusion and markup line suppression.
//! - `discovery`: Script and stylesheet discovery from page markup.
//! - `fetch`: Resource fetchers (in-memory and file-backed).
//! - `verify`: Verifier contract, registry and the null verifier.
//! - `rules`: Built-in markup rules.
//! - `presets`: Named verifier option presets.
//! - `models`: Resource and violation data types.
//! - `config`: Discovery and effective configuration resolution.
//! - `cli`: CLI argument parsing (binary uses this).
//! - `output`: Human/JSON/HTML printers.
//! - `error`: Configuration-time error type.
pub mod analyze;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod join;
pub mod models;
pub mod normalize;
pub mod output;
pub mod presets;
pub mod rules;
pub mod suppress;
pub mod verify;
