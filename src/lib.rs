//! # CodeIndex
//!
//! A local-first code indexing and search engine. Repositories are parsed
//! with tree-sitter into symbols, references and imports, stored in an
//! embedded DuckDB database, and made searchable via lexical, fuzzy and
//! (optionally) semantic vector retrieval fused with reciprocal rank fusion.
//! The core API is exposed to AI assistants over MCP and to humans over a
//! CLI.
//!
//! ## Architecture
//!
//! The crate is organized following Domain-Driven Design principles:
//!
//! - `domain`: Core entities, value objects and the closed error taxonomy.
//! - `application`: Port traits (`interfaces`) and orchestration logic
//!   (`use_cases`) — the `Dispatcher` is the single entry point both the
//!   MCP tool layer and the CLI call into.
//! - `connector`: External integrations — DuckDB storage and vector store,
//!   tree-sitter parsing, the plugin/language registry, the file watcher,
//!   the embedding client, the MCP server, and the CLI.

pub mod application;
pub mod connector;
pub mod domain;

pub use application::*;
pub use connector::*;
pub use domain::*;
