pub mod duckdb_store;

pub use duckdb_store::DuckDbStore;
