pub mod duckdb_vector_store;

pub use duckdb_vector_store::DuckDbVectorStore;
