pub mod dispatcher;
pub mod index_engine;
pub mod multi_repo_manager;
pub mod query_planner;
pub mod rrf;
pub mod semantic_indexer;

pub use dispatcher::Dispatcher;
pub use index_engine::IndexEngine;
pub use multi_repo_manager::MultiRepoManager;
pub use query_planner::QueryPlanner;
pub use semantic_indexer::SemanticIndexer;
