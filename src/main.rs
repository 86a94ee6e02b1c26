//! CodeIndex CLI - local-first code indexing and search engine.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use codeindex::application::interfaces::{Embedder, VectorStore, WatchEvent, Watcher};
use codeindex::application::use_cases::multi_repo_manager::MultiRepoManager;
use codeindex::application::use_cases::{Dispatcher, IndexEngine, QueryPlanner, SemanticIndexer};
use codeindex::connector::cli::Commands;
use codeindex::connector::embedding::MockEmbedder;
use codeindex::connector::language_registry::DuckDbLanguageRegistry;
use codeindex::connector::mcp::CodeIndexMcpServer;
use codeindex::connector::path_resolver;
use codeindex::connector::storage::DuckDbStore;
use codeindex::connector::vector::DuckDbVectorStore;
use codeindex::connector::watcher::NotifyWatcher;
use codeindex::connector::Config;
use codeindex::domain::models::{Repository, SearchMode};

#[derive(Parser)]
#[command(name = "codeindex")]
#[command(author, version, about = "Local-first code indexing and search engine", long_about = None)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env();
    let dispatcher = Arc::new(build_dispatcher(&config).await?);

    match cli.command {
        Commands::Index { path, name, force: _ } => {
            let root = PathBuf::from(&path).canonicalize()?;
            let repo_id = name.unwrap_or_else(|| Repository::derive_id(&root, None));

            let relative_paths = path_resolver::walk_repo_files(&root);
            let total = relative_paths.len();
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            let progress_bar = bar.clone();
            let progress = Arc::new(move |event: codeindex::application::use_cases::index_engine::ProgressEvent| {
                progress_bar.set_position(event.processed as u64);
                progress_bar.set_message(event.current_path);
            });

            let summary = dispatcher.index_directory(&repo_id, &root, relative_paths, Some(progress)).await?;
            bar.finish_and_clear();
            println!(
                "Indexed repository {repo_id}: {} files succeeded, {} failed",
                summary.succeeded,
                summary.failed.len()
            );
            for failure in &summary.failed {
                println!("  failed: {} ({}): {}", failure.path, failure.kind, failure.message);
            }
        }

        Commands::Search { repo_id, query, mode, limit } => {
            let search_mode = match mode.as_str() {
                "lexical" => SearchMode::Lexical,
                "semantic" => SearchMode::Semantic,
                _ => SearchMode::Hybrid,
            };
            let result = dispatcher.search(&repo_id, &query, search_mode, limit).await?;
            if result.degraded {
                println!("(degraded: a retriever was unavailable or missed its deadline)");
            }
            if result.hits.is_empty() {
                println!("No results found.");
            } else {
                for (i, hit) in result.hits.iter().enumerate() {
                    println!("{}. {}:{} (score: {:.3})", i + 1, hit.relative_path, hit.line, hit.score);
                    println!("   {}", hit.snippet);
                }
            }
        }

        Commands::Lookup { repo_id, name, fuzzy, limit } => {
            let symbols = dispatcher.lookup_symbol(&repo_id, &name, None, fuzzy, limit).await?;
            if symbols.is_empty() {
                println!("No symbols found.");
            } else {
                for symbol in symbols {
                    println!("{:?} {} at line {}", symbol.kind, symbol.name, symbol.line_start);
                }
            }
        }

        Commands::List => {
            let repos = dispatcher.list_repos().await?;
            if repos.is_empty() {
                println!("No repositories indexed under {}", config.index_root.display());
            } else {
                for repo in repos {
                    println!(
                        "{}  {}  last_indexed_at={:?}",
                        repo.id,
                        repo.root_path_absolute.display(),
                        repo.last_indexed_at
                    );
                }
            }
        }

        Commands::Delete { repo_id, relative_path } => {
            dispatcher.remove_file(&repo_id, &relative_path).await?;
            println!("Removed {relative_path} from {repo_id}.");
        }

        Commands::Stats { repo_id } => {
            let status = dispatcher.get_status(&repo_id).await?;
            println!("CodeIndex Statistics ({repo_id})");
            println!("=====================");
            println!("Files:   {}", status.files);
            println!("Symbols: {}", status.symbols);
            println!("Last indexed at: {:?}", status.last_indexed_at);
            println!(
                "Plugin cache: {} languages resident, {}/{} bytes",
                status.plugin_cache_stats.resident_languages.len(),
                status.plugin_cache_stats.total_est_bytes,
                status.plugin_cache_stats.max_memory_bytes
            );
        }

        Commands::Mcp => {
            let multi_repo = Arc::new(MultiRepoManager::new(
                dispatcher.clone(),
                config.plugin_strategy,
                config.enable_multi_repo,
                config.reference_repos.clone(),
            ));
            // Pre-register every repo the store already knows so `search_scope`
            // can authorize them without waiting for a fresh `index_directory`.
            for repo in dispatcher.list_repos().await? {
                let last_seen = repo.last_indexed_at.unwrap_or(repo.created_at);
                multi_repo.register(repo, last_seen);
            }

            let server = CodeIndexMcpServer::new(dispatcher, multi_repo);
            let service = server
                .serve(stdio())
                .await
                .map_err(|e| anyhow::anyhow!("MCP serve error: {e}"))?;
            service.waiting().await.map_err(|e| anyhow::anyhow!("MCP runtime error: {e}"))?;
        }

        Commands::Watch { path, name } => {
            let root = PathBuf::from(&path).canonicalize()?;
            let repo_id = name.unwrap_or_else(|| Repository::derive_id(&root, None));

            let relative_paths = path_resolver::walk_repo_files(&root);
            let summary = dispatcher.index_directory(&repo_id, &root, relative_paths, None).await?;
            println!(
                "Indexed repository {repo_id}: {} files succeeded, {} failed",
                summary.succeeded,
                summary.failed.len()
            );

            let watcher = NotifyWatcher::new();
            let watch_dispatcher = dispatcher.clone();
            let watch_repo_id = repo_id.clone();
            let watch_root = root.clone();
            watcher.set_callback(Box::new(move |event: WatchEvent| {
                let dispatcher = watch_dispatcher.clone();
                let repo_id = watch_repo_id.clone();
                let root = watch_root.clone();
                tokio::spawn(async move {
                    let outcome = match event {
                        WatchEvent::Created { relative_path } | WatchEvent::Modified { relative_path } => {
                            dispatcher.index_file(&repo_id, &root, &relative_path).await
                        }
                        WatchEvent::Deleted { relative_path } => dispatcher.remove_file(&repo_id, &relative_path).await,
                        WatchEvent::Moved { old, new } => dispatcher.move_file(&repo_id, &root, &old, &new, "").await,
                    };
                    if let Err(e) = outcome {
                        tracing::warn!(error = %e, "failed to apply watch event");
                    }
                });
            }));

            watcher.watch(&root).await?;
            println!("Watching {} (repo {repo_id}). Press Ctrl-C to stop.", root.display());
            tokio::signal::ctrl_c().await?;
            watcher.unwatch(&root).await?;
        }
    }

    Ok(())
}

/// Builds the single `Dispatcher` shared by every repository in this
/// process: one `DuckDbStore`/`DuckDbVectorStore` pair under
/// `config.store_dir()`, with repositories distinguished by the `repo_id`
/// column rather than by separate database files.
async fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let store_dir = config.store_dir();
    std::fs::create_dir_all(&store_dir)?;

    let storage = Arc::new(DuckDbStore::open(&store_dir.join("current.db"))?);
    let registry = Arc::new(DuckDbLanguageRegistry::new(config.max_memory_bytes()));

    let semantic = if config.semantic_enabled {
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::new(config.embedding_dim));
        let vector_store: Arc<dyn VectorStore> =
            Arc::new(DuckDbVectorStore::open(&store_dir.join("vectors.db"), config.embedding_dim)?);
        Some(Arc::new(SemanticIndexer::new(embedder, vector_store)))
    } else {
        None
    };

    let index_engine = Arc::new(IndexEngine::new(storage.clone(), registry.clone(), semantic.clone()));
    let query_planner = Arc::new(QueryPlanner::new(storage.clone(), semantic));

    Ok(Dispatcher::new(storage, index_engine, query_planner, None, registry))
}
