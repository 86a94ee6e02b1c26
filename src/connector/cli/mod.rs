use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Index (or re-index) a repository directory.
    Index {
        /// Path to the repository to index.
        path: String,

        /// Optional id to register the repository under (default: derived
        /// from the remote URL or path, per spec §3).
        #[arg(short, long)]
        name: Option<String>,

        /// Force a full walk even if the store has prior state for this repo.
        #[arg(short, long)]
        force: bool,
    },

    /// Search an indexed repository.
    Search {
        /// Id of a previously-indexed repository.
        repo_id: String,

        /// The search query.
        query: String,

        /// lexical | semantic | hybrid.
        #[arg(long, default_value = "hybrid")]
        mode: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Look up a symbol by name.
    Lookup {
        repo_id: String,
        name: String,

        #[arg(short, long)]
        fuzzy: bool,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// List indexed repositories.
    List,

    /// Remove a file from the index.
    Delete { repo_id: String, relative_path: String },

    /// Show indexing and plugin-cache statistics for a repository.
    Stats { repo_id: String },

    /// Start the MCP (Model Context Protocol) server over stdio.
    Mcp,

    /// Watch a repository directory and keep its index in sync as files
    /// change, until interrupted.
    Watch {
        /// Path to the repository to watch.
        path: String,

        /// Id of a previously-indexed repository (default: derived from
        /// the path, per spec §3).
        #[arg(short, long)]
        name: Option<String>,
    },
}
