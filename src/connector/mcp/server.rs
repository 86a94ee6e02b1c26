use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::tool;
use rmcp::tool_handler;
use rmcp::tool_router;
use rmcp::ErrorData as McpError;
use rmcp::ServerHandler;

use crate::application::use_cases::{Dispatcher, MultiRepoManager};
use crate::domain::models::SymbolKind;

use super::tools::{
    parse_mode, FindReferencesInput, GetOutlineInput, GetStatusInput, IndexDirectoryInput,
    LookupSymbolInput, ScopeSearchInput, SearchHitOutput, SearchToolInput, SymbolOutput,
};

const MAX_LIMIT: usize = 100;

/// MCP server exposing `Dispatcher` operations as tools (spec §6: the
/// dispatcher's six core operations plus `get_status`), plus `search_scope`
/// for cross-repo fan-out (spec §4.J). Contains no business logic — every
/// tool call is a thin translation into and out of the core API.
#[derive(Clone)]
pub struct CodeIndexMcpServer {
    dispatcher: Arc<Dispatcher>,
    multi_repo: Arc<MultiRepoManager>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CodeIndexMcpServer {
    pub fn new(dispatcher: Arc<Dispatcher>, multi_repo: Arc<MultiRepoManager>) -> Self {
        Self {
            dispatcher,
            multi_repo,
            tool_router: Self::tool_router(),
        }
    }

    /// Search an indexed repository with lexical, semantic or hybrid
    /// retrieval. Falls back to lexical-only (with `degraded=true`) when
    /// semantic search is unavailable.
    #[tool(name = "search_code")]
    async fn search_code(
        &self,
        params: Parameters<SearchToolInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let limit = input.limit.min(MAX_LIMIT);
        let mode = parse_mode(&input.mode);

        let result = self
            .dispatcher
            .search(&input.repo_id, &input.query, mode, limit)
            .await
            .map_err(|e| McpError::internal_error(format!("search failed: {e}"), None))?;

        let outputs: Vec<SearchHitOutput> = result
            .hits
            .iter()
            .map(|hit| SearchHitOutput {
                repo_id: hit.repo_id.clone(),
                relative_path: hit.relative_path.clone(),
                line: hit.line,
                snippet: hit.snippet.clone(),
                score: hit.score,
            })
            .collect();

        let json = serde_json::to_string_pretty(&serde_json::json!({
            "hits": outputs,
            "degraded": result.degraded,
        }))
        .map_err(|e| McpError::internal_error(format!("failed to serialize results: {e}"), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Look up a symbol by exact (or, with `fuzzy`, trigram-approximate) name.
    #[tool(name = "lookup_symbol")]
    async fn lookup_symbol(
        &self,
        params: Parameters<LookupSymbolInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let symbols = self
            .dispatcher
            .lookup_symbol(&input.repo_id, &input.name, None::<SymbolKind>, input.fuzzy, input.limit)
            .await
            .map_err(|e| McpError::internal_error(format!("lookup_symbol failed: {e}"), None))?;

        let outputs: Vec<SymbolOutput> = symbols.iter().map(SymbolOutput::from).collect();
        let json = serde_json::to_string_pretty(&outputs)
            .map_err(|e| McpError::internal_error(format!("failed to serialize results: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Index (or re-index) a directory of repo-relative paths.
    #[tool(name = "index_directory")]
    async fn index_directory(
        &self,
        params: Parameters<IndexDirectoryInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let root = std::path::PathBuf::from(&input.root);
        let summary = self
            .dispatcher
            .index_directory(&input.repo_id, &root, input.relative_paths, None)
            .await
            .map_err(|e| McpError::internal_error(format!("index_directory failed: {e}"), None))?;
        self.multi_repo.register_indexed(&input.repo_id, &root);

        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| McpError::internal_error(format!("failed to serialize summary: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Find callers of a symbol, optionally including its definition.
    #[tool(name = "find_references")]
    async fn find_references(
        &self,
        params: Parameters<FindReferencesInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let result = self
            .dispatcher
            .find_references(&input.repo_id, &input.symbol_identifier, input.include_definitions)
            .await
            .map_err(|e| McpError::internal_error(format!("find_references failed: {e}"), None))?;

        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(format!("failed to serialize results: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// List the symbols declared in a single file, in source order.
    #[tool(name = "get_outline")]
    async fn get_outline(
        &self,
        params: Parameters<GetOutlineInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let outline = self
            .dispatcher
            .get_outline(&input.repo_id, &input.relative_path)
            .await
            .map_err(|e| McpError::internal_error(format!("get_outline failed: {e}"), None))?;

        let json = serde_json::to_string_pretty(&outline)
            .map_err(|e| McpError::internal_error(format!("failed to serialize outline: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Search across several registered repositories at once, subject to
    /// the `MCP_REFERENCE_REPOS` allow-list, fusing hits by score.
    #[tool(name = "search_scope")]
    async fn search_scope(
        &self,
        params: Parameters<ScopeSearchInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let limit = input.limit.min(MAX_LIMIT);
        let mode = parse_mode(&input.mode);

        let result = self
            .multi_repo
            .search_scope(&input.repo_ids, &input.query, mode, limit)
            .await
            .map_err(|e| McpError::internal_error(format!("search_scope failed: {e}"), None))?;

        let outputs: Vec<SearchHitOutput> = result
            .hits
            .iter()
            .map(|hit| SearchHitOutput {
                repo_id: hit.repo_id.clone(),
                relative_path: hit.relative_path.clone(),
                line: hit.line,
                snippet: hit.snippet.clone(),
                score: hit.score,
            })
            .collect();

        let json = serde_json::to_string_pretty(&serde_json::json!({
            "hits": outputs,
            "degraded": result.degraded,
        }))
        .map_err(|e| McpError::internal_error(format!("failed to serialize results: {e}"), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Report repo/file/symbol counts and plugin cache residency.
    #[tool(name = "get_status")]
    async fn get_status(
        &self,
        params: Parameters<GetStatusInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let status = self
            .dispatcher
            .get_status(&input.repo_id)
            .await
            .map_err(|e| McpError::internal_error(format!("get_status failed: {e}"), None))?;

        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("failed to serialize status: {e}"), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for CodeIndexMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Local code index server. Use search_code, lookup_symbol, find_references and \
                 get_outline to navigate an indexed repository; index_directory to (re)index it \
                 first; get_status to check indexing progress and plugin cache residency. \
                 search_scope fans a query across several repositories at once, subject to the \
                 configured reference-repo allow-list."
                    .into(),
            ),
        }
    }
}
