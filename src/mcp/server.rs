// file: src/mcp/server.rs
// description: MCP server exposing the GitHub and Obsidian vault toolsets
// reference: https://docs.rs/rmcp

use crate::config::Config;
use crate::github::GitHubClient;
use crate::vault::VaultStore;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, schemars, tool, tool_handler, tool_router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

const TOKEN_MISSING_MESSAGE: &str = "GITHUB_TOKEN is not set on the server. Configure it in the \
     MCP server process environment (e.g., in the mcpServers entry that launches vaulthub).";
const VAULT_MISSING_MESSAGE: &str = "VAULT_PATH not configured on server.";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RepoArgs {
    /// Owner (username or organization) of the GitHub repository, e.g. "octocat"
    pub owner: String,
    /// Name of the GitHub repository, e.g. "Spoon-Knife"
    pub repo: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RepoContentsArgs {
    /// Owner (username or organization) of the GitHub repository
    pub owner: String,
    /// Name of the GitHub repository
    pub repo: String,
    /// Path within the repository to list; defaults to the root directory
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FileContentsArgs {
    /// Owner (username or organization) of the GitHub repository
    pub owner: String,
    /// Name of the GitHub repository
    pub repo: String,
    /// Full path to the file within the repository, e.g. "src/main.rs"
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NotePathArgs {
    /// Relative path to the note within the vault, e.g. "Meetings/Project Sync.md"
    pub note_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateNoteArgs {
    /// Desired relative path for the note; ".md" is appended when missing
    pub relative_path: String,
    /// Markdown content for the note
    pub content: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AppendNoteArgs {
    /// Relative path to the existing note within the vault
    pub note_path: String,
    /// Markdown content to append at the end of the note
    pub content_to_append: String,
}

/// Tool server over a configuration resolved once at process start. GitHub
/// clients are constructed fresh per call from the request's (owner, repo);
/// vault operations share only the read-only root.
#[derive(Clone)]
pub struct VaultHubMcp {
    config: Arc<Config>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl VaultHubMcp {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    pub fn get_tool_router(&self) -> &ToolRouter<Self> {
        &self.tool_router
    }

    fn github_client(
        &self,
        owner: &str,
        repo: &str,
    ) -> std::result::Result<GitHubClient, serde_json::Value> {
        let Some(token) = self.config.github.token.as_deref() else {
            warn!("GitHub tool invoked without a configured token");
            return Err(json!({
                "error": "ConfigurationError",
                "error_message": TOKEN_MISSING_MESSAGE,
            }));
        };

        GitHubClient::new(owner, repo, token, &self.config.github).map_err(|e| {
            json!({
                "error": "ConfigurationError",
                "error_message": e.to_string(),
            })
        })
    }

    fn vault(&self) -> Option<VaultStore> {
        self.config
            .vault
            .root
            .clone()
            .map(VaultStore::new)
    }

    #[tool(
        description = "Retrieves details of the most recently merged pull request for a GitHub \
                       repository (scanning the 10 most recently updated closed PRs). Returns a \
                       JSON object with number, title, url, merged_at, merged_by, author, \
                       body_summary, head_commit_sha and base_branch, or a JSON error message."
    )]
    async fn get_github_last_merged_pr(
        &self,
        Parameters(args): Parameters<RepoArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "Tool 'get_github_last_merged_pr' called for repo: {}/{}",
            args.owner, args.repo
        );

        let client = match self.github_client(&args.owner, &args.repo) {
            Ok(client) => client,
            Err(payload) => return json_result(payload),
        };

        match client.last_merged_pull_request().await {
            Ok(Some(summary)) => json_result(summary),
            Ok(None) => json_result(json!({
                "message": format!(
                    "No recently merged PRs found for {}/{}.",
                    args.owner, args.repo
                ),
            })),
            Err(e) => json_result(json!({
                "error": "ToolExecutionError",
                "error_message": format!(
                    "Failed to retrieve or process last merged PR details: {}",
                    e
                ),
                "details": {"owner": args.owner, "repo": args.repo},
            })),
        }
    }

    #[tool(
        description = "Lists files and directories at a path within a GitHub repository. Returns \
                       a JSON array of entries with name, path, type, size, sha, html_url and \
                       download_url; a path addressing a single file yields a one-element array. \
                       Returns a JSON error object on failure."
    )]
    async fn get_repo_contents(
        &self,
        Parameters(args): Parameters<RepoContentsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let path = args.path.unwrap_or_default();
        info!(
            "Tool 'get_repo_contents' called for {}/{} path: '{}'",
            args.owner, args.repo, path
        );

        let client = match self.github_client(&args.owner, &args.repo) {
            Ok(client) => client,
            Err(payload) => return json_result(payload),
        };

        match client.directory_contents(&path).await {
            Ok(entries) => json_result(entries),
            Err(e) if e.is_not_found() => json_result(json!({
                "error_message": format!(
                    "Directory or path not found: {} in {}/{}",
                    path, args.owner, args.repo
                ),
            })),
            Err(e) => json_result(json!({
                "error": "ToolExecutionError",
                "error_message": e.to_string(),
            })),
        }
    }

    #[tool(
        description = "Retrieves the decoded content and metadata of a file from a GitHub \
                       repository. Inline base64 content is decoded; large files are fetched via \
                       their raw-content URL. Returns a JSON object with name, path, sha, size, \
                       encoding, content, html_url and download_url, or a JSON error object."
    )]
    async fn get_file_contents(
        &self,
        Parameters(args): Parameters<FileContentsArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "Tool 'get_file_contents' called for {}/{} path: '{}'",
            args.owner, args.repo, args.path
        );

        let client = match self.github_client(&args.owner, &args.repo) {
            Ok(client) => client,
            Err(payload) => return json_result(payload),
        };

        match client.file_contents(&args.path).await {
            Ok(record) => json_result(record),
            Err(e) if e.is_not_found() => json_result(json!({
                "error": "NotFound",
                "error_message": format!(
                    "content not found: {} in {}/{}",
                    args.path, args.owner, args.repo
                ),
            })),
            Err(e) => json_result(json!({
                "error": "ToolExecutionError",
                "error_message": e.to_string(),
            })),
        }
    }

    #[tool(
        description = "Retrieves the content of a note from the configured Obsidian vault. \
                       Returns {\"path\", \"content\"} on success or a JSON error message."
    )]
    async fn get_obsidian_note(
        &self,
        Parameters(args): Parameters<NotePathArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("Tool 'get_obsidian_note' called for: {}", args.note_path);

        let Some(store) = self.vault() else {
            return json_result(json!({"error": VAULT_MISSING_MESSAGE}));
        };

        match store.read_note(&args.note_path) {
            Ok(content) => json_result(json!({
                "path": args.note_path,
                "content": content,
            })),
            Err(_) => json_result(json!({
                "error": format!("Note not found or could not be read: {}", args.note_path),
            })),
        }
    }

    #[tool(
        description = "Creates a new note (or overwrites an existing one) in the configured \
                       Obsidian vault. Missing folders are created and the \".md\" extension is \
                       added when absent. Returns {\"message\", \"path\"} on success or a JSON \
                       error message."
    )]
    async fn create_obsidian_note(
        &self,
        Parameters(args): Parameters<CreateNoteArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("Tool 'create_obsidian_note' called for: {}", args.relative_path);

        let Some(store) = self.vault() else {
            return json_result(json!({"error": VAULT_MISSING_MESSAGE}));
        };

        match store.create_note(&args.relative_path, &args.content) {
            Ok(full_path) => {
                let created = full_path
                    .strip_prefix(store.root())
                    .unwrap_or(&full_path)
                    .display()
                    .to_string();
                json_result(json!({
                    "message": "Note created/updated successfully.",
                    "path": created,
                }))
            }
            Err(e) => {
                warn!("Failed to create note {}: {}", args.relative_path, e);
                json_result(json!({
                    "error": format!("Failed to create note at: {}", args.relative_path),
                }))
            }
        }
    }

    #[tool(
        description = "Appends content to an existing note in the configured Obsidian vault. \
                       Fails if the note does not exist. A newline is inserted first when the \
                       note does not already end with one. Returns {\"message\"} on success or a \
                       JSON error message."
    )]
    async fn append_obsidian_note(
        &self,
        Parameters(args): Parameters<AppendNoteArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("Tool 'append_obsidian_note' called for: {}", args.note_path);

        let Some(store) = self.vault() else {
            return json_result(json!({"error": VAULT_MISSING_MESSAGE}));
        };

        match store.append_note(&args.note_path, &args.content_to_append, true) {
            Ok(()) => json_result(json!({
                "message": format!("Content appended to '{}' successfully.", args.note_path),
            })),
            Err(e) if e.is_not_found() => json_result(json!({
                "error": format!(
                    "Note not found or is not a file (cannot append): {}",
                    args.note_path
                ),
            })),
            Err(e) => {
                warn!("Failed to append to note {}: {}", args.note_path, e);
                json_result(json!({
                    "error": format!("Failed to append content to note: {}", args.note_path),
                }))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for VaultHubMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Tools for reading GitHub repositories (last merged PR, directory listings, \
                 decoded file contents) and for reading, creating and appending Obsidian vault \
                 notes. Every tool returns a JSON string; errors are embedded in the payload."
                    .to_string(),
            ),
        }
    }
}

/// Serialize a tool payload into a text content block. Errors travel inside
/// the JSON, so this is the only place a protocol-level fault can originate.
fn json_result(value: impl serde::Serialize) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&value).map_err(|e| {
        McpError::internal_error(format!("Failed to serialize tool result: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn server_without_config() -> VaultHubMcp {
        let mut config = Config::default_config();
        config.github.token = None;
        config.vault.root = None;
        VaultHubMcp::new(config)
    }

    fn server_with_vault() -> (TempDir, VaultHubMcp) {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default_config();
        config.vault.root = Some(temp.path().to_path_buf());
        (temp, VaultHubMcp::new(config))
    }

    fn payload(result: &CallToolResult) -> serde_json::Value {
        let text = result.content.as_ref().expect("content")[0].as_text().expect("text content");
        serde_json::from_str(&text.text).expect("json payload")
    }

    #[test]
    fn test_all_six_tools_registered() {
        let mcp = server_without_config();
        let tools = mcp.get_tool_router().list_all();
        let mut names: Vec<_> = tools.iter().map(|t| t.name.as_ref()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "append_obsidian_note",
                "create_obsidian_note",
                "get_file_contents",
                "get_github_last_merged_pr",
                "get_obsidian_note",
                "get_repo_contents",
            ]
        );
    }

    #[tokio::test]
    async fn test_github_tool_without_token_is_configuration_error() {
        let mcp = server_without_config();
        let result = mcp
            .get_github_last_merged_pr(Parameters(RepoArgs {
                owner: "octocat".to_string(),
                repo: "spoon-knife".to_string(),
            }))
            .await
            .unwrap();

        let body = payload(&result);
        assert_eq!(body["error"], "ConfigurationError");
        assert!(body["error_message"].as_str().unwrap().contains("GITHUB_TOKEN"));
    }

    #[tokio::test]
    async fn test_vault_tools_without_root_touch_nothing() {
        let mcp = server_without_config();

        let result = mcp
            .create_obsidian_note(Parameters(CreateNoteArgs {
                relative_path: "unconfigured-vault-note".to_string(),
                content: "never written".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(payload(&result)["error"], VAULT_MISSING_MESSAGE);
        assert!(!std::path::Path::new("unconfigured-vault-note.md").exists());

        let result = mcp
            .get_obsidian_note(Parameters(NotePathArgs {
                note_path: "anything.md".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(payload(&result)["error"], VAULT_MISSING_MESSAGE);

        let result = mcp
            .append_obsidian_note(Parameters(AppendNoteArgs {
                note_path: "anything.md".to_string(),
                content_to_append: "x".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(payload(&result)["error"], VAULT_MISSING_MESSAGE);
    }

    #[tokio::test]
    async fn test_create_and_read_note_payloads() {
        let (_temp, mcp) = server_with_vault();

        let result = mcp
            .create_obsidian_note(Parameters(CreateNoteArgs {
                relative_path: "ideas/quick".to_string(),
                content: "# Quick Ideas".to_string(),
            }))
            .await
            .unwrap();
        let body = payload(&result);
        assert_eq!(body["message"], "Note created/updated successfully.");
        assert_eq!(body["path"], "ideas/quick.md");

        let result = mcp
            .get_obsidian_note(Parameters(NotePathArgs {
                note_path: "ideas/quick.md".to_string(),
            }))
            .await
            .unwrap();
        let body = payload(&result);
        assert_eq!(body["path"], "ideas/quick.md");
        assert_eq!(body["content"], "# Quick Ideas");
    }

    #[tokio::test]
    async fn test_append_missing_note_payload() {
        let (_temp, mcp) = server_with_vault();

        let result = mcp
            .append_obsidian_note(Parameters(AppendNoteArgs {
                note_path: "journal/ghost.md".to_string(),
                content_to_append: "entry".to_string(),
            }))
            .await
            .unwrap();
        let body = payload(&result);
        assert_eq!(
            body["error"],
            "Note not found or is not a file (cannot append): journal/ghost.md"
        );
    }

    #[tokio::test]
    async fn test_append_note_success_payload() {
        let (_temp, mcp) = server_with_vault();

        mcp.create_obsidian_note(Parameters(CreateNoteArgs {
            relative_path: "log".to_string(),
            content: "first".to_string(),
        }))
        .await
        .unwrap();

        let result = mcp
            .append_obsidian_note(Parameters(AppendNoteArgs {
                note_path: "log.md".to_string(),
                content_to_append: "second".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(
            payload(&result)["message"],
            "Content appended to 'log.md' successfully."
        );

        let result = mcp
            .get_obsidian_note(Parameters(NotePathArgs {
                note_path: "log.md".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(payload(&result)["content"], "first\nsecond");
    }
}
