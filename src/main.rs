// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use std::path::PathBuf;
use tracing::{info, warn};
use vaulthub::utils::logging;
use vaulthub::{Config, GitHubClient, VaultHubMcp, VaultStore};

#[derive(Parser)]
#[command(name = "vaulthub")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "MCP server bridging GitHub repositories and Obsidian vaults", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP (Model Context Protocol) server for agentic tool integration
    Mcp {
        #[arg(long, default_value = "stdio")]
        transport: String,
    },

    /// Run a GitHub tool once and print its JSON payload
    Github {
        #[command(subcommand)]
        command: GithubCommands,
    },

    /// Run a vault tool once and print its JSON payload
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
}

#[derive(Subcommand)]
enum GithubCommands {
    /// Most recently merged pull request of a repository
    LastMergedPr { owner: String, repo: String },

    /// List files and directories at a repository path
    Contents {
        owner: String,
        repo: String,

        #[arg(default_value = "")]
        path: String,
    },

    /// Decoded content of a repository file
    File {
        owner: String,
        repo: String,
        path: String,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Print the content of a vault note
    Get { note_path: String },

    /// Create or overwrite a vault note
    Create {
        relative_path: String,
        content: String,
    },

    /// Append content to an existing vault note
    Append {
        note_path: String,
        content: String,

        /// Skip inserting a newline before the appended content
        #[arg(long)]
        no_newline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logger(cli.color, cli.verbose);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::default_config()
    };

    match cli.command {
        Commands::Mcp { transport } => {
            cmd_mcp(&config, &transport).await?;
        }
        Commands::Github { command } => {
            cmd_github(&config, command).await?;
        }
        Commands::Note { command } => {
            cmd_note(&config, command)?;
        }
    }

    Ok(())
}

async fn cmd_mcp(config: &Config, transport: &str) -> Result<()> {
    info!("Starting MCP server (transport: {})", transport);

    if transport != "stdio" {
        bail!("Unsupported transport: {} (only stdio is supported)", transport);
    }

    if config.github.token.is_none() {
        warn!("GITHUB_TOKEN is not set; GitHub tools will return configuration errors");
    }
    if config.vault.root.is_none() {
        warn!("VAULT_PATH is not set; vault tools will return configuration errors");
    }

    let mcp_server = VaultHubMcp::new(config.clone());

    info!("MCP server ready. Available tools:");
    for tool in mcp_server.get_tool_router().list_all() {
        info!("  - {}", tool.name);
    }

    let service = mcp_server
        .serve(stdio())
        .await
        .context("Failed to start MCP stdio transport")?;
    service.waiting().await?;

    info!("MCP server shut down");
    Ok(())
}

async fn cmd_github(config: &Config, command: GithubCommands) -> Result<()> {
    let token = config
        .github
        .token
        .as_deref()
        .context("GITHUB_TOKEN is not configured (set it in the environment or config file)")?;

    match command {
        GithubCommands::LastMergedPr { owner, repo } => {
            let client = GitHubClient::new(&owner, &repo, token, &config.github)?;
            match client.last_merged_pull_request().await? {
                Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
                None => println!(
                    "{}",
                    logging::format_warning(&format!(
                        "No recently merged PRs found for {}/{}",
                        owner, repo
                    ))
                ),
            }
        }
        GithubCommands::Contents { owner, repo, path } => {
            let client = GitHubClient::new(&owner, &repo, token, &config.github)?;
            let entries = client.directory_contents(&path).await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        GithubCommands::File { owner, repo, path } => {
            let client = GitHubClient::new(&owner, &repo, token, &config.github)?;
            let record = client.file_contents(&path).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

fn cmd_note(config: &Config, command: NoteCommands) -> Result<()> {
    let root = config
        .vault
        .root
        .clone()
        .context("VAULT_PATH is not configured (set it in the environment or config file)")?;
    let store = VaultStore::new(root);

    match command {
        NoteCommands::Get { note_path } => {
            let content = store.read_note(&note_path)?;
            println!("{}", content);
        }
        NoteCommands::Create {
            relative_path,
            content,
        } => {
            let path = store.create_note(&relative_path, &content)?;
            println!(
                "{}",
                logging::format_success(&format!("Note written: {}", path.display()))
            );
        }
        NoteCommands::Append {
            note_path,
            content,
            no_newline,
        } => {
            store.append_note(&note_path, &content, !no_newline)?;
            println!(
                "{}",
                logging::format_success(&format!("Content appended to {}", note_path))
            );
        }
    }

    Ok(())
}
