// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod github;
pub mod mcp;
pub mod utils;
pub mod vault;

pub use config::{Config, GithubConfig, VaultConfig};
pub use error::{Result, ServerError};
pub use github::{DirectoryEntry, FileContentRecord, GitHubClient, MergedPrSummary};
pub use mcp::VaultHubMcp;
pub use vault::VaultStore;
