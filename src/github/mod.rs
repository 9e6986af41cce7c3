// file: src/github/mod.rs
// description: GitHub REST API client and typed response models
// reference: https://docs.github.com/en/rest

pub mod client;
pub mod models;

pub use client::GitHubClient;
pub use models::{DirectoryEntry, FileContentRecord, MergedPrSummary};
