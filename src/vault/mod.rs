// file: src/vault/mod.rs
// description: local Obsidian vault note storage
// reference: internal module structure

pub mod store;

pub use store::VaultStore;
