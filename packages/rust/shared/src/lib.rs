//! Shared types, error model, and configuration for the tab catalog.
//!
//! This crate is the foundation depended on by all other tabcatalog crates.
//! It provides:
//! - [`TabCatalogError`], the unified error type
//! - Domain types ([`TabRecord`], [`TabKind`], [`CategorizationResult`])
//! - Configuration ([`AppConfig`], config loading) and stored credentials

pub mod config;
pub mod credentials;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClassifierConfig, ClassifierRule, DefaultsConfig, GeminiConfig, MistralConfig,
    OllamaConfig, TaggingConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use credentials::{
    CredentialStore, credentials_file_path, load_credentials, load_credentials_from,
    save_credentials, save_credentials_to,
};
pub use error::{Result, TabCatalogError};
pub use types::{CategorizationResult, FALLBACK_CATEGORY, TabKind, TabRecord};
