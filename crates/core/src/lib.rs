// Core types and functionality for the LicenseGuard MCP gateway

pub mod config;
pub mod error;
pub mod manifest;
pub mod types;

pub use config::{BackendConfig, BackendSettings};
pub use error::{ConfigError, ValidationError};
pub use manifest::{parse_requirements, ParseWarning, ParsedManifest};
pub use types::*;
