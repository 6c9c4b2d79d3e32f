//! # LicenseGuard backend client
//!
//! Talks to the external license analysis REST service. One POST per
//! analysis, no retries; every failure comes back as a [`BackendError`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use licenseguard_backend::{AnalysisRequest, BackendClient, LicenseBackend};
//! use licenseguard_core::{parse_requirements, BackendConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(BackendConfig::new("http://localhost", 5000)?);
//! let client = BackendClient::new(config)?;
//!
//! let parsed = parse_requirements("requests==2.31.0\nflask>=2.0\n")?;
//! let report = client
//!     .submit_dependencies(&AnalysisRequest::new(parsed.dependencies))
//!     .await?;
//! println!("{} findings", report.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod transport;

pub use client::{AnalysisRequest, BackendClient, LicenseBackend};
pub use error::{BackendError, BackendResult};
