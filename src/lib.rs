//! poolctl - machine pool management for managed Kubernetes clusters.
//!
//! A library and command-line tool for:
//! - **Creating** machine pools (classic clusters) and node pools (hosted control plane clusters)
//! - **Listing** and **describing** the pools of a cluster
//! - **Deleting** pools after confirmation
//!
//! ## Quick Start
//!
//! Credentials are loaded from environment variables, optionally through a `.env` file:
//!
//! ```text
//! POOLCTL_API_TOKEN=your_token_here
//! POOLCTL_API_URL=https://api.example.com
//! POOLCTL_CLUSTER=my-cluster
//! ```
//!
//! Then drive the workflows through [`PoolService`]:
//!
//! ```ignore
//! use poolctl::{ApiConfig, HttpCloudProvider, HttpControlPlane, OutputFormat, PoolService, RestTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rest = RestTransport::new(ApiConfig::from_env()?)?;
//!     let control_plane = HttpControlPlane::new(rest.clone());
//!     let cloud = HttpCloudProvider::new(rest);
//!
//!     let service = PoolService::new(&control_plane, &cloud);
//!     service.list("my-cluster", OutputFormat::Text, &mut std::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Linting
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]
#![warn(dead_code)]
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(nonstandard_style)]

// Clippy
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(clippy::unwrap_used)]         // unwrap() is forbidden
#![deny(clippy::expect_used)]         // expect() is forbidden outside static regexes
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)]        // Output goes through an injected writer
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::redundant_clone)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

// Safety and robustness lints
#![deny(overflowing_literals)]
#![deny(arithmetic_overflow)]

// ============================================================================
// Modules
// ============================================================================

/// Wire types of the cluster-management API.
pub mod pool_api;

/// Create payloads built from resolved requests.
pub mod pool_builder;

/// Command-line parsing and dispatch.
pub mod pool_cli;

/// HTTP transport and control-plane client.
///
/// Use this module to talk to the cluster-management API.
pub mod pool_client;

/// Cloud network inquiries (subnets, security groups, local zones).
pub mod pool_cloud;

/// Environment-based configuration.
pub mod pool_config;

/// Top-level workflow error.
pub mod pool_error;

/// Domain model: clusters, raw input, resolved requests.
pub mod pool_model;

/// Tables, describe blocks and JSON output.
pub mod pool_output;

/// Interactive prompting.
pub mod pool_prompt;

/// Flag-or-prompt resolution of a creation request.
///
/// Use this module to turn raw `create` input into a validated request.
pub mod pool_resolver;

/// `create`, `list`, `describe` and `delete` workflows.
pub mod pool_service;

/// Input validators and parsers.
pub mod pool_validate;

#[cfg(test)]
mod pool_testing;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use pool_cli::{Cli, run};
pub use pool_client::{ClientError, ControlPlane, HttpControlPlane, RestTransport};
pub use pool_cloud::{CloudProvider, HttpCloudProvider};
pub use pool_config::ApiConfig;
pub use pool_error::PoolError;
pub use pool_model::{Cluster, CreationRequest, Flag, FlagSet, PoolInput, Provenance, Session};
pub use pool_output::OutputFormat;
pub use pool_prompt::{Prompter, TerminalPrompter};
pub use pool_resolver::Resolver;
pub use pool_service::PoolService;
