//! x402 paywall server.
//!
//! Serves one protected resource at `GET /article`. Requests without a valid
//! `Authorization: x402 <tx>` credential get HTTP 402 with the payment terms;
//! requests carrying one get the resource.
//!
//! # Modules
//!
//! - [`config`]: environment configuration ([`ServerConfig`](config::ServerConfig))
//! - [`routes`]: `/article`, `/health` and `/metrics` handlers
//! - [`metrics`]: Prometheus counters for requests and credentials
//! - [`security`]: constant-time token comparison

pub mod config;
pub mod metrics;
pub mod routes;
pub mod security;

pub use config::{ConfigError, ServerConfig};
