//! # SQL Server Provider Core
//!
//! The configuration-resolution and credential-acquisition core of an
//! infrastructure-as-code provider for Microsoft SQL Server.
//!
//! This crate provides:
//! - **Config resolution**: merge host-supplied attributes over `MSSQL_*`
//!   environment defaults with tri-state (unknown/null/known) semantics,
//!   accumulating every field error in one pass
//! - **Credential acquisition**: managed identity bearer tokens from the
//!   Azure instance-metadata endpoint
//! - **Connection building**: eager, bounded driver connections for the
//!   managed-identity and SQL-authentication variants
//! - **Query execution**: opaque statement execution with captured output
//!
//! ## Architecture
//!
//! [`MssqlProvider::configure`] runs the pipeline end to end: resolve,
//! optionally fetch a token, open the connection. The opened handle is
//! reference-counted and shared by every [`resource::QueryResource`] the
//! provider hands out; the host's plugin protocol and resource lifecycle
//! dispatch live outside this crate.

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod identity;
pub mod provider;
pub mod resource;

pub use config::{
    EnvironmentDefaults, ManagedIdentityConfig, ManagedIdentityRawConfig, SqlAuthConfig,
    SqlAuthRawConfig, Value,
};
pub use error::{ConfigErrors, FieldError, FieldErrorKind, ProviderError};
pub use identity::{AccessToken, ImdsCredentialSource};
pub use provider::{MssqlProvider, ProviderConfig};
pub use resource::{QueryResource, QueryState};
