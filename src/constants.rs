//! Centralized constants for the SQL Server provider core.
//!
//! Magic numbers and well-known endpoints live here so they are easy to
//! find and change in one place.

use std::time::Duration;

// =============================================================================
// Timeout Constants
// =============================================================================

/// Timeout for the instance-metadata token request in seconds.
///
/// The metadata endpoint is link-local and only reachable from inside the
/// Azure compute fabric; off-fabric the request must fail fast rather than
/// hang on an unroutable address.
pub const METADATA_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Default connection timeout in seconds (TCP connect + TDS handshake).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default statement execution timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Timeout for the instance-metadata token request as Duration.
pub const METADATA_REQUEST_TIMEOUT: Duration = Duration::from_secs(METADATA_REQUEST_TIMEOUT_SECS);

/// Default connection timeout as Duration.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS);

/// Default statement execution timeout as Duration.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS);

// =============================================================================
// Connection Constants
// =============================================================================

/// Default SQL Server TCP port.
pub const DEFAULT_SQL_PORT: u16 = 1433;

/// Application name reported to SQL Server.
pub const APPLICATION_NAME: &str = "mssql-provider";

// =============================================================================
// Azure Instance Metadata Service
// =============================================================================

/// Token endpoint of the Azure Instance Metadata Service (IMDS).
///
/// Link-local, unauthenticated, reachable only from inside an Azure VM or
/// managed compute instance.
pub const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// IMDS API version pinned by this provider.
pub const IMDS_API_VERSION: &str = "2018-02-01";

/// Resource URI tokens are requested for: Azure SQL Database.
pub const AZURE_SQL_RESOURCE: &str = "https://database.windows.net/";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment default for the `server` attribute.
pub const ENV_SERVER: &str = "MSSQL_SERVER";

/// Environment default for the `database` attribute.
pub const ENV_DATABASE: &str = "MSSQL_DATABASE";

/// Environment default for the `username` attribute (SQL authentication).
pub const ENV_USERNAME: &str = "MSSQL_USERNAME";

/// Environment default for the `password` attribute (SQL authentication).
pub const ENV_PASSWORD: &str = "MSSQL_PASSWORD";
