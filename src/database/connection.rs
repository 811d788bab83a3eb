//! Connection establishment for SQL Server.
//!
//! Builds a driver-level connection descriptor from resolved configuration
//! and opens the session eagerly (TCP connect + TDS handshake) under a
//! bounded timeout. The opened handle is reference-counted and
//! mutex-guarded, never a process-wide singleton, so independent handles
//! can be injected per test case. The mutex serializes statement execution;
//! callers needing concurrent execution open independent handles.

use crate::config::{ManagedIdentityConfig, SqlAuthConfig};
use crate::constants::{APPLICATION_NAME, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SQL_PORT};
use crate::error::ProviderError;
use crate::identity::AccessToken;
use std::sync::Arc;
use std::time::Duration;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

/// A raw tiberius connection.
pub type RawConnection = Client<Compat<TcpStream>>;

/// Shared, reference-counted connection handle.
pub type SharedConnection = Arc<Mutex<RawConnection>>;

/// Split a `server` attribute into host and port.
///
/// Accepts `host`, `host:port`, and SQL Server's own `host,port` notation;
/// unparseable or absent ports fall back to 1433.
fn parse_server(server: &str) -> (String, u16) {
    for sep in [',', ':'] {
        if let Some((host, port)) = server.rsplit_once(sep) {
            if let Ok(port) = port.trim().parse() {
                return (host.trim().to_string(), port);
            }
        }
    }
    (server.trim().to_string(), DEFAULT_SQL_PORT)
}

/// Refuse configurations that do not opt into managed identity.
///
/// This variant has no fallback authentication path by design, regardless
/// of what the other fields hold. Both the descriptor builder and the
/// configure pipeline's pre-check (before any token fetch) go through this
/// single gate.
pub fn ensure_managed_identity(cfg: &ManagedIdentityConfig) -> Result<(), ProviderError> {
    if cfg.use_managed_identity {
        Ok(())
    } else {
        Err(ProviderError::unsupported_auth(
            "only managed identity authentication is supported by this variant; \
             set use_managed_identity = true",
        ))
    }
}

/// Build the driver descriptor for the managed-identity variant.
///
/// Fails with [`ProviderError::UnsupportedAuth`] when the flag is false.
pub fn managed_identity_descriptor(
    cfg: &ManagedIdentityConfig,
    token: &AccessToken,
) -> Result<Config, ProviderError> {
    ensure_managed_identity(cfg)?;

    let (host, port) = parse_server(&cfg.server);

    let mut config = Config::new();
    config.host(&host);
    config.port(port);
    config.database(&cfg.database);
    config.authentication(AuthMethod::aad_token(token.secret()));
    // Azure SQL always speaks TLS.
    config.encryption(EncryptionLevel::Required);
    config.trust_cert();
    config.application_name(APPLICATION_NAME);
    Ok(config)
}

/// Build the driver descriptor for the SQL-authentication variant.
pub fn sql_auth_descriptor(cfg: &SqlAuthConfig) -> Config {
    let (host, port) = parse_server(&cfg.server);

    let mut config = Config::new();
    config.host(&host);
    config.port(port);
    config.database(&cfg.database);
    config.authentication(AuthMethod::sql_server(&cfg.username, &cfg.password));
    config.trust_cert();
    config.application_name(APPLICATION_NAME);
    config
}

/// Open a connection eagerly from a built descriptor.
pub async fn open(config: Config) -> Result<SharedConnection, ProviderError> {
    open_with_timeout(config, DEFAULT_CONNECT_TIMEOUT).await
}

/// Open a connection eagerly, bounded by `connect_timeout`.
pub async fn open_with_timeout(
    config: Config,
    connect_timeout: Duration,
) -> Result<SharedConnection, ProviderError> {
    let addr = config.get_addr();
    debug!(%addr, "opening connection");

    let client = timeout(connect_timeout, async {
        let tcp = TcpStream::connect(&addr).await.map_err(|e| {
            ProviderError::connection_with_source(format!("failed to connect to {addr}"), e)
        })?;

        tcp.set_nodelay(true).map_err(|e| {
            ProviderError::connection_with_source("failed to set TCP_NODELAY", e)
        })?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| {
                ProviderError::connection_with_source("failed to connect to SQL Server", e)
            })
    })
    .await
    .map_err(|_| ProviderError::timeout(connect_timeout.as_secs()))??;

    info!(%addr, "connection established");
    Ok(Arc::new(Mutex::new(client)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mi_config(flag: bool) -> ManagedIdentityConfig {
        ManagedIdentityConfig {
            server: "example.database.windows.net".into(),
            database: "appdb".into(),
            use_managed_identity: flag,
        }
    }

    #[test]
    fn parse_server_plain_host() {
        assert_eq!(parse_server("db.example.com"), ("db.example.com".into(), 1433));
    }

    #[test]
    fn parse_server_with_colon_port() {
        assert_eq!(parse_server("db.example.com:1533"), ("db.example.com".into(), 1533));
    }

    #[test]
    fn parse_server_with_comma_port() {
        // SQL Server notation as used in connection strings.
        assert_eq!(parse_server("db.example.com,14330"), ("db.example.com".into(), 14330));
    }

    #[test]
    fn parse_server_bad_port_falls_back() {
        assert_eq!(parse_server("db.example.com:abc"), ("db.example.com:abc".into(), 1433));
    }

    #[test]
    fn managed_identity_gate_names_the_flag() {
        assert!(ensure_managed_identity(&mi_config(true)).is_ok());

        let err = ensure_managed_identity(&mi_config(false)).unwrap_err();
        assert!(err.to_string().contains("use_managed_identity"));
    }

    #[test]
    fn managed_identity_disabled_is_unsupported_auth() {
        let err =
            managed_identity_descriptor(&mi_config(false), &AccessToken::new("tok")).unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedAuth(_)));
    }

    #[test]
    fn managed_identity_enabled_builds_descriptor() {
        let config =
            managed_identity_descriptor(&mi_config(true), &AccessToken::new("tok")).unwrap();
        assert_eq!(config.get_addr(), "example.database.windows.net:1433");
    }

    #[test]
    fn sql_auth_builds_descriptor() {
        let config = sql_auth_descriptor(&SqlAuthConfig {
            server: "localhost,1434".into(),
            database: "master".into(),
            username: "sa".into(),
            password: "p".into(),
        });
        assert_eq!(config.get_addr(), "localhost:1434");
    }

    #[tokio::test]
    async fn open_against_unroutable_address_fails_bounded() {
        let mut config = Config::new();
        // TEST-NET-1 address: connect attempts fail or hang, never succeed.
        config.host("192.0.2.1");
        config.port(1433);
        config.authentication(AuthMethod::sql_server("sa", "p"));

        let err = open_with_timeout(config, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ConnectionOpen { .. } | ProviderError::Timeout { .. }
        ));
    }
}
