//! The provider configure pipeline.
//!
//! Ties the stages together: resolve configuration against environment
//! defaults, acquire a managed identity token when that variant asks for
//! one, open the connection eagerly, and hand out query resources that
//! share the opened handle. Each stage fails the single configure call it
//! belongs to; nothing here is fatal to the process.

use crate::config::{EnvironmentDefaults, ManagedIdentityRawConfig, SqlAuthRawConfig};
use crate::database::{self, SharedConnection};
use crate::error::ProviderError;
use crate::identity::ImdsCredentialSource;
use crate::resource::QueryResource;
use tracing::info;

/// Raw configuration for one of the two provider variants.
///
/// The host picks exactly one coherent variant; the two are never mixed
/// within a single configure call.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    /// Azure managed identity authentication.
    ManagedIdentity(ManagedIdentityRawConfig),
    /// SQL Server username/password authentication.
    SqlAuth(SqlAuthRawConfig),
}

/// A configured provider owning a shared connection handle.
pub struct MssqlProvider {
    connection: SharedConnection,
}

/// The raw driver handle is not `Debug`; render the provider by name and
/// elide it.
impl std::fmt::Debug for MssqlProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlProvider").finish_non_exhaustive()
    }
}

impl MssqlProvider {
    /// Run the full configure pipeline with the well-known metadata
    /// endpoint as the credential source.
    pub async fn configure(
        raw: ProviderConfig,
        env: &EnvironmentDefaults,
    ) -> Result<Self, ProviderError> {
        Self::configure_with(raw, env, &ImdsCredentialSource::new()).await
    }

    /// Run the full configure pipeline with an injected credential source.
    ///
    /// Resolution runs first and reports every field problem in one pass;
    /// nothing reaches the network until it succeeds. For the managed
    /// identity variant the token is fetched fresh per configure call: it
    /// is short-lived and never cached.
    pub async fn configure_with(
        raw: ProviderConfig,
        env: &EnvironmentDefaults,
        credentials: &ImdsCredentialSource,
    ) -> Result<Self, ProviderError> {
        let connection = match raw {
            ProviderConfig::ManagedIdentity(raw) => {
                let cfg = raw.resolve(env)?;
                // Refuse before touching the metadata endpoint.
                database::ensure_managed_identity(&cfg)?;

                let token = credentials.fetch_token().await?;
                let descriptor = database::managed_identity_descriptor(&cfg, &token)?;
                database::open(descriptor).await?
            }
            ProviderConfig::SqlAuth(raw) => {
                let cfg = raw.resolve(env)?;
                let descriptor = database::sql_auth_descriptor(&cfg);
                database::open(descriptor).await?
            }
        };

        info!("provider configured");
        Ok(Self { connection })
    }

    /// The shared connection handle.
    pub fn connection(&self) -> SharedConnection {
        self.connection.clone()
    }

    /// A query resource sharing this provider's connection.
    pub fn query_resource(&self) -> QueryResource {
        QueryResource::new(self.connection.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Value;
    use crate::error::{FieldError, ProviderError};

    fn unreachable_credentials() -> ImdsCredentialSource {
        // TEST-NET-1: any fetch against it is a test failure in disguise,
        // the pipeline must error out before getting here.
        ImdsCredentialSource::with_endpoint("http://192.0.2.1/metadata/identity/oauth2/token")
    }

    #[test]
    fn provider_satisfies_debug_for_result_assertions() {
        // `unwrap_err` on `Result<MssqlProvider, _>` needs this bound.
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_debug::<MssqlProvider>();
    }

    #[tokio::test]
    async fn resolution_failure_never_reaches_the_network() {
        let raw = ProviderConfig::ManagedIdentity(ManagedIdentityRawConfig {
            server: Value::Null,
            database: Value::Null,
            use_managed_identity: Value::Known(true),
        });

        let err = MssqlProvider::configure_with(
            raw,
            &EnvironmentDefaults::default(),
            &unreachable_credentials(),
        )
        .await
        .unwrap_err();

        match err {
            ProviderError::Config(errors) => {
                assert_eq!(
                    errors.errors(),
                    &[FieldError::missing("server"), FieldError::missing("database")]
                );
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_managed_identity_fails_before_token_fetch() {
        let raw = ProviderConfig::ManagedIdentity(ManagedIdentityRawConfig {
            server: Value::Known("example.database.windows.net".into()),
            database: Value::Known("appdb".into()),
            use_managed_identity: Value::Known(false),
        });

        let err = MssqlProvider::configure_with(
            raw,
            &EnvironmentDefaults::default(),
            &unreachable_credentials(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProviderError::UnsupportedAuth(_)));
    }

    #[tokio::test]
    async fn sql_auth_resolution_errors_aggregate() {
        let raw = ProviderConfig::SqlAuth(SqlAuthRawConfig::default());

        let err = MssqlProvider::configure_with(
            raw,
            &EnvironmentDefaults::default(),
            &unreachable_credentials(),
        )
        .await
        .unwrap_err();

        match err {
            ProviderError::Config(errors) => {
                // Default raw config is all-unknown: every field defers.
                assert_eq!(errors.len(), 4);
                assert!(errors.has_unknown());
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }
}
