//! Configuration resolution for the provider.
//!
//! The host hands each provider attribute over in one of three states:
//! not yet known (still pending evaluation on the host side), explicitly
//! null, or a concrete value. Resolution merges those attributes over
//! process environment defaults with a fixed precedence, then validates
//! completeness, accumulating every problem before failing so the user sees
//! the full diagnostic picture in a single pass.
//!
//! # Environment Variables
//!
//! - `MSSQL_SERVER`: default for the `server` attribute
//! - `MSSQL_DATABASE`: default for the `database` attribute
//! - `MSSQL_USERNAME`: default for the `username` attribute (SQL auth only)
//! - `MSSQL_PASSWORD`: default for the `password` attribute (SQL auth only)
//!
//! A concrete attribute value always wins over its environment default; a
//! null attribute falls back to the environment; an unknown attribute defers
//! the whole resolution.

use crate::constants::{ENV_DATABASE, ENV_PASSWORD, ENV_SERVER, ENV_USERNAME};
use crate::error::{ConfigErrors, FieldError};
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Tri-state attribute value as delivered by the host.
///
/// `Unknown` and `Null` are distinct on purpose: an unknown value means the
/// host has not evaluated the attribute yet and resolution must be deferred,
/// while null means the attribute was deliberately left unset and the
/// environment default applies. String emptiness is never used as a proxy
/// for either state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value<T> {
    /// Not yet determined by the host's evaluation.
    #[default]
    Unknown,
    /// Explicitly absent.
    Null,
    /// A concrete value.
    Known(T),
}

impl<T> Value<T> {
    /// Returns the concrete value, if there is one.
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl<T> From<T> for Value<T> {
    fn from(v: T) -> Self {
        Value::Known(v)
    }
}

/// Deserializes JSON `null` to [`Value::Null`] and anything else to
/// [`Value::Known`]. Combined with `#[serde(default)]` on the raw config
/// fields, an attribute missing from the payload entirely comes out as
/// [`Value::Unknown`].
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|opt| match opt {
            Some(v) => Value::Known(v),
            None => Value::Null,
        })
    }
}

/// Raw attributes of the managed-identity provider variant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagedIdentityRawConfig {
    /// SQL Server hostname, `host:port`, or `host,port`.
    #[serde(default)]
    pub server: Value<String>,

    /// Database to connect to.
    #[serde(default)]
    pub database: Value<String>,

    /// Authenticate with an Azure managed identity token.
    #[serde(default)]
    pub use_managed_identity: Value<bool>,
}

/// Raw attributes of the SQL-authentication provider variant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqlAuthRawConfig {
    /// SQL Server hostname, `host:port`, or `host,port`.
    #[serde(default)]
    pub server: Value<String>,

    /// Database to connect to.
    #[serde(default)]
    pub database: Value<String>,

    /// SQL login name.
    #[serde(default)]
    pub username: Value<String>,

    /// SQL login password (sensitive; never logged).
    #[serde(default)]
    pub password: Value<String>,
}

/// Snapshot of the process environment defaults, read once per resolution.
///
/// Unset variables read as empty strings; emptiness is only meaningful
/// *after* the merge, where it turns into a `Missing` field error.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentDefaults {
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl EnvironmentDefaults {
    /// Read the `MSSQL_*` defaults from the process environment.
    pub fn from_env() -> Self {
        Self {
            server: std::env::var(ENV_SERVER).unwrap_or_default(),
            database: std::env::var(ENV_DATABASE).unwrap_or_default(),
            username: std::env::var(ENV_USERNAME).unwrap_or_default(),
            password: std::env::var(ENV_PASSWORD).unwrap_or_default(),
        }
    }
}

/// Fully resolved managed-identity configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedIdentityConfig {
    pub server: String,
    pub database: String,
    pub use_managed_identity: bool,
}

/// Fully resolved SQL-authentication configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlAuthConfig {
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

/// Merge one field: environment default first, then the raw value on top
/// when it is concrete. Reads from exactly one logical field; the caller
/// pairs a raw field with its own environment default and nothing else.
fn resolve_field(
    field: &'static str,
    raw: &Value<String>,
    env_default: &str,
    errors: &mut Vec<FieldError>,
) -> String {
    let value = match raw {
        Value::Unknown => {
            errors.push(FieldError::unknown(field));
            return String::new();
        }
        Value::Null => env_default.to_string(),
        Value::Known(v) => v.clone(),
    };

    if value.is_empty() {
        errors.push(FieldError::missing(field));
    }
    value
}

impl ManagedIdentityRawConfig {
    /// Resolve `{server, database}` plus the authentication flag.
    ///
    /// All field errors are accumulated; any error fails the resolution as
    /// a whole and no resolved config is returned.
    pub fn resolve(
        &self,
        env: &EnvironmentDefaults,
    ) -> Result<ManagedIdentityConfig, ConfigErrors> {
        let mut errors = Vec::new();

        let server = resolve_field("server", &self.server, &env.server, &mut errors);
        let database = resolve_field("database", &self.database, &env.database, &mut errors);

        // The flag carries no environment default: null means "not requested".
        let use_managed_identity = match &self.use_managed_identity {
            Value::Unknown => {
                errors.push(FieldError::unknown("use_managed_identity"));
                false
            }
            Value::Null => false,
            Value::Known(b) => *b,
        };

        if !errors.is_empty() {
            return Err(ConfigErrors::new(errors));
        }

        debug!(server = %server, database = %database, "resolved managed-identity configuration");
        Ok(ManagedIdentityConfig {
            server,
            database,
            use_managed_identity,
        })
    }
}

impl SqlAuthRawConfig {
    /// Resolve `{server, database, username, password}`.
    ///
    /// All field errors are accumulated; any error fails the resolution as
    /// a whole and no resolved config is returned.
    pub fn resolve(&self, env: &EnvironmentDefaults) -> Result<SqlAuthConfig, ConfigErrors> {
        let mut errors = Vec::new();

        let server = resolve_field("server", &self.server, &env.server, &mut errors);
        let database = resolve_field("database", &self.database, &env.database, &mut errors);
        let username = resolve_field("username", &self.username, &env.username, &mut errors);
        let password = resolve_field("password", &self.password, &env.password, &mut errors);

        if !errors.is_empty() {
            return Err(ConfigErrors::new(errors));
        }

        debug!(server = %server, database = %database, username = %username, "resolved sql-auth configuration");
        Ok(SqlAuthConfig {
            server,
            database,
            username,
            password,
        })
    }
}
