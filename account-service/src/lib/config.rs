use std::env;
use std::fmt;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use config::Map;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

/// Flat variable names used by existing deployments, mapped onto config keys.
const LEGACY_VARIABLES: [(&str, &str); 6] = [
    ("PORT", "server.http_port"),
    ("DB_HOST", "database.host"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
    ("JWT_SECRET", "jwt.secret"),
];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub api: ApiConfig,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the discrete fields
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

#[derive(Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_seconds: i64,
}

/// Argon2id work factor
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Answer "Invalid credentials" for unknown emails too
    pub uniform_login_errors: bool,
    /// Include the stored hash in the registration response
    pub expose_password_hash: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            uniform_login_errors: false,
            expose_password_hash: true,
        }
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Legacy flat variables (PORT, DB_HOST, DB_USER, DB_PASSWORD, DB_NAME, JWT_SECRET)
    /// 2. Environment variables (ACCOUNT__JWT__SECRET, ACCOUNT__SERVER__HTTP_PORT, etc.)
    /// 3. Environment-specific config file (config/{environment}.toml)
    /// 4. Default config file (config/default.toml)
    /// 5. Built-in defaults
    ///
    /// Variables in a `.env` file are read as if they were part of the
    /// environment; the real process environment wins on conflicts.
    pub fn load() -> Result<Self, ConfigError> {
        let env_file = dotenv::dotenv_iter().into_iter().flatten();
        let variables = layered_variables(env_file, env::vars());
        let run_mode = variables
            .get("RUN_MODE")
            .cloned()
            .unwrap_or_else(|| "development".to_string());
        Self::load_from(&run_mode, variables)
    }

    /// Load configuration using `variables` in place of the process environment.
    pub fn load_from(run_mode: &str, variables: Map<String, String>) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.http_port", 3000_i64)?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432_i64)?
            .set_default("database.user", "postgres")?
            .set_default("database.password", "")?
            .set_default("database.name", "users")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("jwt.expiration_seconds", auth::TokenService::DEFAULT_TTL_SECONDS)?
            .set_default("password.memory_kib", i64::from(auth::WorkFactor::default().memory_kib))?
            .set_default("password.iterations", i64::from(auth::WorkFactor::default().iterations))?
            .set_default("password.parallelism", i64::from(auth::WorkFactor::default().parallelism))?
            .set_default("api.uniform_login_errors", false)?
            .set_default("api.expose_password_hash", true)?
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: ACCOUNT__DATABASE__HOST=db overrides database.host
            .add_source(
                Environment::with_prefix("ACCOUNT")
                    .prefix_separator("__")
                    .separator("__")
                    .source(Some(variables.clone())),
            );

        let builder = LEGACY_VARIABLES
            .iter()
            .try_fold(builder, |builder, (variable, key)| {
                builder.set_override_option(*key, variables.get(*variable).cloned())
            })?;

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values that would leave the service unable to authenticate anyone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "jwt.secret must be set to a non-empty value".to_string(),
            ));
        }

        if self.jwt.expiration_seconds <= 0 {
            return Err(ConfigError::Message(
                "jwt.expiration_seconds must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Overlay the process environment on `.env` entries.
///
/// Lines of the file that fail to parse are skipped with a warning.
fn layered_variables<F, P>(env_file: F, process: P) -> Map<String, String>
where
    F: IntoIterator<Item = dotenv::Result<(String, String)>>,
    P: IntoIterator<Item = (String, String)>,
{
    let mut variables: Map<String, String> = env_file
        .into_iter()
        .filter_map(|entry| {
            entry
                .map_err(|e| tracing::warn!(error = %e, "Skipping malformed .env entry"))
                .ok()
        })
        .collect();
    variables.extend(process);
    variables
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match &self.url {
            Some(url) => url.parse(),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.name)),
        }
    }
}

impl PasswordConfig {
    pub fn work_factor(&self) -> auth::WorkFactor {
        auth::WorkFactor {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_seconds", &self.expiration_seconds)
            .finish()
    }
}
