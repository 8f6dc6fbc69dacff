use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

#[derive(Debug)]
pub struct ToolConfig {
    pub env: Env,
    pub database_url: String,
    pub max_connections: usize,
}

const DEFAULT_MAX_CONNECTIONS: usize = 1;

fn var(key: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(std::env::VarError::NotPresent) => {
            tracing::debug!("Missing environment variable `{key}`");
            Ok(None)
        }
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key)),
    }
}

fn required_var(key: &'static str) -> Result<String, ConfigError> {
    var(key)?.ok_or(ConfigError::Missing(key))
}

impl ToolConfig {
    /// Reads the configuration from the process environment. A database URL
    /// given on the command line wins over `DATABASE_URL`.
    pub fn new_from_env(database_url: Option<String>) -> Result<Self, ConfigError> {
        let database_url = match database_url {
            Some(url) => url,
            None => required_var("DATABASE_URL")?,
        };

        let max_connections = parse_max_connections(var("DATABASE_MAX_CONNECTIONS")?)?;

        Ok(ToolConfig {
            env: parse_env(var("ENVIRONMENT")?.as_deref()),
            database_url,
            max_connections,
        })
    }
}

fn parse_max_connections(value: Option<String>) -> Result<usize, ConfigError> {
    match value {
        None => Ok(DEFAULT_MAX_CONNECTIONS),
        Some(value) => match value.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                value,
            }),
        },
    }
}

fn parse_env(value: Option<&str>) -> Env {
    match value {
        Some("staging") => Env::Staging,
        Some("production") => Env::Production,
        Some("dev") | None => Env::Dev,
        Some(other) => {
            tracing::warn!("Unknown ENVIRONMENT `{other}`, falling back to dev");
            Env::Dev
        }
    }
}
