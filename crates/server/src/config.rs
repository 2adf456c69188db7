// Server configuration.
//
// Every setting the session core depends on (signing secret, access token
// ceiling, platform flag, webhook key) is read here once and passed down
// explicitly; nothing below `main` touches the environment.

use std::net::SocketAddr;

const DEV_JWT_SECRET: &str = "chirpy_local_development_jwt_secret_must_be_32_chars";
const DEFAULT_ACCESS_TTL_CEILING_SECS: i64 = 3600;

/// Deployment platform. Destructive admin routes refuse to run outside `Dev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Dev,
    Production,
}

impl Platform {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("dev") {
            Self::Dev
        } else {
            Self::Production
        }
    }
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Core server configuration.
///
/// Constructed via [`ServerConfig::from_env`] which reads environment
/// variables and falls back to development defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (host:port).
    pub listen_addr: SocketAddr,
    /// HMAC secret for access tokens.
    pub jwt_secret: String,
    /// Upper bound for access token lifetimes, in seconds.
    pub access_ttl_ceiling_secs: i64,
    /// PostgreSQL connection string. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Shared secret the payment provider presents in `X-Api-Key`.
    pub polka_key: Option<String>,
    pub platform: Platform,
    /// Log filter directive (e.g. `info`, `chirpy_server=debug`).
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Parse configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `CHIRPY_HOST` | `0.0.0.0` |
    /// | `CHIRPY_PORT` | `8080` |
    /// | `CHIRPY_JWT_SECRET` | dev-only placeholder |
    /// | `CHIRPY_ACCESS_TTL_CEILING_SECS` | `3600` |
    /// | `CHIRPY_DATABASE_URL` | *(none, in-memory store)* |
    /// | `CHIRPY_POLKA_KEY` | *(none, webhook rejects every call)* |
    /// | `CHIRPY_PLATFORM` | `production` |
    /// | `CHIRPY_LOG_FILTER` | `info` |
    /// | `CHIRPY_LOG_FORMAT` | `text` |
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| std::env::var(key))
    }

    /// Testable constructor that accepts an environment lookup function.
    pub(crate) fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let non_empty = |key: &str| env(key).ok().filter(|value| !value.trim().is_empty());

        let host = non_empty("CHIRPY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = non_empty("CHIRPY_PORT").and_then(|v| v.parse().ok()).unwrap_or(8080);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

        let jwt_secret = non_empty("CHIRPY_JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.into());

        let access_ttl_ceiling_secs = non_empty("CHIRPY_ACCESS_TTL_CEILING_SECS")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_ACCESS_TTL_CEILING_SECS);

        let platform =
            non_empty("CHIRPY_PLATFORM").map(|v| Platform::parse(&v)).unwrap_or(Platform::Production);

        let log_format = match non_empty("CHIRPY_LOG_FORMAT") {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            listen_addr,
            jwt_secret,
            access_ttl_ceiling_secs,
            database_url: non_empty("CHIRPY_DATABASE_URL"),
            polka_key: non_empty("CHIRPY_POLKA_KEY"),
            platform,
            log_filter: non_empty("CHIRPY_LOG_FILTER").unwrap_or_else(|| "info".into()),
            log_format,
        }
    }

    /// Returns true when using the development-only JWT secret.
    pub fn is_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn is_dev(&self) -> bool {
        self.platform == Platform::Dev
    }
}
