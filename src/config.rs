use std::env;
use std::fs;

/// Default token lifetime, in minutes, when `TOKEN_TTL_MINUTES` is not set.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Process-wide startup configuration.
///
/// Built exactly once by [`Config::from_env`] before any component
/// initializes. Nothing else in the crate reads the environment; the pool,
/// the token service, and the server binding are all derived from this
/// struct and passed down explicitly.
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub server_port: u16,
    pub server_host: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: resolve_database_url(),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            token_ttl_minutes: env::var("TOKEN_TTL_MINUTES")
                .ok()
                .map(|v| v.parse().expect("TOKEN_TTL_MINUTES must be a number"))
                .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

/// Resolves the database connection string from a prioritized list of
/// sources, first success wins:
///
/// 1. `DATABASE_URL`: the URL itself;
/// 2. `DATABASE_URL_FILE`: path to a mounted secret containing the URL;
/// 3. a local development default.
fn resolve_database_url() -> String {
    if let Ok(url) = env::var("DATABASE_URL") {
        return url;
    }
    if let Ok(path) = env::var("DATABASE_URL_FILE") {
        let contents = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read DATABASE_URL_FILE {}: {}", path, e));
        return contents.trim().to_string();
    }
    "postgres://localhost/donelist".to_string()
}
