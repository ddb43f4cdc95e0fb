//! Environment-backed configuration, loaded once at startup.

use crate::error::ConfigError;

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            addr: "0.0.0.0:3000".into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CorsConfig {
    /// Empty means any origin (credentials disabled in that case).
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Clone, Debug, Default)]
pub struct BrokerConfig {
    pub url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub cors: CorsConfig,
    pub broker: Option<BrokerConfig>,
}

impl AppConfig {
    /// Read configuration from the environment (a `.env` file is honored).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = AppConfig::default();
        if let Ok(addr) = std::env::var("MODELGATE_HTTP_ADDR") {
            config.http.addr = addr;
        }
        if let Ok(origins) = std::env::var("MODELGATE_CORS_ORIGINS") {
            config.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(raw) = std::env::var("MODELGATE_CORS_CREDENTIALS") {
            config.cors.allow_credentials = parse_bool("MODELGATE_CORS_CREDENTIALS", &raw)?;
        }
        if let Ok(url) = std::env::var("MODELGATE_BROKER_URL") {
            config.broker = Some(BrokerConfig {
                url,
                client_id: std::env::var("MODELGATE_BROKER_CLIENT_ID")
                    .unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string()),
                username: std::env::var("MODELGATE_BROKER_USERNAME").ok(),
                password: std::env::var("MODELGATE_BROKER_PASSWORD").ok(),
            });
        }
        Ok(config)
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            message: format!("expected a boolean, got '{raw}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("K", "true").unwrap());
        assert!(parse_bool("K", "1").unwrap());
        assert!(!parse_bool("K", "No").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
    }
}
