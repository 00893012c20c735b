use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Environment prefix for overrides, e.g. `DATADICT__HTTP__PORT=9000`.
pub const ENV_PREFIX: &str = "DATADICT";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RelayConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub credentials: CredentialConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Names of the environment variables holding the API key. The key itself
/// never lives in the config; it is looked up per request.
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialConfig {
    pub primary_var: String,
    pub fallback_var: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            primary_var: "GEMINI_API_KEY".to_string(),
            fallback_var: "API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Permit any origin, method and header. Not suitable for production.
    pub allow_any_origin: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_any_origin: true,
        }
    }
}

impl RelayConfig {
    /// Load from an optional TOML file, then apply `DATADICT__*` overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = RelayConfig::load("does-not-exist-datadict.toml").unwrap();
        assert_eq!(config.http.port, 8000);
        assert_eq!(config.gateway.model, "gemini-2.0-flash-exp");
        assert_eq!(config.credentials.primary_var, "GEMINI_API_KEY");
        assert_eq!(config.credentials.fallback_var, "API_KEY");
        assert!(config.cors.allow_any_origin);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: RelayConfig = Config::builder()
            .add_source(config::File::from_str(
                "[gateway]\nbase_url = \"http://localhost:1234\"\nmodel = \"gemini-test\"\ntimeout_seconds = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.gateway.model, "gemini-test");
        assert_eq!(config.gateway.timeout_seconds, 5);
        assert_eq!(config.http.host, "0.0.0.0");
    }
}
