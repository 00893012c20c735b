//! API key resolution.
//!
//! The key is looked up on every request through a [`CredentialSource`], so a
//! rotated key takes effect without a restart and tests can inject fixtures
//! without touching the process environment.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::CredentialConfig;
use crate::error::RelayError;

/// Somewhere a named secret can be read from.
pub trait CredentialSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads the process environment at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of values.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn lookup(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// A resolved API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Clone)]
pub struct CredentialResolver {
    source: Arc<dyn CredentialSource>,
    config: CredentialConfig,
}

impl CredentialResolver {
    pub fn new(source: Arc<dyn CredentialSource>, config: CredentialConfig) -> Self {
        Self { source, config }
    }

    /// Resolver over the process environment with the default variable names.
    pub fn from_env() -> Self {
        Self::new(Arc::new(EnvCredentials), CredentialConfig::default())
    }

    /// Primary variable first, then the fallback. Empty values count as unset.
    pub fn resolve(&self) -> Result<ApiKey, RelayError> {
        [&self.config.primary_var, &self.config.fallback_var]
            .into_iter()
            .filter_map(|name| self.source.lookup(name))
            .find(|value| !value.is_empty())
            .map(ApiKey)
            .ok_or(RelayError::Configuration)
    }

    pub fn is_configured(&self) -> bool {
        self.resolve().is_ok()
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
