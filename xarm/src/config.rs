//! Resource manager configuration types and builders.

use std::time::Duration;

use xarm_core::{Result, XarmError};

/// Default transaction timeout applied when a session was never given an
/// explicit one.
const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(120);
/// Default resource manager name, used as a log field.
const DEFAULT_NAME: &str = "xarm";

/// Configuration for a [`ResourceManager`](crate::manager::ResourceManager).
#[derive(Debug, Clone)]
pub struct ResourceManagerConfig {
    name: String,
    default_transaction_timeout: Duration,
}

impl ResourceManagerConfig {
    /// Returns a configuration builder.
    pub fn builder() -> ResourceManagerConfigBuilder {
        ResourceManagerConfigBuilder::new()
    }

    /// Returns the resource manager name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the default transaction timeout.
    pub fn default_transaction_timeout(&self) -> Duration {
        self.default_transaction_timeout
    }
}

impl Default for ResourceManagerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            default_transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }
}

/// Builder for [`ResourceManagerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ResourceManagerConfigBuilder {
    name: Option<String>,
    default_transaction_timeout: Option<Duration>,
}

impl ResourceManagerConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource manager name used in log output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the default transaction timeout.
    pub fn default_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.default_transaction_timeout = Some(timeout);
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<ResourceManagerConfig> {
        let defaults = ResourceManagerConfig::default();
        let timeout = self
            .default_transaction_timeout
            .unwrap_or(defaults.default_transaction_timeout);
        if timeout.is_zero() {
            return Err(XarmError::IllegalState(
                "default transaction timeout must be greater than zero".to_string(),
            ));
        }
        Ok(ResourceManagerConfig {
            name: self.name.unwrap_or(defaults.name),
            default_transaction_timeout: timeout,
        })
    }
}
