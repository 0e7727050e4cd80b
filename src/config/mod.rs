#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::ConfigError;
use std::sync::Arc;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::FileConfig;

/// Provides no values at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConfig;

impl ConfigProvider for NullConfig {
    fn get_value(&self, namespace: &str, keys: &[&str]) -> Result<String, ConfigError> {
        Err(ConfigError::key_not_found(namespace, keys))
    }
}

/// In-memory nested table, namespace first.
#[derive(Debug, Clone, Default)]
pub struct DictConfig {
    table: toml::Table,
}

impl DictConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: toml::Table) -> Self {
        Self { table }
    }

    pub fn with_value(mut self, namespace: &str, key: &str, value: impl Into<String>) -> Self {
        let section = self
            .table
            .entry(namespace.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(section) = section {
            section.insert(key.to_string(), toml::Value::String(value.into()));
        }
        self
    }

    pub fn table(&self) -> &toml::Table {
        &self.table
    }
}

impl ConfigProvider for DictConfig {
    fn get_value(&self, namespace: &str, keys: &[&str]) -> Result<String, ConfigError> {
        let missing = || ConfigError::key_not_found(namespace, keys);

        let mut node = self.table.get(namespace).ok_or_else(missing)?;
        for key in keys {
            node = node.get(*key).ok_or_else(missing)?;
        }
        match node {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Float(f) => Ok(f.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => Err(missing()),
        }
    }
}

/// One carrier's view of configuration: the user's provider first, then
/// the carrier's built-in defaults.
#[derive(Clone)]
pub struct CarrierConfig {
    namespace: &'static str,
    provider: Arc<dyn ConfigProvider>,
    defaults: DictConfig,
}

impl CarrierConfig {
    pub fn new(namespace: &'static str, provider: Arc<dyn ConfigProvider>, defaults: DictConfig) -> Self {
        Self {
            namespace,
            provider,
            defaults,
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Falls back to the defaults; if neither has the key, the user
    /// provider's error is returned.
    pub fn value(&self, key: &str) -> Result<String, ConfigError> {
        self.provider
            .get_value(self.namespace, &[key])
            .or_else(|err| {
                self.defaults
                    .get_value(self.namespace, &[key])
                    .map_err(|_| err)
            })
    }

    /// Like [`value`](Self::value), but an absent key is `None`.
    pub fn optional_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.value(key) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::KeyNotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
