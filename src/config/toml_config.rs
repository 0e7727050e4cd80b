use crate::config::DictConfig;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::ConfigError;
use crate::utils::validation::{validate_non_empty_string, validate_one_of, validate_url, Validate};
use regex::Regex;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "PACKAGETRACK_CONFIG";
const DEFAULT_FILE_NAME: &str = ".packagetrack.toml";

/// Carrier credentials read from a TOML file, one table per carrier:
///
/// ```toml
/// [UPS]
/// license_number = "XXXXXXXXXXXXXXXX"
/// user_id = "XXXX"
/// password = "${UPS_PASSWORD}"
///
/// [USPS]
/// userid = "XXXXXXXXXXXX"
/// ```
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: Option<PathBuf>,
    values: DictConfig,
}

impl FileConfig {
    /// `$PACKAGETRACK_CONFIG`, else `~/.packagetrack.toml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_FILE_NAME))
    }

    /// Loads the default file if it exists.
    pub fn load_default() -> Result<Option<Self>, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path).map(Some),
            _ => Ok(None),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.path = Some(path.as_ref().to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let processed = Self::substitute_env_vars(content)?;
        let table: toml::Table = toml::from_str(&processed).map_err(|e| ConfigError::Parse {
            message: format!("TOML parsing error: {}", e),
        })?;
        Ok(Self {
            path: None,
            values: DictConfig::from_table(table),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn optional(&self, namespace: &str, key: &str) -> Option<String> {
        self.values.get_value(namespace, &[key]).ok()
    }
}

impl ConfigProvider for FileConfig {
    fn get_value(&self, namespace: &str, keys: &[&str]) -> Result<String, ConfigError> {
        self.values.get_value(namespace, keys)
    }
}

impl Validate for FileConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for namespace in self.values.table().keys() {
            if let Some(url) = self.optional(namespace, "api_url") {
                validate_url(&format!("{}.api_url", namespace), &url)?;
            }
        }

        if let Some(server) = self.optional("USPS", "server") {
            validate_one_of(
                "USPS.server",
                &server,
                &["production", "test", "secure", "secure_test"],
            )?;
        }
        if let Some(server) = self.optional("DHL", "server") {
            validate_one_of("DHL.server", &server, &["production", "test"])?;
        }
        if let Some(site_id) = self.optional("DHL", "site_id") {
            validate_non_empty_string("DHL.site_id", &site_id)?;
        }

        Ok(())
    }
}
