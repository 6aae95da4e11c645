use crate::error::ProvisionError;
use crate::taxonomy::{Environment, EnvironmentRecord, Taxonomy, BANK_ROLE};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use toml::map::Map;

pub const DEFAULT_CONFIG_PATH: &str = "configs/provision.toml";
pub const COMMON_CONFIG_PATH: &str = "configs/common.toml";

/// KMS caps `ListAliases` pages at 100 entries.
pub const MAX_LIST_PAGE_SIZE: i32 = 100;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvisionConfig {
    pub region: String,
    pub enabled_environments: Vec<Environment>,
    #[serde(default = "default_list_page_size")]
    pub list_page_size: i32,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Keyed by environment name; entries for disabled environments are kept
    /// but never read.
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentSettings>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EnvironmentSettings {
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_list_page_size() -> i32 {
    MAX_LIST_PAGE_SIZE
}

fn default_concurrency() -> usize {
    1
}

impl ProvisionConfig {
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with_common(path, COMMON_CONFIG_PATH)
    }

    pub fn load_with_common(path: &str, common_path: &str) -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let common_content = Self::load_common_config(common_path)?;
        let specific_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;

        // Specific values override common ones
        let merged_content = Self::merge_configs(common_content, specific_content)?;
        let content = Self::substitute_env_vars(merged_content)?;

        Self::from_toml_str(&content).with_context(|| format!("Invalid config file {}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ProvisionConfig = toml::from_str(content)?;
        Ok(config)
    }

    fn load_common_config(common_path: &str) -> Result<String> {
        match fs::read_to_string(common_path) {
            Ok(content) => Ok(content),
            // A missing common file means no shared defaults
            Err(_) => Ok(String::new()),
        }
    }

    fn merge_configs(common: String, specific: String) -> Result<String> {
        if common.is_empty() {
            return Ok(specific);
        }

        let common_toml: toml::Value = toml::from_str(&common)?;
        let specific_toml: toml::Value = toml::from_str(&specific)?;
        let merged = Self::merge_toml_values(common_toml, specific_toml);

        Ok(toml::to_string_pretty(&merged)?)
    }

    fn merge_toml_values(mut base: toml::Value, override_val: toml::Value) -> toml::Value {
        match (&mut base, override_val) {
            (toml::Value::Table(base_map), toml::Value::Table(override_map)) => {
                for (key, value) in override_map {
                    let merged = Self::merge_toml_values(
                        base_map.get(&key).cloned().unwrap_or(toml::Value::Table(Map::new())),
                        value,
                    );
                    base_map.insert(key, merged);
                }
                base
            }
            (_, override_val) => override_val,
        }
    }

    fn substitute_env_vars(content: String) -> Result<String> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")?;
        let mut result = content.clone();

        for cap in re.captures_iter(&content) {
            let var_name = &cap[1];
            if let Ok(value) = env::var(var_name) {
                result = result.replace(&cap[0], &value);
            }
        }

        Ok(result)
    }

    /// Command line values take precedence over the file.
    pub fn apply_overrides(
        &mut self,
        region: Option<String>,
        environments: Vec<Environment>,
        concurrency: Option<usize>,
    ) {
        if let Some(region) = region {
            self.region = region;
        }
        if !environments.is_empty() {
            self.enabled_environments = environments;
        }
        if let Some(concurrency) = concurrency {
            self.concurrency = concurrency;
        }
    }

    /// Validate the enabled part of the configuration and build the
    /// taxonomy. Runs before any KMS call is made.
    pub fn taxonomy(&self) -> Result<Taxonomy, ProvisionError> {
        if self.region.trim().is_empty() {
            return Err(ProvisionError::Configuration("region must not be empty".to_string()));
        }
        if self.enabled_environments.is_empty() {
            return Err(ProvisionError::Configuration(
                "enabled_environments must list at least one environment".to_string(),
            ));
        }

        // Every key in the table must name a known environment, even if disabled.
        for name in self.environments.keys() {
            name.parse::<Environment>().map_err(ProvisionError::Configuration)?;
        }

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(self.enabled_environments.len());
        for environment in &self.enabled_environments {
            if !seen.insert(*environment) {
                return Err(ProvisionError::Configuration(format!(
                    "environment '{}' is enabled more than once",
                    environment
                )));
            }

            let settings = self.environments.get(environment.as_str()).ok_or_else(|| {
                ProvisionError::Configuration(format!(
                    "environment '{}' is enabled but has no [environments.{}] entry",
                    environment, environment
                ))
            })?;

            validate_names(*environment, "network", &settings.networks)?;
            validate_names(*environment, "role", &settings.roles)?;
            if settings.roles.iter().any(|r| r == BANK_ROLE) {
                return Err(ProvisionError::Configuration(format!(
                    "environment '{}': role '{}' is reserved for the bank key",
                    environment, BANK_ROLE
                )));
            }

            records.push(EnvironmentRecord {
                environment: *environment,
                networks: settings.networks.clone(),
                roles: settings.roles.clone(),
            });
        }

        Ok(Taxonomy {
            region: self.region.clone(),
            environments: records,
        })
    }

    pub fn validate_runtime(&self) -> Result<(), ProvisionError> {
        if !(1..=MAX_LIST_PAGE_SIZE).contains(&self.list_page_size) {
            return Err(ProvisionError::Configuration(format!(
                "list_page_size must be between 1 and {}, got {}",
                MAX_LIST_PAGE_SIZE, self.list_page_size
            )));
        }
        if self.concurrency == 0 {
            return Err(ProvisionError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_names(
    environment: Environment,
    kind: &str,
    names: &[String],
) -> Result<(), ProvisionError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ProvisionError::Configuration(format!(
                "environment '{}': invalid {} name '{}'",
                environment, kind, name
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(ProvisionError::Configuration(format!(
                "environment '{}': duplicate {} '{}'",
                environment, kind, name
            )));
        }
    }
    Ok(())
}
