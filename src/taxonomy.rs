use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role name reserved for the per-environment bank key.
pub const BANK_ROLE: &str = "bank";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment '{}' (expected development, staging or production)",
                other
            )),
        }
    }
}

/// One required key, independent of whether it exists in KMS yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyIdentity {
    pub environment: Environment,
    pub network: Option<String>,
    pub role: String,
}

impl KeyIdentity {
    pub fn bank(environment: Environment) -> Self {
        Self {
            environment,
            network: None,
            role: BANK_ROLE.to_string(),
        }
    }

    pub fn agent(environment: Environment, network: &str, role: &str) -> Self {
        Self {
            environment,
            network: Some(network.to_string()),
            role: role.to_string(),
        }
    }

    /// `{environment}[-{network}]-{role}`
    pub fn name(&self) -> String {
        match &self.network {
            Some(network) => format!("{}-{}-{}", self.environment, network, self.role),
            None => format!("{}-{}", self.environment, self.role),
        }
    }

    pub fn alias(&self) -> String {
        format!("alias/{}", self.name())
    }

    pub fn description(&self) -> String {
        match &self.network {
            Some(network) => format!("{} {} {}", self.environment, network, self.role),
            None => format!("{} {}", self.environment, self.role),
        }
    }
}

/// Networks and roles required for one enabled environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRecord {
    pub environment: Environment,
    pub networks: Vec<String>,
    pub roles: Vec<String>,
}

/// Validated, ordered description of every key a run must provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    pub region: String,
    pub environments: Vec<EnvironmentRecord>,
}

impl Taxonomy {
    /// Every identity in provisioning order: per environment the bank key
    /// first, then each network crossed with each role.
    pub fn identities(&self) -> Vec<KeyIdentity> {
        let mut identities = Vec::with_capacity(self.key_count());
        for record in &self.environments {
            identities.push(KeyIdentity::bank(record.environment));
            for network in &record.networks {
                for role in &record.roles {
                    identities.push(KeyIdentity::agent(record.environment, network, role));
                }
            }
        }
        identities
    }

    pub fn key_count(&self) -> usize {
        self.environments
            .iter()
            .map(|r| 1 + r.networks.len() * r.roles.len())
            .sum()
    }
}
