#![allow(dead_code)]

use async_trait::async_trait;
use kms_provisioner::kms::{AliasEntry, AliasPage, CreateKeyRequest, KeyMetadata, KmsCapability};
use kms_provisioner::taxonomy::{Environment, EnvironmentRecord, Taxonomy};
use kms_provisioner::{ProvisionError, Result};
use std::sync::Mutex;
use std::time::Duration;

const SECP256K1_SPKI_PREFIX: &str = "3056301006072a8648ce3d020106052b8104000a034200";

/// (uncompressed point, address) for private keys 1 and 2.
pub const KEY_VECTORS: [(&str, &str); 2] = [
    (
        "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
         483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
        "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf",
    ),
    (
        "04c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5\
         1ae168fea63dc339a3c58419466ceaeef7f632653266d0e1236431a950cfe52a",
        "0x2B5AD5c4795c026514f8317c7a215E218DcCD6cF",
    ),
];

pub fn spki_der(point_hex: &str) -> Vec<u8> {
    hex::decode(format!("{}{}", SECP256K1_SPKI_PREFIX, point_hex)).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateKey(String),
    CreateAlias(String, String),
    DescribeKey(String),
    GetPublicKey(String),
    ListAliases(Option<String>),
}

#[derive(Debug, Clone)]
pub struct SimKey {
    pub id: String,
    pub arn: String,
    pub description: String,
    pub environment: Environment,
    pub public_key: Vec<u8>,
    pub address: String,
}

#[derive(Default)]
struct State {
    keys: Vec<SimKey>,
    aliases: Vec<AliasEntry>,
    calls: Vec<Call>,
    failures: Vec<(&'static str, String)>,
}

/// In-memory KMS. Keys get sequential ids and cycle through `KEY_VECTORS`
/// so every derived address is known up front.
#[derive(Default)]
pub struct SimulatedKms {
    state: Mutex<State>,
    latency: Option<Box<dyn Fn(&str) -> Duration + Send + Sync>>,
}

impl SimulatedKms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay `GetPublicKey` by a per-key amount.
    pub fn with_latency(
        mut self,
        latency: impl Fn(&str) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.latency = Some(Box::new(latency));
        self
    }

    /// Make `operation` fail whenever its argument (description for
    /// CreateKey, alias for CreateAlias, key id otherwise) equals `argument`.
    pub fn fail_on(&self, operation: &'static str, argument: &str) {
        self.state.lock().unwrap().failures.push((operation, argument.to_string()));
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// Replace the public key KMS returns for `key_id`.
    pub fn set_public_key(&self, key_id: &str, public_key: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        if let Some(key) = state.keys.iter_mut().find(|k| k.id == key_id) {
            key.public_key = public_key;
        }
    }

    /// Create a key and alias outside of the provisioner.
    pub fn seed(&self, alias: &str, description: &str, environment: Environment) -> String {
        let mut state = self.state.lock().unwrap();
        let key = Self::new_key(&mut state, description, environment);
        state.aliases.push(AliasEntry {
            alias_name: alias.to_string(),
            target_key_id: Some(key.id.clone()),
        });
        key.id
    }

    /// An alias KMS lists without a target key.
    pub fn seed_alias_without_target(&self, alias: &str) {
        self.state.lock().unwrap().aliases.push(AliasEntry {
            alias_name: alias.to_string(),
            target_key_id: None,
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn keys(&self) -> Vec<SimKey> {
        self.state.lock().unwrap().keys.clone()
    }

    pub fn aliases(&self) -> Vec<AliasEntry> {
        self.state.lock().unwrap().aliases.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn key(&self, key_id: &str) -> Option<SimKey> {
        self.keys().into_iter().find(|k| k.id == key_id)
    }

    fn new_key(state: &mut State, description: &str, environment: Environment) -> SimKey {
        let index = state.keys.len();
        let (point, address) = KEY_VECTORS[index % KEY_VECTORS.len()];
        let id = format!("key-{:04}", index + 1);
        let key = SimKey {
            arn: format!("arn:aws:kms:us-west-2:111122223333:key/{}", id),
            id,
            description: description.to_string(),
            environment,
            public_key: spki_der(point),
            address: address.to_string(),
        };
        state.keys.push(key.clone());
        key
    }

    fn record(&self, operation: &'static str, argument: &str, call: Call) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state
            .failures
            .iter()
            .any(|(op, arg)| *op == operation && arg == argument)
        {
            return Err(ProvisionError::remote(operation, "simulated failure"));
        }
        Ok(())
    }

    fn metadata(key: &SimKey) -> KeyMetadata {
        KeyMetadata {
            id: key.id.clone(),
            arn: key.arn.clone(),
            description: key.description.clone(),
        }
    }
}

#[async_trait]
impl KmsCapability for SimulatedKms {
    async fn create_key(&self, request: &CreateKeyRequest) -> Result<KeyMetadata> {
        self.record(
            "CreateKey",
            &request.description,
            Call::CreateKey(request.description.clone()),
        )?;
        let mut state = self.state.lock().unwrap();
        let key = Self::new_key(&mut state, &request.description, request.environment);
        Ok(Self::metadata(&key))
    }

    async fn create_alias(&self, alias_name: &str, target_key_id: &str) -> Result<()> {
        self.record(
            "CreateAlias",
            alias_name,
            Call::CreateAlias(alias_name.to_string(), target_key_id.to_string()),
        )?;
        let mut state = self.state.lock().unwrap();
        if state.aliases.iter().any(|a| a.alias_name == alias_name) {
            return Err(ProvisionError::remote("CreateAlias", "AlreadyExistsException"));
        }
        state.aliases.push(AliasEntry {
            alias_name: alias_name.to_string(),
            target_key_id: Some(target_key_id.to_string()),
        });
        Ok(())
    }

    async fn describe_key(&self, key_id: &str) -> Result<KeyMetadata> {
        self.record("DescribeKey", key_id, Call::DescribeKey(key_id.to_string()))?;
        let state = self.state.lock().unwrap();
        let target = if key_id.starts_with("alias/") {
            state
                .aliases
                .iter()
                .find(|a| a.alias_name == key_id)
                .and_then(|a| a.target_key_id.clone())
        } else {
            Some(key_id.to_string())
        };
        state
            .keys
            .iter()
            .find(|k| Some(&k.id) == target.as_ref())
            .map(Self::metadata)
            .ok_or_else(|| ProvisionError::remote("DescribeKey", "NotFoundException"))
    }

    async fn get_public_key(&self, key_id: &str) -> Result<Vec<u8>> {
        self.record("GetPublicKey", key_id, Call::GetPublicKey(key_id.to_string()))?;
        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(key_id)).await;
        }
        let state = self.state.lock().unwrap();
        state
            .keys
            .iter()
            .find(|k| k.id == key_id)
            .map(|k| k.public_key.clone())
            .ok_or_else(|| ProvisionError::remote("GetPublicKey", "NotFoundException"))
    }

    async fn list_aliases(&self, limit: i32, marker: Option<String>) -> Result<AliasPage> {
        self.record(
            "ListAliases",
            marker.as_deref().unwrap_or(""),
            Call::ListAliases(marker.clone()),
        )?;
        let state = self.state.lock().unwrap();
        let start: usize = match &marker {
            Some(m) => m.trim_start_matches("offset-").parse().unwrap(),
            None => 0,
        };
        let end = (start + limit as usize).min(state.aliases.len());
        let truncated = end < state.aliases.len();

        Ok(AliasPage {
            entries: state.aliases[start..end].to_vec(),
            truncated,
            next_marker: truncated.then(|| format!("offset-{}", end)),
        })
    }
}

pub fn record(environment: Environment, networks: &[&str], roles: &[&str]) -> EnvironmentRecord {
    EnvironmentRecord {
        environment,
        networks: networks.iter().map(|s| s.to_string()).collect(),
        roles: roles.iter().map(|s| s.to_string()).collect(),
    }
}

/// Two environments: staging with 2 networks x 2 roles, production with 1 x 1.
pub fn sample_taxonomy() -> Taxonomy {
    Taxonomy {
        region: "us-west-2".to_string(),
        environments: vec![
            record(
                Environment::Staging,
                &["goerli", "xdai"],
                &["updater-signer", "relayer-signer"],
            ),
            record(Environment::Production, &["ethereum"], &["watcher-signer"]),
        ],
    }
}
