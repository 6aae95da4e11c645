//! Narrow view of the key-management service used by the provisioner.
//!
//! `KmsCapability` covers the five calls the tool needs. `AwsKms` backs it
//! with `aws-sdk-kms`; tests substitute an in-memory service.

use crate::error::{ProvisionError, Result};
use crate::taxonomy::Environment;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_kms::error::DisplayErrorContext;
use aws_sdk_kms::types::{KeySpec, KeyUsageType, OriginType, Tag};
use aws_sdk_kms::Client as KmsClient;
use tracing::debug;

pub const ENVIRONMENT_TAG: &str = "environment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    pub id: String,
    pub arn: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub alias_name: String,
    pub target_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPage {
    pub entries: Vec<AliasEntry>,
    pub truncated: bool,
    pub next_marker: Option<String>,
}

/// Parameters of a new secp256k1 sign/verify key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateKeyRequest {
    pub description: String,
    pub environment: Environment,
}

#[async_trait]
pub trait KmsCapability: Send + Sync {
    async fn create_key(&self, request: &CreateKeyRequest) -> Result<KeyMetadata>;

    async fn create_alias(&self, alias_name: &str, target_key_id: &str) -> Result<()>;

    /// Accepts a key id, key ARN or alias name.
    async fn describe_key(&self, key_id: &str) -> Result<KeyMetadata>;

    /// DER encoded `SubjectPublicKeyInfo`.
    async fn get_public_key(&self, key_id: &str) -> Result<Vec<u8>>;

    async fn list_aliases(&self, limit: i32, marker: Option<String>) -> Result<AliasPage>;
}

#[derive(Debug, Clone)]
pub struct AwsKms {
    client: KmsClient,
}

impl AwsKms {
    pub fn new(client: KmsClient) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS credential chain, pinned to `region`.
    pub async fn from_region(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(KmsClient::new(&config))
    }
}

fn sdk_error<E: std::error::Error>(operation: &'static str, error: E) -> ProvisionError {
    ProvisionError::remote(operation, DisplayErrorContext(&error).to_string())
}

fn metadata_from_sdk(
    operation: &'static str,
    metadata: Option<&aws_sdk_kms::types::KeyMetadata>,
) -> Result<KeyMetadata> {
    let metadata =
        metadata.ok_or_else(|| ProvisionError::remote(operation, "response has no KeyMetadata"))?;
    let arn = metadata
        .arn()
        .ok_or_else(|| ProvisionError::remote(operation, "KeyMetadata has no Arn"))?;

    Ok(KeyMetadata {
        id: metadata.key_id().to_string(),
        arn: arn.to_string(),
        description: metadata.description().unwrap_or_default().to_string(),
    })
}

#[async_trait]
impl KmsCapability for AwsKms {
    async fn create_key(&self, request: &CreateKeyRequest) -> Result<KeyMetadata> {
        let tag = Tag::builder()
            .tag_key(ENVIRONMENT_TAG)
            .tag_value(request.environment.as_str())
            .build()
            .map_err(|e| ProvisionError::remote("CreateKey", e.to_string()))?;

        let response = self
            .client
            .create_key()
            .description(&request.description)
            .key_usage(KeyUsageType::SignVerify)
            .key_spec(KeySpec::EccSecgP256K1)
            .origin(OriginType::AwsKms)
            .bypass_policy_lockout_safety_check(false)
            .tags(tag)
            .send()
            .await
            .map_err(|e| sdk_error("CreateKey", e))?;

        debug!("CreateKey response: {:?}", response);
        metadata_from_sdk("CreateKey", response.key_metadata())
    }

    async fn create_alias(&self, alias_name: &str, target_key_id: &str) -> Result<()> {
        let response = self
            .client
            .create_alias()
            .alias_name(alias_name)
            .target_key_id(target_key_id)
            .send()
            .await
            .map_err(|e| sdk_error("CreateAlias", e))?;

        debug!("CreateAlias response: {:?}", response);
        Ok(())
    }

    async fn describe_key(&self, key_id: &str) -> Result<KeyMetadata> {
        let response = self
            .client
            .describe_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeKey", e))?;

        metadata_from_sdk("DescribeKey", response.key_metadata())
    }

    async fn get_public_key(&self, key_id: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_public_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(|e| sdk_error("GetPublicKey", e))?;

        let blob = response
            .public_key()
            .ok_or_else(|| ProvisionError::remote("GetPublicKey", "response has no PublicKey"))?;
        Ok(blob.as_ref().to_vec())
    }

    async fn list_aliases(&self, limit: i32, marker: Option<String>) -> Result<AliasPage> {
        let response = self
            .client
            .list_aliases()
            .limit(limit)
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| sdk_error("ListAliases", e))?;

        let entries = response
            .aliases()
            .iter()
            .filter_map(|alias| {
                alias.alias_name().map(|name| AliasEntry {
                    alias_name: name.to_string(),
                    target_key_id: alias.target_key_id().map(str::to_string),
                })
            })
            .collect();

        Ok(AliasPage {
            entries,
            truncated: response.truncated(),
            next_marker: response.next_marker().map(str::to_string),
        })
    }
}
