use crate::directory::AliasDirectory;
use crate::error::Result;
use crate::kms::{CreateKeyRequest, KeyMetadata, KmsCapability};
use crate::taxonomy::KeyIdentity;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Created,
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub metadata: KeyMetadata,
    pub resolution: Resolution,
}

/// Decides, per identity, between creating a key + alias and describing the
/// key an existing alias already points at.
pub struct KeyResolver<'a> {
    kms: &'a dyn KmsCapability,
}

impl<'a> KeyResolver<'a> {
    pub fn new(kms: &'a dyn KmsCapability) -> Self {
        Self { kms }
    }

    pub async fn resolve(
        &self,
        identity: &KeyIdentity,
        directory: &AliasDirectory,
    ) -> Result<ResolvedKey> {
        let alias = identity.alias();

        let resolved = match directory.find(&alias) {
            None => {
                info!("🔐 No existing alias found for {}, creating new key", alias);
                let metadata = self
                    .kms
                    .create_key(&CreateKeyRequest {
                        description: identity.description(),
                        environment: identity.environment,
                    })
                    .await?;
                // A failure here leaves an unaliased key behind; no retry.
                self.kms.create_alias(&alias, &metadata.id).await?;

                ResolvedKey {
                    metadata,
                    resolution: Resolution::Created,
                }
            }
            Some(entry) => {
                info!("Existing alias for {}, fetching key", alias);
                let target = entry.target_key_id.as_deref().unwrap_or(&alias);
                ResolvedKey {
                    metadata: self.kms.describe_key(target).await?,
                    resolution: Resolution::Existing,
                }
            }
        };

        debug!("Key Id: {}", resolved.metadata.id);
        debug!("Key Arn: {}", resolved.metadata.arn);
        debug!("Key Description: {}", resolved.metadata.description);

        Ok(resolved)
    }
}
