use crate::address::derive_address;
use crate::directory::AliasDirectory;
use crate::error::Result;
use crate::kms::KmsCapability;
use crate::report::{PlanEntry, PlanStatus, ReportRow};
use crate::resolver::{KeyResolver, Resolution};
use crate::taxonomy::{KeyIdentity, Taxonomy};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::info;

/// Walks the taxonomy and provisions every key it names.
///
/// The alias snapshot is fetched to completion before any key is touched.
/// With `concurrency > 1` keys are resolved in parallel but rows still come
/// back in taxonomy order, and the first failure drops all pending work.
pub struct Provisioner {
    kms: Arc<dyn KmsCapability>,
    list_page_size: i32,
    concurrency: usize,
}

impl Provisioner {
    pub fn new(kms: Arc<dyn KmsCapability>, list_page_size: i32, concurrency: usize) -> Self {
        Self {
            kms,
            list_page_size,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(&self, taxonomy: &Taxonomy) -> Result<Vec<ReportRow>> {
        let directory = AliasDirectory::fetch(self.kms.as_ref(), self.list_page_size).await?;
        info!(
            "📡 Loaded {} aliases, provisioning {} keys in {}",
            directory.len(),
            taxonomy.key_count(),
            taxonomy.region
        );

        let resolver = &KeyResolver::new(self.kms.as_ref());
        let directory = &directory;
        let region = taxonomy.region.as_str();
        let identities = taxonomy.identities();

        // Completion order is arbitrary; the first error drops every
        // in-flight and not yet started key.
        let mut indexed: Vec<(usize, (ReportRow, Resolution))> =
            stream::iter(identities.iter().enumerate())
                .map(|(index, identity)| async move {
                    self.provision_key(resolver, directory, region, identity)
                        .await
                        .map(|provisioned| (index, provisioned))
                })
                .buffer_unordered(self.concurrency)
                .try_collect()
                .await?;
        indexed.sort_by_key(|(index, _)| *index);
        let provisioned: Vec<(ReportRow, Resolution)> =
            indexed.into_iter().map(|(_, provisioned)| provisioned).collect();

        let created = provisioned
            .iter()
            .filter(|(_, resolution)| *resolution == Resolution::Created)
            .count();
        info!(
            "✅ Provisioning complete: {} created, {} existing",
            created,
            provisioned.len() - created
        );

        Ok(provisioned.into_iter().map(|(row, _)| row).collect())
    }

    async fn provision_key(
        &self,
        resolver: &KeyResolver<'_>,
        directory: &AliasDirectory,
        region: &str,
        identity: &KeyIdentity,
    ) -> Result<(ReportRow, Resolution)> {
        let alias = identity.alias();
        self.try_provision_key(resolver, directory, region, identity, &alias)
            .await
            .map_err(|e| e.for_key(&alias))
    }

    async fn try_provision_key(
        &self,
        resolver: &KeyResolver<'_>,
        directory: &AliasDirectory,
        region: &str,
        identity: &KeyIdentity,
        alias: &str,
    ) -> Result<(ReportRow, Resolution)> {
        let resolved = resolver.resolve(identity, directory).await?;

        // Get the Ethereum address from the KMS public key
        let public_key = self.kms.get_public_key(&resolved.metadata.id).await?;
        let address = derive_address(&public_key)?;

        let row = ReportRow {
            alias: alias.to_string(),
            region: region.to_string(),
            key_id: resolved.metadata.id,
            arn: resolved.metadata.arn,
            description: identity.description(),
            address,
        };
        Ok((row, resolved.resolution))
    }

    /// Report what `run` would do without creating anything.
    pub async fn plan(&self, taxonomy: &Taxonomy) -> Result<Vec<PlanEntry>> {
        let directory = AliasDirectory::fetch(self.kms.as_ref(), self.list_page_size).await?;

        Ok(taxonomy
            .identities()
            .into_iter()
            .map(|identity| {
                let alias = identity.alias();
                let status = match directory.find(&alias) {
                    Some(entry) => PlanStatus::Exists {
                        target_key_id: entry.target_key_id.clone(),
                    },
                    None => PlanStatus::Create,
                };
                PlanEntry {
                    alias,
                    description: identity.description(),
                    status,
                }
            })
            .collect())
    }
}
