use crate::error::{ProvisionError, Result};
use crate::kms::{AliasEntry, KmsCapability};
use std::collections::HashMap;
use tracing::debug;

/// Snapshot of every alias in the account, taken once per run.
#[derive(Debug, Clone, Default)]
pub struct AliasDirectory {
    entries: Vec<AliasEntry>,
    by_name: HashMap<String, usize>,
}

impl AliasDirectory {
    pub fn from_entries(entries: Vec<AliasEntry>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            // Alias names are unique per account and region; keep the first if not.
            by_name.entry(entry.alias_name.clone()).or_insert(index);
        }
        Self { entries, by_name }
    }

    /// Page through `ListAliases` until the listing is no longer truncated.
    pub async fn fetch(kms: &dyn KmsCapability, page_size: i32) -> Result<Self> {
        let mut entries = Vec::new();
        let mut marker = None;
        let mut pages = 0usize;

        loop {
            let page = kms.list_aliases(page_size, marker.take()).await?;
            pages += 1;
            entries.extend(page.entries);

            if !page.truncated {
                break;
            }
            match page.next_marker {
                Some(next) if !next.is_empty() => marker = Some(next),
                _ => {
                    return Err(ProvisionError::remote(
                        "ListAliases",
                        "response is truncated but carries no NextMarker",
                    ))
                }
            }
        }

        debug!("Fetched {} aliases from KMS in {} page(s)", entries.len(), pages);
        Ok(Self::from_entries(entries))
    }

    /// Exact match on the alias name.
    pub fn find(&self, alias_name: &str) -> Option<&AliasEntry> {
        self.by_name.get(alias_name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
