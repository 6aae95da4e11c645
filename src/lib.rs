pub mod address;
pub mod config;
pub mod directory;
pub mod error;
pub mod kms;
pub mod provisioner;
pub mod report;
pub mod resolver;
pub mod taxonomy;

pub use address::derive_address;
pub use config::ProvisionConfig;
pub use directory::AliasDirectory;
pub use error::{ProvisionError, Result};
pub use kms::{AwsKms, KeyMetadata, KmsCapability};
pub use provisioner::Provisioner;
pub use report::{render_plan, render_rows, OutputFormat, ReportRow};
pub use resolver::{KeyResolver, Resolution, ResolvedKey};
pub use taxonomy::{Environment, KeyIdentity, Taxonomy};
