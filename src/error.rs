use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("malformed public key: {0}")]
    MalformedPublicKey(String),

    #[error("KMS {operation} failed: {message}")]
    RemoteService {
        operation: &'static str,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Failure while processing one logical key, tagged with its alias.
    #[error("failed to provision {alias}")]
    Key {
        alias: String,
        #[source]
        source: Box<ProvisionError>,
    },
}

impl ProvisionError {
    pub fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        Self::RemoteService {
            operation,
            message: message.into(),
        }
    }

    pub fn for_key(self, alias: &str) -> Self {
        match self {
            // Already tagged
            ProvisionError::Key { .. } => self,
            other => ProvisionError::Key {
                alias: alias.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, with any alias tagging removed.
    pub fn root(&self) -> &ProvisionError {
        match self {
            ProvisionError::Key { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
