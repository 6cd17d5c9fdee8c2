use thiserror::Error;

/// Errors that stop a dispatch before any message is sent.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unsupported trigger kind '{0}'")]
    UnsupportedTrigger(String),

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("failed to load emergency contacts: {0}")]
    ContactLookup(#[source] anyhow::Error),
}
