use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transport error: {0}")]
    Transport(#[from] squall_ssh::SshError),

    #[error("no collections available for vendor '{0}'")]
    NoCollections(String),

    #[error("engine worker did not stop within the grace period")]
    StopTimeout,
}
