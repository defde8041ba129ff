use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid vendor tag: {0}")]
    InvalidVendorTag(String),

    #[error("credentials missing an auth method for {0}")]
    MissingAuth(String),

    #[error("invalid field type '{0}' (expected int|float|bool|str)")]
    InvalidFieldType(String),
}
