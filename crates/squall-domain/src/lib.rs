pub mod error;
pub mod types;

pub use error::DomainError;
pub use types::{
    AuthMethod, CollectionMeta, CollectionReader, ConnectionStatus, DeviceInfo, DeviceTarget,
    FieldType, HistorySample, JumpHost, NoCollections, Payload, PayloadBody, Provenance, Row,
    SshCredentials, VendorTag,
};

#[cfg(test)]
mod tests;
