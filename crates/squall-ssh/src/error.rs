use thiserror::Error;

#[derive(Debug, Error)]
pub enum SshError {
    #[error("connect to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("ssh handshake with {host} failed: {source}")]
    Handshake {
        host: String,
        #[source]
        source: ssh2::Error,
    },

    #[error("authentication failed for {username}@{host}: {source}")]
    Auth {
        username: String,
        host: String,
        #[source]
        source: ssh2::Error,
    },

    #[error("failed to load private key: {0}")]
    KeyLoad(String),

    #[error("shell channel error: {0}")]
    Channel(#[source] ssh2::Error),

    #[error("not connected")]
    NotConnected,

    #[error("io error on shell stream: {0}")]
    Io(#[from] std::io::Error),
}
