#[derive(Debug, thiserror::Error)]
pub enum ReplacerError {
    #[error("failed to bind replacer placement socket on {address}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to join replacer multicast group {address}")]
    Join {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to connect to simulator endpoint {address}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
}
