#[derive(Debug, thiserror::Error)]
pub enum RefereeError {
    #[error("failed to bind referee command socket")]
    Bind(#[source] std::io::Error),
    #[error("failed to connect to referee endpoint {address}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
}
