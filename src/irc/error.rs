use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to resolve '{host}:{port}': no addresses returned")]
    NoAddresses { host: String, port: u16 },
    #[error("Client communication error: {0}")]
    ActorComm(String),
}

pub type Result<T, E = IrcError> = std::result::Result<T, E>;
