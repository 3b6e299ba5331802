use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid hardware address: {0}")]
    InvalidHardwareAddress(String),

    #[error("Invalid magic token: {0}")]
    InvalidMagicToken(String),

    #[error("Invalid device key: {0}")]
    InvalidDeviceKey(String),

    #[error("Unknown device kind: {0}")]
    UnknownDeviceKind(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
