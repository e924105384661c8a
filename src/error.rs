use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unknown board model: {0}")]
    UnknownModel(String),
    #[error("Export failed: {0}")]
    Export(String),
    #[error("Read failed: {0}")]
    Read(String),
    #[error("Write failed: {0}")]
    Write(String),
    #[error("Invalid pin index: {0}")]
    InvalidPin(String),
    #[error("Unexport warning: {0}")]
    Unexport(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("GPIO error: {0}")]
    Gpio(String),
}
