use cosmwasm_std::StdError;
use thiserror::Error;

pub type BufferResult<R> = Result<R, BufferError>;

/// This enum describes checkpoint buffer errors
#[derive(Error, Debug, PartialEq)]
pub enum BufferError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Buffer capacity must be greater than zero")]
    ZeroCapacity {},

    #[error("Buffer not initialized")]
    BufferNotInitialized {},

    #[error("Buffer already initialized")]
    BufferAlreadyInitialized {},

    #[error("Checkpoint timestamps must be monotonically non-decreasing")]
    NonMonotonicTimestamp {},
}

impl From<BufferError> for StdError {
    fn from(value: BufferError) -> Self {
        match value {
            BufferError::Std(err) => err,
            _ => StdError::generic_err(value.to_string()),
        }
    }
}
