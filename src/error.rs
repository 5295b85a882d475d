use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not authorised: cookie does not match the pledge owner")]
    Unauthorized,

    #[error("no pledge with name: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unable to reserve a path: {0}")]
    CannotReserve(String),

    #[error("a pledge with name {0} already exists")]
    Conflict(String),

    #[error("flow-mod push failed for pledge {0}")]
    PushFailed(String),

    #[error("checkpoint write failed: {0}")]
    CheckpointWriteFailed(String),

    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("actor mailbox closed or timed out: {0}")]
    MailboxError(String),
}

impl From<actix::MailboxError> for Error {
    fn from(e: actix::MailboxError) -> Self {
        Error::MailboxError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
