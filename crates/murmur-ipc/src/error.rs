use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("command bus is no longer running")]
    BusClosed,

    #[error("reply slot dropped before resolution (handler failed?)")]
    ReplyDropped,
}

pub type Result<T> = std::result::Result<T, IpcError>;
