use thiserror::Error;

/// Contract violations reported by the reply controller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// A prompt was submitted while a previous reply was still pending or streaming
    #[error("a reply is already being generated; stop it before sending another message")]
    ReplyInProgress,
}
