#[derive(Debug, thiserror::Error)]
pub enum LineKvError {
    #[error("ERR {0}")]
    Generic(String),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArgCount(String),

    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    #[error("ERR no such key")]
    NoSuchKey,

    #[error("ERR value is out of range, must be positive")]
    NegativeCount,

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("NOAUTH Authentication required.")]
    NoAuth,

    #[error("ERR invalid password")]
    InvalidPassword,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LineKvError {
    /// Render as the single reply line sent back to the client.
    pub fn to_reply(&self) -> String {
        format!("{self}")
    }
}
