use thiserror::Error;

#[derive(Debug, Error)]
pub enum CkStyleError {
    /// Message from the auth provider, surfaced verbatim.
    #[error("{0}")]
    Auth(String),

    /// Message from the record store, surfaced verbatim.
    #[error("{0}")]
    Store(String),

    #[error("{0}")]
    Validation(String),

    #[error("Please log in to continue")]
    LoginRequired,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Local storage error: {0}")]
    Local(String),
}

pub type Result<T> = std::result::Result<T, CkStyleError>;

impl From<CkStyleError> for String {
    fn from(err: CkStyleError) -> Self {
        err.to_string()
    }
}
