pub type DraftlineResult<T> = Result<T, DraftlineError>;

#[derive(thiserror::Error, Debug)]
pub enum DraftlineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error("media resolution error: {0}")]
    MediaResolution(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DraftlineError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_time(msg: impl Into<String>) -> Self {
        Self::InvalidTime(msg.into())
    }

    pub fn media_resolution(msg: impl Into<String>) -> Self {
        Self::MediaResolution(msg.into())
    }
}
