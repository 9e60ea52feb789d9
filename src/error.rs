pub type StageResult<T> = Result<T, StageError>;

#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("unsupported render engine: {0}")]
    UnsupportedEngine(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn unsupported_engine(engine: impl std::fmt::Display) -> Self {
        Self::UnsupportedEngine(engine.to_string())
    }
}
