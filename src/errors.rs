use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterCalcError>;

#[derive(Debug, Error)]
pub enum FilterCalcError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("line {line}: `{content}` is not a hexadecimal CAN identifier")]
    ParseIdentifier { line: usize, content: String },
    #[error("failed to parse DBC file: {0}")]
    Dbc(String),
    #[error(transparent)]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FilterCalcError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        FilterCalcError::InvalidArgument(msg.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, FilterCalcError::InvalidArgument(_))
    }
}
