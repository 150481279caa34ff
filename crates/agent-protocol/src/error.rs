use thiserror::Error;

/// Errors raised while decoding server text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty message")]
    Empty,

    #[error("unbalanced parentheses at byte {0}")]
    Unbalanced(usize),

    #[error("lists nested too deeply at byte {0}")]
    TooDeep(usize),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("unknown play mode: {0}")]
    UnknownPlayMode(String),

    #[error("unknown side: {0}")]
    UnknownSide(String),
}
