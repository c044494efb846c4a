use crate::compiler::diagnostic::ErrorLog;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Compile(ErrorLog),

    #[error("S98 parse error: {0}")]
    S98Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
