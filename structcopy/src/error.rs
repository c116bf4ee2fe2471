use thiserror::Error;

use crate::diagnostic::Position;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors aborting the processing of one method (directive errors) or of a whole file.
#[derive(Debug, Error)]
pub enum Error {
    /// The directive line does not match `ws* marker? ":" directive args*`.
    #[error("{position}: invalid notation format {line:?}")]
    Syntax { position: Position, line: String },

    #[error("{position}: {message}")]
    Configuration { position: Position, message: String },

    #[error("{file}: {message}")]
    Parse { file: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn configuration<M: Into<String>>(position: &Position, message: M) -> Self {
        Self::Configuration {
            position: position.clone(),
            message: message.into(),
        }
    }

    /// Position of the offending line or declaration, when the error has one.
    pub fn position(&self) -> Option<&Position> {
        match self {
            Self::Syntax { position, .. } | Self::Configuration { position, .. } => Some(position),
            Self::Parse { .. } | Self::Io(_) => None,
        }
    }
}
