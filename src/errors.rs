use std::fmt;

/// Fatal conditions only. Recoverable statement/meta-command outcomes are
/// plain enum values (see `command`), never an `Error` — this type exists
/// for conditions the engine cannot recover from.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Storage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error. {}", e),
            Error::Storage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
