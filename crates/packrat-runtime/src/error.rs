use std::fmt;

/// Result type for packrat-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Session cache error
    Cache(packrat_index::Error),

    /// Discovery or scan failure (the one terminal refresh error)
    Scan(anyhow::Error),

    /// Archive layer error
    Archive(anyhow::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Cache(err) => write!(f, "Session cache error: {}", err),
            Error::Scan(err) => write!(f, "Scan error: {:#}", err),
            Error::Archive(err) => write!(f, "Archive error: {:#}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Cache(err) => Some(err),
            Error::Config(_) => None,
            Error::Scan(err) | Error::Archive(err) => err.source(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<packrat_index::Error> for Error {
    fn from(err: packrat_index::Error) -> Self {
        Error::Cache(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
