//! The errors that may occur while estimating row sizes

#[derive(Debug)]
pub enum Error {
    /// A generic estimator error
    Generic(String),
    /// The run config is missing something or is invalid
    InvalidConfig(String),
    /// A Scylla new session error occured
    ScyllaNewSession(scylla::errors::NewSessionError),
    /// A Scylla prepare error occured
    ScyllaPrepare(scylla::errors::PrepareError),
    /// A Scylla paged query error occured
    ScyllaPager(scylla::errors::PagerExecutionError),
    /// A Scylla next row error occured
    ScyllaNextRow(scylla::errors::NextRowError),
    /// A Scylla row type check error occured
    ScyllaTypeCheck(scylla::errors::TypeCheckError),
    /// A tokio join error
    TokioJoin(tokio::task::JoinError),
    /// A kanal send error
    KanalSend(kanal::SendError),
    /// An IO Error
    IO(std::io::Error),
    /// A config error
    Config(config::ConfigError),
    /// An openssl error
    Ssl(openssl::error::ErrorStack),
    /// A progress bar template error
    ProgressTemplate(indicatif::style::TemplateError),
}

impl Error {
    /// Create a new generic error
    ///
    /// # Arguments
    ///
    /// * `msg` - The error message to use
    pub fn new<T: Into<String>>(msg: T) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a new invalid config error
    ///
    /// # Arguments
    ///
    /// * `msg` - What is wrong with the config
    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        Error::InvalidConfig(msg.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Generic(err) => write!(f, "{err}"),
            Error::InvalidConfig(err) => write!(f, "Invalid Config: {err}"),
            Error::ScyllaNewSession(err) => write!(f, "ScyllaNewSession Error: {err}"),
            Error::ScyllaPrepare(err) => write!(f, "ScyllaPrepare Error: {err}"),
            Error::ScyllaPager(err) => write!(f, "ScyllaPager Error: {err}"),
            Error::ScyllaNextRow(err) => write!(f, "ScyllaNextRow Error: {err}"),
            Error::ScyllaTypeCheck(err) => write!(f, "ScyllaTypeCheck Error: {err}"),
            Error::TokioJoin(err) => write!(f, "TokioJoin Error: {err}"),
            Error::KanalSend(err) => write!(f, "KanalSend Error: {err}"),
            Error::IO(err) => write!(f, "IO Error: {err}"),
            Error::Config(err) => write!(f, "Config Error: {err}"),
            Error::Ssl(err) => write!(f, "Ssl Error: {err}"),
            Error::ProgressTemplate(err) => write!(f, "ProgressTemplate Error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<scylla::errors::NewSessionError> for Error {
    fn from(error: scylla::errors::NewSessionError) -> Self {
        Error::ScyllaNewSession(error)
    }
}

impl From<scylla::errors::PrepareError> for Error {
    fn from(error: scylla::errors::PrepareError) -> Self {
        Error::ScyllaPrepare(error)
    }
}

impl From<scylla::errors::PagerExecutionError> for Error {
    fn from(error: scylla::errors::PagerExecutionError) -> Self {
        Error::ScyllaPager(error)
    }
}

impl From<scylla::errors::NextRowError> for Error {
    fn from(error: scylla::errors::NextRowError) -> Self {
        Error::ScyllaNextRow(error)
    }
}

impl From<scylla::errors::TypeCheckError> for Error {
    fn from(error: scylla::errors::TypeCheckError) -> Self {
        Error::ScyllaTypeCheck(error)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        Error::TokioJoin(error)
    }
}

impl From<kanal::SendError> for Error {
    fn from(error: kanal::SendError) -> Self {
        Error::KanalSend(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error)
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(error: openssl::error::ErrorStack) -> Self {
        Error::Ssl(error)
    }
}

impl From<indicatif::style::TemplateError> for Error {
    fn from(error: indicatif::style::TemplateError) -> Self {
        Error::ProgressTemplate(error)
    }
}
