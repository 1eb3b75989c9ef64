//! Custom error types for kua.

use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage class an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong positional argument count or content.
    Argument,
    /// Missing or unreadable configuration file.
    File,
    /// Unsupported API version or malformed document.
    Schema,
    /// Invalid preflight check names, enum values or version policy.
    Validation,
    /// Client construction from kubeconfig failed.
    Connectivity,
}

/// Errors that can occur while resolving the upgrade apply configuration.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("missing one or more required arguments. Required arguments: [version]")]
    MissingVersion,

    #[error("too many arguments: expected a single version, got {0} ({1})")]
    TooManyArguments(usize, String),

    #[error("invalid version \"{0}\": {1}")]
    InvalidVersion(String, String),

    #[error("unable to read config file \"{}\": {source}", .path.display())]
    ConfigFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to decode config file \"{}\": {reason}", .path.display())]
    ConfigDecode { path: PathBuf, reason: String },

    #[error(
        "config file \"{}\": unsupported apiVersion \"{api_version}\" (supported: {supported})",
        .path.display()
    )]
    UnsupportedApiVersion {
        path: PathBuf,
        api_version: String,
        supported: String,
    },

    #[error("config file \"{}\": {reason}", .path.display())]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("{field}: Invalid value: \"{value}\": {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error(
        "ignore-preflight-errors: Invalid value: {}: unknown preflight check",
        quote_all(.0)
    )]
    InvalidPreflightChecks(Vec<String>),

    #[error("version policy: {0}")]
    VersionPolicy(String),

    #[error("couldn't create a Kubernetes client from file \"{}\": {reason}", .path.display())]
    ClientCreate { path: PathBuf, reason: String },
}

impl ApplyError {
    /// Classify the error by the pipeline stage that produced it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingVersion | Self::TooManyArguments(..) | Self::InvalidVersion(..) => {
                ErrorKind::Argument
            }
            Self::ConfigFileRead { .. } => ErrorKind::File,
            Self::ConfigDecode { .. }
            | Self::UnsupportedApiVersion { .. }
            | Self::InvalidDocument { .. } => ErrorKind::Schema,
            Self::InvalidValue { .. }
            | Self::InvalidPreflightChecks(_)
            | Self::VersionPolicy(_) => ErrorKind::Validation,
            Self::ClientCreate { .. } => ErrorKind::Connectivity,
        }
    }
}

fn quote_all(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", n))
        .collect::<Vec<_>>()
        .join(", ")
}
