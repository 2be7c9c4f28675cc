use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::IndicatorId;

#[derive(Debug, Error, Diagnostic)]
pub enum SotkaError {
    #[error("invalid indicator id: {0}")]
    InvalidIndicatorId(String),

    #[error("invalid year range: {min}..{max}")]
    InvalidYearRange { min: i32, max: i32 },

    #[error("failed to read config file: {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    #[error("failed to read layer mapping file: {0}")]
    LayerMappingRead(PathBuf),

    #[error("failed to parse layer mapping: {0}")]
    LayerMappingParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("sotkanet request failed: {0}")]
    SotkaHttp(String),

    #[error("sotkanet returned status {status}: {message}")]
    SotkaStatus { status: u16, message: String },

    #[error("malformed sotkanet response: {0}")]
    Parse(String),

    #[error("no metadata available for indicator {0}")]
    NoData(IndicatorId),

    #[error("something went wrong calling SotkaNET Indicators interface")]
    #[diagnostic(help("the indicator listing could not be fetched; no partial result is returned"))]
    IndicatorListing {
        #[source]
        source: Box<SotkaError>,
    },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

impl SotkaError {
    /// True for errors caused by the remote API rather than local state.
    pub fn is_remote(&self) -> bool {
        match self {
            SotkaError::SotkaHttp(_) | SotkaError::SotkaStatus { .. } | SotkaError::Parse(_) => {
                true
            }
            SotkaError::IndicatorListing { source } => source.is_remote(),
            _ => false,
        }
    }

    /// Process exit code: 2 when the indicator does not exist, 3 for remote
    /// failures, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            SotkaError::NoData(_) | SotkaError::SotkaStatus { status: 404, .. } => 2,
            error if error.is_remote() => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> SotkaError {
        SotkaError::SotkaStatus {
            status,
            message: "Not Found".to_string(),
        }
    }

    #[test]
    fn missing_indicator_exit_code() {
        assert_eq!(SotkaError::NoData(IndicatorId::new(7)).exit_code(), 2);
        assert_eq!(status(404).exit_code(), 2);
    }

    #[test]
    fn remote_failure_exit_code() {
        assert_eq!(status(500).exit_code(), 3);
        assert_eq!(SotkaError::Parse("not json".to_string()).exit_code(), 3);
        let listing = SotkaError::IndicatorListing {
            source: Box::new(status(404)),
        };
        assert_eq!(listing.exit_code(), 3);
    }

    #[test]
    fn local_failure_exit_code() {
        assert_eq!(SotkaError::ConfigParse("bad".to_string()).exit_code(), 1);
        assert_eq!(SotkaError::Filesystem("denied".to_string()).exit_code(), 1);
    }
}
