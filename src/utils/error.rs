use crate::core::parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilmMapError {
    #[error("Geocoder request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Location file error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Geocoding service unreachable: all {attempted} lookups failed")]
    GeocoderUnreachable { attempted: usize },

    #[error("Input file not found: {path}")]
    InputNotFound { path: String },

    #[error("Malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("Invalid location '{value}': {reason}")]
    InvalidLocation { value: String, reason: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required setting: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Network,
    Configuration,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl FilmMapError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FilmMapError::HttpError(_) | FilmMapError::GeocoderUnreachable { .. } => {
                ErrorCategory::Network
            }
            FilmMapError::CsvError(_)
            | FilmMapError::InputNotFound { .. }
            | FilmMapError::Parse { .. }
            | FilmMapError::InvalidLocation { .. } => ErrorCategory::Input,
            FilmMapError::ConfigValidationError { .. }
            | FilmMapError::InvalidConfigValueError { .. }
            | FilmMapError::MissingConfigError { .. } => ErrorCategory::Configuration,
            FilmMapError::IoError(_) | FilmMapError::SerializationError(_) => {
                ErrorCategory::Output
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FilmMapError::HttpError(_) | FilmMapError::GeocoderUnreachable { .. } => {
                ErrorSeverity::Medium
            }
            FilmMapError::InputNotFound { .. } | FilmMapError::IoError(_) => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            FilmMapError::HttpError(_) | FilmMapError::GeocoderUnreachable { .. } => {
                "Check network access to the geocoding service (--geocoder-endpoint) and retry"
            }
            FilmMapError::InputNotFound { .. } => {
                "Pass the locations list with --input (default: locations.txt)"
            }
            FilmMapError::CsvError(_) | FilmMapError::Parse { .. } => {
                "Fix the offending line or rerun with --on-malformed skip"
            }
            FilmMapError::InvalidLocation { .. } => {
                "Enter the location as 'lat, long', e.g. 49.83, 24.02"
            }
            FilmMapError::ConfigValidationError { .. }
            | FilmMapError::InvalidConfigValueError { .. }
            | FilmMapError::MissingConfigError { .. } => {
                "Check the command line flags and the TOML configuration file"
            }
            FilmMapError::IoError(_) | FilmMapError::SerializationError(_) => {
                "Make sure the output directory exists and is writable"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FilmMapError::InputNotFound { path } => {
                format!("Cannot find the locations file '{}'", path)
            }
            FilmMapError::Parse { line, source } => {
                format!("Line {} of the locations file is malformed ({})", line, source)
            }
            FilmMapError::HttpError(_) => "The geocoding service could not be reached".to_string(),
            FilmMapError::GeocoderUnreachable { attempted } => format!(
                "The geocoding service could not be reached ({} lookups failed)",
                attempted
            ),
            FilmMapError::InvalidLocation { value, .. } => {
                format!("'{}' is not a valid 'lat, long' pair", value)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FilmMapError>;
