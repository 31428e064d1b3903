//! The crate-wide error type.
//!
//! Every failure in this crate is fatal: reference data is checked while it is loaded, parameters
//! are checked before the first day-step, and a day-step itself cannot fail once the
//! `EpidemicEngine` has validated its tables. Nothing is retried.
use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `ZikaError` and maps to other errors to
/// convert to a `ZikaError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum ZikaError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    /// A node, route or curve record is missing a field or holds an unusable value.
    ReferenceDataError {
        source_name: String,
        record: u64,
        message: String,
    },
    /// An IATA code is absent from the table it was looked up in.
    LookupError { table: &'static str, key: String },
    /// A policy parameter is out of range.
    ConfigurationError {
        parameter: &'static str,
        value: String,
        message: String,
    },
    ReportError(String),
}

impl ZikaError {
    pub(crate) fn reference_data(
        source_name: &str,
        record: u64,
        message: impl Into<String>,
    ) -> Self {
        ZikaError::ReferenceDataError {
            source_name: source_name.to_string(),
            record,
            message: message.into(),
        }
    }

    pub(crate) fn lookup(table: &'static str, key: &str) -> Self {
        ZikaError::LookupError {
            table,
            key: key.to_string(),
        }
    }

    pub(crate) fn configuration(
        parameter: &'static str,
        value: impl Display,
        message: impl Into<String>,
    ) -> Self {
        ZikaError::ConfigurationError {
            parameter,
            value: value.to_string(),
            message: message.into(),
        }
    }
}

impl From<io::Error> for ZikaError {
    fn from(error: io::Error) -> Self {
        ZikaError::IoError(error)
    }
}

impl From<serde_json::Error> for ZikaError {
    fn from(error: serde_json::Error) -> Self {
        ZikaError::JsonError(error)
    }
}

impl From<csv::Error> for ZikaError {
    fn from(error: csv::Error) -> Self {
        ZikaError::CSVError(error)
    }
}

impl std::error::Error for ZikaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZikaError::IoError(error) => Some(error),
            ZikaError::JsonError(error) => Some(error),
            ZikaError::CSVError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for ZikaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ZikaError::IoError(error) => write!(f, "I/O error: {error}"),
            ZikaError::JsonError(error) => write!(f, "JSON error: {error}"),
            ZikaError::CSVError(error) => write!(f, "CSV error: {error}"),
            ZikaError::ReferenceDataError {
                source_name,
                record,
                message,
            } => write!(
                f,
                "reference data error in {source_name} (record {record}): {message}"
            ),
            ZikaError::LookupError { table, key } => {
                write!(f, "lookup error: no entry for \"{key}\" in {table}")
            }
            ZikaError::ConfigurationError {
                parameter,
                value,
                message,
            } => write!(
                f,
                "configuration error: {parameter} = {value} is invalid: {message}"
            ),
            ZikaError::ReportError(message) => write!(f, "report error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_names_the_key() {
        let error = ZikaError::lookup("transmission curve table", "XYZ");
        assert_eq!(
            error.to_string(),
            "lookup error: no entry for \"XYZ\" in transmission curve table"
        );
    }

    #[test]
    fn configuration_error_reports_value() {
        let error = ZikaError::configuration("tau", -1.0, "must be positive");
        assert_eq!(
            error.to_string(),
            "configuration error: tau = -1 is invalid: must be positive"
        );
    }

    #[test]
    fn io_error_converts() {
        let error: ZikaError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(error, ZikaError::IoError(_)));
        assert!(std::error::Error::source(&error).is_some());
    }
}
