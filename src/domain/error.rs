//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for sigfolio.
#[derive(Debug, thiserror::Error)]
pub enum SigfolioError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid configuration for {parameter}: {reason}")]
    Configuration { parameter: String, reason: String },

    #[error("data alignment error: {reason}")]
    DataAlignment { reason: String },

    #[error(
        "insufficient cash on {date} for {instrument}: trade needs {required:.2}, {available:.2} available above floor"
    )]
    InsufficientCash {
        date: NaiveDate,
        instrument: String,
        required: f64,
        available: f64,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SigfolioError {
    pub(crate) fn configuration(parameter: &str, reason: impl Into<String>) -> Self {
        SigfolioError::Configuration {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn alignment(reason: impl Into<String>) -> Self {
        SigfolioError::DataAlignment {
            reason: reason.into(),
        }
    }
}

impl From<&SigfolioError> for std::process::ExitCode {
    fn from(err: &SigfolioError) -> Self {
        let code: u8 = match err {
            SigfolioError::Io(_) => 1,
            SigfolioError::ConfigParse { .. }
            | SigfolioError::ConfigMissing { .. }
            | SigfolioError::Configuration { .. } => 2,
            SigfolioError::Data { .. } | SigfolioError::DataAlignment { .. } => 3,
            SigfolioError::InsufficientCash { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_message_names_parameter() {
        let err = SigfolioError::configuration("fraction", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid configuration for fraction: must be positive"
        );
    }

    #[test]
    fn insufficient_cash_message() {
        let err = SigfolioError::InsufficientCash {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            instrument: "BHP".into(),
            required: 1500.0,
            available: 1000.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("2024-01-02"));
        assert!(msg.contains("BHP"));
        assert!(msg.contains("1500.00"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SigfolioError = io.into();
        assert!(matches!(err, SigfolioError::Io(_)));
    }
}
