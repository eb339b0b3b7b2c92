//! Domain error types.

/// Top-level error type for regimetrader.
#[derive(Debug, thiserror::Error)]
pub enum RegimeTraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("insufficient data to fit regime model: have {rows} feature rows, need {minimum}")]
    InsufficientData { rows: usize, minimum: usize },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RegimeTraderError> for std::process::ExitCode {
    fn from(err: &RegimeTraderError) -> Self {
        let code: u8 = match err {
            RegimeTraderError::Io(_) => 1,
            RegimeTraderError::ConfigParse { .. }
            | RegimeTraderError::ConfigMissing { .. }
            | RegimeTraderError::ConfigInvalid { .. } => 2,
            RegimeTraderError::Data { .. } | RegimeTraderError::InvalidInput { .. } => 3,
            RegimeTraderError::InsufficientData { .. } => 5,
            RegimeTraderError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
