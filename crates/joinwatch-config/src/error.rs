#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Missing value for {field}: {reason}")]
    Missing { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Missing {
            field,
            reason: reason.into(),
        }
    }
}
