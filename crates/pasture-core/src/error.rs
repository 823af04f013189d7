use thiserror::Error;

/// Application-wide error types for Pasture.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (non-success status, unreadable body).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// A feed or API payload could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// HTML-to-Markdown conversion failed.
    #[error("Cleaner error: {0}")]
    CleanerError(String),

    /// The scraping collaborator could not produce Markdown for a page.
    #[error("Scrape error: {0}")]
    ScrapeError(String),

    /// The configuration file is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single source section is misconfigured.
    #[error("Configuration error in [{section}]: {message}")]
    InvalidSource { section: String, message: String },

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    pub fn invalid_source(section: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::InvalidSource {
            section: section.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors that make the process unable to start.
    pub fn is_configuration(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::InvalidSource { .. })
    }

    /// Returns true if the failure came from the network layer rather than
    /// from the content itself.
    pub fn is_transport(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_source_names_the_section() {
        let err = AppError::invalid_source("worldnews", "unknown source type 'gopher'");
        assert_eq!(
            err.to_string(),
            "Configuration error in [worldnews]: unknown source type 'gopher'"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn transport_errors() {
        assert!(AppError::NetworkError("reset".into()).is_transport());
        assert!(AppError::Timeout(30).is_transport());
        assert!(AppError::HttpError("connect refused".into()).is_transport());
        assert!(!AppError::ParseError("bad xml".into()).is_transport());
        assert!(!AppError::Config("missing".into()).is_transport());
    }
}
