/// Errors that can occur across Lodestone.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate reports it through `miette` at the boundary.
/// Per-item indexing failures (a chunk that fails to embed, a row that fails
/// to insert) are contained by the coordinator and never surface through
/// this type, only operation-level failures do.
///
/// # Examples
///
/// ```
/// use lode_core::LodeError;
///
/// let err = LodeError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum LodeError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Embedding provider API or tokenizer error.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Vector store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LodeError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = LodeError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn storage_error_displays_message() {
        let err = LodeError::Storage("table locked".into());
        assert_eq!(err.to_string(), "storage error: table locked");
    }

    #[test]
    fn propagates_into_a_miette_report() {
        fn boundary() -> miette::Result<()> {
            Err(LodeError::Storage("table locked".into()))?;
            Ok(())
        }
        let report = boundary().unwrap_err();
        assert!(report.to_string().contains("table locked"));
    }
}
