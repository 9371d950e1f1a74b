use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Result alias for errors emitted by the mint-risk I/O boundary.
pub type MintResult<T> = Result<T, MintRiskError>;

/// Structured error type for the parts of mint-risk that touch the outside world.
///
/// The analyzer itself never fails; these errors come from loading sources,
/// reading configuration and persisting findings.
#[derive(Debug, Error)]
pub enum MintRiskError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("source error: {0}")]
    Source(String),

    #[error("finding store error: {0}")]
    Store(String),

    #[error("{0}")]
    Other(String),
}

impl MintRiskError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Convert to anyhow::Error for interop with anyhow-based code.
    pub fn into_anyhow(self) -> AnyhowError {
        AnyhowError::new(self)
    }
}

impl From<AnyhowError> for MintRiskError {
    fn from(err: AnyhowError) -> Self {
        MintRiskError::other(format!("{err:#}"))
    }
}

/// Convenience macro mirroring `anyhow::bail!` but returning a `MintRiskError::Source`.
#[macro_export]
macro_rules! mint_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::MintRiskError::source(format!($($arg)*)))
    };
}

/// Convenience macro mirroring `anyhow::ensure!`.
#[macro_export]
macro_rules! mint_ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::mint_bail!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn needs_lines(lines: usize) -> MintResult<usize> {
        crate::mint_ensure!(lines > 0, "expected at least one line, got {lines}");
        Ok(lines)
    }

    #[test]
    fn ensure_macro_produces_source_error() {
        let err = needs_lines(0).unwrap_err();
        assert!(matches!(err, MintRiskError::Source(_)));
        assert_eq!(err.to_string(), "source error: expected at least one line, got 0");
        assert_eq!(needs_lines(3).unwrap(), 3);
    }

    #[test]
    fn anyhow_round_trip_keeps_message() {
        let err: MintRiskError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
        let back = MintRiskError::store("locked").into_anyhow();
        assert_eq!(back.to_string(), "finding store error: locked");
    }
}
