//! Error types for document loading and configuration.

use core::fmt;

/// Errors raised while loading a page or its configuration.
///
/// Widget event handlers never return errors; they degrade to no-ops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScrollmarkError {
    /// The HTML input could not be tokenized.
    Parse {
        /// Parser message.
        message: String,
        /// Byte offset in the input where parsing stopped.
        offset: u64,
    },
    /// Input exceeded a configured structural limit.
    LimitExceeded {
        kind: &'static str,
        actual: usize,
        limit: usize,
    },
    /// Configuration value was rejected.
    Config(String),
}

impl ScrollmarkError {
    pub(crate) fn parse(message: impl Into<String>, offset: u64) -> Self {
        Self::Parse {
            message: message.into(),
            offset,
        }
    }

    pub(crate) fn limit(kind: &'static str, actual: usize, limit: usize) -> Self {
        Self::LimitExceeded {
            kind,
            actual,
            limit,
        }
    }
}

impl fmt::Display for ScrollmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { message, offset } => {
                write!(f, "html parse error at byte {}: {}", offset, message)
            }
            Self::LimitExceeded {
                kind,
                actual,
                limit,
            } => write!(
                f,
                "document limit exceeded: {} (actual={} limit={})",
                kind, actual, limit
            ),
            Self::Config(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ScrollmarkError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_limit_exceeded() {
        let err = ScrollmarkError::limit("max_depth", 65, 64);
        assert_eq!(
            err.to_string(),
            "document limit exceeded: max_depth (actual=65 limit=64)"
        );
    }

    #[test]
    fn test_display_parse() {
        let err = ScrollmarkError::parse("unexpected end", 12);
        assert_eq!(err.to_string(), "html parse error at byte 12: unexpected end");
    }
}
