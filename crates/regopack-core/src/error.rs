//! Error types for bundle composition and compilation.

/// Errors raised while configuring, packaging or compiling policy sources.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A configuration call received an empty required value.
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    /// `compile` was invoked before any source was added.
    #[error("no compilation sources specified")]
    NoSourceSpecified,

    /// A file or stream could not be read, or the archive could not be written.
    #[error("archive i/o failed while {context}: {source}")]
    ArchiveIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Bundle manifest could not be serialized or parsed.
    #[error("bundle manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Compilation parameters could not be loaded.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Failure reported by the external compiler, passed through as-is.
    #[error(transparent)]
    Compiler(#[from] anyhow::Error),
}

impl CompileError {
    pub(crate) fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }

    pub(crate) fn empty(argument: &'static str) -> Self {
        Self::invalid(argument, "value must not be empty")
    }

    /// Returns a mapper that wraps an I/O error with the given context.
    pub(crate) fn archive_io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| Self::ArchiveIo { context, source }
    }

    /// Exit code for command-line front ends.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Caller mistakes
            Self::InvalidArgument { .. } => 1,
            Self::NoSourceSpecified => 1,
            Self::Config { .. } => 1,

            // Packaging
            Self::ArchiveIo { .. } => 2,
            Self::Manifest(_) => 2,

            // Downstream
            Self::Compiler(_) => 3,
        }
    }

    /// Whether the failure was caused by how the configurator was used.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::NoSourceSpecified | Self::Config { .. }
        )
    }
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_error_is_transparent() {
        let err = CompileError::from(anyhow::anyhow!("opa exited with status 2"));
        assert_eq!(err.to_string(), "opa exited with status 2");
        assert_eq!(err.exit_code(), 3);
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_archive_io_keeps_context_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = CompileError::archive_io("reading policy.rego")(io);
        assert!(err.to_string().contains("reading policy.rego"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_invalid_argument_message() {
        let err = CompileError::empty("path");
        assert_eq!(
            err.to_string(),
            "invalid argument `path`: value must not be empty"
        );
        assert!(err.is_caller_error());
    }
}
