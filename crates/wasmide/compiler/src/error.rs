use serde::{Deserialize, Serialize};

/// Result type for compilation operations.
pub type CompilerResult<T> = Result<T, CompilerError>;

/// Errors that can occur while turning user source into a WebAssembly module.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
pub enum CompilerError {
    /// The ephemeral workspace could not be created or seeded.
    #[error("workspace setup failed: {0}")]
    Workspace(String),

    /// The user's code did not compile. The payload is the normalized
    /// toolchain output and is safe to show to the user.
    #[error("{0}")]
    Diagnostics(String),

    /// The external toolchain is missing, crashed, or produced no output.
    #[error("{tool} invocation failed: {message}")]
    ToolInvocation { tool: String, message: String },

    /// The external toolchain exceeded its time budget (in seconds).
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// The module compiled but could not be converted to text format.
    #[error("disassembly failed: {0}")]
    Disassembly(String),

    /// No backend handles the requested language.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The export scanner could not tokenize the source.
    #[error("source parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl CompilerError {
    /// True when the error is a defect in the user's code rather than a
    /// system fault.
    pub fn is_user_error(&self) -> bool {
        matches!(self, CompilerError::Diagnostics(_) | CompilerError::Parse { .. })
    }

    pub(crate) fn tool(tool: &str, message: impl Into<String>) -> Self {
        CompilerError::ToolInvocation {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e1 = CompilerError::Diagnostics("main.go:3:2: undefined: x".into());
        assert_eq!(format!("{e1}"), "main.go:3:2: undefined: x");

        let e2 = CompilerError::tool("tinygo", "not found");
        assert_eq!(format!("{e2}"), "tinygo invocation failed: not found");

        let e3 = CompilerError::Timeout {
            tool: "asc".into(),
            secs: 30,
        };
        assert_eq!(format!("{e3}"), "asc timed out after 30s");
    }

    #[test]
    fn user_errors_are_distinguished_from_faults() {
        assert!(CompilerError::Diagnostics("x".into()).is_user_error());
        assert!(CompilerError::Parse {
            line: 1,
            message: "x".into()
        }
        .is_user_error());
        assert!(!CompilerError::Workspace("disk full".into()).is_user_error());
        assert!(!CompilerError::UnsupportedLanguage("Rust".into()).is_user_error());
    }

    #[test]
    fn error_serde_roundtrip() {
        let errors = vec![
            CompilerError::Workspace("no space".into()),
            CompilerError::Disassembly("bad magic".into()),
            CompilerError::UnsupportedLanguage("Zig".into()),
        ];
        for err in &errors {
            let json = serde_json::to_string(err).unwrap();
            let restored: CompilerError = serde_json::from_str(&json).unwrap();
            assert_eq!(format!("{err}"), format!("{restored}"));
        }
    }
}
