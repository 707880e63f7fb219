use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::diagnostics::scrub_paths;
use crate::error::{CompilerError, CompilerResult};
use crate::toolchain::{self, tool_name, ToolchainConfig};

/// Converts a compiled module into WebAssembly text format.
#[async_trait]
pub trait Disassembler: Send + Sync {
    async fn to_text(&self, wasm: &[u8]) -> CompilerResult<String>;
}

/// [`Disassembler`] backed by WABT's `wasm2wat` with every feature enabled.
#[derive(Clone, Debug)]
pub struct Wasm2Wat {
    program: PathBuf,
    timeout: Duration,
}

impl Wasm2Wat {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(config.wasm2wat.clone(), config.timeout())
    }
}

#[async_trait]
impl Disassembler for Wasm2Wat {
    async fn to_text(&self, wasm: &[u8]) -> CompilerResult<String> {
        let tool = tool_name(&self.program);
        let scratch = tempfile::Builder::new()
            .prefix("wasm2wat-")
            .tempdir()
            .map_err(|e| CompilerError::Disassembly(format!("scratch directory: {e}")))?;
        let input = scratch.path().join("module.wasm");
        let output = scratch.path().join("module.wat");

        tokio::fs::write(&input, wasm)
            .await
            .map_err(|e| CompilerError::Disassembly(format!("scratch file: {e}")))?;

        let mut command = Command::new(&self.program);
        command.arg("--enable-all").arg(&input).arg("-o").arg(&output);
        let result = toolchain::run(command, &tool, self.timeout)
            .await
            .map_err(|e| CompilerError::Disassembly(scrub_paths(&e.to_string(), scratch.path())))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let message = scrub_paths(stderr.trim(), scratch.path());
            return Err(CompilerError::Disassembly(if message.is_empty() {
                format!("{tool} exited with {}", result.status)
            } else {
                message
            }));
        }

        let text = tokio::fs::read_to_string(&output)
            .await
            .map_err(|e| CompilerError::Disassembly(format!("no text output: {e}")))?;
        debug!(bytes = wasm.len(), chars = text.len(), "module disassembled");
        Ok(text)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::toolchain::testing::fake_tool;

    #[tokio::test]
    async fn reads_back_text_output() {
        let dir = tempfile::tempdir().unwrap();
        // wasm2wat --enable-all <in> -o <out>
        let tool = fake_tool(
            dir.path(),
            "wasm2wat",
            "[ \"$1\" = --enable-all ] || exit 9\n\
             [ -s \"$2\" ] || exit 8\n\
             echo '(module (export \"add\" (func 0)))' > \"$4\"",
        );
        let text = Wasm2Wat::new(tool, Duration::from_secs(10))
            .to_text(b"\0asm\x01\0\0\0")
            .await
            .unwrap();
        assert!(text.contains("\"add\""));
    }

    #[tokio::test]
    async fn tool_failure_is_disassembly_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(
            dir.path(),
            "wasm2wat",
            "echo \"$2:0000000: error: bad magic value\" >&2\nexit 1",
        );
        let err = Wasm2Wat::new(tool, Duration::from_secs(10))
            .to_text(b"garbage")
            .await
            .unwrap_err();
        match err {
            CompilerError::Disassembly(msg) => {
                assert!(msg.contains("bad magic value"));
                assert!(msg.starts_with("module.wasm"));
            }
            other => panic!("expected disassembly error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_tool_is_disassembly_error() {
        let err = Wasm2Wat::new("/nonexistent/wasm2wat", Duration::from_secs(10))
            .to_text(b"\0asm")
            .await
            .unwrap_err();
        assert!(matches!(err, CompilerError::Disassembly(_)));
    }
}
