use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{BackendOutput, CompileOptions, CompilerBackend, WASM_OUTPUT};
use crate::diagnostics::{normalize, DiagnosticFilter};
use crate::error::{CompilerError, CompilerResult};
use crate::language::Language;
use crate::toolchain::{self, tool_name, ToolchainConfig};
use crate::workspace::{create_workspace, Workspace};

/// Compiles Go sources with `tinygo build -target wasm`.
#[derive(Clone, Debug)]
pub struct TinyGoBackend {
    program: PathBuf,
    strip: Option<PathBuf>,
    timeout: Duration,
}

impl TinyGoBackend {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            strip: None,
            timeout,
        }
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self {
            program: config.tinygo.clone(),
            strip: config.wasm_strip.clone(),
            timeout: config.timeout(),
        }
    }

    /// Run `wasm-strip` on every produced module.
    pub fn with_strip(mut self, program: impl Into<PathBuf>) -> Self {
        self.strip = Some(program.into());
        self
    }

    async fn build(&self, workspace: &Workspace) -> CompilerResult<Vec<u8>> {
        let tool = tool_name(&self.program);
        let seed = workspace.seed_file();

        let mut command = Command::new(&self.program);
        command
            .args(["build", "-o", WASM_OUTPUT, "-target", "wasm", seed])
            .current_dir(workspace.path());
        let output = toolchain::run(command, &tool, self.timeout).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(
                match normalize(&stderr, workspace.path(), seed, DiagnosticFilter::SeedFileLines) {
                    Some(text) => {
                        debug!(diagnostics = %text, "go source rejected");
                        CompilerError::Diagnostics(text)
                    }
                    None => CompilerError::tool(&tool, format!("exited with {}", output.status)),
                },
            );
        }

        let module = workspace.file(WASM_OUTPUT);
        if let Some(strip) = &self.strip {
            self.strip_module(strip, &module).await;
        }

        tokio::fs::read(&module)
            .await
            .map_err(|e| CompilerError::tool(&tool, format!("no module produced: {e}")))
    }

    // A failed strip leaves the module untouched, which is still valid.
    async fn strip_module(&self, program: &Path, module: &Path) {
        let tool = tool_name(program);
        let mut command = Command::new(program);
        command.arg(module);
        match toolchain::run(command, &tool, self.timeout).await {
            Ok(output) if output.status.success() => {}
            Ok(output) => warn!(tool, status = %output.status, "strip failed, keeping module"),
            Err(e) => warn!(tool, error = %e, "strip failed, keeping module"),
        }
    }
}

#[async_trait]
impl CompilerBackend for TinyGoBackend {
    fn language(&self) -> Language {
        Language::Go
    }

    async fn compile(&self, source: &str, _options: CompileOptions) -> CompilerResult<BackendOutput> {
        let mut workspace = create_workspace(Language::Go.seed_file_name(), source).await?;
        let result = self.build(&workspace).await;
        workspace.release();

        let wasm = result?;
        info!(bytes = wasm.len(), "tinygo build succeeded");
        Ok(BackendOutput { wasm, wat: None })
    }
}
