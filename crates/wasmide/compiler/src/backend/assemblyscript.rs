use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{BackendOutput, CompileOptions, CompilerBackend, WASM_OUTPUT, WAT_OUTPUT};
use crate::diagnostics::{normalize, DiagnosticFilter};
use crate::error::{CompilerError, CompilerResult};
use crate::language::Language;
use crate::toolchain::{self, tool_name, ToolchainConfig};
use crate::workspace::{create_workspace, Workspace};

/// Compiles AssemblyScript sources with `asc`.
///
/// When text output is requested, `asc` writes the module and its text form
/// in a single invocation, so no separate disassembly pass is needed.
#[derive(Clone, Debug)]
pub struct AssemblyScriptBackend {
    program: PathBuf,
    timeout: Duration,
}

impl AssemblyScriptBackend {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(config.asc.clone(), config.timeout())
    }

    async fn build(&self, workspace: &Workspace, options: CompileOptions) -> CompilerResult<BackendOutput> {
        let tool = tool_name(&self.program);
        let seed = workspace.seed_file();

        let mut command = Command::new(&self.program);
        command
            .args([seed, "--outFile", WASM_OUTPUT])
            .current_dir(workspace.path());
        if options.gen_text {
            command.args(["--textFile", WAT_OUTPUT]);
        }
        let output = toolchain::run(command, &tool, self.timeout).await?;

        if !output.status.success() {
            // asc reports each error as a multi-line block whose file
            // reference sits on the last line, so nothing is filtered out.
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(
                match normalize(&stderr, workspace.path(), seed, DiagnosticFilter::Verbatim) {
                    Some(text) => {
                        debug!(diagnostics = %text, "assemblyscript source rejected");
                        CompilerError::Diagnostics(text)
                    }
                    None => CompilerError::tool(&tool, format!("exited with {}", output.status)),
                },
            );
        }

        let wasm = tokio::fs::read(workspace.file(WASM_OUTPUT))
            .await
            .map_err(|e| CompilerError::tool(&tool, format!("no module produced: {e}")))?;

        let wat = if options.gen_text {
            match tokio::fs::read_to_string(workspace.file(WAT_OUTPUT)).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(tool, error = %e, "text output missing");
                    None
                }
            }
        } else {
            None
        };

        Ok(BackendOutput { wasm, wat })
    }
}

#[async_trait]
impl CompilerBackend for AssemblyScriptBackend {
    fn language(&self) -> Language {
        Language::AssemblyScript
    }

    async fn compile(&self, source: &str, options: CompileOptions) -> CompilerResult<BackendOutput> {
        let mut workspace =
            create_workspace(Language::AssemblyScript.seed_file_name(), source).await?;
        let result = self.build(&workspace, options).await;
        workspace.release();

        let output = result?;
        info!(
            bytes = output.wasm.len(),
            text = output.wat.is_some(),
            "asc build succeeded"
        );
        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::toolchain::testing::{fake_tool, WASM_HEADER};

    const AS_SOURCE: &str = "export function add(a: i32, b: i32): i32 {\n  return a + b;\n}\n";

    fn fake_asc(dir: &std::path::Path) -> PathBuf {
        fake_tool(
            dir,
            "asc",
            &format!(
                "while [ $# -gt 0 ]; do\n\
                   case \"$1\" in\n\
                     --outFile) shift; {WASM_HEADER} > \"$1\" ;;\n\
                     --textFile) shift; echo '(module (func $add))' > \"$1\" ;;\n\
                   esac\n\
                   shift\n\
                 done"
            ),
        )
    }

    #[tokio::test]
    async fn emits_binary_only_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let backend = AssemblyScriptBackend::new(fake_asc(dir.path()), Duration::from_secs(10));

        let out = backend.compile(AS_SOURCE, CompileOptions::default()).await.unwrap();
        assert_eq!(&out.wasm[..4], b"\0asm");
        assert!(out.wat.is_none());
    }

    #[tokio::test]
    async fn emits_text_in_the_same_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let backend = AssemblyScriptBackend::new(fake_asc(dir.path()), Duration::from_secs(10));

        let out = backend
            .compile(AS_SOURCE, CompileOptions { gen_text: true })
            .await
            .unwrap();
        assert!(out.wat.unwrap().contains("$add"));
    }

    #[tokio::test]
    async fn compile_errors_keep_context_and_hide_paths() {
        let dir = tempfile::tempdir().unwrap();
        let asc = fake_tool(
            dir.path(),
            "asc",
            "echo \"ERROR TS2304: Cannot find name 'y'.\" >&2\n\
             echo '   :' >&2\n\
             echo \"   in $PWD/main.ts(2,10)\" >&2\n\
             exit 1",
        );
        let backend = AssemblyScriptBackend::new(asc, Duration::from_secs(10));

        let err = backend.compile("y", CompileOptions::default()).await.unwrap_err();
        match err {
            CompilerError::Diagnostics(text) => {
                assert!(text.starts_with("ERROR TS2304"));
                assert!(text.ends_with("in main.ts(2,10)"));
                assert!(!text.contains("project-dir"));
            }
            other => panic!("expected diagnostics, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_compiler_is_tool_fault() {
        let backend = AssemblyScriptBackend::new("/nonexistent/asc", Duration::from_secs(10));
        let err = backend.compile(AS_SOURCE, CompileOptions::default()).await.unwrap_err();
        assert!(matches!(err, CompilerError::ToolInvocation { ref tool, .. } if tool == "asc"));
    }
}
