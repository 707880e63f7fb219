use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CompilerError, CompilerResult};

/// Locations of the external tools and the limits applied to them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// TinyGo compiler used for Go projects.
    #[serde(default = "default_tinygo")]
    pub tinygo: PathBuf,

    /// AssemblyScript compiler.
    #[serde(default = "default_asc")]
    pub asc: PathBuf,

    /// WABT disassembler.
    #[serde(default = "default_wasm2wat")]
    pub wasm2wat: PathBuf,

    /// Optional WABT `wasm-strip`, run on TinyGo output.
    #[serde(default)]
    pub wasm_strip: Option<PathBuf>,

    /// Wall-clock budget for a single tool invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Return the binary without text form when disassembly fails.
    #[serde(default = "default_true")]
    pub degrade_on_disassembly_failure: bool,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            tinygo: default_tinygo(),
            asc: default_asc(),
            wasm2wat: default_wasm2wat(),
            wasm_strip: None,
            timeout_secs: default_timeout_secs(),
            degrade_on_disassembly_failure: true,
        }
    }
}

impl ToolchainConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_tinygo() -> PathBuf {
    PathBuf::from("tinygo")
}

fn default_asc() -> PathBuf {
    PathBuf::from("asc")
}

fn default_wasm2wat() -> PathBuf {
    PathBuf::from("wasm2wat")
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// Short name of a tool for logs and error messages.
pub(crate) fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

/// Run `command` to completion, capturing stdout and stderr.
///
/// The child is killed if it outlives `timeout`. A nonzero exit is NOT an
/// error here; callers interpret the status.
pub(crate) async fn run(mut command: Command, tool: &str, timeout: Duration) -> CompilerResult<Output> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = spawn(&mut command).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => CompilerError::tool(tool, "executable not found"),
        ErrorKind::PermissionDenied => CompilerError::tool(tool, "executable not permitted"),
        _ => CompilerError::tool(tool, e.to_string()),
    })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            debug!(tool, status = %output.status, "tool exited");
            Ok(output)
        }
        Ok(Err(e)) => Err(CompilerError::tool(tool, e.to_string())),
        Err(_) => Err(CompilerError::Timeout {
            tool: tool.to_string(),
            secs: timeout.as_secs(),
        }),
    }
}

// ETXTBSY: the executable was just written and another process still holds
// it open for writing.
const TEXT_FILE_BUSY: i32 = 26;

async fn spawn(command: &mut Command) -> std::io::Result<tokio::process::Child> {
    let mut attempts = 0;
    loop {
        match command.spawn() {
            Err(e) if e.raw_os_error() == Some(TEXT_FILE_BUSY) && attempts < 5 => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            other => return other,
        }
    }
}

#[cfg(all(test, unix))]
pub(crate) mod testing {
    //! Fake toolchain executables for exercising the subprocess paths.

    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable `/bin/sh` script named `name` into `dir`.
    pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// Shell snippet printing a minimal valid wasm header to stdout.
    pub const WASM_HEADER: &str = r"printf '\000asm\001\000\000\000'";
}

#[cfg(all(test, unix))]
mod tests {
    use super::testing::fake_tool;
    use super::*;

    #[tokio::test]
    async fn missing_executable_is_tool_invocation_error() {
        let cmd = Command::new("/nonexistent/wasmide-tool");
        let err = run(cmd, "wasmide-tool", Duration::from_secs(5)).await.unwrap_err();
        assert!(
            matches!(err, CompilerError::ToolInvocation { ref message, .. } if message.contains("not found"))
        );
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "sleepy", "sleep 5");
        let err = run(Command::new(&tool), "sleepy", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, CompilerError::Timeout { ref tool, .. } if tool == "sleepy"));
    }

    #[tokio::test]
    async fn captures_stderr_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "noisy", "echo oops >&2\nexit 3");
        let output = run(Command::new(&tool), "noisy", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "oops");
    }

    #[test]
    fn tool_name_uses_file_name() {
        assert_eq!(tool_name(Path::new("/usr/local/bin/tinygo")), "tinygo");
        assert_eq!(tool_name(Path::new("asc")), "asc");
    }
}
