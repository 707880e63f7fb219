//! Language-specific compilation backends.
//!
//! Each backend compiles one [`Language`] by seeding a fresh
//! [`Workspace`](crate::Workspace), invoking the external toolchain inside it,
//! and reading the produced module back into memory. The workspace is always
//! released before the backend returns.

mod assemblyscript;
mod tinygo;

pub use assemblyscript::AssemblyScriptBackend;
pub use tinygo::TinyGoBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompilerResult;
use crate::language::Language;

/// File name every backend asks its toolchain to write the module to.
pub(crate) const WASM_OUTPUT: &str = "main.wasm";
/// File name for toolchains that can emit text format themselves.
pub(crate) const WAT_OUTPUT: &str = "main.wat";

/// Per-request compilation switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Also produce the WebAssembly text format.
    pub gen_text: bool,
}

/// What a backend hands back on success.
#[derive(Clone, Debug, Default)]
pub struct BackendOutput {
    pub wasm: Vec<u8>,
    /// Text format, when the toolchain emitted it in the same invocation.
    pub wat: Option<String>,
}

/// A compiler strategy bound to one source language.
#[async_trait]
pub trait CompilerBackend: Send + Sync {
    /// The language this backend compiles.
    fn language(&self) -> Language;

    /// Compile `source` into a WebAssembly module.
    ///
    /// User-code defects are reported as
    /// [`CompilerError::Diagnostics`](crate::CompilerError::Diagnostics) with
    /// workspace paths stripped.
    async fn compile(&self, source: &str, options: CompileOptions) -> CompilerResult<BackendOutput>;
}
