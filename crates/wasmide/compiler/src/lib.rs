//! # wasmide-compiler
//!
//! WebAssembly compilation pipeline for the web IDE.
//!
//! Every request is compiled inside its own ephemeral [`Workspace`] by a
//! language-specific [`CompilerBackend`] that shells out to an external
//! toolchain (TinyGo or AssemblyScript). The [`CompilationOrchestrator`]
//! selects the backend, optionally disassembles the produced module through a
//! [`Disassembler`], and normalizes the result.
//!
//! [`parse_exports`] statically scans Go sources for `//export` markers.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod backend;
pub mod diagnostics;
pub mod disassembler;
pub mod error;
pub mod exports;
pub mod language;
pub mod orchestrator;
pub mod toolchain;
pub mod workspace;

pub use backend::{AssemblyScriptBackend, BackendOutput, CompileOptions, CompilerBackend, TinyGoBackend};
pub use disassembler::{Disassembler, Wasm2Wat};
pub use error::{CompilerError, CompilerResult};
pub use exports::{parse_exports, ExportMarker, ExportedFunction, FunctionDecl};
pub use language::Language;
pub use orchestrator::{CompilationOrchestrator, CompileResult};
pub use toolchain::ToolchainConfig;
pub use workspace::{create_workspace, Workspace};
