use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{AssemblyScriptBackend, CompileOptions, CompilerBackend, TinyGoBackend};
use crate::disassembler::{Disassembler, Wasm2Wat};
use crate::error::{CompilerError, CompilerResult};
use crate::language::Language;
use crate::toolchain::ToolchainConfig;

/// Output of a successful compilation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    pub wasm: Vec<u8>,
    pub wat: Option<String>,
}

/// Routes a compile request to the backend registered for its language and
/// fills in the text form when asked for it.
///
/// Holds no per-request state; clones share the same backends.
#[derive(Clone)]
pub struct CompilationOrchestrator {
    backends: HashMap<Language, Arc<dyn CompilerBackend>>,
    disassembler: Arc<dyn Disassembler>,
    degrade_on_disassembly_failure: bool,
}

impl std::fmt::Debug for CompilationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut languages: Vec<_> = self.backends.keys().map(Language::as_str).collect();
        languages.sort_unstable();
        f.debug_struct("CompilationOrchestrator")
            .field("languages", &languages)
            .field("degrade_on_disassembly_failure", &self.degrade_on_disassembly_failure)
            .finish()
    }
}

impl CompilationOrchestrator {
    /// An orchestrator with no backends registered.
    pub fn new(disassembler: Arc<dyn Disassembler>) -> Self {
        Self {
            backends: HashMap::new(),
            disassembler,
            degrade_on_disassembly_failure: true,
        }
    }

    /// TinyGo, asc and wasm2wat as described by `config`.
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(Arc::new(Wasm2Wat::from_config(config)))
            .register(Arc::new(TinyGoBackend::from_config(config)))
            .register(Arc::new(AssemblyScriptBackend::from_config(config)))
            .degrade_on_disassembly_failure(config.degrade_on_disassembly_failure)
    }

    /// Register `backend` for the language it reports, replacing any previous
    /// registration.
    pub fn register(mut self, backend: Arc<dyn CompilerBackend>) -> Self {
        self.backends.insert(backend.language(), backend);
        self
    }

    pub fn degrade_on_disassembly_failure(mut self, degrade: bool) -> Self {
        self.degrade_on_disassembly_failure = degrade;
        self
    }

    pub fn supports(&self, language: Language) -> bool {
        self.backends.contains_key(&language)
    }

    pub async fn compile(
        &self,
        language: Language,
        source: &str,
        options: CompileOptions,
    ) -> CompilerResult<CompileResult> {
        let backend = self
            .backends
            .get(&language)
            .ok_or_else(|| CompilerError::UnsupportedLanguage(language.to_string()))?;

        debug!(%language, bytes = source.len(), gen_text = options.gen_text, "compiling");
        let output = backend.compile(source, options).await?;

        let wat = match output.wat {
            Some(text) => Some(text),
            None if options.gen_text => match self.disassembler.to_text(&output.wasm).await {
                Ok(text) => Some(text),
                Err(e) if self.degrade_on_disassembly_failure => {
                    warn!(%language, error = %e, "disassembly failed, returning binary only");
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        info!(
            %language,
            wasm_bytes = output.wasm.len(),
            text = wat.is_some(),
            "compilation finished"
        );
        Ok(CompileResult {
            wasm: output.wasm,
            wat,
        })
    }
}
