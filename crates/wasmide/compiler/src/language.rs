use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CompilerError;

/// Source languages a project can be written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Go, compiled with TinyGo.
    Go,
    /// AssemblyScript, compiled with `asc`.
    AssemblyScript,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Go, Language::AssemblyScript];

    /// Canonical name, as persisted in the metadata store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "Go",
            Language::AssemblyScript => "AssemblyScript",
        }
    }

    /// The single file a compilation is seeded with.
    pub fn seed_file_name(&self) -> &'static str {
        match self {
            Language::Go => "main.go",
            Language::AssemblyScript => "main.ts",
        }
    }

    /// Whether the source carries `//export` markers the export scanner
    /// understands.
    pub fn supports_export_markers(&self) -> bool {
        matches!(self, Language::Go)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "go" | "tinygo" => Ok(Language::Go),
            "assemblyscript" | "as" => Ok(Language::AssemblyScript),
            _ => Err(CompilerError::UnsupportedLanguage(s.to_string())),
        }
    }
}
