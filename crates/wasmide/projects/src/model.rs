use crate::share_code::ShareCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use wasmide_compiler::Language;
use wasmide_storage::{join_key, FileMap};

/// Name of the compiled module under `build/`.
pub const WASM_FILE: &str = "main.wasm";
/// Name of the text disassembly under `build/`.
pub const WAT_FILE: &str = "main.wat";

/// Opaque project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata row of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub owner_id: String,
    pub language: Language,
    pub is_shared: bool,
    pub share_code: Option<ShareCode>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>, language: Language) -> Self {
        Self {
            id: ProjectId::generate(),
            name: name.into(),
            owner_id: owner_id.into(),
            language,
            is_shared: false,
            share_code: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, caller: &str) -> bool {
        self.owner_id == caller
    }

    pub fn dir(&self) -> String {
        project_dir(&self.owner_id, &self.id)
    }

    pub fn src_dir(&self) -> String {
        src_dir(&self.owner_id, &self.id)
    }

    pub fn build_dir(&self) -> String {
        build_dir(&self.owner_id, &self.id)
    }

    /// View without files.
    pub fn view(&self) -> ProjectView {
        ProjectView {
            id: self.id.clone(),
            name: self.name.clone(),
            owner_id: self.owner_id.clone(),
            language: self.language,
            is_shared: self.is_shared,
            share_code: self.share_code.clone(),
            created_at: self.created_at,
            files: Vec::new(),
            wasm_url: None,
        }
    }

    pub fn view_with_files(&self, files: &FileMap) -> ProjectView {
        ProjectView {
            files: FileView::from_files(files),
            ..self.view()
        }
    }
}

/// `{owner}/{project}`
pub fn project_dir(owner_id: &str, id: &ProjectId) -> String {
    join_key(owner_id, id.as_str())
}

/// `{owner}/{project}/src`
pub fn src_dir(owner_id: &str, id: &ProjectId) -> String {
    join_key(&project_dir(owner_id, id), "src")
}

/// `{owner}/{project}/build`
pub fn build_dir(owner_id: &str, id: &ProjectId) -> String {
    join_key(&project_dir(owner_id, id), "build")
}

/// A project as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: ProjectId,
    pub name: String,
    pub owner_id: String,
    pub language: Language,
    pub is_shared: bool,
    pub share_code: Option<ShareCode>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<FileView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wasm_url: Option<String>,
}

impl ProjectView {
    /// The file map the view was built from.
    pub fn file_map(&self) -> FileMap {
        self.files
            .iter()
            .map(|f| (f.name.clone(), f.content.clone()))
            .collect()
    }
}

/// One editable file, tagged with the editor language of its extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileView {
    pub name: String,
    pub content: String,
    pub language: String,
}

impl FileView {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let language = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default();
        Self {
            name,
            content: content.into(),
            language,
        }
    }

    /// Views of every file, ordered by name.
    pub fn from_files(files: &FileMap) -> Vec<FileView> {
        files
            .iter()
            .map(|(name, content)| FileView::new(name.clone(), content.clone()))
            .collect()
    }
}

const DEFAULT_GO: &str = r#"package main

import (
	"syscall/js"
)

func main() {
	js.Global().Get("alert").Invoke("Hello WASM!")
}"#;

const DEFAULT_ASSEMBLYSCRIPT: &str = "export function add(a: i32, b: i32): i32 {
\treturn a + b;
}";

const DEFAULT_HTML: &str = "<h1>Hello World</h1>";

const DEFAULT_CSS: &str = "h1 {
\tcolor: red;
}";

const DEFAULT_JS: &str = r#"console.log("Hello World")"#;

/// Starter tree for a new project: the language's seed file plus a page,
/// stylesheet and script.
pub fn default_files(language: Language) -> FileMap {
    let seed = match language {
        Language::Go => DEFAULT_GO,
        Language::AssemblyScript => DEFAULT_ASSEMBLYSCRIPT,
    };
    [
        (language.seed_file_name(), seed),
        ("index.html", DEFAULT_HTML),
        ("styles.css", DEFAULT_CSS),
        ("app.js", DEFAULT_JS),
    ]
    .into_iter()
    .map(|(name, content)| (name.to_string(), content.to_string()))
    .collect()
}
