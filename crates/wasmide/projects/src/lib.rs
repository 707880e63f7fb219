//! Projects for the web IDE.
//!
//! A project is a metadata row (owner, name, language, sharing state) plus
//! two object-storage trees: `{owner}/{project}/src` with the editable files
//! and `{owner}/{project}/build` with the last compiled artifacts.
//!
//! - [`ProjectRepository`] owns the metadata/object-storage coordination and
//!   drives compilation.
//! - [`SharingController`] hands out share codes and forks shared projects.
//! - [`ProjectStore`] is the metadata contract, with in-memory and (behind
//!   the `postgres` feature) PostgreSQL implementations.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
mod model;
mod repository;
mod share_code;
mod sharing;
pub mod store;

pub use error::{MetadataError, MetadataResult, ProjectError, ProjectResult};
pub use model::{
    build_dir, default_files, project_dir, src_dir, FileView, Project, ProjectId, ProjectView,
    WASM_FILE, WAT_FILE,
};
pub use repository::{ProjectRepository, ProjectsConfig};
pub use share_code::{ShareCode, SHARE_CODE_LEN};
pub use sharing::{ShareState, SharingController};
pub use store::{InMemoryProjectStore, ProjectStore};
