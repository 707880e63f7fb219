//! Object storage for the web IDE.
//!
//! Project source trees and build artifacts live in a flat key space:
//! - `{owner}/{project}/src/{file}` for editable sources
//! - `{owner}/{project}/build/{main.wasm|main.wat}` for compiler output
//!
//! [`ObjectStore`] is the raw client contract; [`ObjectStorageGateway`]
//! layers the concurrent multi-file operations and presigning on top of any
//! explicitly constructed client.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
mod gateway;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;
mod traits;

pub use error::{StorageError, StorageResult};
pub use gateway::{content_type_for, join_key, FileMap, ObjectStorageGateway};
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
