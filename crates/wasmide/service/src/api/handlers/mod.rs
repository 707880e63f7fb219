//! API request handlers

mod health;
mod projects;
mod sharing;

pub use health::*;
pub use projects::*;
pub use sharing::*;
