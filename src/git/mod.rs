//! Version-control boundary: changed files and diff text from the `git` CLI.

mod client;

pub use client::{DiffMode, GitClient};
