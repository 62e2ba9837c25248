//! Shared plumbing for the tinymod command-line tools.

pub mod common;
