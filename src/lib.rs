//! Bookshelf application library
//!
//! The books module and the bootstrap that wires it to storage and HTTP.

pub mod app;
pub mod modules;

pub use app::{build_registry, run, serve};
