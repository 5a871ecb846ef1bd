//! Library half of the `relaylm` binary: flag parsing, catalog loading and
//! configuration wiring.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod catalog;
pub mod parser;

pub use bootstrap::{bootstrap, build_config};
pub use catalog::{CatalogError, load_models_file};
pub use parser::Cli;
