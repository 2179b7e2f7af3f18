//! Parsing of HTTP request files
//!
//! A request file (`.http` or `.rest`) holds HTTP requests written as plain
//! text, separated by `###` lines and parameterised with `{{variable}}`
//! placeholders. Variables come from named environments in a JSON
//! configuration file.

pub mod domain;
pub use domain::{Config, Environment, Method, RequestDescriptor};

pub mod parser;
pub use parser::{parse_document, parse_str, Error};

/// Loading request files from disk.
pub mod storage;
pub use storage::{LoadError, RequestFile};
