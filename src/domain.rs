//! Domain models for request files.
//!
//! This module contains the types produced by the parser (request
//! descriptors and methods) and the configuration that feeds it (named
//! environments of variables).

/// Request descriptor and method types.
pub mod request;
pub use request::{Method, RequestDescriptor, UnknownMethod, DEFAULT_PROTOCOL};

mod config;
pub use config::{Config, ConfigError, DEFAULT_CONFIG_FILE, DEFAULT_ENVIRONMENT};

mod environment;
pub use environment::Environment;
