//! Fabric client extensions
//!
//! Chaincode lifecycle with custom collection types, ledger configuration
//! management, and Sidetree file index documents.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
