//! tabjar - per-tab cookie isolation
//!
//! Every browser tab gets its own cookie store. Cookies for a domain are
//! copied into the store of the tab that received them, and outgoing
//! requests only carry the cookies found in the issuing tab's store.

pub mod cli;
pub mod config;
pub mod cookies;
pub mod error;
pub mod exit_code;
pub mod extension;
pub mod filter;
pub mod http;
pub mod logging;
pub mod output;
pub mod propagation;
pub mod tabs;
pub mod utils;

pub use error::{Result, TabJarError};
pub use extension::{EventOutcome, Extension, HostEvent};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
