//! Shared plumbing for the ldapadm command-line binaries.
//!
//! Each binary parses its arguments, calls [`init_tracing`] and
//! [`build_client`], runs one directory operation, and prints the result;
//! any error goes through [`fail`].

#![deny(missing_docs)]

use ldapadm_core::{Result, Settings};
use ldapadm_directory::{DirectoryClient, DirectoryConfig};
use std::path::Path;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Installs the tracing subscriber for a command-line invocation.
///
/// The filter defaults to `info` and can be overridden through `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

/// Loads the settings document and builds a connected-on-demand client.
///
/// # Errors
///
/// Returns a configuration error when the document cannot be loaded or is
/// invalid.
pub fn build_client(config_path: &Path) -> Result<DirectoryClient> {
    let settings = Settings::load(config_path)?;
    let config = DirectoryConfig::from_settings(&settings)?;
    Ok(DirectoryClient::new(config))
}

/// Logs the error and terminates the process with a nonzero status.
pub fn fail(err: ldapadm_core::Error) -> ! {
    error!("{err}");
    std::process::exit(1);
}
