//! forgectl: command-line administration for a hosted Forge service.
//!
//! The service's resource model is groups containing subgroups and
//! projects, plus users and per-project approval rules, all behind a
//! paginated REST API. forgectl enumerates, filters, bulk-creates,
//! bulk-deletes and bulk-updates those resources with a three-tier
//! configuration (defaults, config file, CLI) and dry-run support for
//! every mutation.
//!
//! # Module Structure
//!
//! - [`options`] - the typed options tree and its three-tier resolution
//! - [`commands`] - the command tree, dispatch, and the leaf commands
//! - [`resolve`] - the per-invocation driver from argv to exit code
//! - [`forge`] - REST client, wire types, credentials
//! - [`traverse`] - paginated, filtered walks over the resource tree
//! - [`mutate`] - the dry-run-aware bulk mutation loop
//! - [`userfile`] - the users roster file read/write/merge

pub mod commands;
pub mod forge;
pub mod mutate;
pub mod options;
pub mod resolve;
pub mod traverse;
pub mod userfile;

/// Version injected at build time via the FORGECTL_VERSION env var (set
/// by CI), or the crate version for local builds.
pub const VERSION: &str = match option_env!("FORGECTL_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
