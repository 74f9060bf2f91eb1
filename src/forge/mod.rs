//! Forge API interaction module
//!
//! Everything needed to talk to a Forge instance: credentials loading,
//! the HTTP layer, the typed endpoint client, and the wire types.
//!
//! # Module Structure
//!
//! - [`auth`] - credentials file loading and request authorization
//! - [`client`] - typed endpoint methods
//! - [`http`] - HTTP plumbing and the client error type
//! - [`types`] - wire types shared by client and commands

pub mod auth;
pub mod client;
pub mod http;
pub mod types;

pub use client::ForgeClient;
pub use http::ClientError;
