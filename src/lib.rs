//! odoo-agent: Guarded RPC Access to Odoo
//!
//! A profile-bound execution core for Odoo's external API. Every call passes
//! through guardrails, layered context merging and an optional result cache before
//! it reaches the JSON-RPC transport. A script engine runs multi-step documents on
//! top of the core, passing ids between steps and applying a failure policy.

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod guardrail;
pub mod logging;
pub mod operation;
pub mod profile;
pub mod script;
pub mod transport;

pub use client::RpcClient;
pub use error::{ApiError, ErrorKind, ErrorReport};
pub use operation::Operation;
pub use profile::Profile;
