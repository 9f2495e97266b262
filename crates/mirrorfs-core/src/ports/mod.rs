//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Remote file store operations (transfers, namespace
//!   mutations, listings, session keepalive)

pub mod remote_store;

pub use remote_store::{IRemoteStore, TransferDirection};
