//! mirrorfs Cache - Caching strategies
//!
//! The strategy layer sits between the filesystem shim and the remote
//! store. Two variants share one trait:
//! - [`MinimalCache`] resolves everything on demand, one remote round trip
//!   at a time.
//! - [`FullCache`] mirrors the whole namespace in the background with a
//!   lister task, batched transfer workers, and a session keepalive.
//!
//! ## Architecture
//!
//! Strategies are driving-side application services in the hexagonal
//! architecture: they consume the `IRemoteStore` port from `mirrorfs-core`
//! and the shared [`NamespaceTree`](mirrorfs_core::tree::NamespaceTree),
//! and expose [`ICacheStrategy`] upwards. All methods report plain status
//! codes (`mirrorfs_core::codes`) the shim passes through unchanged.
//!
//! ## Key Components
//!
//! - [`ICacheStrategy`] - The strategy trait
//! - [`MinimalCache`] / [`FullCache`] - The two variants
//! - [`TransferLedger`] - Pending-transfer queues and the in-flight set

pub mod access;
pub mod full;
pub mod ledger;
pub mod minimal;
mod shared;
pub mod strategy;

pub use full::FullCache;
pub use ledger::TransferLedger;
pub use minimal::MinimalCache;
pub use strategy::ICacheStrategy;

#[cfg(test)]
pub(crate) mod testing;
