//! Core domain types and ports for MirrorFS
//!
//! MirrorFS mirrors a remote hierarchical file store onto a local
//! filesystem surface. This crate holds everything the other layers share:
//!
//! - [`domain`]: the [`Entry`](domain::entry::Entry) metadata record,
//!   pre-parsed [`StorePath`](domain::path::StorePath) handling, and
//!   domain errors
//! - [`tree`]: the [`NamespaceTree`](tree::NamespaceTree), the in-memory
//!   mirror of the remote+local namespace
//! - [`ports`]: the [`IRemoteStore`](ports::remote_store::IRemoteStore)
//!   trait consumed by the caching strategies
//! - [`config`]: typed YAML configuration
//! - [`codes`]: the POSIX-style integer status codes shared by all layers

pub mod codes;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tree;
