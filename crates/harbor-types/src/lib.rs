//! Foundation types for Harbor.
//!
//! This crate provides the identity and addressing types used throughout the
//! Harbor persistence core. Every other Harbor crate depends on
//! `harbor-types`.
//!
//! # Key Types
//!
//! - [`RepositoryId`] — Opaque logical identifier of a hosted repository
//! - [`NamespaceName`] — Name of a repository namespace
//! - [`Repository`] — Persisted repository metadata (including the archived flag)
//! - [`Changeset`] — A single accepted change, carried by post-receive events
//! - [`Scope`] — Global, namespace, or repository-level store context
//! - [`StoreType`] — Config, data, or blob store kind

pub mod repository;
pub mod scope;

pub use repository::{Changeset, NamespaceName, Repository, RepositoryId};
pub use scope::{Scope, StoreType};
