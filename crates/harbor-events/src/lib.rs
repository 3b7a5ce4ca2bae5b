//! Repository lifecycle event bus for Harbor.
//!
//! The bus carries repository CRUD notifications, cache-clear requests, and
//! the pre-/post-receive hook events, and is the only way state changes
//! propagate between the store engine, the write gate, and read-path caches.
//!
//! Delivery comes in three explicit flavors, one channel type each:
//!
//! - [`SyncChannel`] — handlers run on the publisher's thread, in
//!   registration order. Used for events whose effects must be visible to
//!   the next operation (archived-flag mirroring, cache eviction).
//! - [`VetoChannel`] — synchronous like [`SyncChannel`], but any handler can
//!   return a [`Veto`] which aborts delivery and must abort the write that
//!   triggered the event. This is the pre-receive contract.
//! - [`AsyncChannel`] — fire-and-forget; handlers run on the bus's
//!   dispatcher thread. This is the post-receive contract: side effects
//!   happen after the data is durably committed, off the writer's path.
//!
//! Subscribers that only care about a single repository register a predicate
//! via `subscribe_filtered` (see [`scoped`]) so unrelated repositories never
//! trigger them.

pub mod bus;
pub mod channel;
pub mod error;
pub mod event;

pub use bus::EventBus;
pub use channel::{AsyncChannel, SyncChannel, VetoChannel};
pub use error::Veto;
pub use event::{
    scoped, ClearRepositoryCacheEvent, PostReceiveEvent, PreReceiveEvent, RepositoryEvent,
    RepositoryEventKind, RepositoryScoped,
};
