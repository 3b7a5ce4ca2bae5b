//! Write-gating for Harbor repositories.
//!
//! Every mutating store operation asks the [`WriteGate`] for permission
//! first. A repository is read-only while it is archived (a durable flag on
//! its metadata, mirrored into memory by repository events) or while it is
//! being exported (an in-memory flag held only for the duration of the
//! export callback). A small set of verbs (`read`, `pull`) stays permitted
//! even on read-only repositories.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use harbor_gate::{GateStatusRegistry, WriteGate};
//! use harbor_types::RepositoryId;
//!
//! let registry = Arc::new(GateStatusRegistry::new());
//! let gate = WriteGate::new(Arc::clone(&registry));
//! let id = RepositoryId::new("r1");
//!
//! assert!(gate.check(&id).is_ok());
//! let result = registry.with_exporting(&id, || gate.check(&id));
//! assert!(result.is_err());
//! assert!(gate.check(&id).is_ok());
//! ```

pub mod check;
pub mod error;
pub mod gate;
pub mod status;

pub use check::ReadOnlyCheck;
pub use error::{GateError, GateResult, ReadOnlyReason};
pub use gate::WriteGate;
pub use status::{ExportingGuard, GateStatusRegistry};
