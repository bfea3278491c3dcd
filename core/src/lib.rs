// src/lib.rs

//! Vitrine: the framework-independent core of the Vitrine booking catalog.
//!
//! - `flow`: async request workflows built from named steps with before/on/after
//!   handlers, optional steps, skip conditions and early stopping, plus a
//!   type-keyed registry that dispatches a context to its flow.
//! - `upload`: picture upload validation (size, declared type, magic-byte
//!   sniffing, extension agreement, base64 payloads) and a storage directory
//!   that refuses path traversal.
//! - `slug`, `booking`, `roles`: catalog rules shared by every entry point.

pub mod booking;
pub mod error;
pub mod flow;
pub mod roles;
pub mod slug;
pub mod upload;

pub use crate::booking::BookingStatus;
pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::{Flow, FlowContext, FlowControl, FlowOutcome, FlowRegistry, Handler, SkipCondition, StepDef};
pub use crate::roles::{Role, RoleError};
pub use crate::upload::{ImageKind, StoredFile, UploadError, UploadPolicy, UploadSource, UploadStore, ValidatedImage};
