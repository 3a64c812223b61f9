//! Core of the electronic order workspace.
//!
//! An order is a table of parent document rows, each owning the child slots
//! its document type declares. This crate holds that table and the catalog
//! selections around it ([`state`]), decides when the table may be edited or
//! submitted ([`readiness`]), flattens it for the order service
//! ([`payload`]), rebuilds it from a saved order ([`reconcile`]) and ties all
//! of it to the service boundary in an [`OrderSession`].

pub mod builder;
pub mod engine;
pub mod payload;
pub mod readiness;
pub mod reconcile;
pub mod state;

pub use builder::{SessionBuilder, SessionError, SessionFactories};
pub use engine::{event_bus::EventBus, DocumentEdit, OrderSession};
pub use payload::{PayloadAssembler, PayloadError};
pub use readiness::Readiness;
pub use reconcile::{ReconcileError, ReconcileReport};
pub use state::{Command, OrderState, RowTree};
