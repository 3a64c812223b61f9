//! Common types for the electronic order workspace.
//!
//! This crate defines the data shared by every other crate: the customer and
//! jurisdiction catalogs as they arrive from the backend, the two-level row
//! model of an order, the flat persisted record shape, the request bodies sent
//! across the service boundary, and the field-encoding codec used for stored
//! form values.

/// Wire request and response bodies for the order service boundary.
pub mod api;
/// Customer, jurisdiction and document-type catalogs.
pub mod catalog;
/// Codec for the delimited form-field blob stored on document records.
pub mod encoding;
/// Events published by an order session.
pub mod events;
/// Order context and the parent/child row model.
pub mod order;
/// Flat records and headers of orders already persisted by the backend.
pub mod records;
/// Base trait for name-registered implementations.
pub mod registry;
/// Schema validation for implementation configuration tables.
pub mod validation;

pub use api::*;
pub use catalog::*;
pub use encoding::{decode_field_elements, encode_field_elements, FieldElements};
pub use events::*;
pub use order::*;
pub use records::*;
pub use registry::ImplementationRegistry;
pub use validation::*;
