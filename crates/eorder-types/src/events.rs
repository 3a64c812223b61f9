//! Events published by an order session.
//!
//! Calls across the service boundary never surface errors to the caller.
//! Instead every outcome, including failures, is published as an event so
//! that observers can react or record it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Calls made across the order service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryOperation {
	FetchCustomers,
	FetchCustomerPresets,
	FetchDocTypes,
	FetchDocTypeHelpers,
	CreateOrder,
	AddDocument,
	UpdateDocument,
	RemoveDocument,
	CancelOrder,
	SaveOrder,
}

impl BoundaryOperation {
	pub fn as_str(&self) -> &'static str {
		match self {
			BoundaryOperation::FetchCustomers => "fetch_customers",
			BoundaryOperation::FetchCustomerPresets => "fetch_customer_presets",
			BoundaryOperation::FetchDocTypes => "fetch_doc_types",
			BoundaryOperation::FetchDocTypeHelpers => "fetch_doc_type_helpers",
			BoundaryOperation::CreateOrder => "create_order",
			BoundaryOperation::AddDocument => "add_document",
			BoundaryOperation::UpdateDocument => "update_document",
			BoundaryOperation::RemoveDocument => "remove_document",
			BoundaryOperation::CancelOrder => "cancel_order",
			BoundaryOperation::SaveOrder => "save_order",
		}
	}
}

impl fmt::Display for BoundaryOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Main event type of an order session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
	/// The backend assigned a payload id to a new order.
	OrderCreated { payload_id: String },
	/// A document was persisted and received its id.
	DocumentAdded {
		parent_row_index: usize,
		child_row_index: Option<usize>,
		document_id: u64,
	},
	DocumentUpdated { document_id: u64 },
	DocumentRemoved { document_id: Option<u64> },
	OrderCancelled { payload_id: Option<String> },
	/// The order was saved as a draft or submitted.
	OrderSaved { submitted: bool },
	/// A saved order was rebuilt from its persisted records.
	OrderReconciled {
		payload_id: String,
		rows: usize,
		failed_helper_fetches: usize,
	},
	/// A call across the boundary failed; local state was left as is.
	BoundaryFailed {
		operation: BoundaryOperation,
		row_index: Option<usize>,
		error: String,
	},
}
