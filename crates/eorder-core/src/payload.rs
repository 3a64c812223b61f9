//! Flattening of the row tree into the bodies the order service accepts.

use crate::state::{OrderState, RowTree};
use chrono::Local;
use std::fmt::Write;
use eorder_config::WorkspaceConfig;
use eorder_types::{
	AddDocRequest, AddDocument, CancelOrderRequest, ChildRow, CreateOrderHead, CreateOrderRequest,
	DocumentPayload, DocumentRef, DocumentUpdate, ElectronicOrder, ElectronicOrderHead, OrderRow,
	OrderStatus, RemoveDocRequest, UpdateDocRequest, NOT_USED, ROOT_PARENT_ID,
};
use thiserror::Error;

/// Errors raised while assembling a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
	/// A selection the request cannot be sent without is missing.
	#[error("Missing selection: {0}")]
	MissingSelection(&'static str),
	/// The recording date format is not a valid `strftime` pattern.
	#[error("Invalid recording date format: {0}")]
	InvalidDateFormat(String),
}

/// Wire shape of a parent row.
pub fn parent_document(
	row: &OrderRow,
	processing_order: usize,
	payload_id: Option<&str>,
) -> DocumentPayload {
	DocumentPayload {
		document_id: row.document_id,
		parent_document_id: ROOT_PARENT_ID,
		document_type: row.document_type.clone(),
		document_type_id: row.document_type_id,
		order_number: row.order_number.clone(),
		page_count: Some(row.page_count),
		esubmit_file_name: row.esubmit_file_name.clone(),
		notes: Some(row.notes.clone()).filter(|notes| !notes.is_empty()),
		processing_order,
		payload_id: payload_id.map(str::to_string),
	}
}

/// Wire shape of a child slot. The child's own parent id wins over the
/// parent row's current one.
pub fn child_document(
	parent: &OrderRow,
	child: &ChildRow,
	processing_order: usize,
	payload_id: Option<&str>,
) -> DocumentPayload {
	DocumentPayload {
		document_id: child.document_id,
		parent_document_id: child
			.parent_document_id
			.or(parent.document_id)
			.unwrap_or(ROOT_PARENT_ID),
		document_type: Some(child.document_type.clone()),
		document_type_id: child.document_type_id,
		order_number: child.order_number.clone().or_else(|| parent.order_number.clone()),
		page_count: child.page_count,
		esubmit_file_name: child.esubmit_file_name.clone(),
		notes: None,
		processing_order,
		payload_id: payload_id.map(str::to_string),
	}
}

/// Flattens the tree in row order: each typed parent, then its uploaded
/// children, numbered densely from 1. Untyped parents and pending slots are
/// left out.
pub fn assemble_rows(rows: &RowTree, payload_id: Option<&str>) -> Vec<DocumentPayload> {
	let mut documents = Vec::new();
	let mut processing_order = 1;

	for row in rows.rows() {
		if row.has_doc_type() {
			documents.push(parent_document(row, processing_order, payload_id));
			processing_order += 1;
		}

		for child in row.child_rows.iter().filter(|child| !child.is_pending()) {
			documents.push(child_document(row, child, processing_order, payload_id));
			processing_order += 1;
		}
	}

	documents
}

/// Builds request bodies from an [`OrderState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadAssembler {
	not_used_label: String,
	recording_date_format: String,
}

impl Default for PayloadAssembler {
	fn default() -> Self {
		Self::new(NOT_USED, "%m/%d/%Y")
	}
}

impl PayloadAssembler {
	pub fn new(not_used_label: impl Into<String>, recording_date_format: impl Into<String>) -> Self {
		Self {
			not_used_label: not_used_label.into(),
			recording_date_format: recording_date_format.into(),
		}
	}

	pub fn from_config(config: &WorkspaceConfig) -> Self {
		Self::new(&config.not_used_label, &config.recording_date_format)
	}

	/// Today's date in the configured format.
	pub fn recording_date(&self) -> Result<String, PayloadError> {
		let mut date = String::new();
		write!(date, "{}", Local::now().format(&self.recording_date_format))
			.map_err(|_| PayloadError::InvalidDateFormat(self.recording_date_format.clone()))?;
		Ok(date)
	}

	fn describe(&self, description: Option<&str>) -> String {
		description
			.filter(|description| !description.is_empty())
			.unwrap_or(self.not_used_label.as_str())
			.to_string()
	}

	fn trans_type(&self, state: &OrderState) -> String {
		self.describe(
			state
				.context()
				.trans_type
				.as_ref()
				.map(|trans_type| trans_type.description.as_str()),
		)
	}

	fn order_type(&self, state: &OrderState) -> String {
		self.describe(
			state
				.context()
				.order_type
				.as_ref()
				.map(|order_type| order_type.description.as_str()),
		)
	}

	/// Create-order body carrying the order's first document.
	pub fn create_order(
		&self,
		state: &OrderState,
		document: DocumentPayload,
		recording_date: String,
	) -> Result<CreateOrderRequest, PayloadError> {
		let context = state.context();
		let customer = context
			.customer
			.as_ref()
			.ok_or(PayloadError::MissingSelection("customer"))?;
		let title_officer = context
			.title_officer
			.as_ref()
			.ok_or(PayloadError::MissingSelection("title officer"))?;
		let selected_state = context
			.state
			.as_ref()
			.ok_or(PayloadError::MissingSelection("state"))?;
		let county = context
			.county
			.as_ref()
			.ok_or(PayloadError::MissingSelection("county"))?;

		let head = CreateOrderHead {
			customer_id: customer.id,
			short_code: state.short_code().to_string(),
			title_officer_id: title_officer.id,
			state: selected_state.id,
			county_id: county.id,
			trans_type: self.trans_type(state),
			order_type: self.order_type(state),
			process_queue_id: context
				.process_queue
				.as_ref()
				.map(|queue| queue.queuename.clone()),
			order_number: document.order_number.clone(),
			recording_date,
		};

		Ok(CreateOrderRequest {
			head,
			rows: vec![document],
		})
	}

	/// Add-document body for one document of an existing order.
	pub fn add_document(&self, state: &OrderState, document: DocumentPayload) -> AddDocRequest {
		let context = state.context();
		AddDocRequest {
			payload_id: state.payload_id().map(str::to_string),
			short_code: state.short_code().to_string(),
			add_docs: vec![AddDocument {
				title_officer_id: context.title_officer.as_ref().map(|officer| officer.id),
				trans_type: self.trans_type(state),
				order_type: self.order_type(state),
				county_id: context.county.as_ref().map(|county| county.id),
				document,
			}],
		}
	}

	pub fn update_document(&self, state: &OrderState, update: DocumentUpdate) -> UpdateDocRequest {
		UpdateDocRequest {
			short_code: state.short_code().to_string(),
			document_id: update.document_id,
			update,
		}
	}

	pub fn remove_documents(
		&self,
		state: &OrderState,
		document_ids: impl IntoIterator<Item = u64>,
	) -> RemoveDocRequest {
		RemoveDocRequest {
			payload_id: state.payload_id().map(str::to_string),
			short_code: state.short_code().to_string(),
			docs: document_ids
				.into_iter()
				.map(|document_id| DocumentRef { document_id })
				.collect(),
		}
	}

	pub fn cancel_order(&self, state: &OrderState) -> CancelOrderRequest {
		CancelOrderRequest {
			payload_id: state.payload_id().map(str::to_string),
			short_code: state.short_code().to_string(),
		}
	}

	/// Full order body for saving (`Draft`) or submitting (`Submitted`).
	pub fn electronic_order(
		&self,
		state: &OrderState,
		status: OrderStatus,
		recording_date: String,
	) -> ElectronicOrder {
		let context = state.context();
		let head = ElectronicOrderHead {
			customer_id: context.customer.as_ref().map(|customer| customer.id),
			title_officer_id: context.title_officer.as_ref().map(|officer| officer.id),
			recording_date,
			state: context.state.as_ref().map(|selected| selected.id),
			county_id: context.county.as_ref().map(|county| county.id),
			trans_type: self.trans_type(state),
			process_queue_id: context.process_queue.as_ref().map(|queue| queue.entity_id),
			order_type: self.order_type(state),
			short_code: state.short_code().to_string(),
			order_number: state.rows().order_number().map(str::to_string),
			payload_id: state.payload_id().map(str::to_string),
			status,
		};

		ElectronicOrder {
			head,
			rows: assemble_rows(state.rows(), state.payload_id()),
		}
	}
}
