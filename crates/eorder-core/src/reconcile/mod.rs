//! Reconciliation of a saved order back into a row tree.
//!
//! A saved order arrives as a catalog snapshot, a header and one flat list of
//! persisted records. Parents are the records whose parent id is zero; every
//! other record is a candidate child. Each parent gets one child slot per
//! helper its document type declares, filled from the first candidate that
//! belongs to the parent and carries the helper's display name.

use eorder_api::{ApiError, OrderApiService};
use eorder_types::{
	decode_field_elements, ChildRow, County, Customer, DocTypeHelper, ExistingOrder, FieldElements,
	OrderRow, OrderType, PersistedRecord, RequireNr, StateRecord, TitleOfficer, TransType,
};
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors that prevent a saved order from being reopened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
	#[error("Saved order does not name its customer")]
	MissingCustomer,
	#[error("State {0} is not in the customer's presets")]
	UnknownState(u64),
	#[error("County {0} is not in the customer's presets")]
	UnknownCounty(u64),
}

/// Selections a saved order was made with, resolved against its catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Selections {
	pub customer: Customer,
	pub short_code: String,
	pub title_officer: Option<TitleOfficer>,
	pub state: StateRecord,
	pub county: County,
	pub order_type: Option<OrderType>,
	pub trans_type: Option<TransType>,
}

/// Resolves every selection of a saved order.
///
/// The customer is looked up by short code in `customers`, falling back to
/// the one embedded in the presets. Title officer, order type and
/// transaction type come from the first record; those that cannot be resolved
/// stay unselected.
pub fn resolve_selections(
	customers: &[Customer],
	order: &ExistingOrder,
) -> Result<Selections, ReconcileError> {
	let presets = &order.presets;
	let short_code = order
		.short_code()
		.ok_or(ReconcileError::MissingCustomer)?
		.to_string();
	let customer = customers
		.iter()
		.find(|customer| customer.short_code == short_code)
		.or(presets.customer.as_ref())
		.cloned()
		.ok_or(ReconcileError::MissingCustomer)?;

	let state = presets
		.find_state(order.header.state_id)
		.cloned()
		.ok_or(ReconcileError::UnknownState(order.header.state_id))?;
	let county = presets
		.find_county(order.header.county_id)
		.cloned()
		.ok_or(ReconcileError::UnknownCounty(order.header.county_id))?;

	let first = order.records.first();
	let title_officer = first
		.and_then(|record| record.title_officer_id)
		.and_then(|officer_id| {
			presets
				.title_officers
				.iter()
				.find(|officer| officer.id == officer_id)
		})
		.map(TitleOfficer::with_display_name);
	let order_type = first
		.and_then(|record| record.order_type.as_deref())
		.or(order.header.order_type.as_deref())
		.and_then(|description| {
			presets
				.order_types
				.iter()
				.find(|order_type| order_type.description == description)
		})
		.cloned();
	let trans_type = first
		.and_then(|record| record.trans_type.as_deref())
		.or(order.header.trans_type.as_deref())
		.and_then(|description| {
			presets
				.trans_types
				.iter()
				.find(|trans_type| trans_type.description == description)
		})
		.cloned();

	if title_officer.is_none() {
		debug!(%short_code, "saved order has no resolvable title officer");
	}

	Ok(Selections {
		customer,
		short_code,
		title_officer,
		state,
		county,
		order_type,
		trans_type,
	})
}

/// Rebuilds parent rows, with their child slots, from the flat record list.
pub fn rebuild_rows(order: &ExistingOrder) -> Vec<OrderRow> {
	let short_code = order.short_code().map(str::to_string);
	let (parents, children): (Vec<&PersistedRecord>, Vec<&PersistedRecord>) =
		order.records.iter().partition(|record| record.is_parent());

	parents
		.into_iter()
		.enumerate()
		.map(|(row_index, record)| {
			let helpers = record
				.doc_type
				.as_ref()
				.map(|doc_type| doc_type.helpers.clone())
				.unwrap_or_default();
			let child_rows = helpers
				.iter()
				.enumerate()
				.map(|(child_row_index, helper)| {
					let slot = ChildRow {
						order_number: order.header.order_number.clone(),
						short_code: short_code.clone(),
						..ChildRow::pending(row_index, child_row_index, helper)
					};
					match find_child(&children, record.document_id, helper) {
						Some(matched) => ChildRow {
							document_id: Some(matched.document_id),
							document_type_id: matched.document_type_id,
							esubmit_file_name: matched.esubmit_file_name.clone(),
							page_count: matched.page_count,
							parent_document_id: Some(matched.parent_document_id),
							..slot
						},
						None => slot,
					}
				})
				.collect();

			let existing_form_data = record
				.esubmit_doc_elements
				.as_deref()
				.map(decode_field_elements)
				.unwrap_or_else(FieldElements::new);
			let require_nr = record
				.doc_type
				.as_ref()
				.and_then(|doc_type| RequireNr::try_from(doc_type.require_nr).ok())
				.unwrap_or_default();

			OrderRow {
				document_id: Some(record.document_id),
				document_type: record.document_type.clone(),
				document_type_id: record.document_type_id,
				esubmit_file_name: record.esubmit_file_name.clone(),
				page_count: record.page_count.unwrap_or_default(),
				helpers: Some(helpers),
				notes: record.notes.clone().unwrap_or_default(),
				touched: true,
				require_nr,
				child_rows,
				selected_doc_type: record.doc_type.clone(),
				esubmit_doc_elements: record.esubmit_doc_elements.clone(),
				existing_form_data,
				..OrderRow::placeholder(row_index, record.order_number.clone())
			}
		})
		.collect()
}

/// First candidate belonging to `parent_document_id` whose type is the helper's.
fn find_child<'a>(
	children: &[&'a PersistedRecord],
	parent_document_id: u64,
	helper: &DocTypeHelper,
) -> Option<&'a PersistedRecord> {
	children.iter().copied().find(|record| {
		record.parent_document_id == parent_document_id
			&& record.document_type.as_deref() == Some(helper.display_name.as_str())
	})
}

/// Outcome of one helper lookup.
#[derive(Debug)]
pub struct HelperFetch {
	pub row_index: usize,
	pub doc_type_id: u64,
	pub result: Result<Vec<DocTypeHelper>, ApiError>,
}

/// Looks up the helpers of every typed row concurrently and returns once all
/// lookups have settled, in row order.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn fetch_helpers(api: &OrderApiService, rows: &[OrderRow]) -> Vec<HelperFetch> {
	let lookups = rows.iter().filter_map(|row| {
		let doc_type_id = row.document_type_id?;
		let row_index = row.row_index;
		Some(async move {
			HelperFetch {
				row_index,
				doc_type_id,
				result: api.doc_type_helpers(doc_type_id).await,
			}
		})
	});

	join_all(lookups).await
}

/// Summary of a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
	pub payload_id: String,
	/// Parent rows rebuilt, not counting the trailing placeholder.
	pub parent_rows: usize,
	pub filled_slots: usize,
	pub pending_slots: usize,
	pub failed_helper_fetches: usize,
}

impl ReconcileReport {
	pub fn new(payload_id: impl Into<String>, rows: &[OrderRow]) -> Self {
		let slots = rows.iter().flat_map(|row| row.child_rows.iter());
		let (pending, filled): (Vec<&ChildRow>, Vec<&ChildRow>) =
			slots.partition(|child| child.is_pending());
		Self {
			payload_id: payload_id.into(),
			parent_rows: rows.len(),
			filled_slots: filled.len(),
			pending_slots: pending.len(),
			failed_helper_fetches: 0,
		}
	}
}
