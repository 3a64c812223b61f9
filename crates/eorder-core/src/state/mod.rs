//! State of the order being edited.
//!
//! [`OrderState`] is the single owner of everything a session knows: the
//! fetched catalog, the selections made against it, and the row tree. It only
//! changes through [`Command`]s, see [`command`].

pub mod command;
pub mod rows;

pub use command::Command;
pub use rows::RowTree;

use eorder_types::{
	ChildRow, County, Customer, CustomerPresets, DocType, FieldElements, OrderContext, OrderRow,
	OrderType, ProcessQueue, StateRecord, TitleOfficer, TransType,
};
use serde::Serialize;

/// Catalog, selections and rows of one order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderState {
	pub(crate) context: OrderContext,
	pub(crate) customers: Vec<Customer>,
	pub(crate) presets: CustomerPresets,
	pub(crate) presets_loading: bool,
	/// Visible queues of the selected county.
	pub(crate) process_queues: Vec<ProcessQueue>,
	/// Recordable, non-PCOR document types of the selected county.
	pub(crate) doc_types: Vec<DocType>,
	pub(crate) rows: RowTree,
	pub(crate) payload_id: Option<String>,
	pub(crate) is_existing_order: bool,
}

impl OrderState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn context(&self) -> &OrderContext {
		&self.context
	}

	pub fn customers(&self) -> &[Customer] {
		&self.customers
	}

	pub fn presets(&self) -> &CustomerPresets {
		&self.presets
	}

	pub fn presets_loading(&self) -> bool {
		self.presets_loading
	}

	pub fn states(&self) -> &[StateRecord] {
		&self.presets.states
	}

	/// Counties of the selected state; empty while no state is selected.
	pub fn counties(&self) -> Vec<County> {
		match &self.context.state {
			Some(state) => self.presets.counties_in(state.id),
			None => Vec::new(),
		}
	}

	pub fn order_types(&self) -> &[OrderType] {
		&self.presets.order_types
	}

	pub fn trans_types(&self) -> &[TransType] {
		&self.presets.trans_types
	}

	pub fn title_officers(&self) -> Vec<TitleOfficer> {
		self.presets.title_officer_list()
	}

	pub fn process_queues(&self) -> &[ProcessQueue] {
		&self.process_queues
	}

	pub fn doc_types(&self) -> &[DocType] {
		&self.doc_types
	}

	pub fn find_doc_type(&self, doc_type_id: u64) -> Option<&DocType> {
		self.doc_types.iter().find(|doc_type| doc_type.id == doc_type_id)
	}

	pub fn rows(&self) -> &RowTree {
		&self.rows
	}

	pub fn row(&self, row_index: usize) -> Option<&OrderRow> {
		self.rows.get(row_index)
	}

	pub fn child_rows(&self, parent_row_index: usize) -> &[ChildRow] {
		self.rows
			.get(parent_row_index)
			.map(|row| row.child_rows.as_slice())
			.unwrap_or_default()
	}

	pub fn parent_document_id(&self, row_index: usize) -> Option<u64> {
		self.rows.get(row_index).and_then(|row| row.document_id)
	}

	pub fn sub_row_document_id(&self, parent_row_index: usize, child_row_index: usize) -> Option<u64> {
		self.rows
			.child(parent_row_index, child_row_index)
			.and_then(|child| child.document_id)
	}

	/// Decoded form values a saved parent row was recorded with.
	pub fn existing_form_data(&self, row_index: usize) -> Option<&FieldElements> {
		self.rows.get(row_index).map(|row| &row.existing_form_data)
	}

	pub fn payload_id(&self) -> Option<&str> {
		self.payload_id.as_deref()
	}

	pub fn is_existing_order(&self) -> bool {
		self.is_existing_order
	}

	pub fn short_code(&self) -> &str {
		self.context.short_code.as_deref().unwrap_or_default()
	}

	/// The selected county as listed in the customer's presets.
	pub fn preset_county(&self) -> Option<&County> {
		let county_id = self.context.county.as_ref()?.id;
		self.presets.find_county(county_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_counties_follow_selected_state() {
		let presets: CustomerPresets = serde_json::from_str(
			r#"{
				"states": [{"id": 1}, {"stateID": 2}],
				"counties": [{"id": 10, "stateId": 1}, {"id": 20, "stateId": 2}]
			}"#,
		)
		.unwrap();

		let mut state = OrderState::new();
		state.apply(Command::SetCustomerPresets(presets));
		assert!(state.counties().is_empty());

		let second = state.states()[1].clone();
		state.apply(Command::SetState(Some(second)));
		let ids: Vec<u64> = state.counties().iter().map(|c| c.id).collect();
		assert_eq!(ids, vec![20]);
	}

	#[test]
	fn test_row_lookups_on_fresh_state() {
		let state = OrderState::new();
		assert_eq!(state.rows().len(), 1);
		assert!(state.child_rows(3).is_empty());
		assert!(state.parent_document_id(0).is_none());
		assert!(state.sub_row_document_id(0, 0).is_none());
		assert!(state.existing_form_data(0).unwrap().is_empty());
		assert_eq!(state.short_code(), "");
	}
}
