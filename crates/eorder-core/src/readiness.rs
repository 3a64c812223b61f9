//! Readiness predicates gating table editing and submission.
//!
//! All predicates are pure functions of an [`OrderState`].

use crate::state::OrderState;
use eorder_types::{OrderRow, RequireNr};
use serde::Serialize;

/// Customer, title officer, state and county are selected.
pub fn required_fields_set(state: &OrderState) -> bool {
	let context = state.context();
	context.customer.is_some()
		&& context.title_officer.is_some()
		&& context.state.is_some()
		&& context.county.is_some()
}

/// The selected county offers visible process queues.
pub fn has_process_queue(state: &OrderState) -> bool {
	!state.process_queues().is_empty()
}

pub fn uses_order_type(state: &OrderState) -> bool {
	state
		.context()
		.customer
		.as_ref()
		.is_some_and(|customer| customer.requires_order_type())
}

pub fn uses_trans_type(state: &OrderState) -> bool {
	state
		.context()
		.customer
		.as_ref()
		.is_some_and(|customer| customer.requires_trans_type())
}

/// Each of process queue, order type and transaction type is selected
/// exactly when the context requires it.
pub fn optional_fields_set(state: &OrderState) -> bool {
	let context = state.context();
	let required = [
		has_process_queue(state),
		uses_order_type(state),
		uses_trans_type(state),
	];
	let selected = [
		context.process_queue.is_some(),
		context.order_type.is_some(),
		context.trans_type.is_some(),
	];
	required == selected
}

pub fn is_order_created(state: &OrderState) -> bool {
	state.payload_id().is_some()
}

/// The table may be edited: the order exists, or every selection it needs is made.
pub fn ready_for_table(state: &OrderState) -> bool {
	is_order_created(state) || (required_fields_set(state) && optional_fields_set(state))
}

pub fn is_ready_to_save(state: &OrderState) -> bool {
	state.payload_id().is_some_and(|payload_id| !payload_id.is_empty())
}

/// Rows persisted by the backend.
pub fn valid_row_count(state: &OrderState) -> usize {
	state
		.rows()
		.rows()
		.iter()
		.filter(|row| row.document_id.is_some())
		.count()
}

pub fn last_row_valid(state: &OrderState) -> bool {
	state.rows().last().document_id.is_some()
}

/// Every typed parent row has an uploaded file. Needs at least two rows.
pub fn parent_rows_ready(state: &OrderState) -> bool {
	let rows = state.rows().rows();
	if rows.len() < 2 {
		return false;
	}
	let typed = rows.iter().filter(|row| row.has_doc_type()).count();
	let uploaded = rows.iter().filter(|row| row.has_file()).count();
	typed == uploaded
}

/// Every row whose children are mandatory has all of them uploaded and paginated.
pub fn child_rows_ready(state: &OrderState) -> bool {
	let rows = state.rows().rows();
	if rows.len() < 2 {
		return true;
	}
	let mandatory: Vec<&OrderRow> = rows
		.iter()
		.filter(|row| row.require_nr == RequireNr::Mandatory)
		.collect();
	let satisfied = mandatory
		.iter()
		.filter(|row| row.children_complete())
		.count();
	mandatory.len() == satisfied
}

pub fn ready_to_submit(state: &OrderState) -> bool {
	parent_rows_ready(state) && child_rows_ready(state)
}

pub fn is_sub_row_complete(
	state: &OrderState,
	parent_row_index: usize,
	child_row_index: usize,
) -> bool {
	state
		.rows()
		.child(parent_row_index, child_row_index)
		.is_some_and(|child| child.is_complete())
}

pub fn uses_margins(state: &OrderState) -> bool {
	state.context().margins.any_set()
}

pub fn uses_endorsement_box(state: &OrderState) -> bool {
	state.context().endorsement_box.any_set()
}

/// Snapshot of every readiness predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
	pub required_fields_set: bool,
	pub optional_fields_set: bool,
	pub ready_for_table: bool,
	pub is_order_created: bool,
	pub is_ready_to_save: bool,
	pub parent_rows_ready: bool,
	pub child_rows_ready: bool,
	pub ready_to_submit: bool,
	pub valid_row_count: usize,
	pub last_row_valid: bool,
	pub uses_margins: bool,
	pub uses_endorsement_box: bool,
}

impl Readiness {
	pub fn evaluate(state: &OrderState) -> Self {
		Self {
			required_fields_set: required_fields_set(state),
			optional_fields_set: optional_fields_set(state),
			ready_for_table: ready_for_table(state),
			is_order_created: is_order_created(state),
			is_ready_to_save: is_ready_to_save(state),
			parent_rows_ready: parent_rows_ready(state),
			child_rows_ready: child_rows_ready(state),
			ready_to_submit: ready_to_submit(state),
			valid_row_count: valid_row_count(state),
			last_row_valid: last_row_valid(state),
			uses_margins: uses_margins(state),
			uses_endorsement_box: uses_endorsement_box(state),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::Command;
	use eorder_types::{
		ChildPatch, County, Customer, DocType, DocTypeHelper, OrderType, ProcessQueue, RowPatch,
		StateRecord, TitleOfficer,
	};

	fn customer(uses_order_type: i64) -> Customer {
		Customer {
			id: 1,
			short_code: "ACME".into(),
			name: None,
			uses_order_type,
			uses_trans_type: 0,
		}
	}

	fn with_required_fields(uses_order_type: i64) -> OrderState {
		OrderState::new()
			.reduce(Command::SetCustomer(Some(customer(uses_order_type))))
			.reduce(Command::SetTitleOfficer(Some(TitleOfficer {
				id: 2,
				first_name: "Ada".into(),
				last_name: "Byron".into(),
				name: String::new(),
			})))
			.reduce(Command::SetState(Some(StateRecord {
				id: 3,
				name: None,
				abbreviation: None,
			})))
			.reduce(Command::SetCounty(Some(County {
				id: 4,
				state_id: 3,
				name: None,
				margins: None,
				endorsement_area: None,
				process_queues: None,
				cut_off_time: None,
			})))
	}

	fn deed(require_nr: u8) -> DocType {
		DocType {
			id: 7,
			display_name: "Deed".into(),
			is_pcor: 0,
			require_nr,
			helpers: vec![DocTypeHelper {
				id: 71,
				display_name: "Exhibit A".into(),
			}],
		}
	}

	fn uploaded(row_index: usize) -> Command {
		Command::UpdateRow(RowPatch {
			esubmit_file_name: Some(Some(format!("doc-{}.pdf", row_index))),
			..RowPatch::new(row_index)
		})
	}

	#[test]
	fn test_required_fields_gate_table_until_order_exists() {
		let state = OrderState::new();
		assert!(!required_fields_set(&state));
		assert!(!ready_for_table(&state));

		let state = state.reduce(Command::SetPayloadId(Some("P-1".into())));
		assert!(ready_for_table(&state));
		assert!(is_order_created(&state));
		assert!(is_ready_to_save(&state));
	}

	#[test]
	fn test_optional_fields_must_match_requirements() {
		let state = with_required_fields(0);
		assert!(required_fields_set(&state));
		assert!(optional_fields_set(&state));
		assert!(ready_for_table(&state));

		// customer uses order types but none is selected
		let state = with_required_fields(1);
		assert!(!optional_fields_set(&state));
		let state = state.reduce(Command::SetOrderType(Some(OrderType {
			id: None,
			description: "Refinance".into(),
		})));
		assert!(optional_fields_set(&state));

		// a queue selected where none is offered is also a mismatch
		let state = with_required_fields(0).reduce(Command::SetProcessQueue(Some(ProcessQueue {
			entity_id: 1,
			queuename: "q".into(),
			ui_visible: "Y".into(),
		})));
		assert!(!optional_fields_set(&state));
	}

	#[test]
	fn test_parent_rows_ready() {
		let state = OrderState::new().reduce(Command::AssignDocType {
			row_index: 0,
			doc_type: deed(0),
		});
		assert!(!parent_rows_ready(&state), "a single row is never ready");

		let state = state.reduce(uploaded(0)).reduce(Command::AddRow);
		assert!(parent_rows_ready(&state));

		let state = state.reduce(Command::AssignDocType {
			row_index: 1,
			doc_type: deed(0),
		});
		assert!(!parent_rows_ready(&state));
	}

	#[test]
	fn test_child_rows_ready_for_mandatory_rows() {
		let state = OrderState::new()
			.reduce(Command::AssignDocType {
				row_index: 0,
				doc_type: deed(2),
			})
			.reduce(uploaded(0))
			.reduce(Command::AddRow);
		assert!(parent_rows_ready(&state));
		assert!(!child_rows_ready(&state));
		assert!(!ready_to_submit(&state));
		assert!(!is_sub_row_complete(&state, 0, 0));

		let state = state.reduce(Command::UpdateChild(ChildPatch {
			esubmit_file_name: Some(Some("exhibit.pdf".into())),
			page_count: Some(Some(2)),
			..ChildPatch::new(0, 0)
		}));
		assert!(child_rows_ready(&state));
		assert!(ready_to_submit(&state));
		assert!(is_sub_row_complete(&state, 0, 0));
	}

	#[test]
	fn test_zero_page_count_is_incomplete() {
		let state = OrderState::new()
			.reduce(Command::AssignDocType {
				row_index: 0,
				doc_type: deed(2),
			})
			.reduce(Command::AddRow)
			.reduce(Command::UpdateChild(ChildPatch {
				esubmit_file_name: Some(Some("exhibit.pdf".into())),
				page_count: Some(Some(0)),
				..ChildPatch::new(0, 0)
			}));
		assert!(!child_rows_ready(&state));
	}

	#[test]
	fn test_row_validity() {
		let state = OrderState::new().reduce(Command::UpdateRow(RowPatch {
			document_id: Some(Some(10)),
			..RowPatch::new(0)
		}));
		assert_eq!(valid_row_count(&state), 1);
		assert!(last_row_valid(&state));

		let state = state.reduce(Command::AddRow);
		assert_eq!(valid_row_count(&state), 1);
		assert!(!last_row_valid(&state));
	}

	#[test]
	fn test_snapshot_matches_predicates() {
		let state = with_required_fields(0);
		let readiness = Readiness::evaluate(&state);
		assert!(readiness.ready_for_table);
		assert!(!readiness.ready_to_submit);
		assert!(!readiness.uses_margins);
		assert_eq!(readiness.valid_row_count, 0);
	}
}
