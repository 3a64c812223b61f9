//! Commands and the reducer that applies them.
//!
//! Every change to an [`OrderState`] is one [`Command`]. Selection cascades
//! (choosing a customer, state or county) are sequences of commands exposed as
//! `select_*` methods so that the dependent selections are always cleared
//! together.

use super::OrderState;
use eorder_types::{
	ChildPatch, ChildRow, County, Customer, CustomerPresets, DocType, DocTypeHelper,
	EndorsementBox, Margins, OrderRow, OrderType, ProcessQueue, RowPatch, StateRecord,
	TitleOfficer, TransType,
};
use tracing::debug;

/// A single state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
	SetCustomers(Vec<Customer>),
	SetCustomerPresets(CustomerPresets),
	ResetCustomerPresets,
	SetPresetsLoading(bool),
	SetCustomer(Option<Customer>),
	SetShortCode(Option<String>),
	SetTitleOfficer(Option<TitleOfficer>),
	SetState(Option<StateRecord>),
	SetCounty(Option<County>),
	SetProcessQueues(Vec<ProcessQueue>),
	SetProcessQueue(Option<ProcessQueue>),
	SetCutOffTime(Option<String>),
	SetTransType(Option<TransType>),
	SetOrderType(Option<OrderType>),
	/// Replaces the document type list, keeping only non-PCOR types.
	SetDocTypes(Vec<DocType>),
	SetDocTypeHelpers {
		doc_type_id: u64,
		helpers: Vec<DocTypeHelper>,
	},
	SetPayloadId(Option<String>),
	SetExistingOrder(bool),
	SetMargins(Margins),
	SetEndorsementBox(EndorsementBox),
	AddRow,
	RemoveRow(usize),
	UpdateRow(RowPatch),
	UpdateChild(ChildPatch),
	AddChild(ChildRow),
	ResetRowDocTypes,
	ReplaceRows(Vec<OrderRow>),
	ResetRows,
	AssignDocType {
		row_index: usize,
		doc_type: DocType,
	},
}

impl OrderState {
	/// Applies one command.
	pub fn apply(&mut self, command: Command) {
		match command {
			Command::SetCustomers(customers) => self.customers = customers,
			Command::SetCustomerPresets(presets) => self.presets = presets,
			Command::ResetCustomerPresets => self.presets = CustomerPresets::default(),
			Command::SetPresetsLoading(loading) => self.presets_loading = loading,
			Command::SetCustomer(customer) => self.context.customer = customer,
			Command::SetShortCode(short_code) => self.context.short_code = short_code,
			Command::SetTitleOfficer(officer) => {
				self.context.title_officer = officer.map(|officer| officer.with_display_name())
			},
			Command::SetState(state) => self.context.state = state,
			Command::SetCounty(county) => self.context.county = county,
			Command::SetProcessQueues(queues) => self.process_queues = queues,
			Command::SetProcessQueue(queue) => self.context.process_queue = queue,
			Command::SetCutOffTime(time) => self.context.cut_off_time = time,
			Command::SetTransType(trans_type) => self.context.trans_type = trans_type,
			Command::SetOrderType(order_type) => self.context.order_type = order_type,
			Command::SetDocTypes(doc_types) => {
				self.doc_types = doc_types
					.into_iter()
					.filter(|doc_type| doc_type.is_pcor == 0)
					.collect();
			},
			Command::SetDocTypeHelpers {
				doc_type_id,
				helpers,
			} => {
				if let Some(doc_type) = self
					.doc_types
					.iter_mut()
					.find(|doc_type| doc_type.id == doc_type_id)
				{
					doc_type.helpers = helpers;
				}
			},
			Command::SetPayloadId(payload_id) => self.payload_id = payload_id,
			Command::SetExistingOrder(existing) => self.is_existing_order = existing,
			Command::SetMargins(margins) => self.context.margins = margins,
			Command::SetEndorsementBox(endorsement) => self.context.endorsement_box = endorsement,
			Command::AddRow => {
				self.rows.add_row();
			},
			Command::RemoveRow(row_index) => {
				self.rows.remove_row(row_index);
			},
			Command::UpdateRow(patch) => {
				self.rows.update_row(patch);
			},
			Command::UpdateChild(patch) => {
				self.rows.update_child(patch);
			},
			Command::AddChild(child) => {
				self.rows.add_child(child);
			},
			Command::ResetRowDocTypes => self.rows.reset_row_doc_types(),
			Command::ReplaceRows(rows) => self.rows.replace_rows(rows),
			Command::ResetRows => self.rows.reset(),
			Command::AssignDocType {
				row_index,
				doc_type,
			} => {
				self.rows.assign_doc_type(row_index, &doc_type);
			},
		}
	}

	/// Applies `command` and returns the resulting state.
	pub fn reduce(mut self, command: Command) -> Self {
		self.apply(command);
		self
	}

	pub fn apply_all(&mut self, commands: impl IntoIterator<Item = Command>) {
		for command in commands {
			self.apply(command);
		}
	}

	/// Clears the customer's presets and every selection that depends on them.
	pub fn reset_customer_selections(&mut self) {
		self.apply_all([
			Command::ResetCustomerPresets,
			Command::SetShortCode(None),
			Command::SetPayloadId(None),
			Command::SetTitleOfficer(None),
			Command::SetState(None),
			Command::SetCounty(None),
			Command::SetProcessQueue(None),
			Command::SetProcessQueues(Vec::new()),
			Command::SetCutOffTime(None),
			Command::SetOrderType(None),
			Command::SetTransType(None),
		]);
	}

	/// Selects a customer after clearing everything selected for the previous one.
	pub fn select_customer(&mut self, customer: Customer) {
		debug!(short_code = %customer.short_code, "selecting customer");
		self.reset_customer_selections();
		let short_code = customer.short_code.clone();
		self.apply_all([
			Command::SetCustomer(Some(customer)),
			Command::SetShortCode(Some(short_code)),
		]);
	}

	/// Selects a state and clears the county level below it.
	pub fn select_state(&mut self, state: StateRecord) {
		debug!(state_id = state.id, "selecting state");
		self.apply_all([
			Command::SetState(Some(state)),
			Command::ResetRowDocTypes,
			Command::SetCounty(None),
			Command::SetProcessQueues(Vec::new()),
			Command::SetProcessQueue(None),
			Command::SetCutOffTime(None),
		]);
	}

	/// Selects a county and derives its queues, cut-off time, margins and
	/// endorsement box from the customer's presets.
	pub fn select_county(&mut self, county: County) {
		debug!(county_id = county.id, "selecting county");
		self.apply_all([
			Command::SetCounty(Some(county)),
			Command::ResetRowDocTypes,
			Command::SetProcessQueue(None),
		]);
		self.derive_county_details();
	}

	/// Re-derives the county-dependent lists from the selected county.
	pub(crate) fn derive_county_details(&mut self) {
		let preset = self.preset_county().cloned();

		let queues = preset
			.as_ref()
			.map(County::visible_process_queues)
			.unwrap_or_default();
		let cut_off_time = preset.as_ref().and_then(|county| county.cut_off_time.clone());
		let margins = preset
			.as_ref()
			.and_then(|county| county.margins.as_deref())
			.filter(|text| !text.is_empty())
			.map(Margins::parse)
			.unwrap_or_default();
		let endorsement = preset
			.as_ref()
			.and_then(|county| county.endorsement_area.as_deref())
			.filter(|text| !text.is_empty())
			.map(EndorsementBox::parse)
			.unwrap_or_default();

		self.apply_all([
			Command::SetProcessQueues(queues),
			Command::SetCutOffTime(cut_off_time),
			Command::SetMargins(margins),
			Command::SetEndorsementBox(endorsement),
		]);
	}

	/// Empties the table and the document type list.
	pub fn reset_table(&mut self) {
		self.apply_all([Command::ResetRows, Command::SetDocTypes(Vec::new())]);
	}

	/// Drops the customer, every dependent selection and the table.
	pub fn reset_current_order(&mut self) {
		self.apply(Command::SetCustomer(None));
		self.reset_customer_selections();
		self.reset_table();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use eorder_types::DocTypeHelper;

	fn presets() -> CustomerPresets {
		serde_json::from_str(
			r#"{
				"customer": {"id": 1, "shortCode": "ACME", "usesOrderType": 1},
				"states": [{"id": 1, "name": "CA"}],
				"counties": [
					{
						"id": 10,
						"stateId": 1,
						"margins": "1|0.5|1|0.5",
						"endorsementArea": "2|3",
						"certnaCutOffTime": "15:00",
						"process_queues": [
							{"entityID": 100, "queuename": "standard", "uiVisible": "Y"},
							{"entityID": 101, "queuename": "internal", "uiVisible": "N"}
						]
					},
					{"id": 11, "stateId": 1}
				],
				"titleOfficers": [{"id": 5, "firstName": "Ada", "lastName": "Byron"}]
			}"#,
		)
		.unwrap()
	}

	fn selected_state() -> OrderState {
		let presets = presets();
		let mut state = OrderState::new();
		state.select_customer(presets.customer.clone().unwrap());
		state.apply(Command::SetCustomerPresets(presets.clone()));
		state.apply(Command::SetTitleOfficer(presets.title_officers.first().cloned()));
		state.select_state(presets.states[0].clone());
		state
	}

	#[test]
	fn test_select_county_derives_details() {
		let mut state = selected_state();
		let county = state.counties()[0].clone();
		state.select_county(county);

		let context = state.context();
		assert_eq!(state.process_queues().len(), 1);
		assert_eq!(state.process_queues()[0].entity_id, 100);
		assert_eq!(context.cut_off_time.as_deref(), Some("15:00"));
		assert_eq!(context.margins.mr, Some(0.5));
		assert_eq!(context.endorsement_box.height, Some(2.0));
		assert_eq!(context.endorsement_box.width, Some(3.0));
	}

	#[test]
	fn test_county_without_details_resets_them() {
		let mut state = selected_state();
		state.select_county(state.counties()[0].clone());
		state.select_county(state.counties()[1].clone());

		let context = state.context();
		assert!(state.process_queues().is_empty());
		assert!(context.cut_off_time.is_none());
		assert!(!context.margins.any_set());
		assert!(!context.endorsement_box.any_set());
	}

	#[test]
	fn test_select_state_clears_county_level() {
		let mut state = selected_state();
		state.select_county(state.counties()[0].clone());
		state.apply(Command::SetProcessQueue(state.process_queues().first().cloned()));

		state.select_state(state.states()[0].clone());
		let context = state.context();
		assert!(context.county.is_none());
		assert!(context.process_queue.is_none());
		assert!(context.cut_off_time.is_none());
		assert!(state.process_queues().is_empty());
	}

	#[test]
	fn test_select_customer_cascades() {
		let mut state = selected_state();
		state.select_county(state.counties()[0].clone());
		state.apply(Command::SetPayloadId(Some("P-1".into())));

		let other = Customer {
			id: 2,
			short_code: "BETA".into(),
			name: None,
			uses_order_type: 0,
			uses_trans_type: 0,
		};
		state.select_customer(other);

		let context = state.context();
		assert_eq!(context.short_code.as_deref(), Some("BETA"));
		assert!(context.title_officer.is_none());
		assert!(context.state.is_none());
		assert!(context.county.is_none());
		assert!(state.payload_id().is_none());
		assert!(state.presets().states.is_empty());
		assert!(state.process_queues().is_empty());
	}

	#[test]
	fn test_title_officer_gets_display_name() {
		let state = selected_state();
		let officer = state.context().title_officer.as_ref().unwrap();
		assert_eq!(officer.name, "Ada Byron");
	}

	#[test]
	fn test_doc_types_filter_pcor_and_take_helpers() {
		let doc_type = |id: u64, is_pcor: i64| DocType {
			id,
			display_name: format!("type {}", id),
			is_pcor,
			require_nr: 0,
			helpers: vec![],
		};

		let state = OrderState::new()
			.reduce(Command::SetDocTypes(vec![doc_type(1, 0), doc_type(2, 1)]))
			.reduce(Command::SetDocTypeHelpers {
				doc_type_id: 1,
				helpers: vec![DocTypeHelper {
					id: 9,
					display_name: "Exhibit".into(),
				}],
			});

		assert_eq!(state.doc_types().len(), 1);
		assert_eq!(state.find_doc_type(1).unwrap().helpers.len(), 1);
		assert!(state.find_doc_type(2).is_none());
	}

	#[test]
	fn test_reset_current_order() {
		let mut state = selected_state();
		state.apply_all([Command::AddRow, Command::SetDocTypes(vec![])]);
		state.reset_current_order();

		assert!(state.context().customer.is_none());
		assert!(state.context().short_code.is_none());
		assert_eq!(state.rows().len(), 1);
		assert!(state.doc_types().is_empty());
	}
}
