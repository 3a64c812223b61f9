//! Order session: the single owner of an order being edited.
//!
//! [`OrderSession`] pairs an [`OrderState`] with the order service. Actions
//! take `&mut self`, so two mutations never interleave. Calls across the
//! service boundary never fail the action: a failure is logged, published as
//! [`SessionEvent::BoundaryFailed`] and leaves local state as it was before
//! the call. Mutations committed ahead of a failing call stay in effect.

pub mod event_bus;

use crate::payload::{child_document, parent_document, PayloadAssembler, PayloadError};
use crate::readiness::{self, Readiness};
use crate::reconcile::{
	fetch_helpers, rebuild_rows, resolve_selections, ReconcileError, ReconcileReport,
};
use crate::state::{Command, OrderState};
use eorder_api::{ApiError, OrderApiService};
use eorder_types::{
	BoundaryOperation, ChildPatch, County, Customer, DocumentUpdate, ElectronicOrder,
	ExistingOrder, OrderStatus, RowPatch, SessionEvent, StateRecord, ROOT_PARENT_ID,
};
use event_bus::EventBus;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

/// Changes made to a persisted document.
///
/// Whether the document is a parent row or a child slot is decided by
/// `parent_document_id`: zero addresses the parent row at
/// `parent_row_index`, anything else a child slot of that row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentEdit {
	pub document_id: u64,
	pub parent_document_id: u64,
	pub parent_row_index: usize,
	/// Child slot to update. When absent, the slot is found by `document_id`.
	pub child_row_index: Option<usize>,
	pub esubmit_file_name: Option<String>,
	pub page_count: Option<u32>,
	pub order_number: Option<String>,
	pub document_type: Option<String>,
	pub document_type_id: Option<u64>,
}

/// An order being edited against the order service.
pub struct OrderSession {
	workspace_id: String,
	state: OrderState,
	api: Arc<OrderApiService>,
	assembler: PayloadAssembler,
	event_bus: EventBus,
}

impl OrderSession {
	pub fn new(
		workspace_id: impl Into<String>,
		api: Arc<OrderApiService>,
		assembler: PayloadAssembler,
		event_bus: EventBus,
	) -> Self {
		Self {
			workspace_id: workspace_id.into(),
			state: OrderState::new(),
			api,
			assembler,
			event_bus,
		}
	}

	pub fn workspace_id(&self) -> &str {
		&self.workspace_id
	}

	pub fn state(&self) -> &OrderState {
		&self.state
	}

	pub fn readiness(&self) -> Readiness {
		Readiness::evaluate(&self.state)
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.event_bus.subscribe()
	}

	/// Applies a command directly, for selections that need no service call.
	pub fn apply(&mut self, command: Command) {
		self.state.apply(command);
	}

	/// The body a save would send right now.
	pub fn electronic_order(&self, status: OrderStatus) -> Result<ElectronicOrder, PayloadError> {
		let recording_date = self.assembler.recording_date()?;
		Ok(self.assembler.electronic_order(&self.state, status, recording_date))
	}

	fn publish(&self, event: SessionEvent) {
		self.event_bus.publish(event).ok();
	}

	fn report_failure(&self, operation: BoundaryOperation, row_index: Option<usize>, error: String) {
		warn!(
			workspace_id = %self.workspace_id,
			%operation,
			?row_index,
			%error,
			"Order service call failed"
		);
		self.publish(SessionEvent::BoundaryFailed {
			operation,
			row_index,
			error,
		});
	}

	fn report_api_failure(
		&self,
		operation: BoundaryOperation,
		row_index: Option<usize>,
		error: &ApiError,
	) {
		self.report_failure(operation, row_index, error.to_string());
	}

	#[instrument(skip_all)]
	pub async fn fetch_customers(&mut self) {
		match self.api.customers().await {
			Ok(customers) => {
				debug!(count = customers.len(), "Loaded customers");
				self.apply(Command::SetCustomers(customers));
			},
			Err(e) => self.report_api_failure(BoundaryOperation::FetchCustomers, None, &e),
		}
	}

	/// Selects a customer, clearing the previous customer's selections, and
	/// loads the customer's presets.
	#[instrument(skip_all, fields(short_code = %customer.short_code))]
	pub async fn select_customer(&mut self, customer: Customer) {
		let short_code = customer.short_code.clone();
		self.state.select_customer(customer);
		self.fetch_customer_presets(&short_code).await;
	}

	pub async fn fetch_customer_presets(&mut self, short_code: &str) {
		self.apply(Command::SetPresetsLoading(true));
		match self.api.customer_presets(short_code).await {
			Ok(presets) => self.apply(Command::SetCustomerPresets(presets)),
			Err(e) => self.report_api_failure(BoundaryOperation::FetchCustomerPresets, None, &e),
		}
		self.apply(Command::SetPresetsLoading(false));
	}

	pub fn select_state(&mut self, state: StateRecord) {
		self.state.select_state(state);
	}

	/// Selects a county and loads its document types.
	#[instrument(skip_all, fields(county_id = county.id))]
	pub async fn select_county(&mut self, county: County) {
		self.state.select_county(county);
		self.fetch_doc_types().await;
	}

	pub async fn fetch_doc_types(&mut self) {
		let Some(county_id) = self.state.context().county.as_ref().map(|county| county.id) else {
			debug!("No county selected, skipping document type fetch");
			return;
		};

		match self.api.doc_types(county_id).await {
			Ok(doc_types) => self.apply(Command::SetDocTypes(doc_types)),
			Err(e) => self.report_api_failure(BoundaryOperation::FetchDocTypes, None, &e),
		}
	}

	/// Loads a document type's helpers into the catalog and onto the row.
	/// Returns whether the lookup succeeded.
	pub async fn fetch_doc_type_helpers(&mut self, row_index: usize, doc_type_id: u64) -> bool {
		match self.api.doc_type_helpers(doc_type_id).await {
			Ok(helpers) => {
				self.apply_all([
					Command::SetDocTypeHelpers {
						doc_type_id,
						helpers: helpers.clone(),
					},
					Command::UpdateRow(RowPatch {
						helpers: Some(Some(helpers)),
						..RowPatch::new(row_index)
					}),
				]);
				true
			},
			Err(e) => {
				self.report_api_failure(BoundaryOperation::FetchDocTypeHelpers, Some(row_index), &e);
				false
			},
		}
	}

	/// Gives a row a document type from the catalog, rebuilding its child
	/// slots from the freshest helper list available.
	#[instrument(skip_all, fields(row_index = row_index, doc_type_id = doc_type_id))]
	pub async fn select_doc_type(&mut self, row_index: usize, doc_type_id: u64) {
		self.fetch_doc_type_helpers(row_index, doc_type_id).await;
		match self.state.find_doc_type(doc_type_id).cloned() {
			Some(doc_type) => self.apply(Command::AssignDocType {
				row_index,
				doc_type,
			}),
			None => debug!(doc_type_id, "Document type is not in the catalog"),
		}
	}

	fn apply_all(&mut self, commands: impl IntoIterator<Item = Command>) {
		self.state.apply_all(commands);
	}

	/// Creates the order on the backend with the first row as its first document.
	#[instrument(skip_all)]
	pub async fn init_order(&mut self, patch: RowPatch) {
		let patch = RowPatch {
			row_index: 0,
			..patch
		};
		let mut row = self.state.rows().first().clone();
		row.merge(patch.clone());

		let document = parent_document(&row, 1, None);
		let request = match self
			.assembler
			.recording_date()
			.and_then(|date| self.assembler.create_order(&self.state, document, date))
		{
			Ok(request) => request,
			Err(e) => {
				self.report_failure(BoundaryOperation::CreateOrder, Some(0), e.to_string());
				return;
			},
		};

		match self.api.create_order(&request).await {
			Ok(response) => {
				let payload_id = response.head.payload_id;
				let document_id = response.rows.first().map(|doc| doc.document_id);
				self.apply_all([
					Command::SetPayloadId(Some(payload_id.clone())),
					Command::UpdateRow(RowPatch {
						document_id: Some(document_id),
						touched: Some(true),
						..patch
					}),
				]);
				info!(%payload_id, "Order created");
				self.publish(SessionEvent::OrderCreated { payload_id });
				if let Some(document_id) = document_id {
					self.publish(SessionEvent::DocumentAdded {
						parent_row_index: 0,
						child_row_index: None,
						document_id,
					});
				}
			},
			Err(e) => self.report_api_failure(BoundaryOperation::CreateOrder, Some(0), &e),
		}
	}

	/// Persists a parent row of an existing order.
	#[instrument(skip_all, fields(row_index = patch.row_index))]
	pub async fn add_row_document(&mut self, patch: RowPatch) {
		let row_index = patch.row_index;
		let Some(mut row) = self.state.row(row_index).cloned() else {
			debug!(row_index, "Ignoring document for unknown row");
			return;
		};
		row.merge(patch.clone());

		let processing_order = row.processing_order.unwrap_or(row_index + 1);
		let document = parent_document(&row, processing_order, self.state.payload_id());
		let request = self.assembler.add_document(&self.state, document);

		match self.api.add_doc(&request).await {
			Ok(response) => {
				let Some(document_id) = response.docs_added.first().map(|doc| doc.document_id)
				else {
					self.report_failure(
						BoundaryOperation::AddDocument,
						Some(row_index),
						"no document id returned".to_string(),
					);
					return;
				};
				self.apply(Command::UpdateRow(RowPatch {
					document_id: Some(Some(document_id)),
					touched: Some(true),
					..patch
				}));
				self.publish(SessionEvent::DocumentAdded {
					parent_row_index: row_index,
					child_row_index: None,
					document_id,
				});
			},
			Err(e) => self.report_api_failure(BoundaryOperation::AddDocument, Some(row_index), &e),
		}
	}

	/// Persists an uploaded child slot.
	#[instrument(skip_all, fields(parent_row_index = patch.parent_row_index, child_row_index = patch.child_row_index))]
	pub async fn add_sub_row_document(&mut self, patch: ChildPatch) {
		let parent_row_index = patch.parent_row_index;
		let child_row_index = patch.child_row_index;
		let Some(parent) = self.state.row(parent_row_index).cloned() else {
			debug!(parent_row_index, "Ignoring sub-document for unknown row");
			return;
		};
		let Some(mut child) = parent.child_rows.get(child_row_index).cloned() else {
			debug!(parent_row_index, child_row_index, "Ignoring sub-document for unknown slot");
			return;
		};
		child.merge(patch.clone());

		let processing_order = parent.processing_order.unwrap_or(parent_row_index + 1);
		let document =
			child_document(&parent, &child, processing_order, self.state.payload_id());
		let parent_document_id = document.parent_document_id;
		let request = self.assembler.add_document(&self.state, document);

		match self.api.add_doc(&request).await {
			Ok(response) => {
				let Some(document_id) = response.docs_added.first().map(|doc| doc.document_id)
				else {
					self.report_failure(
						BoundaryOperation::AddDocument,
						Some(parent_row_index),
						"no document id returned".to_string(),
					);
					return;
				};
				self.apply(Command::UpdateChild(ChildPatch {
					document_id: Some(Some(document_id)),
					parent_document_id: Some(Some(parent_document_id)),
					..patch
				}));
				self.publish(SessionEvent::DocumentAdded {
					parent_row_index,
					child_row_index: Some(child_row_index),
					document_id,
				});
			},
			Err(e) => {
				self.report_api_failure(BoundaryOperation::AddDocument, Some(parent_row_index), &e)
			},
		}
	}

	/// Sends a document edit and, once accepted, applies it to the parent row
	/// or child slot it addresses.
	#[instrument(skip_all, fields(document_id = edit.document_id))]
	pub async fn update_document(&mut self, edit: DocumentEdit) {
		let update = DocumentUpdate {
			esubmit_file_name: edit.esubmit_file_name.clone(),
			page_count: edit.page_count,
			order_number: edit.order_number.clone(),
			document_type: edit.document_type.clone(),
			document_type_id: edit.document_type_id,
			document_id: edit.document_id,
			parent_document_id: edit.parent_document_id,
		};
		let request = self.assembler.update_document(&self.state, update);

		if let Err(e) = self.api.update_doc(&request).await {
			self.report_api_failure(
				BoundaryOperation::UpdateDocument,
				Some(edit.parent_row_index),
				&e,
			);
			return;
		}

		if edit.parent_document_id == ROOT_PARENT_ID {
			self.apply(Command::UpdateRow(RowPatch {
				esubmit_file_name: edit.esubmit_file_name.map(Some),
				page_count: edit.page_count,
				order_number: edit.order_number.map(Some),
				document_type: edit.document_type.map(Some),
				document_type_id: edit.document_type_id.map(Some),
				..RowPatch::new(edit.parent_row_index)
			}));
		} else {
			let child_row_index = edit.child_row_index.or_else(|| {
				self.state
					.child_rows(edit.parent_row_index)
					.iter()
					.position(|child| child.document_id == Some(edit.document_id))
			});
			let Some(child_row_index) = child_row_index else {
				debug!(
					parent_row_index = edit.parent_row_index,
					"Updated document has no slot in the table"
				);
				return;
			};
			self.apply(Command::UpdateChild(ChildPatch {
				document_type: edit.document_type,
				document_type_id: edit.document_type_id.map(Some),
				esubmit_file_name: edit.esubmit_file_name.map(Some),
				page_count: edit.page_count.map(Some),
				parent_document_id: Some(Some(edit.parent_document_id)),
				..ChildPatch::new(edit.parent_row_index, child_row_index)
			}));
		}

		self.publish(SessionEvent::DocumentUpdated {
			document_id: edit.document_id,
		});
	}

	/// Removes a row locally, then its document on the backend. Rows that
	/// were never persisted are only removed locally.
	#[instrument(skip_all, fields(row_index = row_index))]
	pub async fn remove_row(&mut self, row_index: usize) {
		if self.state.row(row_index).is_none() {
			debug!(row_index, "Ignoring removal of unknown row");
			return;
		}
		let document_id = self.state.parent_document_id(row_index);
		self.apply(Command::RemoveRow(row_index));

		let Some(document_id) = document_id else {
			self.publish(SessionEvent::DocumentRemoved { document_id: None });
			return;
		};

		let request = self.assembler.remove_documents(&self.state, [document_id]);
		match self.api.remove_doc(&request).await {
			Ok(()) => self.publish(SessionEvent::DocumentRemoved {
				document_id: Some(document_id),
			}),
			Err(e) => {
				self.report_api_failure(BoundaryOperation::RemoveDocument, Some(row_index), &e)
			},
		}
	}

	/// Clears an uploaded child slot back to pending and removes its document.
	#[instrument(skip_all, fields(parent_row_index = parent_row_index, child_row_index = child_row_index))]
	pub async fn delete_sub_row_document(&mut self, parent_row_index: usize, child_row_index: usize) {
		if self.state.rows().child(parent_row_index, child_row_index).is_none() {
			debug!(parent_row_index, child_row_index, "Ignoring removal of unknown slot");
			return;
		}
		let document_id = self
			.state
			.sub_row_document_id(parent_row_index, child_row_index);
		self.apply(Command::UpdateChild(ChildPatch {
			document_id: Some(None),
			esubmit_file_name: Some(None),
			page_count: Some(None),
			..ChildPatch::new(parent_row_index, child_row_index)
		}));

		let Some(document_id) = document_id else {
			self.publish(SessionEvent::DocumentRemoved { document_id: None });
			return;
		};

		let request = self.assembler.remove_documents(&self.state, [document_id]);
		match self.api.remove_doc(&request).await {
			Ok(()) => self.publish(SessionEvent::DocumentRemoved {
				document_id: Some(document_id),
			}),
			Err(e) => self.report_api_failure(
				BoundaryOperation::RemoveDocument,
				Some(parent_row_index),
				&e,
			),
		}
	}

	#[instrument(skip_all)]
	pub async fn cancel_order(&mut self) {
		let request = self.assembler.cancel_order(&self.state);
		match self.api.cancel_order(&request).await {
			Ok(()) => {
				info!(payload_id = ?request.payload_id, "Order cancelled");
				self.publish(SessionEvent::OrderCancelled {
					payload_id: request.payload_id,
				});
			},
			Err(e) => self.report_api_failure(BoundaryOperation::CancelOrder, None, &e),
		}
	}

	pub async fn save_draft(&mut self) {
		self.save(OrderStatus::Draft).await;
	}

	/// Submits the order. Refused while the table is not ready to submit.
	pub async fn submit(&mut self) {
		if !readiness::ready_to_submit(&self.state) {
			warn!(
				parent_rows_ready = readiness::parent_rows_ready(&self.state),
				child_rows_ready = readiness::child_rows_ready(&self.state),
				"Order is not ready to submit"
			);
			return;
		}
		self.save(OrderStatus::Submitted).await;
	}

	#[instrument(skip_all, fields(status = %status))]
	async fn save(&mut self, status: OrderStatus) {
		let order = match self.electronic_order(status) {
			Ok(order) => order,
			Err(e) => {
				self.report_failure(BoundaryOperation::SaveOrder, None, e.to_string());
				return;
			},
		};
		match self.api.save_order(&order).await {
			Ok(()) => {
				let submitted = status == OrderStatus::Submitted;
				info!(rows = order.rows.len(), submitted, "Order saved");
				self.publish(SessionEvent::OrderSaved { submitted });
			},
			Err(e) => self.report_api_failure(BoundaryOperation::SaveOrder, None, &e),
		}
	}

	pub fn reset_table(&mut self) {
		self.state.reset_table();
	}

	pub fn reset_current_order(&mut self) {
		self.state.reset_current_order();
	}

	/// Reopens a saved order.
	///
	/// Selections are resolved before anything is changed, so an order whose
	/// jurisdiction cannot be found leaves the session untouched. Helper lists
	/// of every parent are fetched concurrently; the rebuilt rows are
	/// committed only after all lookups have settled, and a failed lookup
	/// leaves that row with the helpers it was saved with.
	#[instrument(skip_all, fields(payload_id = %order.header.payload_id))]
	pub async fn populate_existing_order(
		&mut self,
		order: ExistingOrder,
	) -> Result<ReconcileReport, ReconcileError> {
		let selections = resolve_selections(self.state.customers(), &order)?;
		let header = order.header.clone();
		info!(short_code = %selections.short_code, "Reopening saved order");

		self.state.reset_customer_selections();
		self.apply_all([
			Command::SetShortCode(Some(selections.short_code)),
			Command::SetCustomer(Some(selections.customer)),
			Command::SetCustomerPresets(order.presets.clone()),
			Command::SetOrderType(selections.order_type),
			Command::SetTransType(selections.trans_type),
			Command::SetTitleOfficer(selections.title_officer),
			Command::SetState(Some(selections.state)),
			Command::SetCounty(Some(selections.county)),
			Command::SetPayloadId(Some(header.payload_id.clone())),
			Command::SetExistingOrder(true),
		]);
		self.state.derive_county_details();
		self.fetch_doc_types().await;

		let mut rows = rebuild_rows(&order);
		let fetches = fetch_helpers(&self.api, &rows).await;

		let mut failed_helper_fetches = 0;
		for fetch in fetches {
			match fetch.result {
				Ok(helpers) => {
					if let Some(row) = rows.get_mut(fetch.row_index) {
						row.helpers = Some(helpers.clone());
					}
					self.apply(Command::SetDocTypeHelpers {
						doc_type_id: fetch.doc_type_id,
						helpers,
					});
				},
				Err(e) => {
					failed_helper_fetches += 1;
					self.report_api_failure(
						BoundaryOperation::FetchDocTypeHelpers,
						Some(fetch.row_index),
						&e,
					);
				},
			}
		}

		let mut report = ReconcileReport::new(header.payload_id.clone(), &rows);
		report.failed_helper_fetches = failed_helper_fetches;

		self.apply_all([Command::ReplaceRows(rows), Command::AddRow]);

		let queue = header.process_queue_id.and_then(|queue_id| {
			self.state
				.process_queues()
				.iter()
				.find(|queue| queue.entity_id == queue_id)
				.cloned()
		});
		if queue.is_some() {
			self.apply(Command::SetProcessQueue(queue));
		}

		info!(
			parent_rows = report.parent_rows,
			filled_slots = report.filled_slots,
			pending_slots = report.pending_slots,
			failed_helper_fetches,
			"Saved order reconciled"
		);
		self.publish(SessionEvent::OrderReconciled {
			payload_id: header.payload_id,
			rows: report.parent_rows,
			failed_helper_fetches,
		});

		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use eorder_api::implementations::memory::{MemoryOrderApi, MemorySeed};
	use eorder_api::MockOrderApiInterface;
	use eorder_types::{CustomerPresets, DocType, DocTypeHelper, RequireNr};
	use std::collections::HashMap;

	fn seed() -> MemorySeed {
		serde_json::from_str(
			r#"{
				"customers": [{"id": 1, "shortCode": "ACME"}],
				"presets": {
					"ACME": {
						"customer": {"id": 1, "shortCode": "ACME"},
						"states": [{"id": 6, "name": "CA"}],
						"counties": [
							{
								"id": 40,
								"stateId": 6,
								"margins": "1|1|1|1",
								"process_queues": [
									{"entityID": 100, "queuename": "standard", "uiVisible": "Y"}
								]
							}
						],
						"titleOfficers": [{"id": 9, "firstName": "Ada", "lastName": "Byron"}]
					}
				},
				"docTypes": {
					"40": [
						{
							"id": 7,
							"DisplayName": "Deed",
							"requireNR": 2,
							"helpers": [{"id": 71, "DisplayName": "Exhibit A"}]
						},
						{"id": 8, "DisplayName": "Release"},
						{"id": 9, "DisplayName": "PCOR", "isPcor": 1}
					]
				}
			}"#,
		)
		.unwrap()
	}

	fn session_with(backend: MemoryOrderApi) -> OrderSession {
		OrderSession::new(
			"test-workspace",
			Arc::new(OrderApiService::new(Box::new(backend))),
			PayloadAssembler::default(),
			EventBus::new(64),
		)
	}

	async fn selected_session(backend: MemoryOrderApi) -> OrderSession {
		let mut session = session_with(backend);
		session.fetch_customers().await;
		let customer = session.state().customers()[0].clone();
		session.select_customer(customer).await;

		let officer = session.state().title_officers()[0].clone();
		session.apply(Command::SetTitleOfficer(Some(officer)));
		let state = session.state().states()[0].clone();
		session.select_state(state);
		let county = session.state().counties()[0].clone();
		session.select_county(county).await;
		let queue = session.state().process_queues().first().cloned();
		session.apply(Command::SetProcessQueue(queue));
		session
	}

	fn drain(receiver: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
		let mut events = Vec::new();
		while let Ok(event) = receiver.try_recv() {
			events.push(event);
		}
		events
	}

	#[tokio::test]
	async fn test_selection_flow_loads_catalog() {
		let session = selected_session(MemoryOrderApi::from_seed(seed())).await;
		let state = session.state();

		assert!(!state.presets_loading());
		assert_eq!(state.short_code(), "ACME");
		assert_eq!(state.doc_types().len(), 2, "PCOR types are filtered out");
		assert_eq!(state.process_queues().len(), 1);
		assert!(readiness::uses_margins(state));
		assert!(session.readiness().ready_for_table);
	}

	#[tokio::test]
	async fn test_order_lifecycle_against_memory_backend() {
		let backend = MemoryOrderApi::from_seed(seed());
		let mut session = selected_session(backend.clone()).await;
		let mut events = session.subscribe();

		session.select_doc_type(0, 7).await;
		assert_eq!(session.state().child_rows(0).len(), 1);
		assert_eq!(session.state().rows().first().require_nr, RequireNr::Mandatory);

		session
			.init_order(RowPatch {
				order_number: Some(Some("ORD-1".into())),
				esubmit_file_name: Some(Some("deed.pdf".into())),
				page_count: Some(3),
				..RowPatch::new(0)
			})
			.await;
		let payload_id = session.state().payload_id().unwrap().to_string();
		assert_eq!(payload_id, "P-0001");
		assert_eq!(session.state().parent_document_id(0), Some(1000));
		assert!(session.state().rows().first().touched);

		session
			.add_sub_row_document(ChildPatch {
				esubmit_file_name: Some(Some("exhibit.pdf".into())),
				page_count: Some(Some(2)),
				..ChildPatch::new(0, 0)
			})
			.await;
		assert_eq!(session.state().sub_row_document_id(0, 0), Some(1001));
		assert_eq!(session.state().child_rows(0)[0].parent_document_id, Some(1000));

		session.apply(Command::AddRow);
		assert!(session.readiness().ready_to_submit);
		session.submit().await;

		let stored = backend.order(&payload_id).await.unwrap();
		assert_eq!(stored.documents.len(), 2);
		assert_eq!(stored.status(), Some(OrderStatus::Submitted));

		let events = drain(&mut events);
		assert!(events.contains(&SessionEvent::OrderCreated {
			payload_id: payload_id.clone()
		}));
		assert!(events.contains(&SessionEvent::DocumentAdded {
			parent_row_index: 0,
			child_row_index: Some(0),
			document_id: 1001,
		}));
		assert!(events.contains(&SessionEvent::OrderSaved { submitted: true }));
	}

	#[tokio::test]
	async fn test_submit_refused_until_ready() {
		let backend = MemoryOrderApi::from_seed(seed());
		let mut session = selected_session(backend.clone()).await;
		session.select_doc_type(0, 7).await;
		session
			.init_order(RowPatch {
				esubmit_file_name: Some(Some("deed.pdf".into())),
				..RowPatch::new(0)
			})
			.await;
		session.apply(Command::AddRow);

		// the mandatory exhibit is still pending
		session.submit().await;
		let stored = backend.order("P-0001").await.unwrap();
		assert_eq!(stored.status(), None);

		session.save_draft().await;
		let stored = backend.order("P-0001").await.unwrap();
		assert_eq!(stored.status(), Some(OrderStatus::Draft));
	}

	#[tokio::test]
	async fn test_remove_row_is_local_first() {
		let backend = MemoryOrderApi::from_seed(seed());
		let mut session = selected_session(backend.clone()).await;
		session.select_doc_type(0, 8).await;
		session
			.init_order(RowPatch {
				esubmit_file_name: Some(Some("release.pdf".into())),
				..RowPatch::new(0)
			})
			.await;
		session.apply(Command::AddRow);
		session.select_doc_type(1, 8).await;
		session.add_row_document(RowPatch::new(1)).await;
		assert_eq!(session.state().parent_document_id(1), Some(1001));

		backend.fail_on(BoundaryOperation::RemoveDocument).await;
		let mut events = session.subscribe();
		session.remove_row(0).await;

		assert_eq!(session.state().rows().len(), 1);
		assert_eq!(session.state().parent_document_id(0), Some(1001));
		assert_eq!(session.state().rows().first().order_id, 1);
		assert!(matches!(
			drain(&mut events).as_slice(),
			[SessionEvent::BoundaryFailed {
				operation: BoundaryOperation::RemoveDocument,
				row_index: Some(0),
				..
			}]
		));
	}

	#[tokio::test]
	async fn test_update_document_dispatches_on_parent_id() {
		let backend = MemoryOrderApi::from_seed(seed());
		let mut session = selected_session(backend.clone()).await;
		session.select_doc_type(0, 7).await;
		session
			.init_order(RowPatch {
				esubmit_file_name: Some(Some("deed.pdf".into())),
				..RowPatch::new(0)
			})
			.await;
		session
			.add_sub_row_document(ChildPatch {
				esubmit_file_name: Some(Some("exhibit.pdf".into())),
				page_count: Some(Some(1)),
				..ChildPatch::new(0, 0)
			})
			.await;

		session
			.update_document(DocumentEdit {
				document_id: 1000,
				parent_document_id: 0,
				parent_row_index: 0,
				page_count: Some(12),
				..Default::default()
			})
			.await;
		assert_eq!(session.state().rows().first().page_count, 12);

		session
			.update_document(DocumentEdit {
				document_id: 1001,
				parent_document_id: 1000,
				parent_row_index: 0,
				page_count: Some(5),
				..Default::default()
			})
			.await;
		assert_eq!(session.state().child_rows(0)[0].page_count, Some(5));

		let stored = backend.order("P-0001").await.unwrap();
		assert_eq!(stored.document(1001).unwrap().page_count, Some(5));
	}

	#[tokio::test]
	async fn test_delete_sub_row_document_clears_slot() {
		let backend = MemoryOrderApi::from_seed(seed());
		let mut session = selected_session(backend.clone()).await;
		session.select_doc_type(0, 7).await;
		session
			.init_order(RowPatch {
				esubmit_file_name: Some(Some("deed.pdf".into())),
				..RowPatch::new(0)
			})
			.await;
		session
			.add_sub_row_document(ChildPatch {
				esubmit_file_name: Some(Some("exhibit.pdf".into())),
				page_count: Some(Some(1)),
				..ChildPatch::new(0, 0)
			})
			.await;

		session.delete_sub_row_document(0, 0).await;
		let child = &session.state().child_rows(0)[0];
		assert!(child.is_pending());
		assert!(child.document_id.is_none());
		assert_eq!(child.document_type, "Exhibit A");

		let stored = backend.order("P-0001").await.unwrap();
		assert!(stored.document(1001).is_none());
		assert!(stored.document(1000).is_some());
	}

	#[tokio::test]
	async fn test_cancel_order() {
		let backend = MemoryOrderApi::from_seed(seed());
		let mut session = selected_session(backend.clone()).await;
		session.select_doc_type(0, 8).await;
		session.init_order(RowPatch::new(0)).await;

		let mut events = session.subscribe();
		session.cancel_order().await;
		assert!(backend.order("P-0001").await.unwrap().cancelled);
		assert_eq!(
			drain(&mut events),
			vec![SessionEvent::OrderCancelled {
				payload_id: Some("P-0001".into())
			}]
		);
	}

	#[tokio::test]
	async fn test_failed_create_leaves_state_untouched() {
		let mut mock = MockOrderApiInterface::new();
		mock.expect_create_order()
			.times(1)
			.returning(|_| Err(ApiError::Network("connection refused".into())));

		let mut session = OrderSession::new(
			"test-workspace",
			Arc::new(OrderApiService::new(Box::new(mock))),
			PayloadAssembler::default(),
			EventBus::new(8),
		);
		let presets: CustomerPresets = seed().presets.remove("ACME").unwrap();
		session.state.select_customer(presets.customer.clone().unwrap());
		session.apply_all([
			Command::SetCustomerPresets(presets.clone()),
			Command::SetTitleOfficer(presets.title_officers.first().cloned()),
			Command::SetState(presets.states.first().cloned()),
			Command::SetCounty(presets.counties.first().cloned()),
		]);
		let before = session.state().clone();
		let mut events = session.subscribe();

		session
			.init_order(RowPatch {
				order_number: Some(Some("ORD-1".into())),
				..RowPatch::new(0)
			})
			.await;

		assert_eq!(session.state(), &before);
		assert!(matches!(
			drain(&mut events).as_slice(),
			[SessionEvent::BoundaryFailed {
				operation: BoundaryOperation::CreateOrder,
				..
			}]
		));
	}

	#[tokio::test]
	async fn test_create_without_selections_is_reported() {
		let mut mock = MockOrderApiInterface::new();
		mock.expect_create_order().never();

		let mut session = OrderSession::new(
			"test-workspace",
			Arc::new(OrderApiService::new(Box::new(mock))),
			PayloadAssembler::default(),
			EventBus::new(8),
		);
		let mut events = session.subscribe();
		session.init_order(RowPatch::new(0)).await;

		assert!(session.state().payload_id().is_none());
		assert_eq!(drain(&mut events).len(), 1);
	}

	fn saved_order() -> ExistingOrder {
		serde_json::from_str(
			r#"{
				"presets": {
					"customer": {"id": 1, "shortCode": "ACME"},
					"states": [{"stateID": 6}],
					"counties": [
						{
							"id": 40,
							"stateId": 6,
							"endorsementArea": "2|3",
							"certnaCutOffTime": "14:00",
							"process_queues": [
								{"entityID": 100, "queuename": "standard", "uiVisible": "Y"},
								{"entityID": 101, "queuename": "rush", "uiVisible": "Y"}
							]
						}
					],
					"titleOfficers": [{"id": 9, "firstName": "Ada", "lastName": "Byron"}]
				},
				"header": {
					"payloadID": "P-77",
					"orderNumber": "ORD-77",
					"stateId": 6,
					"countyID": 40,
					"processQueueID": 101
				},
				"records": [
					{
						"documentID": 500,
						"parentDocumentID": 0,
						"documentType": "Deed",
						"documentTypeID": 7,
						"orderNumber": "ORD-77",
						"esubmitFileName": "deed.pdf",
						"esubmitDocElements": "grantor,Smith",
						"titleOfficerID": 9,
						"docType": {
							"id": 7,
							"DisplayName": "Deed",
							"requireNR": 2,
							"helpers": [{"id": 71, "DisplayName": "Exhibit A"}]
						}
					},
					{
						"documentID": 501,
						"parentDocumentID": 500,
						"documentType": "Exhibit A",
						"documentTypeID": 71,
						"pageCount": 2,
						"esubmitFileName": "a.pdf"
					},
					{
						"documentID": 502,
						"parentDocumentID": 0,
						"documentType": "Release",
						"documentTypeID": 8,
						"esubmitFileName": "release.pdf"
					}
				]
			}"#,
		)
		.unwrap()
	}

	#[tokio::test]
	async fn test_populate_existing_order() {
		let backend = MemoryOrderApi::from_seed(seed());
		let mut session = session_with(backend);
		session.fetch_customers().await;
		let mut events = session.subscribe();

		let report = session.populate_existing_order(saved_order()).await.unwrap();
		assert_eq!(report.parent_rows, 2);
		assert_eq!(report.filled_slots, 1);
		assert_eq!(report.failed_helper_fetches, 0);

		let state = session.state();
		assert!(state.is_existing_order());
		assert_eq!(state.payload_id(), Some("P-77"));
		assert_eq!(state.context().title_officer.as_ref().unwrap().name, "Ada Byron");
		assert_eq!(state.context().process_queue.as_ref().unwrap().entity_id, 101);
		assert_eq!(state.context().cut_off_time.as_deref(), Some("14:00"));
		assert!(readiness::uses_endorsement_box(state));

		// two rebuilt rows plus the trailing placeholder
		assert_eq!(state.rows().len(), 3);
		assert_eq!(state.rows().last().order_number.as_deref(), Some("ORD-77"));
		assert_eq!(state.existing_form_data(0).unwrap().get("grantor"), Some("Smith"));
		assert_eq!(state.sub_row_document_id(0, 0), Some(501));
		assert!(session.readiness().ready_to_submit);

		let events = drain(&mut events);
		assert_eq!(
			events.last(),
			Some(&SessionEvent::OrderReconciled {
				payload_id: "P-77".into(),
				rows: 2,
				failed_helper_fetches: 0,
			})
		);
	}

	#[tokio::test]
	async fn test_populate_isolates_helper_failures() {
		let backend = MemoryOrderApi::from_seed(seed());
		backend.fail_helpers_for(8).await;
		let mut session = session_with(backend);
		session.fetch_customers().await;
		let mut events = session.subscribe();

		let report = session.populate_existing_order(saved_order()).await.unwrap();
		assert_eq!(report.failed_helper_fetches, 1);
		assert_eq!(session.state().rows().len(), 3);
		assert_eq!(session.state().child_rows(0).len(), 1);

		let failures: Vec<_> = drain(&mut events)
			.into_iter()
			.filter(|event| matches!(event, SessionEvent::BoundaryFailed { .. }))
			.collect();
		assert_eq!(
			failures,
			vec![SessionEvent::BoundaryFailed {
				operation: BoundaryOperation::FetchDocTypeHelpers,
				row_index: Some(1),
				error: "Network error: injected failure: helpers of document type 8".into(),
			}]
		);
	}

	#[tokio::test]
	async fn test_populate_clears_previous_queue() {
		let mut session = selected_session(MemoryOrderApi::from_seed(seed())).await;
		assert_eq!(session.state().context().process_queue.as_ref().unwrap().entity_id, 100);

		let mut order = saved_order();
		order.header.process_queue_id = None;
		session.populate_existing_order(order).await.unwrap();

		assert!(session.state().context().process_queue.is_none());
		let draft = session.electronic_order(OrderStatus::Draft).unwrap();
		assert_eq!(draft.head.process_queue_id, None);
		assert_eq!(draft.head.payload_id.as_deref(), Some("P-77"));
	}

	#[tokio::test]
	async fn test_save_with_invalid_date_format_is_reported() {
		let backend = MemoryOrderApi::from_seed(seed());
		let mut session = selected_session(backend.clone()).await;
		session.assembler = PayloadAssembler::new("Not Used", "%Q");
		let mut events = session.subscribe();

		session.save_draft().await;
		session.init_order(RowPatch::new(0)).await;

		assert!(session.state().payload_id().is_none());
		assert!(backend.order("P-0001").await.is_none());
		let operations: Vec<_> = drain(&mut events)
			.into_iter()
			.filter_map(|event| match event {
				SessionEvent::BoundaryFailed { operation, .. } => Some(operation),
				_ => None,
			})
			.collect();
		assert_eq!(
			operations,
			vec![BoundaryOperation::SaveOrder, BoundaryOperation::CreateOrder]
		);
	}

	#[tokio::test]
	async fn test_populate_rejects_unknown_county_without_changes() {
		let mut session = session_with(MemoryOrderApi::from_seed(seed()));
		let mut order = saved_order();
		order.header.county_id = 99;

		let result = session.populate_existing_order(order).await;
		assert_eq!(result, Err(ReconcileError::UnknownCounty(99)));
		assert_eq!(session.state(), &OrderState::new());
	}

	#[tokio::test]
	async fn test_fetched_helpers_replace_catalog_helpers() {
		let mut seed = seed();
		seed.helpers = HashMap::from([(
			7,
			vec![
				DocTypeHelper {
					id: 71,
					display_name: "Exhibit A".into(),
				},
				DocTypeHelper {
					id: 73,
					display_name: "Legal Description".into(),
				},
			],
		)]);
		let mut session = selected_session(MemoryOrderApi::from_seed(seed)).await;

		session.select_doc_type(0, 7).await;
		let doc_type: &DocType = session.state().find_doc_type(7).unwrap();
		assert_eq!(doc_type.helpers.len(), 2);
		assert_eq!(session.state().child_rows(0).len(), 2);
		assert_eq!(session.state().child_rows(0)[1].document_type, "Legal Description");
	}
}
