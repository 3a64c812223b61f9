//! In-process order service backend.
//!
//! Serves catalog data from a seed and keeps created orders in memory,
//! assigning payload and document identifiers the way the real backend does.
//! Individual operations can be made to fail, which is how session tests
//! exercise failure isolation.

use crate::{ApiError, OrderApiFactory, OrderApiInterface, OrderApiRegistry};
use async_trait::async_trait;
use eorder_types::{
	AddDocRequest, AddDocResponse, BoundaryOperation, CancelOrderRequest, ConfigSchema,
	CreateOrderRequest, CreateOrderResponse, CreatedOrderHead, Customer, CustomerPresets,
	DocType, DocTypeHelper, DocumentPayload, DocumentRef, ElectronicOrder, ElectronicOrderHead,
	Field, FieldType, ImplementationRegistry, OrderStatus, RemoveDocRequest, Schema,
	UpdateDocRequest, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

const FIRST_DOCUMENT_ID: u64 = 1000;

/// Catalog data served by the memory backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySeed {
	#[serde(default)]
	pub customers: Vec<Customer>,
	/// Presets keyed by customer short code.
	#[serde(default)]
	pub presets: HashMap<String, CustomerPresets>,
	/// Document types keyed by county id.
	#[serde(rename = "docTypes", default)]
	pub doc_types: HashMap<u64, Vec<DocType>>,
	/// Helper lists keyed by document type id. Falls back to the helpers
	/// declared on the document type itself.
	#[serde(default)]
	pub helpers: HashMap<u64, Vec<DocTypeHelper>>,
}

/// An order as the memory backend stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOrder {
	pub short_code: String,
	pub documents: Vec<DocumentPayload>,
	/// Head of the last save, if any.
	pub head: Option<ElectronicOrderHead>,
	pub cancelled: bool,
}

impl StoredOrder {
	pub fn status(&self) -> Option<OrderStatus> {
		self.head.as_ref().map(|head| head.status)
	}

	pub fn document(&self, document_id: u64) -> Option<&DocumentPayload> {
		self.documents
			.iter()
			.find(|doc| doc.document_id == Some(document_id))
	}
}

#[derive(Debug, Default)]
struct MemoryState {
	seed: MemorySeed,
	orders: HashMap<String, StoredOrder>,
	payloads_issued: u64,
	next_document_id: u64,
	failures: HashSet<BoundaryOperation>,
	failing_helpers: HashSet<u64>,
}

impl MemoryState {
	fn check(&self, operation: BoundaryOperation) -> Result<(), ApiError> {
		if self.failures.contains(&operation) {
			return Err(ApiError::Network(format!("injected failure: {}", operation)));
		}
		Ok(())
	}

	fn issue_document_id(&mut self) -> u64 {
		let id = FIRST_DOCUMENT_ID + self.next_document_id;
		self.next_document_id += 1;
		id
	}

	fn open_order_mut(&mut self, payload_id: Option<&str>) -> Result<&mut StoredOrder, ApiError> {
		let payload_id =
			payload_id.ok_or_else(|| ApiError::NotFound("order without payload id".into()))?;
		self.orders
			.get_mut(payload_id)
			.filter(|order| !order.cancelled)
			.ok_or_else(|| ApiError::NotFound(format!("order {}", payload_id)))
	}
}

/// Memory-backed implementation of [`OrderApiInterface`].
///
/// Clones share state, so a test can keep one handle for inspection while the
/// session owns another.
#[derive(Clone, Default)]
pub struct MemoryOrderApi {
	state: Arc<RwLock<MemoryState>>,
}

impl MemoryOrderApi {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_seed(seed: MemorySeed) -> Self {
		Self {
			state: Arc::new(RwLock::new(MemoryState {
				seed,
				..Default::default()
			})),
		}
	}

	/// Makes every later call of `operation` fail with a network error.
	pub async fn fail_on(&self, operation: BoundaryOperation) {
		self.state.write().await.failures.insert(operation);
	}

	/// Makes helper fetches for one document type fail.
	pub async fn fail_helpers_for(&self, doc_type_id: u64) {
		self.state.write().await.failing_helpers.insert(doc_type_id);
	}

	pub async fn clear_failures(&self) {
		let mut state = self.state.write().await;
		state.failures.clear();
		state.failing_helpers.clear();
	}

	pub async fn order(&self, payload_id: &str) -> Option<StoredOrder> {
		self.state.read().await.orders.get(payload_id).cloned()
	}
}

#[async_trait]
impl OrderApiInterface for MemoryOrderApi {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryOrderApiSchema)
	}

	async fn get_customers(&self) -> Result<Vec<Customer>, ApiError> {
		let state = self.state.read().await;
		state.check(BoundaryOperation::FetchCustomers)?;
		Ok(state.seed.customers.clone())
	}

	async fn get_customer_presets(&self, short_code: &str) -> Result<CustomerPresets, ApiError> {
		let state = self.state.read().await;
		state.check(BoundaryOperation::FetchCustomerPresets)?;
		state
			.seed
			.presets
			.get(short_code)
			.cloned()
			.ok_or_else(|| ApiError::NotFound(format!("presets for customer {}", short_code)))
	}

	async fn get_doc_types(&self, county_id: u64) -> Result<Vec<DocType>, ApiError> {
		let state = self.state.read().await;
		state.check(BoundaryOperation::FetchDocTypes)?;
		Ok(state
			.seed
			.doc_types
			.get(&county_id)
			.cloned()
			.unwrap_or_default())
	}

	async fn get_doc_type_helpers(
		&self,
		doc_type_id: u64,
	) -> Result<Vec<DocTypeHelper>, ApiError> {
		let state = self.state.read().await;
		state.check(BoundaryOperation::FetchDocTypeHelpers)?;
		if state.failing_helpers.contains(&doc_type_id) {
			return Err(ApiError::Network(format!(
				"injected failure: helpers of document type {}",
				doc_type_id
			)));
		}

		if let Some(helpers) = state.seed.helpers.get(&doc_type_id) {
			return Ok(helpers.clone());
		}
		state
			.seed
			.doc_types
			.values()
			.flatten()
			.find(|doc_type| doc_type.id == doc_type_id)
			.map(|doc_type| doc_type.helpers.clone())
			.ok_or_else(|| ApiError::NotFound(format!("document type {}", doc_type_id)))
	}

	async fn create_order(
		&self,
		request: &CreateOrderRequest,
	) -> Result<CreateOrderResponse, ApiError> {
		let mut state = self.state.write().await;
		state.check(BoundaryOperation::CreateOrder)?;

		state.payloads_issued += 1;
		let payload_id = format!("P-{:04}", state.payloads_issued);

		let mut documents = Vec::with_capacity(request.rows.len());
		let mut refs = Vec::with_capacity(request.rows.len());
		for row in &request.rows {
			let document_id = state.issue_document_id();
			documents.push(DocumentPayload {
				document_id: Some(document_id),
				payload_id: Some(payload_id.clone()),
				..row.clone()
			});
			refs.push(DocumentRef { document_id });
		}

		state.orders.insert(
			payload_id.clone(),
			StoredOrder {
				short_code: request.head.short_code.clone(),
				documents,
				head: None,
				cancelled: false,
			},
		);

		Ok(CreateOrderResponse {
			head: CreatedOrderHead { payload_id },
			rows: refs,
		})
	}

	async fn add_doc(&self, request: &AddDocRequest) -> Result<AddDocResponse, ApiError> {
		let mut state = self.state.write().await;
		state.check(BoundaryOperation::AddDocument)?;
		state.open_order_mut(request.payload_id.as_deref())?;

		let mut added = Vec::with_capacity(request.add_docs.len());
		for doc in &request.add_docs {
			let document_id = state.issue_document_id();
			added.push(DocumentPayload {
				document_id: Some(document_id),
				payload_id: request.payload_id.clone(),
				..doc.document.clone()
			});
		}

		let order = state.open_order_mut(request.payload_id.as_deref())?;
		let docs_added = added
			.iter()
			.filter_map(|doc| doc.document_id)
			.map(|document_id| DocumentRef { document_id })
			.collect();
		order.documents.extend(added);

		Ok(AddDocResponse { docs_added })
	}

	async fn update_doc(&self, request: &UpdateDocRequest) -> Result<(), ApiError> {
		let mut state = self.state.write().await;
		state.check(BoundaryOperation::UpdateDocument)?;

		let update = &request.update;
		let document = state
			.orders
			.values_mut()
			.filter(|order| !order.cancelled)
			.flat_map(|order| order.documents.iter_mut())
			.find(|doc| doc.document_id == Some(request.document_id))
			.ok_or_else(|| ApiError::NotFound(format!("document {}", request.document_id)))?;

		document.esubmit_file_name = update.esubmit_file_name.clone();
		document.page_count = update.page_count;
		document.order_number = update.order_number.clone();
		document.document_type = update.document_type.clone();
		document.document_type_id = update.document_type_id;
		document.parent_document_id = update.parent_document_id;
		Ok(())
	}

	async fn remove_doc(&self, request: &RemoveDocRequest) -> Result<(), ApiError> {
		let mut state = self.state.write().await;
		state.check(BoundaryOperation::RemoveDocument)?;

		let removed: HashSet<u64> = request.docs.iter().map(|doc| doc.document_id).collect();
		let order = state.open_order_mut(request.payload_id.as_deref())?;
		order.documents.retain(|doc| {
			let own = doc.document_id.is_some_and(|id| removed.contains(&id));
			let parent_removed = removed.contains(&doc.parent_document_id);
			!own && !parent_removed
		});
		Ok(())
	}

	async fn cancel_order(&self, request: &CancelOrderRequest) -> Result<(), ApiError> {
		let mut state = self.state.write().await;
		state.check(BoundaryOperation::CancelOrder)?;

		let order = state.open_order_mut(request.payload_id.as_deref())?;
		order.cancelled = true;
		Ok(())
	}

	async fn save_order(&self, order: &ElectronicOrder) -> Result<(), ApiError> {
		let mut state = self.state.write().await;
		state.check(BoundaryOperation::SaveOrder)?;

		let stored = state.open_order_mut(order.head.payload_id.as_deref())?;
		stored.head = Some(order.head.clone());
		Ok(())
	}
}

/// Configuration schema for [`MemoryOrderApi`].
pub struct MemoryOrderApiSchema;

impl ConfigSchema for MemoryOrderApiSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("seed_file", FieldType::String)]);
		schema.validate(config)
	}
}

/// Factory function to create a memory backend from configuration.
///
/// Configuration parameters:
/// - `seed_file` (optional): JSON file with customers, presets, document types
///   and helpers to serve
pub fn create_memory_api(config: &toml::Value) -> Result<Box<dyn OrderApiInterface>, ApiError> {
	MemoryOrderApiSchema
		.validate(config)
		.map_err(|e| ApiError::Configuration(format!("Invalid memory api config: {}", e)))?;

	let seed = match config.get("seed_file").and_then(|v| v.as_str()) {
		Some(path) => {
			let text = std::fs::read_to_string(path).map_err(|e| {
				ApiError::Configuration(format!("Cannot read seed file {}: {}", path, e))
			})?;
			serde_json::from_str(&text)
				.map_err(|e| ApiError::Configuration(format!("Invalid seed file {}: {}", path, e)))?
		},
		None => MemorySeed::default(),
	};

	Ok(Box::new(MemoryOrderApi::from_seed(seed)))
}

/// Registry for the memory implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = OrderApiFactory;

	fn factory() -> Self::Factory {
		create_memory_api
	}
}

impl OrderApiRegistry for Registry {}
