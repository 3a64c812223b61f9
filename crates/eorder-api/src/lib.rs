//! Order service boundary for the electronic order workspace.
//!
//! Every call the workspace makes to the backend goes through
//! [`OrderApiInterface`]. Implementations are registered by name and selected
//! from the `[api]` configuration section.

use async_trait::async_trait;
use eorder_types::{
	AddDocRequest, AddDocResponse, CancelOrderRequest, ConfigSchema, CreateOrderRequest,
	CreateOrderResponse, Customer, CustomerPresets, DocType, DocTypeHelper, ElectronicOrder,
	ImplementationRegistry, RemoveDocRequest, UpdateDocRequest,
};
use thiserror::Error;
use tracing::debug;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur when calling the order service.
#[derive(Debug, Error)]
pub enum ApiError {
	/// The request could not be sent or no response arrived.
	#[error("Network error: {0}")]
	Network(String),
	/// The backend answered with a non-success status.
	#[error("HTTP {status}: {message}")]
	Http { status: u16, message: String },
	/// The response body did not have the expected shape.
	#[error("Decode error: {0}")]
	Decode(String),
	/// The addressed order, document or catalog entry does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// The implementation was configured incorrectly.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Interface of the order service backend.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait OrderApiInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Lists the customers orders may be placed for.
	async fn get_customers(&self) -> Result<Vec<Customer>, ApiError>;

	/// Fetches the lookup tables of one customer.
	async fn get_customer_presets(&self, short_code: &str) -> Result<CustomerPresets, ApiError>;

	/// Lists the document types recordable in a county.
	async fn get_doc_types(&self, county_id: u64) -> Result<Vec<DocType>, ApiError>;

	/// Lists the sub-document types a document type declares.
	async fn get_doc_type_helpers(&self, doc_type_id: u64)
		-> Result<Vec<DocTypeHelper>, ApiError>;

	/// Creates an order and its first documents.
	async fn create_order(
		&self,
		request: &CreateOrderRequest,
	) -> Result<CreateOrderResponse, ApiError>;

	/// Adds documents to an existing order.
	async fn add_doc(&self, request: &AddDocRequest) -> Result<AddDocResponse, ApiError>;

	async fn update_doc(&self, request: &UpdateDocRequest) -> Result<(), ApiError>;

	async fn remove_doc(&self, request: &RemoveDocRequest) -> Result<(), ApiError>;

	async fn cancel_order(&self, request: &CancelOrderRequest) -> Result<(), ApiError>;

	/// Saves the whole order as a draft or submits it, per the head's status.
	async fn save_order(&self, order: &ElectronicOrder) -> Result<(), ApiError>;
}

/// Type alias for order api factory functions.
pub type OrderApiFactory = fn(&toml::Value) -> Result<Box<dyn OrderApiInterface>, ApiError>;

/// Registry trait for order api implementations.
pub trait OrderApiRegistry: ImplementationRegistry<Factory = OrderApiFactory> {}

/// Get all registered order api implementations.
pub fn get_all_implementations() -> Vec<(&'static str, OrderApiFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Service wrapping the configured order api implementation.
pub struct OrderApiService {
	implementation: Box<dyn OrderApiInterface>,
}

impl OrderApiService {
	pub fn new(implementation: Box<dyn OrderApiInterface>) -> Self {
		Self { implementation }
	}

	pub async fn customers(&self) -> Result<Vec<Customer>, ApiError> {
		self.implementation.get_customers().await
	}

	pub async fn customer_presets(&self, short_code: &str) -> Result<CustomerPresets, ApiError> {
		debug!(short_code, "fetching customer presets");
		self.implementation.get_customer_presets(short_code).await
	}

	pub async fn doc_types(&self, county_id: u64) -> Result<Vec<DocType>, ApiError> {
		debug!(county_id, "fetching document types");
		self.implementation.get_doc_types(county_id).await
	}

	pub async fn doc_type_helpers(&self, doc_type_id: u64) -> Result<Vec<DocTypeHelper>, ApiError> {
		debug!(doc_type_id, "fetching document type helpers");
		self.implementation.get_doc_type_helpers(doc_type_id).await
	}

	pub async fn create_order(
		&self,
		request: &CreateOrderRequest,
	) -> Result<CreateOrderResponse, ApiError> {
		debug!(
			short_code = %request.head.short_code,
			rows = request.rows.len(),
			"creating order"
		);
		self.implementation.create_order(request).await
	}

	pub async fn add_doc(&self, request: &AddDocRequest) -> Result<AddDocResponse, ApiError> {
		debug!(
			payload_id = ?request.payload_id,
			docs = request.add_docs.len(),
			"adding documents"
		);
		self.implementation.add_doc(request).await
	}

	pub async fn update_doc(&self, request: &UpdateDocRequest) -> Result<(), ApiError> {
		debug!(document_id = request.document_id, "updating document");
		self.implementation.update_doc(request).await
	}

	pub async fn remove_doc(&self, request: &RemoveDocRequest) -> Result<(), ApiError> {
		debug!(
			payload_id = ?request.payload_id,
			docs = request.docs.len(),
			"removing documents"
		);
		self.implementation.remove_doc(request).await
	}

	pub async fn cancel_order(&self, request: &CancelOrderRequest) -> Result<(), ApiError> {
		debug!(payload_id = ?request.payload_id, "cancelling order");
		self.implementation.cancel_order(request).await
	}

	pub async fn save_order(&self, order: &ElectronicOrder) -> Result<(), ApiError> {
		debug!(
			payload_id = ?order.head.payload_id,
			status = %order.head.status,
			rows = order.rows.len(),
			"saving order"
		);
		self.implementation.save_order(order).await
	}
}
