//! Request and response bodies for the order service boundary.
//!
//! Field names follow the backend's JSON contract, which mixes `ID` and `Id`
//! suffixes; the Rust side uses snake_case throughout.

use crate::order::OrderStatus;
use serde::{Deserialize, Serialize};

/// Sent in place of an order or transaction type the customer does not use.
pub const NOT_USED: &str = "Not Used";

/// One document record as the backend accepts it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPayload {
	#[serde(rename = "documentID")]
	pub document_id: Option<u64>,
	#[serde(rename = "parentDocumentID")]
	pub parent_document_id: u64,
	#[serde(rename = "documentType")]
	pub document_type: Option<String>,
	#[serde(rename = "documentTypeID")]
	pub document_type_id: Option<u64>,
	#[serde(rename = "orderNumber")]
	pub order_number: Option<String>,
	#[serde(rename = "pageCount")]
	pub page_count: Option<u32>,
	#[serde(rename = "esubmitFileName")]
	pub esubmit_file_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	#[serde(rename = "processingOrder")]
	pub processing_order: usize,
	#[serde(rename = "payloadID")]
	pub payload_id: Option<String>,
}

/// Persisted identifier returned for a created document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
	#[serde(rename = "documentID")]
	pub document_id: u64,
}

/// Head of a create-order request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderHead {
	#[serde(rename = "customerId")]
	pub customer_id: u64,
	#[serde(rename = "shortCode")]
	pub short_code: String,
	#[serde(rename = "titleOfficerID")]
	pub title_officer_id: u64,
	pub state: u64,
	#[serde(rename = "countyID")]
	pub county_id: u64,
	#[serde(rename = "transType")]
	pub trans_type: String,
	#[serde(rename = "orderType")]
	pub order_type: String,
	/// Queue name; the create call identifies queues by name.
	#[serde(rename = "processQueueID")]
	pub process_queue_id: Option<String>,
	#[serde(rename = "orderNumber")]
	pub order_number: Option<String>,
	#[serde(rename = "recordingDate")]
	pub recording_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
	pub head: CreateOrderHead,
	pub rows: Vec<DocumentPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedOrderHead {
	#[serde(rename = "payloadID")]
	pub payload_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderResponse {
	pub head: CreatedOrderHead,
	pub rows: Vec<DocumentRef>,
}

/// A document added to an existing order, with the order-level context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddDocument {
	#[serde(rename = "titleOfficerID")]
	pub title_officer_id: Option<u64>,
	#[serde(rename = "transType")]
	pub trans_type: String,
	#[serde(rename = "orderType")]
	pub order_type: String,
	#[serde(rename = "countyID")]
	pub county_id: Option<u64>,
	#[serde(flatten)]
	pub document: DocumentPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddDocRequest {
	#[serde(rename = "payloadID")]
	pub payload_id: Option<String>,
	#[serde(rename = "shortCode")]
	pub short_code: String,
	#[serde(rename = "addDocs")]
	pub add_docs: Vec<AddDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddDocResponse {
	#[serde(rename = "docsAdded")]
	pub docs_added: Vec<DocumentRef>,
}

/// Fields that an update-document call may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdate {
	#[serde(rename = "esubmitFileName")]
	pub esubmit_file_name: Option<String>,
	#[serde(rename = "pageCount")]
	pub page_count: Option<u32>,
	#[serde(rename = "orderNumber")]
	pub order_number: Option<String>,
	#[serde(rename = "documentType")]
	pub document_type: Option<String>,
	#[serde(rename = "documentTypeID")]
	pub document_type_id: Option<u64>,
	#[serde(rename = "documentID")]
	pub document_id: u64,
	#[serde(rename = "parentDocumentID")]
	pub parent_document_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDocRequest {
	#[serde(rename = "shortCode")]
	pub short_code: String,
	#[serde(rename = "documentID")]
	pub document_id: u64,
	pub update: DocumentUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveDocRequest {
	#[serde(rename = "payloadID")]
	pub payload_id: Option<String>,
	#[serde(rename = "shortCode")]
	pub short_code: String,
	pub docs: Vec<DocumentRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
	#[serde(rename = "payloadID")]
	pub payload_id: Option<String>,
	#[serde(rename = "shortCode")]
	pub short_code: String,
}

/// Head of a save or submit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectronicOrderHead {
	#[serde(rename = "customerId")]
	pub customer_id: Option<u64>,
	#[serde(rename = "titleOfficerID")]
	pub title_officer_id: Option<u64>,
	#[serde(rename = "recordingDate")]
	pub recording_date: String,
	pub state: Option<u64>,
	#[serde(rename = "countyID")]
	pub county_id: Option<u64>,
	#[serde(rename = "transType")]
	pub trans_type: String,
	/// Queue entity id.
	#[serde(rename = "processQueueID")]
	pub process_queue_id: Option<u64>,
	#[serde(rename = "orderType")]
	pub order_type: String,
	#[serde(rename = "shortCode")]
	pub short_code: String,
	#[serde(rename = "orderNumber")]
	pub order_number: Option<String>,
	#[serde(rename = "payloadID")]
	pub payload_id: Option<String>,
	pub status: OrderStatus,
}

/// Full order body for save and submit calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectronicOrder {
	pub head: ElectronicOrderHead,
	pub rows: Vec<DocumentPayload>,
}
