//! Records of orders already persisted by the backend.
//!
//! A saved order comes back as a header plus one flat list of document
//! records in which parents and children are interleaved. Parents carry a
//! `parentDocumentID` of zero; children carry their parent's `documentID`.

use crate::catalog::{CustomerPresets, DocType};
use serde::{Deserialize, Serialize};

/// `parentDocumentID` value marking a record as a parent.
pub const ROOT_PARENT_ID: u64 = 0;

/// One persisted document record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
	#[serde(rename = "documentID")]
	pub document_id: u64,
	#[serde(rename = "parentDocumentID", default)]
	pub parent_document_id: u64,
	#[serde(rename = "documentType", default)]
	pub document_type: Option<String>,
	#[serde(rename = "documentTypeID", default)]
	pub document_type_id: Option<u64>,
	#[serde(rename = "orderNumber", default)]
	pub order_number: Option<String>,
	#[serde(rename = "pageCount", default)]
	pub page_count: Option<u32>,
	#[serde(rename = "esubmitFileName", default)]
	pub esubmit_file_name: Option<String>,
	#[serde(default)]
	pub notes: Option<String>,
	#[serde(rename = "esubmitDocElements", default)]
	pub esubmit_doc_elements: Option<String>,
	/// Document type as it was at save time, with its declared helpers.
	#[serde(rename = "docType", default)]
	pub doc_type: Option<DocType>,
	#[serde(rename = "titleOfficerID", default)]
	pub title_officer_id: Option<u64>,
	#[serde(rename = "orderType", default)]
	pub order_type: Option<String>,
	#[serde(rename = "transType", default)]
	pub trans_type: Option<String>,
}

impl PersistedRecord {
	pub fn is_parent(&self) -> bool {
		self.parent_document_id == ROOT_PARENT_ID
	}
}

/// Header fields of a saved order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHeader {
	#[serde(rename = "payloadID")]
	pub payload_id: String,
	#[serde(rename = "orderNumber", default)]
	pub order_number: Option<String>,
	#[serde(rename = "stateId")]
	pub state_id: u64,
	#[serde(rename = "countyID")]
	pub county_id: u64,
	#[serde(rename = "processQueueID", default)]
	pub process_queue_id: Option<u64>,
	/// Used when the first record does not carry one.
	#[serde(rename = "orderType", default)]
	pub order_type: Option<String>,
	#[serde(rename = "transType", default)]
	pub trans_type: Option<String>,
}

/// Everything needed to reopen a saved order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingOrder {
	/// Catalog in effect when the order was saved.
	pub presets: CustomerPresets,
	pub header: OrderHeader,
	pub records: Vec<PersistedRecord>,
}

impl ExistingOrder {
	/// Short code of the customer the order belongs to, if the catalog names one.
	pub fn short_code(&self) -> Option<&str> {
		self.presets
			.customer
			.as_ref()
			.map(|customer| customer.short_code.as_str())
	}
}
