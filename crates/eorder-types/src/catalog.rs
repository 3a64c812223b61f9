//! Catalog types for customers, jurisdictions and document types.
//!
//! These are consumed as already-fetched lookup tables. The backend is not
//! consistent about how it keys state records, so [`StateRecord`] normalizes
//! that at deserialization time and the rest of the workspace only ever sees
//! one canonical identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value the backend expects for a process queue to be offered to users.
pub const VISIBLE_QUEUE_FLAG: &str = "Y";

/// A customer the order is placed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
	pub id: u64,
	#[serde(rename = "shortCode")]
	pub short_code: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Nonzero when orders for this customer must carry an order type.
	#[serde(rename = "usesOrderType", default)]
	pub uses_order_type: i64,
	/// Nonzero when orders for this customer must carry a transaction type.
	#[serde(rename = "usesTransType", default)]
	pub uses_trans_type: i64,
}

impl Customer {
	pub fn requires_order_type(&self) -> bool {
		self.uses_order_type != 0
	}

	pub fn requires_trans_type(&self) -> bool {
		self.uses_trans_type != 0
	}
}

/// A title officer attached to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleOfficer {
	pub id: u64,
	#[serde(rename = "firstName", default)]
	pub first_name: String,
	#[serde(rename = "lastName", default)]
	pub last_name: String,
	/// Display name, filled in by [`TitleOfficer::with_display_name`].
	#[serde(default)]
	pub name: String,
}

impl TitleOfficer {
	/// Returns a copy whose `name` is `"first last"`.
	pub fn with_display_name(&self) -> Self {
		Self {
			name: format!("{} {}", self.first_name, self.last_name),
			..self.clone()
		}
	}
}

/// A state (jurisdiction level one) with its canonical identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStateRecord")]
pub struct StateRecord {
	pub id: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub abbreviation: Option<String>,
}

/// State record exactly as the backend sends it: keyed `id` or `stateID`.
#[derive(Debug, Clone, Deserialize)]
struct RawStateRecord {
	#[serde(default)]
	id: Option<u64>,
	#[serde(rename = "stateID", default)]
	state_id: Option<u64>,
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	abbreviation: Option<String>,
}

/// Error raised when a state record carries neither identifier key.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingStateId;

impl fmt::Display for MissingStateId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "state record has neither `id` nor `stateID`")
	}
}

impl TryFrom<RawStateRecord> for StateRecord {
	type Error = MissingStateId;

	fn try_from(raw: RawStateRecord) -> Result<Self, Self::Error> {
		// `id` wins when both are present
		let id = raw.id.or(raw.state_id).ok_or(MissingStateId)?;
		Ok(Self {
			id,
			name: raw.name,
			abbreviation: raw.abbreviation,
		})
	}
}

/// A routing option for order processing within a county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessQueue {
	#[serde(rename = "entityID")]
	pub entity_id: u64,
	#[serde(default)]
	pub queuename: String,
	#[serde(rename = "uiVisible", default)]
	pub ui_visible: String,
}

impl ProcessQueue {
	pub fn is_visible(&self) -> bool {
		self.ui_visible == VISIBLE_QUEUE_FLAG
	}
}

/// A county (jurisdiction level two) and its recording requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct County {
	pub id: u64,
	#[serde(rename = "stateId")]
	pub state_id: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Page margins as `top|right|bottom|left`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub margins: Option<String>,
	/// Endorsement area as `height|width`.
	#[serde(rename = "endorsementArea", default, skip_serializing_if = "Option::is_none")]
	pub endorsement_area: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub process_queues: Option<Vec<ProcessQueue>>,
	#[serde(rename = "certnaCutOffTime", default, skip_serializing_if = "Option::is_none")]
	pub cut_off_time: Option<String>,
}

impl County {
	/// Queues this county offers to users.
	pub fn visible_process_queues(&self) -> Vec<ProcessQueue> {
		self.process_queues
			.iter()
			.flatten()
			.filter(|queue| queue.is_visible())
			.cloned()
			.collect()
	}
}

/// An order type offered to customers that use them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderType {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<u64>,
	pub description: String,
}

/// A transaction type offered to customers that use them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransType {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<u64>,
	pub description: String,
}

/// A sub-document type declared by a parent document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocTypeHelper {
	pub id: u64,
	#[serde(rename = "DisplayName")]
	pub display_name: String,
}

/// A recordable document type for a county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocType {
	pub id: u64,
	#[serde(rename = "DisplayName", default)]
	pub display_name: String,
	#[serde(rename = "isPcor", default)]
	pub is_pcor: i64,
	#[serde(rename = "requireNR", default)]
	pub require_nr: u8,
	#[serde(default)]
	pub helpers: Vec<DocTypeHelper>,
}

/// Customer-specific lookup tables, fetched once a customer is selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerPresets {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer: Option<Customer>,
	#[serde(default)]
	pub states: Vec<StateRecord>,
	#[serde(default)]
	pub counties: Vec<County>,
	#[serde(rename = "orderTypes", default)]
	pub order_types: Vec<OrderType>,
	#[serde(rename = "transTypes", default)]
	pub trans_types: Vec<TransType>,
	#[serde(rename = "titleOfficers", default)]
	pub title_officers: Vec<TitleOfficer>,
}

impl CustomerPresets {
	pub fn find_state(&self, state_id: u64) -> Option<&StateRecord> {
		self.states.iter().find(|state| state.id == state_id)
	}

	pub fn find_county(&self, county_id: u64) -> Option<&County> {
		self.counties.iter().find(|county| county.id == county_id)
	}

	/// Counties belonging to the given state.
	pub fn counties_in(&self, state_id: u64) -> Vec<County> {
		self.counties
			.iter()
			.filter(|county| county.state_id == state_id)
			.cloned()
			.collect()
	}

	/// Title officers with their display names filled in.
	pub fn title_officer_list(&self) -> Vec<TitleOfficer> {
		self.title_officers
			.iter()
			.map(TitleOfficer::with_display_name)
			.collect()
	}
}
