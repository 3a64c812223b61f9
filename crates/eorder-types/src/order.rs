//! Order context and the parent/child row model.
//!
//! An order is a non-empty sequence of parent rows ([`OrderRow`]), each owning
//! an ordered set of child slots ([`ChildRow`]). Children refer back to their
//! parent by index only; ownership always flows parent to child.

use crate::catalog::{County, Customer, DocTypeHelper, ProcessQueue, StateRecord, TitleOfficer};
use crate::catalog::{DocType, OrderType, TransType};
use crate::encoding::FieldElements;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field separator of the county margin and endorsement strings.
const DIMENSION_DELIMITER: char = '|';

/// Selections made for the order being edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderContext {
	pub customer: Option<Customer>,
	pub short_code: Option<String>,
	pub title_officer: Option<TitleOfficer>,
	pub state: Option<StateRecord>,
	pub county: Option<County>,
	pub trans_type: Option<TransType>,
	pub order_type: Option<OrderType>,
	pub process_queue: Option<ProcessQueue>,
	pub cut_off_time: Option<String>,
	pub margins: Margins,
	pub endorsement_box: EndorsementBox,
}

/// Page margin offsets required by a county.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
	pub mt: Option<f64>,
	pub mr: Option<f64>,
	pub mb: Option<f64>,
	pub ml: Option<f64>,
}

impl Margins {
	/// Parses `top|right|bottom|left`. Unreadable offsets are left unset.
	pub fn parse(text: &str) -> Self {
		let mut values = text.splitn(4, DIMENSION_DELIMITER).map(parse_dimension);
		Self {
			mt: values.next().flatten(),
			mr: values.next().flatten(),
			mb: values.next().flatten(),
			ml: values.next().flatten(),
		}
	}

	pub fn any_set(&self) -> bool {
		[self.mt, self.mr, self.mb, self.ml]
			.iter()
			.any(|value| value.is_some_and(|v| v != 0.0))
	}
}

/// Endorsement area required by a county.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EndorsementBox {
	pub width: Option<f64>,
	pub height: Option<f64>,
}

impl EndorsementBox {
	/// Parses `height|width`.
	pub fn parse(text: &str) -> Self {
		let mut values = text.splitn(2, DIMENSION_DELIMITER).map(parse_dimension);
		let height = values.next().flatten();
		let width = values.next().flatten();
		Self { width, height }
	}

	pub fn any_set(&self) -> bool {
		[self.width, self.height]
			.iter()
			.any(|value| value.is_some_and(|v| v != 0.0))
	}
}

fn parse_dimension(text: &str) -> Option<f64> {
	text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether a row's child slots must all be uploaded before submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RequireNr {
	#[default]
	NotRequired,
	Optional,
	Mandatory,
}

impl RequireNr {
	pub fn is_mandatory(self) -> bool {
		self == RequireNr::Mandatory
	}
}

impl TryFrom<u8> for RequireNr {
	type Error = String;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(RequireNr::NotRequired),
			1 => Ok(RequireNr::Optional),
			2 => Ok(RequireNr::Mandatory),
			other => Err(format!("invalid requireNR classifier: {}", other)),
		}
	}
}

impl From<RequireNr> for u8 {
	fn from(value: RequireNr) -> Self {
		match value {
			RequireNr::NotRequired => 0,
			RequireNr::Optional => 1,
			RequireNr::Mandatory => 2,
		}
	}
}

/// Submission status carried in the order head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
	#[default]
	#[serde(rename = "D")]
	Draft,
	#[serde(rename = "O")]
	Submitted,
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Draft => write!(f, "D"),
			OrderStatus::Submitted => write!(f, "O"),
		}
	}
}

/// A sub-document slot owned by a parent row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRow {
	pub child_row_index: usize,
	/// Index of the owning parent; lookup only.
	pub parent_row_index: usize,
	pub document_type: String,
	pub document_type_id: Option<u64>,
	pub document_id: Option<u64>,
	pub esubmit_file_name: Option<String>,
	pub page_count: Option<u32>,
	pub parent_document_id: Option<u64>,
	pub order_number: Option<String>,
	pub short_code: Option<String>,
}

impl ChildRow {
	/// A slot with nothing uploaded against it yet.
	pub fn pending(
		parent_row_index: usize,
		child_row_index: usize,
		helper: &DocTypeHelper,
	) -> Self {
		Self {
			child_row_index,
			parent_row_index,
			document_type: helper.display_name.clone(),
			document_type_id: Some(helper.id),
			..Default::default()
		}
	}

	pub fn is_pending(&self) -> bool {
		self.esubmit_file_name.as_deref().is_none_or(str::is_empty)
	}

	/// Uploaded and paginated.
	pub fn is_complete(&self) -> bool {
		!self.is_pending() && self.page_count.is_some_and(|count| count > 0)
	}
}

/// A top-level document row of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
	/// 1-based display position.
	pub order_id: usize,
	/// 0-based position.
	pub row_index: usize,
	pub document_id: Option<u64>,
	pub order_number: Option<String>,
	pub document_type: Option<String>,
	pub document_type_id: Option<u64>,
	pub esubmit_file_name: Option<String>,
	pub page_count: u32,
	pub helpers: Option<Vec<DocTypeHelper>>,
	pub notes: String,
	/// Set once the row has round-tripped through the backend.
	pub touched: bool,
	pub show_attachments: bool,
	pub require_nr: RequireNr,
	pub processing_order: Option<usize>,
	pub child_rows: Vec<ChildRow>,
	pub selected_doc_type: Option<DocType>,
	pub esubmit_doc_elements: Option<String>,
	pub existing_form_data: FieldElements,
}

impl OrderRow {
	/// An empty row at `row_index`.
	pub fn placeholder(row_index: usize, order_number: Option<String>) -> Self {
		Self {
			order_id: row_index + 1,
			row_index,
			document_id: None,
			order_number,
			document_type: None,
			document_type_id: None,
			esubmit_file_name: None,
			page_count: 0,
			helpers: None,
			notes: String::new(),
			touched: false,
			show_attachments: false,
			require_nr: RequireNr::NotRequired,
			processing_order: None,
			child_rows: Vec::new(),
			selected_doc_type: None,
			esubmit_doc_elements: None,
			existing_form_data: FieldElements::new(),
		}
	}

	pub fn has_doc_type(&self) -> bool {
		self.document_type_id.is_some()
	}

	pub fn has_file(&self) -> bool {
		self.esubmit_file_name.as_deref().is_some_and(|name| !name.is_empty())
	}

	/// Every child slot is uploaded and paginated.
	pub fn children_complete(&self) -> bool {
		self.child_rows.iter().all(ChildRow::is_complete)
	}

	/// Shallow merge: only fields present in the patch change.
	pub fn merge(&mut self, patch: RowPatch) {
		if let Some(document_id) = patch.document_id {
			self.document_id = document_id;
		}
		if let Some(order_number) = patch.order_number {
			self.order_number = order_number;
		}
		if let Some(document_type) = patch.document_type {
			self.document_type = document_type;
		}
		if let Some(document_type_id) = patch.document_type_id {
			self.document_type_id = document_type_id;
		}
		if let Some(file_name) = patch.esubmit_file_name {
			self.esubmit_file_name = file_name;
		}
		if let Some(page_count) = patch.page_count {
			self.page_count = page_count;
		}
		if let Some(helpers) = patch.helpers {
			self.helpers = helpers;
		}
		if let Some(notes) = patch.notes {
			self.notes = notes;
		}
		if let Some(touched) = patch.touched {
			self.touched = touched;
		}
		if let Some(show_attachments) = patch.show_attachments {
			self.show_attachments = show_attachments;
		}
		if let Some(require_nr) = patch.require_nr {
			self.require_nr = require_nr;
		}
		if let Some(processing_order) = patch.processing_order {
			self.processing_order = Some(processing_order);
		}
		if let Some(child_rows) = patch.child_rows {
			self.child_rows = child_rows;
		}
	}
}

/// Partial update of a parent row, addressed by `row_index`.
///
/// Nullable fields use a nested option: `None` leaves the field alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPatch {
	pub row_index: usize,
	pub document_id: Option<Option<u64>>,
	pub order_number: Option<Option<String>>,
	pub document_type: Option<Option<String>>,
	pub document_type_id: Option<Option<u64>>,
	pub esubmit_file_name: Option<Option<String>>,
	pub page_count: Option<u32>,
	pub helpers: Option<Option<Vec<DocTypeHelper>>>,
	pub notes: Option<String>,
	pub touched: Option<bool>,
	pub show_attachments: Option<bool>,
	pub require_nr: Option<RequireNr>,
	pub processing_order: Option<usize>,
	pub child_rows: Option<Vec<ChildRow>>,
}

impl RowPatch {
	pub fn new(row_index: usize) -> Self {
		Self {
			row_index,
			..Default::default()
		}
	}
}

/// Partial update of a child slot, addressed by parent and child index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildPatch {
	pub parent_row_index: usize,
	pub child_row_index: usize,
	pub document_type: Option<String>,
	pub document_type_id: Option<Option<u64>>,
	pub document_id: Option<Option<u64>>,
	pub esubmit_file_name: Option<Option<String>>,
	pub page_count: Option<Option<u32>>,
	pub parent_document_id: Option<Option<u64>>,
}

impl ChildPatch {
	pub fn new(parent_row_index: usize, child_row_index: usize) -> Self {
		Self {
			parent_row_index,
			child_row_index,
			..Default::default()
		}
	}
}

impl ChildRow {
	/// Shallow merge: only fields present in the patch change.
	pub fn merge(&mut self, patch: ChildPatch) {
		if let Some(document_type) = patch.document_type {
			self.document_type = document_type;
		}
		if let Some(document_type_id) = patch.document_type_id {
			self.document_type_id = document_type_id;
		}
		if let Some(document_id) = patch.document_id {
			self.document_id = document_id;
		}
		if let Some(file_name) = patch.esubmit_file_name {
			self.esubmit_file_name = file_name;
		}
		if let Some(page_count) = patch.page_count {
			self.page_count = page_count;
		}
		if let Some(parent_document_id) = patch.parent_document_id {
			self.parent_document_id = parent_document_id;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_margins_parse() {
		let margins = Margins::parse("1|2|3|4");
		assert_eq!(margins.mt, Some(1.0));
		assert_eq!(margins.mr, Some(2.0));
		assert_eq!(margins.mb, Some(3.0));
		assert_eq!(margins.ml, Some(4.0));
		assert!(margins.any_set());
	}

	#[test]
	fn test_margins_partial_and_garbage() {
		let margins = Margins::parse("1.5|x");
		assert_eq!(margins.mt, Some(1.5));
		assert_eq!(margins.mr, None);
		assert_eq!(margins.mb, None);
		assert_eq!(margins.ml, None);
	}

	#[test]
	fn test_endorsement_box_parse_is_height_then_width() {
		let endorsement = EndorsementBox::parse("10|20");
		assert_eq!(endorsement.height, Some(10.0));
		assert_eq!(endorsement.width, Some(20.0));
	}

	#[test]
	fn test_unset_dimensions_are_not_in_use() {
		assert!(!Margins::default().any_set());
		assert!(!EndorsementBox::parse("0|0").any_set());
	}

	#[test]
	fn test_require_nr_from_wire() {
		let value: RequireNr = serde_json::from_str("2").unwrap();
		assert!(value.is_mandatory());
		assert!(serde_json::from_str::<RequireNr>("3").is_err());
		assert_eq!(serde_json::to_string(&RequireNr::Optional).unwrap(), "1");
	}

	#[test]
	fn test_order_status_markers() {
		assert_eq!(serde_json::to_string(&OrderStatus::default()).unwrap(), "\"D\"");
		assert_eq!(serde_json::to_string(&OrderStatus::Submitted).unwrap(), "\"O\"");
	}

	#[test]
	fn test_row_merge_preserves_unspecified_fields() {
		let mut row = OrderRow::placeholder(0, Some("ORD-1".into()));
		row.notes = "keep me".into();

		row.merge(RowPatch {
			document_type_id: Some(Some(7)),
			esubmit_file_name: Some(Some("deed.pdf".into())),
			..RowPatch::new(0)
		});

		assert_eq!(row.document_type_id, Some(7));
		assert_eq!(row.esubmit_file_name.as_deref(), Some("deed.pdf"));
		assert_eq!(row.notes, "keep me");
		assert_eq!(row.order_number.as_deref(), Some("ORD-1"));
	}

	#[test]
	fn test_child_merge_can_clear_upload() {
		let helper = DocTypeHelper {
			id: 3,
			display_name: "Exhibit".into(),
		};
		let mut child = ChildRow::pending(0, 0, &helper);
		child.merge(ChildPatch {
			esubmit_file_name: Some(Some("a.pdf".into())),
			page_count: Some(Some(2)),
			..ChildPatch::new(0, 0)
		});
		assert!(child.is_complete());

		child.merge(ChildPatch {
			esubmit_file_name: Some(None),
			page_count: Some(None),
			..ChildPatch::new(0, 0)
		});
		assert!(child.is_pending());
		assert_eq!(child.document_type, "Exhibit");
	}
}
