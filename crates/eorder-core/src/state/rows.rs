//! The parent/child row tree of an order.
//!
//! The tree always holds at least one parent row. Every structural change
//! renumbers the rows so that `row_index` is 0-based and dense, `order_id` is
//! `row_index + 1`, and every child's `parent_row_index` names its owner.

use eorder_types::{ChildPatch, ChildRow, DocType, OrderRow, RequireNr, RowPatch};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Ordered parent rows of an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RowTree {
	rows: Vec<OrderRow>,
}

/// Deserialized rows go through [`RowTree::replace_rows`], so a snapshot can
/// never produce an empty or misnumbered tree.
impl<'de> Deserialize<'de> for RowTree {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let rows = Vec::<OrderRow>::deserialize(deserializer)?;
		let mut tree = Self::new();
		tree.replace_rows(rows);
		Ok(tree)
	}
}

impl Default for RowTree {
	fn default() -> Self {
		Self::new()
	}
}

impl RowTree {
	/// A tree holding a single placeholder row.
	pub fn new() -> Self {
		Self {
			rows: vec![OrderRow::placeholder(0, None)],
		}
	}

	pub fn rows(&self) -> &[OrderRow] {
		&self.rows
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	/// Never true: removal and replacement restore the placeholder.
	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn get(&self, row_index: usize) -> Option<&OrderRow> {
		self.rows.get(row_index)
	}

	pub fn child(&self, parent_row_index: usize, child_row_index: usize) -> Option<&ChildRow> {
		self.rows
			.get(parent_row_index)
			.and_then(|row| row.child_rows.get(child_row_index))
	}

	pub fn first(&self) -> &OrderRow {
		&self.rows[0]
	}

	pub fn last(&self) -> &OrderRow {
		&self.rows[self.rows.len() - 1]
	}

	/// Order number shared by all rows, as carried by the first one.
	pub fn order_number(&self) -> Option<&str> {
		self.first().order_number.as_deref()
	}

	/// Appends an empty row that inherits the first row's order number.
	/// Returns its index.
	pub fn add_row(&mut self) -> usize {
		let row_index = self.rows.len();
		let order_number = self.first().order_number.clone();
		self.rows.push(OrderRow::placeholder(row_index, order_number));
		row_index
	}

	/// Removes the row at `row_index` and renumbers the rest.
	///
	/// Out-of-range indexes are ignored. Removing the only row leaves a fresh
	/// placeholder behind.
	pub fn remove_row(&mut self, row_index: usize) -> Option<OrderRow> {
		if row_index >= self.rows.len() {
			debug!(row_index, rows = self.rows.len(), "ignoring removal of unknown row");
			return None;
		}

		let removed = self.rows.remove(row_index);
		if self.rows.is_empty() {
			self.rows.push(OrderRow::placeholder(0, None));
		}
		self.reindex();
		Some(removed)
	}

	/// Shallow-merges `patch` into the row it addresses.
	pub fn update_row(&mut self, patch: RowPatch) -> bool {
		let row_index = patch.row_index;
		let Some(row) = self.rows.get_mut(row_index) else {
			debug!(row_index, "ignoring update of unknown row");
			return false;
		};

		let children_replaced = patch.child_rows.is_some();
		row.merge(patch);
		if children_replaced {
			align_children(row);
		}
		true
	}

	/// Shallow-merges `patch` into the child slot it addresses.
	pub fn update_child(&mut self, patch: ChildPatch) -> bool {
		let (parent_row_index, child_row_index) = (patch.parent_row_index, patch.child_row_index);
		let Some(child) = self
			.rows
			.get_mut(parent_row_index)
			.and_then(|row| row.child_rows.get_mut(child_row_index))
		else {
			debug!(parent_row_index, child_row_index, "ignoring update of unknown child row");
			return false;
		};

		child.merge(patch);
		true
	}

	/// Appends a child slot to the parent named by its `parent_row_index`.
	pub fn add_child(&mut self, mut child: ChildRow) -> bool {
		let parent_row_index = child.parent_row_index;
		let Some(row) = self.rows.get_mut(parent_row_index) else {
			debug!(parent_row_index, "ignoring child for unknown parent row");
			return false;
		};

		child.parent_row_index = parent_row_index;
		row.child_rows.push(child);
		true
	}

	/// Clears document type, helpers and attachment visibility on every row.
	pub fn reset_row_doc_types(&mut self) {
		for row in &mut self.rows {
			row.document_type = None;
			row.document_type_id = None;
			row.helpers = None;
			row.show_attachments = false;
		}
	}

	/// Replaces every row. An empty replacement leaves the placeholder.
	pub fn replace_rows(&mut self, rows: Vec<OrderRow>) {
		self.rows = rows;
		if self.rows.is_empty() {
			self.rows.push(OrderRow::placeholder(0, None));
		}
		self.reindex();
	}

	/// Back to the single placeholder row.
	pub fn reset(&mut self) {
		self.rows = vec![OrderRow::placeholder(0, None)];
	}

	/// Gives a row a document type and rebuilds its child slots, one pending
	/// slot per declared helper.
	pub fn assign_doc_type(&mut self, row_index: usize, doc_type: &DocType) -> bool {
		let Some(row) = self.rows.get_mut(row_index) else {
			debug!(row_index, doc_type_id = doc_type.id, "ignoring document type for unknown row");
			return false;
		};

		row.document_type = Some(doc_type.display_name.clone());
		row.document_type_id = Some(doc_type.id);
		row.require_nr = RequireNr::try_from(doc_type.require_nr).unwrap_or_default();
		row.helpers = Some(doc_type.helpers.clone());
		row.selected_doc_type = Some(doc_type.clone());
		row.child_rows = doc_type
			.helpers
			.iter()
			.enumerate()
			.map(|(child_row_index, helper)| ChildRow {
				order_number: row.order_number.clone(),
				..ChildRow::pending(row_index, child_row_index, helper)
			})
			.collect();
		true
	}

	fn reindex(&mut self) {
		for (row_index, row) in self.rows.iter_mut().enumerate() {
			row.row_index = row_index;
			row.order_id = row_index + 1;
			row.processing_order = Some(row_index + 1);
			align_children(row);
		}
	}
}

fn align_children(row: &mut OrderRow) {
	for child in &mut row.child_rows {
		child.parent_row_index = row.row_index;
	}
}
