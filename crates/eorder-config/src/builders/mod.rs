//! Builder for test and development configurations.

use crate::{ApiConfig, Config, WorkspaceConfig};
use std::collections::HashMap;

/// Fluent builder for [`Config`] with defaults suitable for tests.
///
/// The default targets the in-process `memory` api implementation.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	workspace_id: String,
	recording_date_format: String,
	not_used_label: String,
	api_primary: String,
	api_implementations: HashMap<String, toml::Value>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		let mut api_implementations = HashMap::new();
		api_implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);

		Self {
			workspace_id: "test-workspace".to_string(),
			recording_date_format: "%m/%d/%Y".to_string(),
			not_used_label: "Not Used".to_string(),
			api_primary: "memory".to_string(),
			api_implementations,
		}
	}

	pub fn workspace_id(mut self, id: impl Into<String>) -> Self {
		self.workspace_id = id.into();
		self
	}

	pub fn recording_date_format(mut self, format: impl Into<String>) -> Self {
		self.recording_date_format = format.into();
		self
	}

	pub fn not_used_label(mut self, label: impl Into<String>) -> Self {
		self.not_used_label = label.into();
		self
	}

	/// Adds an api implementation table and makes it primary.
	pub fn api_primary(mut self, name: impl Into<String>, table: toml::Value) -> Self {
		let name = name.into();
		self.api_implementations.insert(name.clone(), table);
		self.api_primary = name;
		self
	}

	pub fn build(self) -> Config {
		Config {
			workspace: WorkspaceConfig {
				id: self.workspace_id,
				recording_date_format: self.recording_date_format,
				not_used_label: self.not_used_label,
			},
			api: ApiConfig {
				primary: self.api_primary,
				implementations: self.api_implementations,
			},
		}
	}
}
