//! Configuration for the electronic order workspace.
//!
//! Configuration is read from TOML. Values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, and a file may pull in other
//! files with `include = ["api.toml"]`. Each top-level section must be unique
//! across all included files.

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Settings of this workspace instance.
	pub workspace: WorkspaceConfig,
	/// The order service boundary.
	pub api: ApiConfig,
}

/// Settings that shape how orders are assembled.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
	/// Identifier of this workspace, used in logs.
	pub id: String,
	/// `chrono` format string for the recording date sent in order heads.
	#[serde(default = "default_recording_date_format")]
	pub recording_date_format: String,
	/// Sent in place of an order or transaction type the customer does not use.
	#[serde(default = "default_not_used_label")]
	pub not_used_label: String,
}

fn default_recording_date_format() -> String {
	"%m/%d/%Y".to_string()
}

fn default_not_used_label() -> String {
	"Not Used".to_string()
}

/// Configuration of the order service boundary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of implementation names to their raw configuration tables.
	pub implementations: HashMap<String, toml::Value>,
}

impl ApiConfig {
	/// Raw table of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable, or with
/// the default in `${VAR_NAME:-default}` when it is unset.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut replacements = Vec::new();
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)));
			},
		};
		replacements.push((full_match.range(), value));
	}

	let mut result = input.to_string();
	for (range, value) in replacements.into_iter().rev() {
		result.replace_range(range, &value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following its includes.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;

		let mut loader = ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.workspace.id.trim().is_empty() {
			return Err(ConfigError::Validation("Workspace ID cannot be empty".into()));
		}
		if self.workspace.recording_date_format.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Recording date format cannot be empty".into(),
			));
		}
		if StrftimeItems::new(&self.workspace.recording_date_format)
			.any(|item| matches!(item, Item::Error))
		{
			return Err(ConfigError::Validation(format!(
				"Recording date format '{}' is not a valid strftime pattern",
				self.workspace.recording_date_format
			)));
		}

		if self.api.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one api implementation must be configured".into(),
			));
		}
		if self.api.primary_config().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary api implementation '{}' is not configured in [api.implementations]",
				self.api.primary
			)));
		}

		Ok(())
	}
}

/// Parses TOML, resolving environment variables first and validating after.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
