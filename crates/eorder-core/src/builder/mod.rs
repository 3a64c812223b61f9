//! Construction of order sessions from configuration.
//!
//! The order service implementation is chosen by name from the `[api]`
//! section and created through a factory map, so the binary decides which
//! implementations exist and the core never names them.

use crate::engine::{event_bus::EventBus, OrderSession};
use crate::payload::PayloadAssembler;
use eorder_api::{ApiError, OrderApiInterface, OrderApiService};
use eorder_config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Capacity of a session's event channel.
const EVENT_CAPACITY: usize = 256;

/// Errors that can occur while building a session.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct SessionFactories<AF> {
	pub api_factories: HashMap<String, AF>,
}

/// Builds [`OrderSession`]s from a [`Config`].
pub struct SessionBuilder {
	config: Config,
}

impl SessionBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn build<AF>(self, factories: SessionFactories<AF>) -> Result<OrderSession, SessionError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn OrderApiInterface>, ApiError>,
	{
		let mut api_impls = HashMap::new();
		for (name, config) in &self.config.api.implementations {
			let Some(factory) = factories.api_factories.get(name) else {
				tracing::warn!(
					component = "api",
					implementation = %name,
					"No factory registered for implementation, skipping"
				);
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.api.primary == name;
					tracing::info!(component = "api", implementation = %name, enabled = %is_primary, "Loaded");
					api_impls.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "api",
						implementation = %name,
						error = %e,
						"Failed to create api implementation"
					);
					return Err(SessionError::Config(format!(
						"Failed to create api implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary = &self.config.api.primary;
		let backend = api_impls.remove(primary).ok_or_else(|| {
			SessionError::MissingComponent(format!(
				"Primary api '{}' has no registered implementation",
				primary
			))
		})?;

		Ok(OrderSession::new(
			self.config.workspace.id.clone(),
			Arc::new(OrderApiService::new(backend)),
			PayloadAssembler::from_config(&self.config.workspace),
			EventBus::new(EVENT_CAPACITY),
		))
	}
}
