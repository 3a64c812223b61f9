//! Command-line entry point for the electronic order workspace.
//!
//! The binary wires the order service implementations into a session and
//! exposes two commands: validating a configuration file, and reopening a
//! saved order to report how it reconciles against the current catalog.

use clap::{Parser, Subcommand};
use eorder_config::Config;
use eorder_core::{OrderSession, Readiness, ReconcileReport, RowTree, SessionBuilder, SessionFactories};
use eorder_types::{ElectronicOrder, ExistingOrder, OrderStatus};
use serde::Serialize;
use std::path::{Path, PathBuf};

use eorder_api::implementations::http::create_http_api;
use eorder_api::implementations::memory::create_memory_api;

/// Command-line arguments for the order workspace.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
	/// Load and validate the configuration, then exit
	CheckConfig,
	/// Reopen a saved order snapshot and print the rebuilt session as JSON
	Open {
		/// JSON file holding the saved order
		order: PathBuf,
	},
}

/// What `open` prints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenedOrder {
	report: ReconcileReport,
	readiness: Readiness,
	rows: RowTree,
	draft: ElectronicOrder,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!("Loaded configuration [{}]", config.workspace.id);

	match args.command {
		Command::CheckConfig => {
			tracing::info!(
				primary = %config.api.primary,
				implementations = config.api.implementations.len(),
				"Configuration is valid"
			);
		},
		Command::Open { order } => {
			let opened = open_order(config, &order).await?;
			println!("{}", serde_json::to_string_pretty(&opened)?);
		},
	}

	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds an order session with every known order service implementation.
fn build_session(config: Config) -> Result<OrderSession, Box<dyn std::error::Error>> {
	let api_factories = create_factory_map!(
		eorder_api::OrderApiInterface,
		eorder_api::ApiError,
		"http" => create_http_api,
		"memory" => create_memory_api,
	);

	Ok(SessionBuilder::new(config).build(SessionFactories { api_factories })?)
}

/// Reopens the saved order at `path` in a fresh session.
async fn open_order(config: Config, path: &Path) -> Result<OpenedOrder, Box<dyn std::error::Error>> {
	let contents = tokio::fs::read_to_string(path).await?;
	let order: ExistingOrder = serde_json::from_str(&contents)?;

	let mut session = build_session(config)?;
	session.fetch_customers().await;
	let report = session.populate_existing_order(order).await?;
	tracing::info!(
		payload_id = %report.payload_id,
		parent_rows = report.parent_rows,
		failed_helper_fetches = report.failed_helper_fetches,
		"Reopened order"
	);

	Ok(OpenedOrder {
		report,
		readiness: session.readiness(),
		rows: session.state().rows().clone(),
		draft: session.electronic_order(OrderStatus::Draft)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	const CONFIG: &str = r#"
[workspace]
id = "desk-7"

[api]
primary = "memory"

[api.implementations.memory]
"#;

	const SAVED_ORDER: &str = r#"{
		"presets": {
			"customer": {"id": 1, "shortCode": "ACME"},
			"states": [{"stateID": 6, "name": "CA"}],
			"counties": [{"id": 40, "stateId": 6}],
			"orderTypes": [{"description": "Refinance"}],
			"transTypes": [{"description": "Sale"}],
			"titleOfficers": [{"id": 9, "firstName": "Ada", "lastName": "Byron"}]
		},
		"header": {
			"payloadID": "P-42",
			"orderNumber": "ORD-42",
			"stateId": 6,
			"countyID": 40
		},
		"records": [
			{
				"documentID": 1000,
				"parentDocumentID": 0,
				"documentType": "Deed",
				"documentTypeID": 7,
				"orderNumber": "ORD-42",
				"pageCount": 4,
				"esubmitFileName": "deed.pdf",
				"titleOfficerID": 9,
				"docType": {
					"id": 7,
					"DisplayName": "Deed",
					"helpers": [{"id": 71, "DisplayName": "Exhibit A"}]
				}
			}
		]
	}"#;

	#[test]
	fn test_parse_open_command() {
		let args = Args::try_parse_from(["eorder", "-c", "desk.toml", "open", "order.json"]).unwrap();

		assert_eq!(args.config, PathBuf::from("desk.toml"));
		assert_eq!(args.log_level, "info");
		assert_eq!(
			args.command,
			Command::Open {
				order: PathBuf::from("order.json")
			}
		);
	}

	#[test]
	fn test_parse_check_config() {
		let args = Args::try_parse_from(["eorder", "--log-level", "debug", "check-config"]).unwrap();

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "debug");
		assert_eq!(args.command, Command::CheckConfig);
	}

	#[test]
	fn test_subcommand_required() {
		assert!(Args::try_parse_from(["eorder"]).is_err());
	}

	#[test]
	fn test_create_factory_map_macro() {
		let factories = create_factory_map!(
			eorder_api::OrderApiInterface,
			eorder_api::ApiError,
			"http" => create_http_api,
			"memory" => create_memory_api,
		);

		assert_eq!(factories.len(), 2);
		assert!(factories.contains_key("http"));
		assert!(factories.contains_key("memory"));
	}

	#[tokio::test]
	async fn test_build_session_from_file() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("config.toml");
		std::fs::write(&config_path, CONFIG).unwrap();

		let config = Config::from_file(config_path.to_str().unwrap()).await.unwrap();
		let session = build_session(config).unwrap();

		assert_eq!(session.workspace_id(), "desk-7");
		assert_eq!(session.state().rows().len(), 1);
	}

	#[tokio::test]
	async fn test_open_order_rebuilds_rows() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("config.toml");
		let order_path = dir.path().join("order.json");
		std::fs::write(&config_path, CONFIG).unwrap();
		std::fs::write(&order_path, SAVED_ORDER).unwrap();

		let config = Config::from_file(config_path.to_str().unwrap()).await.unwrap();
		let opened = open_order(config, &order_path).await.unwrap();

		assert_eq!(opened.report.payload_id, "P-42");
		assert_eq!(opened.report.parent_rows, 1);
		// Saved deed row plus the trailing placeholder.
		assert_eq!(opened.rows.len(), 2);
		assert_eq!(opened.draft.head.payload_id.as_deref(), Some("P-42"));
	}

	#[tokio::test]
	async fn test_open_order_rejects_invalid_snapshot() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("config.toml");
		let order_path = dir.path().join("order.json");
		std::fs::write(&config_path, CONFIG).unwrap();
		std::fs::write(&order_path, "{\"header\": {}}").unwrap();

		let config = Config::from_file(config_path.to_str().unwrap()).await.unwrap();
		assert!(open_order(config, &order_path).await.is_err());
	}
}
