//! JSON-over-HTTP order service client.

use crate::{ApiError, OrderApiFactory, OrderApiInterface, OrderApiRegistry};
use async_trait::async_trait;
use eorder_types::{
	AddDocRequest, AddDocResponse, CancelOrderRequest, ConfigSchema, CreateOrderRequest,
	CreateOrderResponse, Customer, CustomerPresets, DocType, DocTypeHelper, ElectronicOrder,
	Field, FieldType, ImplementationRegistry, RemoveDocRequest, Schema, UpdateDocRequest,
	ValidationError,
};
use reqwest::{Client, IntoUrl, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Order service reached over HTTP.
pub struct HttpOrderApi {
	client: Client,
	base_url: String,
}

impl HttpOrderApi {
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ApiError::Configuration(format!("Failed to build http client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path.trim_start_matches('/'))
	}

	/// Builds a URL from path segments, percent-encoding each one.
	fn segment_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
		let mut url = Url::parse(&self.base_url)
			.map_err(|e| ApiError::Configuration(format!("Invalid base_url: {}", e)))?;
		url.path_segments_mut()
			.map_err(|_| {
				ApiError::Configuration(format!("base_url {} cannot carry a path", self.base_url))
			})?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		self.client.request(method, self.url(path))
	}

	async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
		let response = request
			.send()
			.await
			.map_err(|e| ApiError::Network(e.to_string()))?;

		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let message = response.text().await.unwrap_or_default();
		warn!(status = status.as_u16(), %message, "order service rejected request");
		if status == StatusCode::NOT_FOUND {
			return Err(ApiError::NotFound(message));
		}
		Err(ApiError::Http {
			status: status.as_u16(),
			message,
		})
	}

	async fn get_json<T: DeserializeOwned>(&self, url: impl IntoUrl) -> Result<T, ApiError> {
		let response = self.send(self.client.get(url)).await?;
		response
			.json()
			.await
			.map_err(|e| ApiError::Decode(e.to_string()))
	}

	async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
	where
		B: Serialize + ?Sized + Sync,
		T: DeserializeOwned,
	{
		let response = self.send(self.request(method, path).json(body)).await?;
		response
			.json()
			.await
			.map_err(|e| ApiError::Decode(e.to_string()))
	}

	async fn send_unit<B>(&self, method: Method, path: &str, body: &B) -> Result<(), ApiError>
	where
		B: Serialize + ?Sized + Sync,
	{
		self.send(self.request(method, path).json(body)).await?;
		Ok(())
	}
}

#[async_trait]
impl OrderApiInterface for HttpOrderApi {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpOrderApiSchema)
	}

	async fn get_customers(&self) -> Result<Vec<Customer>, ApiError> {
		self.get_json(self.url("customers")).await
	}

	async fn get_customer_presets(&self, short_code: &str) -> Result<CustomerPresets, ApiError> {
		let url = self.segment_url(&["customers", short_code, "presets"])?;
		self.get_json(url).await
	}

	async fn get_doc_types(&self, county_id: u64) -> Result<Vec<DocType>, ApiError> {
		self.get_json(self.url(&format!("counties/{}/doc-types", county_id)))
			.await
	}

	async fn get_doc_type_helpers(
		&self,
		doc_type_id: u64,
	) -> Result<Vec<DocTypeHelper>, ApiError> {
		self.get_json(self.url(&format!("doc-types/{}/helpers", doc_type_id)))
			.await
	}

	async fn create_order(
		&self,
		request: &CreateOrderRequest,
	) -> Result<CreateOrderResponse, ApiError> {
		self.send_json(Method::POST, "orders", request).await
	}

	async fn add_doc(&self, request: &AddDocRequest) -> Result<AddDocResponse, ApiError> {
		self.send_json(Method::POST, "orders/documents", request)
			.await
	}

	async fn update_doc(&self, request: &UpdateDocRequest) -> Result<(), ApiError> {
		self.send_unit(Method::PUT, "orders/documents", request)
			.await
	}

	async fn remove_doc(&self, request: &RemoveDocRequest) -> Result<(), ApiError> {
		self.send_unit(Method::POST, "orders/documents/remove", request)
			.await
	}

	async fn cancel_order(&self, request: &CancelOrderRequest) -> Result<(), ApiError> {
		self.send_unit(Method::POST, "orders/cancel", request).await
	}

	async fn save_order(&self, order: &ElectronicOrder) -> Result<(), ApiError> {
		self.send_unit(Method::POST, "orders/save", order).await
	}
}

/// Configuration schema for [`HttpOrderApi`].
pub struct HttpOrderApiSchema;

impl ConfigSchema for HttpOrderApiSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("base_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("base_url must start with http:// or https://".to_string()),
					}
				}),
			],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(600),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HTTP order service client from configuration.
///
/// Configuration parameters:
/// - `base_url` (required): root URL of the order service
/// - `timeout_seconds` (optional): per-request timeout, default 30
pub fn create_http_api(config: &toml::Value) -> Result<Box<dyn OrderApiInterface>, ApiError> {
	HttpOrderApiSchema
		.validate(config)
		.map_err(|e| ApiError::Configuration(format!("Invalid http api config: {}", e)))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ApiError::Configuration("base_url is required".to_string()))?;
	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let api = HttpOrderApi::new(base_url, Duration::from_secs(timeout_seconds))?;
	Ok(Box::new(api))
}

/// Registry for the HTTP implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = OrderApiFactory;

	fn factory() -> Self::Factory {
		create_http_api
	}
}

impl OrderApiRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_url_joining() {
		let api = HttpOrderApi::new("http://localhost:9000/api/", Duration::from_secs(1)).unwrap();
		assert_eq!(api.url("customers"), "http://localhost:9000/api/customers");
		assert_eq!(
			api.url("/orders/cancel"),
			"http://localhost:9000/api/orders/cancel"
		);
	}

	#[test]
	fn test_short_code_is_percent_encoded() {
		let api = HttpOrderApi::new("http://localhost:9000/api/", Duration::from_secs(1)).unwrap();
		let url = api.segment_url(&["customers", "A/B C?", "presets"]).unwrap();
		assert_eq!(
			url.as_str(),
			"http://localhost:9000/api/customers/A%2FB%20C%3F/presets"
		);
	}

	#[test]
	fn test_schema_requires_http_base_url() {
		let missing: toml::Value = toml::from_str("timeout_seconds = 5").unwrap();
		assert!(matches!(
			HttpOrderApiSchema.validate(&missing),
			Err(ValidationError::MissingField(_))
		));

		let wrong_scheme: toml::Value = toml::from_str("base_url = \"ftp://host\"").unwrap();
		assert!(HttpOrderApiSchema.validate(&wrong_scheme).is_err());
	}

	#[test]
	fn test_factory_builds_client() {
		let config: toml::Value =
			toml::from_str("base_url = \"https://orders.example.com\"\ntimeout_seconds = 10")
				.unwrap();
		assert!(create_http_api(&config).is_ok());

		let bad_timeout: toml::Value =
			toml::from_str("base_url = \"https://orders.example.com\"\ntimeout_seconds = 0")
				.unwrap();
		assert!(matches!(
			create_http_api(&bad_timeout),
			Err(ApiError::Configuration(_))
		));
	}
}
