//! Tests for error handling and edge cases when applying changes

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::grpc::ProviderService;
use tfplug::proto::{self, provider_server::Provider as _};
use tfplug::request::*;
use tfplug::types::{Diagnostics, Dynamic, State};
use tfplug::{
    AttributeBuilder, DataSourceSchema, DataSourceV2, ProviderSchema, ProviderV2, ResourceSchema,
    ResourceV2, Result, SchemaBuilder, TfplugError,
};
use tonic::{Code, Request};

fn domain_schema() -> ResourceSchema {
    SchemaBuilder::new()
        .attribute("id", AttributeBuilder::string("id").computed())
        .attribute("domain_name", AttributeBuilder::string("domain_name").required())
        .attribute("fail_on", AttributeBuilder::string("fail_on").optional())
        .build_resource(0)
}

struct FailingProvider {
    configured: bool,
}

#[async_trait]
impl ProviderV2 for FailingProvider {
    async fn schema(&self) -> ProviderSchema {
        SchemaBuilder::new()
            .attribute("region", AttributeBuilder::string("region").required())
            .build_provider(0)
    }

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse {
        let mut diagnostics = Diagnostics::new();
        match request.config.get_string("region") {
            Some(_) => self.configured = true,
            None => diagnostics.add_error("Missing region", None::<String>),
        }
        ConfigureResponse { diagnostics }
    }

    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceV2>> {
        match name {
            "failing_domain" => Ok(Box::new(FailingDomain {
                configured: self.configured,
            })),
            _ => Err(TfplugError::ResourceNotFound(name.to_string())),
        }
    }

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSourceV2>> {
        Err(TfplugError::DataSourceNotFound(name.to_string()))
    }

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema> {
        HashMap::from([("failing_domain".to_string(), domain_schema())])
    }

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema> {
        HashMap::new()
    }
}

/// Fails the operation named by its `fail_on` attribute
struct FailingDomain {
    configured: bool,
}

impl FailingDomain {
    fn check(&self, state: &State, operation: &str) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        if !self.configured {
            diagnostics.add_error(TfplugError::ProviderNotConfigured.to_string(), None::<String>);
        } else if state.get_string("fail_on").as_deref() == Some(operation) {
            diagnostics.add_error(
                format!("Error {} domain", operation),
                Some("ValidationException: simulated failure"),
            );
        }
        diagnostics
    }
}

#[async_trait]
impl ResourceV2 for FailingDomain {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: domain_schema(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let diagnostics = self.check(&request.planned_state, "creating");
        let mut state = request.planned_state;
        if !diagnostics.has_errors() {
            state.set("id", "arn:aws:es:us-east-1:123456789012:domain/logs");
        }
        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let diagnostics = self.check(&request.current_state, "reading");
        let state = if diagnostics.has_errors() {
            None
        } else {
            Some(request.current_state)
        };
        ReadResponse { state, diagnostics }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let diagnostics = self.check(&request.planned_state, "updating");
        UpdateResponse {
            state: request.planned_state,
            diagnostics,
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        DeleteResponse {
            diagnostics: self.check(&request.current_state, "deleting"),
        }
    }
}

fn encode(state: Option<&State>) -> Option<proto::DynamicValue> {
    let msgpack = match state {
        Some(state) => rmp_serde::to_vec_named(&state.values).unwrap(),
        None => rmp_serde::to_vec(&Dynamic::Null).unwrap(),
    };
    Some(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn decode(value: Option<proto::DynamicValue>) -> Option<State> {
    rmp_serde::from_slice::<Option<HashMap<String, Dynamic>>>(&value.unwrap().msgpack)
        .unwrap()
        .map(State::from_values)
}

fn domain(id: Option<&str>, fail_on: Option<&str>) -> State {
    let mut state = State::new();
    state.set("id", id.map(Dynamic::string).unwrap_or(Dynamic::Unknown));
    state.set("domain_name", "logs");
    state.set("fail_on", fail_on.map(Dynamic::string).unwrap_or(Dynamic::Null));
    state
}

async fn configured_service() -> ProviderService<FailingProvider> {
    let service = ProviderService::new(FailingProvider { configured: false });
    let mut config = State::new();
    config.set("region", "us-east-1");
    let response = service
        .configure_provider(Request::new(proto::configure_provider::Request {
            terraform_version: "1.9.0".to_string(),
            config: encode(Some(&config)),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(response.diagnostics.is_empty());
    service
}

async fn apply(
    service: &ProviderService<FailingProvider>,
    prior: Option<&State>,
    planned: Option<&State>,
) -> proto::apply_resource_change::Response {
    service
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "failing_domain".to_string(),
            prior_state: encode(prior),
            planned_state: encode(planned),
            config: encode(planned),
            planned_private: vec![],
            provider_meta: None,
        }))
        .await
        .unwrap()
        .into_inner()
}

#[tokio::test]
async fn test_failed_create_without_id_leaves_no_state() {
    let service = configured_service().await;

    let response = apply(&service, None, Some(&domain(None, Some("creating")))).await;

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Error creating domain");
    assert!(decode(response.new_state).is_none());
}

#[tokio::test]
async fn test_failed_update_keeps_returned_state() {
    let service = configured_service().await;
    let prior = domain(Some("arn:logs"), None);
    let planned = domain(Some("arn:logs"), Some("updating"));

    let response = apply(&service, Some(&prior), Some(&planned)).await;

    assert_eq!(response.diagnostics.len(), 1);
    let state = decode(response.new_state).unwrap();
    assert_eq!(state.get_string("id"), Some("arn:logs".to_string()));
}

#[tokio::test]
async fn test_failed_delete_keeps_prior_state() {
    let service = configured_service().await;
    let prior = domain(Some("arn:logs"), Some("deleting"));

    let response = apply(&service, Some(&prior), None).await;

    assert_eq!(response.diagnostics.len(), 1);
    let state = decode(response.new_state).unwrap();
    assert_eq!(state, prior);
}

#[tokio::test]
async fn test_failed_read_keeps_current_state() {
    let service = configured_service().await;
    let current = domain(Some("arn:logs"), Some("reading"));

    let response = service
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "failing_domain".to_string(),
            current_state: encode(Some(&current)),
            private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(decode(response.new_state), Some(current));
}

#[tokio::test]
async fn test_unconfigured_provider_reports_diagnostic() {
    let service = ProviderService::new(FailingProvider { configured: false });

    let response = apply(&service, None, Some(&domain(None, None))).await;

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Provider not configured");
}

#[tokio::test]
async fn test_configure_errors_are_returned() {
    let service = ProviderService::new(FailingProvider { configured: false });

    let response = service
        .configure_provider(Request::new(proto::configure_provider::Request {
            terraform_version: "1.9.0".to_string(),
            config: encode(Some(&State::new())),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(
        response.diagnostics[0].severity,
        proto::diagnostic::Severity::Error as i32
    );
}

#[tokio::test]
async fn test_provider_config_validation() {
    let service = ProviderService::new(FailingProvider { configured: false });

    let response = service
        .validate_provider_config(Request::new(proto::validate_provider_config::Request {
            config: encode(Some(&State::new())),
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Missing required argument");
}

#[tokio::test]
async fn test_invalid_msgpack_is_rejected() {
    let service = configured_service().await;

    let status = service
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "failing_domain".to_string(),
            current_state: Some(proto::DynamicValue {
                msgpack: vec![0xc1],
                json: vec![],
            }),
            private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_unknown_data_source_is_not_found() {
    let service = configured_service().await;

    let status = service
        .read_data_source(Request::new(proto::read_data_source::Request {
            type_name: "missing".to_string(),
            config: encode(Some(&State::new())),
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::NotFound);
}

#[test]
fn test_factory_errors_map_to_not_found() {
    let provider = FailingProvider { configured: true };
    let err = tokio_test::block_on(provider.create_resource("aws_thing"))
        .err()
        .unwrap();

    let status: tonic::Status = err.into();
    assert_eq!(status.code(), Code::NotFound);
    assert!(status.message().contains("aws_thing"));
}
