//! Async behaviour of the provider service: concurrent operations, state
//! waits and cancellation through StopProvider

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tfplug::grpc::ProviderService;
use tfplug::proto::{self, provider_server::Provider as _};
use tfplug::request::{
    ConfigureRequest, ConfigureResponse, CreateRequest, CreateResponse, DataSourceSchemaResponse,
    DeleteRequest, DeleteResponse, ReadRequest, ReadResponse, ResourceSchemaResponse,
    SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::{Diagnostics, Dynamic, State};
use tfplug::{
    AttributeBuilder, DataSourceSchema, DataSourceV2, ProviderSchema, ProviderV2, ResourceSchema,
    ResourceV2, Result, SchemaBuilder, StateChangeConf,
};
use tonic::Request;

fn index_schema() -> ResourceSchema {
    SchemaBuilder::new()
        .attribute("id", AttributeBuilder::string("id").computed())
        .attribute("name", AttributeBuilder::string("name").required())
        .attribute("status", AttributeBuilder::string("status").computed())
        .build_resource(0)
}

struct IndexProvider {
    polls: Arc<AtomicU32>,
}

#[async_trait]
impl ProviderV2 for IndexProvider {
    async fn schema(&self) -> ProviderSchema {
        ProviderSchema::default()
    }

    async fn configure(&mut self, _request: ConfigureRequest) -> ConfigureResponse {
        ConfigureResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceV2>> {
        match name {
            "slow_index" => Ok(Box::new(SlowIndex {
                polls: self.polls.clone(),
                ready_after: 3,
            })),
            "stuck_index" => Ok(Box::new(SlowIndex {
                polls: self.polls.clone(),
                ready_after: u32::MAX,
            })),
            _ => Err("Unknown resource".into()),
        }
    }

    async fn create_data_source(&self, _name: &str) -> Result<Box<dyn DataSourceV2>> {
        Err("Unknown data source".into())
    }

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema> {
        HashMap::from([
            ("slow_index".to_string(), index_schema()),
            ("stuck_index".to_string(), index_schema()),
        ])
    }

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema> {
        HashMap::new()
    }
}

/// Reports CREATING until it has been polled `ready_after` times
struct SlowIndex {
    polls: Arc<AtomicU32>,
    ready_after: u32,
}

#[async_trait]
impl ResourceV2 for SlowIndex {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: index_schema(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        state.set("id", "idx-1");
        let mut diagnostics = Diagnostics::new();

        let seen = AtomicU32::new(0);
        let (seen, polls, ready_after) = (&seen, &self.polls, self.ready_after);
        let conf = StateChangeConf::new(&["CREATING"], &["ACTIVE"], Duration::from_secs(30))
            .poll_interval(Duration::from_millis(5));
        let result = conf
            .wait_for_state(&request.context, || async move {
                polls.fetch_add(1, Ordering::SeqCst);
                let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
                let status = if n >= ready_after { "ACTIVE" } else { "CREATING" };
                Ok::<_, String>((Some(status.to_string()), status.to_string()))
            })
            .await;

        match result {
            Ok(Some(status)) => state.set("status", status),
            Ok(None) => {}
            Err(e) => diagnostics.add_error(
                "Error waiting for index to become active",
                Some(e.to_string()),
            ),
        }

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        ReadResponse {
            state: Some(request.current_state),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        UpdateResponse {
            state: request.planned_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, _request: DeleteRequest) -> DeleteResponse {
        DeleteResponse {
            diagnostics: Diagnostics::new(),
        }
    }
}

struct UnusedDataSource;

#[async_trait]
impl DataSourceV2 for UnusedDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: DataSourceSchema::default(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        ReadResponse {
            state: Some(request.current_state),
            diagnostics: Diagnostics::new(),
        }
    }
}

fn planned(name: &str) -> HashMap<String, Dynamic> {
    HashMap::from([
        ("id".to_string(), Dynamic::Unknown),
        ("name".to_string(), Dynamic::string(name)),
        ("status".to_string(), Dynamic::Unknown),
    ])
}

fn dynamic_value(values: Option<&HashMap<String, Dynamic>>) -> Option<proto::DynamicValue> {
    let msgpack = match values {
        Some(values) => rmp_serde::to_vec_named(values).unwrap(),
        None => rmp_serde::to_vec(&Dynamic::Null).unwrap(),
    };
    Some(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn create_request(type_name: &str, name: &str) -> proto::apply_resource_change::Request {
    let values = planned(name);
    proto::apply_resource_change::Request {
        type_name: type_name.to_string(),
        prior_state: dynamic_value(None),
        planned_state: dynamic_value(Some(&values)),
        config: dynamic_value(Some(&values)),
        planned_private: vec![],
        provider_meta: None,
    }
}

fn decode_state(value: Option<proto::DynamicValue>) -> Option<State> {
    let bytes = value.unwrap().msgpack;
    rmp_serde::from_slice::<Option<HashMap<String, Dynamic>>>(&bytes)
        .unwrap()
        .map(State::from_values)
}

fn service() -> (Arc<ProviderService<IndexProvider>>, Arc<AtomicU32>) {
    let polls = Arc::new(AtomicU32::new(0));
    let service = ProviderService::new(IndexProvider {
        polls: polls.clone(),
    });
    (Arc::new(service), polls)
}

#[tokio::test]
async fn test_create_waits_for_target_state() {
    let (service, polls) = service();

    let response = service
        .apply_resource_change(Request::new(create_request("slow_index", "products")))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    let state = decode_state(response.new_state).unwrap();
    assert_eq!(state.get_string("status"), Some("ACTIVE".to_string()));
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_concurrent_creates_do_not_serialize() {
    let (service, _) = service();
    let start = Instant::now();

    let mut handles = vec![];
    for i in 0..5 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .apply_resource_change(Request::new(create_request(
                    "slow_index",
                    &format!("index-{}", i),
                )))
                .await
                .unwrap()
                .into_inner()
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap();
        assert!(response.diagnostics.is_empty());
    }

    assert!(
        start.elapsed() < Duration::from_secs(5),
        "Concurrent operations took too long: {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_stop_provider_cancels_pending_waits() {
    let (service, _) = service();

    let pending = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .apply_resource_change(Request::new(create_request("stuck_index", "products")))
                .await
                .unwrap()
                .into_inner()
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    service
        .stop_provider(Request::new(proto::stop_provider::Request {}))
        .await
        .unwrap();

    let response = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("cancelled create should return promptly")
        .unwrap();

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("cancelled"));
    // the id was set before the wait, so the partial resource stays tracked
    let state = decode_state(response.new_state).unwrap();
    assert_eq!(state.get_string("id"), Some("idx-1".to_string()));
}

#[tokio::test]
async fn test_unknown_types_are_rejected() {
    let provider = IndexProvider {
        polls: Arc::new(AtomicU32::new(0)),
    };

    let result = provider.create_resource("unknown").await;
    assert!(result.err().unwrap().to_string().contains("Unknown resource"));

    let result = provider.create_data_source("unknown").await;
    assert!(result
        .err()
        .unwrap()
        .to_string()
        .contains("Unknown data source"));
}

#[tokio::test]
async fn test_data_source_trait_object() {
    let data_source: Box<dyn DataSourceV2> = Box::new(UnusedDataSource);
    let mut state = State::new();
    state.set("id", "idx-1");

    let response = data_source
        .read(ReadRequest {
            context: tfplug::Context::new(),
            current_state: state.clone(),
        })
        .await;

    assert_eq!(response.state, Some(state));
}
