//! Kendra index data source

use async_trait::async_trait;
use tfplug::request::{DataSourceSchemaResponse, ReadRequest, ReadResponse, SchemaRequest};
use tfplug::{DataSourceSchema, DataSourceV2, Diagnostics, Dynamic};
use tracing::debug;

use super::{found, from_resource_schema};
use crate::resources::configured;
use crate::resources::flex::{object, ObjectExt};
use crate::resources::kendra::resource_index::read_index;
use crate::resources::kendra::IndexResource;
use crate::AwsProviderData;

pub struct KendraIndexDataSource {
    provider_data: Option<AwsProviderData>,
}

impl KendraIndexDataSource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> DataSourceSchema {
        from_resource_schema(IndexResource::schema_static(), &["id"], "Gets an Amazon Kendra index by identifier")
    }
}

#[async_trait]
impl DataSourceV2 for KendraIndexDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let Some(data) = configured(&self.provider_data, &mut diagnostics) else {
            return ReadResponse { state: None, diagnostics };
        };
        let id = request.current_state.values.string("id").unwrap_or_default();

        debug!(index_id = %id, "Reading Kendra index data source");
        let lookup = object([("id", Dynamic::string(&id))]);
        found(read_index(data, &id, &lookup).await, format!("Kendra Index ({})", id))
    }
}
