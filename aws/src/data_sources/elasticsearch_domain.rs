//! Elasticsearch domain data source

use async_trait::async_trait;
use tfplug::request::{DataSourceSchemaResponse, ReadRequest, ReadResponse, SchemaRequest};
use tfplug::{DataSourceSchema, DataSourceV2, Diagnostics, Dynamic};
use tracing::debug;

use super::{found, from_resource_schema};
use crate::resources::elasticsearch::resource_domain::read_domain;
use crate::resources::elasticsearch::DomainResource;
use crate::resources::flex::{object, ObjectExt};
use crate::resources::configured;
use crate::AwsProviderData;

pub struct ElasticsearchDomainDataSource {
    provider_data: Option<AwsProviderData>,
}

impl ElasticsearchDomainDataSource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> DataSourceSchema {
        from_resource_schema(
            DomainResource::schema_static(),
            &["domain_name"],
            "Gets an Elasticsearch domain by name",
        )
    }
}

#[async_trait]
impl DataSourceV2 for ElasticsearchDomainDataSource {
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
        let name = request.current_state.values.string("domain_name").unwrap_or_default();

        debug!(domain_name = %name, "Reading Elasticsearch domain data source");
        let lookup = object([("domain_name", Dynamic::string(&name))]);
        found(
            read_domain(data, &name, &lookup).await,
            format!("Elasticsearch Domain ({})", name),
        )
    }
}
