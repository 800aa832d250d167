//! Kendra query suggestions block list data source

use async_trait::async_trait;
use tfplug::request::{DataSourceSchemaResponse, ReadRequest, ReadResponse, SchemaRequest};
use tfplug::{DataSourceSchema, DataSourceV2, Diagnostics, Dynamic};
use tracing::debug;

use super::{found, from_resource_schema};
use crate::resources::configured;
use crate::resources::flex::{object, ObjectExt};
use crate::resources::kendra::resource_query_suggestions_block_list::read_block_list;
use crate::resources::kendra::{child_id, QuerySuggestionsBlockListResource};
use crate::AwsProviderData;

pub struct KendraQuerySuggestionsBlockListDataSource {
    provider_data: Option<AwsProviderData>,
}

impl KendraQuerySuggestionsBlockListDataSource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> DataSourceSchema {
        from_resource_schema(
            QuerySuggestionsBlockListResource::schema_static(),
            &["query_suggestions_block_list_id", "index_id"],
            "Gets an Amazon Kendra query suggestions block list",
        )
    }
}

#[async_trait]
impl DataSourceV2 for KendraQuerySuggestionsBlockListDataSource {
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
        let config = &request.current_state.values;
        let block_list_id = config.string("query_suggestions_block_list_id").unwrap_or_default();
        let index_id = config.string("index_id").unwrap_or_default();

        debug!(
            block_list_id = %block_list_id,
            index_id = %index_id,
            "Reading Kendra query suggestions block list data source"
        );
        let lookup = object([
            ("query_suggestions_block_list_id", Dynamic::string(&block_list_id)),
            ("index_id", Dynamic::string(&index_id)),
        ]);
        found(
            read_block_list(data, &block_list_id, &index_id, &lookup).await,
            format!(
                "Kendra QuerySuggestionsBlockList ({})",
                child_id(&block_list_id, &index_id)
            ),
        )
    }
}
