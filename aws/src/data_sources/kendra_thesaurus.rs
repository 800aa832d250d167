//! Kendra thesaurus data source

use async_trait::async_trait;
use tfplug::request::{DataSourceSchemaResponse, ReadRequest, ReadResponse, SchemaRequest};
use tfplug::{DataSourceSchema, DataSourceV2, Diagnostics, Dynamic};
use tracing::debug;

use super::{found, from_resource_schema};
use crate::resources::configured;
use crate::resources::flex::{object, ObjectExt};
use crate::resources::kendra::resource_thesaurus::read_thesaurus;
use crate::resources::kendra::{child_id, ThesaurusResource};
use crate::AwsProviderData;

pub struct KendraThesaurusDataSource {
    provider_data: Option<AwsProviderData>,
}

impl KendraThesaurusDataSource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> DataSourceSchema {
        from_resource_schema(
            ThesaurusResource::schema_static(),
            &["thesaurus_id", "index_id"],
            "Gets an Amazon Kendra thesaurus",
        )
    }
}

#[async_trait]
impl DataSourceV2 for KendraThesaurusDataSource {
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
        let thesaurus_id = config.string("thesaurus_id").unwrap_or_default();
        let index_id = config.string("index_id").unwrap_or_default();

        debug!(thesaurus_id = %thesaurus_id, index_id = %index_id, "Reading Kendra thesaurus data source");
        let lookup = object([
            ("thesaurus_id", Dynamic::string(&thesaurus_id)),
            ("index_id", Dynamic::string(&index_id)),
        ]);
        found(
            read_thesaurus(data, &thesaurus_id, &index_id, &lookup).await,
            format!("Kendra Thesaurus ({})", child_id(&thesaurus_id, &index_id)),
        )
    }
}
