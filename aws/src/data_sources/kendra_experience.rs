//! Kendra experience data source

use async_trait::async_trait;
use tfplug::request::{DataSourceSchemaResponse, ReadRequest, ReadResponse, SchemaRequest};
use tfplug::{DataSourceSchema, DataSourceV2, Diagnostics, Dynamic};
use tracing::debug;

use super::{found, from_resource_schema};
use crate::resources::configured;
use crate::resources::flex::{object, ObjectExt};
use crate::resources::kendra::resource_experience::read_experience;
use crate::resources::kendra::{child_id, ExperienceResource};
use crate::AwsProviderData;

pub struct KendraExperienceDataSource {
    provider_data: Option<AwsProviderData>,
}

impl KendraExperienceDataSource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> DataSourceSchema {
        from_resource_schema(
            ExperienceResource::schema_static(),
            &["experience_id", "index_id"],
            "Gets an Amazon Kendra experience",
        )
    }
}

#[async_trait]
impl DataSourceV2 for KendraExperienceDataSource {
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
        let experience_id = config.string("experience_id").unwrap_or_default();
        let index_id = config.string("index_id").unwrap_or_default();

        debug!(experience_id = %experience_id, index_id = %index_id, "Reading Kendra experience data source");
        let lookup = object([
            ("experience_id", Dynamic::string(&experience_id)),
            ("index_id", Dynamic::string(&index_id)),
        ]);
        found(
            read_experience(data, &experience_id, &index_id, &lookup).await,
            format!("Kendra Experience ({})", child_id(&experience_id, &index_id)),
        )
    }
}
