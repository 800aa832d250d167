//! Kendra FAQ data source

use async_trait::async_trait;
use tfplug::request::{DataSourceSchemaResponse, ReadRequest, ReadResponse, SchemaRequest};
use tfplug::{DataSourceSchema, DataSourceV2, Diagnostics, Dynamic};
use tracing::debug;

use super::{found, from_resource_schema};
use crate::resources::configured;
use crate::resources::flex::{object, ObjectExt};
use crate::resources::kendra::resource_faq::read_faq;
use crate::resources::kendra::{child_id, FaqResource};
use crate::AwsProviderData;

pub struct KendraFaqDataSource {
    provider_data: Option<AwsProviderData>,
}

impl KendraFaqDataSource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> DataSourceSchema {
        from_resource_schema(
            FaqResource::schema_static(),
            &["faq_id", "index_id"],
            "Gets an Amazon Kendra FAQ",
        )
    }
}

#[async_trait]
impl DataSourceV2 for KendraFaqDataSource {
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
        let faq_id = config.string("faq_id").unwrap_or_default();
        let index_id = config.string("index_id").unwrap_or_default();

        debug!(faq_id = %faq_id, index_id = %index_id, "Reading Kendra FAQ data source");
        let lookup = object([
            ("faq_id", Dynamic::string(&faq_id)),
            ("index_id", Dynamic::string(&index_id)),
        ]);
        found(
            read_faq(data, &faq_id, &index_id, &lookup).await,
            format!("Kendra Faq ({})", child_id(&faq_id, &index_id)),
        )
    }
}
