pub mod api;
pub mod config;
pub mod data_sources;
mod provider_data;
pub mod resources;

pub use provider_data::AwsProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::provider::{DataSourceSchema, ProviderSchema, ResourceSchema};
use tfplug::request::{ConfigureRequest, ConfigureResponse};
use tfplug::{DataSourceV2, Diagnostics, ProviderV2, ResourceV2};
use tracing::info;

use config::ProviderConfig;
use data_sources::{
    ElasticsearchDomainDataSource, KendraExperienceDataSource, KendraFaqDataSource,
    KendraIndexDataSource, KendraQuerySuggestionsBlockListDataSource, KendraThesaurusDataSource,
};
use resources::elasticsearch::{DomainPolicyResource, DomainResource, VpcEndpointResource};
use resources::kendra::{
    DataSourceResource, ExperienceResource, FaqResource, IndexResource,
    QuerySuggestionsBlockListResource, ThesaurusResource,
};

/// Resources and data sources are handed `None` until the provider is
/// configured, since Terraform validates configuration before configuring.
pub struct AwsProvider {
    provider_data: Option<AwsProviderData>,
}

impl Default for AwsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsProvider {
    pub fn new() -> Self {
        Self { provider_data: None }
    }
}

#[async_trait]
impl ProviderV2 for AwsProvider {
    async fn schema(&self) -> ProviderSchema {
        ProviderConfig::schema()
    }

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse {
        let mut diags = Diagnostics::new();

        let config = match ProviderConfig::from_values(&request.config.values) {
            Ok(config) => config,
            Err(e) => {
                diags.add_error(e, None::<String>);
                return ConfigureResponse { diagnostics: diags };
            }
        };

        let credentials = config.credentials().await;
        match api::Client::with_config(config.client_config(), credentials) {
            Ok(client) => {
                info!(region = %config.region, "Configured AWS provider");
                self.provider_data = Some(AwsProviderData::new(client, config.default_tags));
            }
            Err(e) => {
                diags.add_error(format!("Failed to create API client: {}", e), None::<String>);
            }
        }

        ConfigureResponse { diagnostics: diags }
    }

    async fn create_resource(&self, name: &str) -> tfplug::Result<Box<dyn ResourceV2>> {
        let data = self.provider_data.clone();

        match name {
            "aws_elasticsearch_domain" => Ok(Box::new(DomainResource::new(data))),
            "aws_elasticsearch_domain_policy" => Ok(Box::new(DomainPolicyResource::new(data))),
            "aws_elasticsearch_vpc_endpoint" => Ok(Box::new(VpcEndpointResource::new(data))),
            "aws_kendra_index" => Ok(Box::new(IndexResource::new(data))),
            "aws_kendra_faq" => Ok(Box::new(FaqResource::new(data))),
            "aws_kendra_thesaurus" => Ok(Box::new(ThesaurusResource::new(data))),
            "aws_kendra_experience" => Ok(Box::new(ExperienceResource::new(data))),
            "aws_kendra_query_suggestions_block_list" => {
                Ok(Box::new(QuerySuggestionsBlockListResource::new(data)))
            }
            "aws_kendra_data_source" => Ok(Box::new(DataSourceResource::new(data))),
            _ => Err(tfplug::TfplugError::ResourceNotFound(name.to_string())),
        }
    }

    async fn create_data_source(&self, name: &str) -> tfplug::Result<Box<dyn DataSourceV2>> {
        let data = self.provider_data.clone();

        match name {
            "aws_elasticsearch_domain" => Ok(Box::new(ElasticsearchDomainDataSource::new(data))),
            "aws_kendra_index" => Ok(Box::new(KendraIndexDataSource::new(data))),
            "aws_kendra_faq" => Ok(Box::new(KendraFaqDataSource::new(data))),
            "aws_kendra_thesaurus" => Ok(Box::new(KendraThesaurusDataSource::new(data))),
            "aws_kendra_experience" => Ok(Box::new(KendraExperienceDataSource::new(data))),
            "aws_kendra_query_suggestions_block_list" => {
                Ok(Box::new(KendraQuerySuggestionsBlockListDataSource::new(data)))
            }
            _ => Err(tfplug::TfplugError::DataSourceNotFound(name.to_string())),
        }
    }

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, ResourceSchema>> =
            std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                HashMap::from([
                    ("aws_elasticsearch_domain".to_string(), DomainResource::schema_static()),
                    (
                        "aws_elasticsearch_domain_policy".to_string(),
                        DomainPolicyResource::schema_static(),
                    ),
                    (
                        "aws_elasticsearch_vpc_endpoint".to_string(),
                        VpcEndpointResource::schema_static(),
                    ),
                    ("aws_kendra_index".to_string(), IndexResource::schema_static()),
                    ("aws_kendra_faq".to_string(), FaqResource::schema_static()),
                    ("aws_kendra_thesaurus".to_string(), ThesaurusResource::schema_static()),
                    ("aws_kendra_experience".to_string(), ExperienceResource::schema_static()),
                    (
                        "aws_kendra_query_suggestions_block_list".to_string(),
                        QuerySuggestionsBlockListResource::schema_static(),
                    ),
                    ("aws_kendra_data_source".to_string(), DataSourceResource::schema_static()),
                ])
            })
            .clone()
    }

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, DataSourceSchema>> =
            std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                HashMap::from([
                    (
                        "aws_elasticsearch_domain".to_string(),
                        ElasticsearchDomainDataSource::schema_static(),
                    ),
                    ("aws_kendra_index".to_string(), KendraIndexDataSource::schema_static()),
                    ("aws_kendra_faq".to_string(), KendraFaqDataSource::schema_static()),
                    (
                        "aws_kendra_thesaurus".to_string(),
                        KendraThesaurusDataSource::schema_static(),
                    ),
                    (
                        "aws_kendra_experience".to_string(),
                        KendraExperienceDataSource::schema_static(),
                    ),
                    (
                        "aws_kendra_query_suggestions_block_list".to_string(),
                        KendraQuerySuggestionsBlockListDataSource::schema_static(),
                    ),
                ])
            })
            .clone()
    }
}
