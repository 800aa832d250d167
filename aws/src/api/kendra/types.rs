//! Wire types for the Kendra JSON 1.1 API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::Tag;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Path {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSideEncryptionConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapacityUnits {
    pub storage_capacity_units: i64,
    pub query_capacity_units: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserGroupResolutionConfiguration {
    pub user_group_resolution_mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserTokenConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_token_type_configuration: Option<JwtTokenTypeConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_token_type_configuration: Option<JsonTokenTypeConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JwtTokenTypeConfiguration {
    #[serde(rename = "KeyLocation")]
    pub key_location: String,
    #[serde(rename = "URL", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "SecretManagerArn", skip_serializing_if = "Option::is_none")]
    pub secret_manager_arn: Option<String>,
    #[serde(rename = "UserNameAttributeField", skip_serializing_if = "Option::is_none")]
    pub user_name_attribute_field: Option<String>,
    #[serde(rename = "GroupAttributeField", skip_serializing_if = "Option::is_none")]
    pub group_attribute_field: Option<String>,
    #[serde(rename = "Issuer", skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(rename = "ClaimRegex", skip_serializing_if = "Option::is_none")]
    pub claim_regex: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JsonTokenTypeConfiguration {
    pub user_name_attribute_field: String,
    pub group_attribute_field: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentMetadataConfiguration {
    pub name: String,
    #[serde(rename = "Type")]
    pub metadata_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<Relevance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<Search>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relevance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_importance_map: Option<HashMap<String, i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Search {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facetable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displayable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexStatistics {
    #[serde(default)]
    pub faq_statistics: Option<FaqStatistics>,
    #[serde(default)]
    pub text_document_statistics: Option<TextDocumentStatistics>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaqStatistics {
    #[serde(default)]
    pub indexed_question_answers_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextDocumentStatistics {
    #[serde(default)]
    pub indexed_text_documents_count: i64,
    #[serde(default)]
    pub indexed_text_bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateIndexRequest {
    pub name: String,
    pub edition: String,
    pub role_arn: String,
    pub client_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption_configuration: Option<ServerSideEncryptionConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_context_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_group_resolution_configuration: Option<UserGroupResolutionConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_token_configurations: Vec<UserTokenConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateIndexRequest {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_units: Option<CapacityUnits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_metadata_configuration_updates: Option<Vec<DocumentMetadataConfiguration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_context_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_group_resolution_configuration: Option<UserGroupResolutionConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_token_configurations: Option<Vec<UserTokenConfiguration>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Index {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<f64>,
    #[serde(default)]
    pub server_side_encryption_configuration: Option<ServerSideEncryptionConfiguration>,
    #[serde(default)]
    pub capacity_units: Option<CapacityUnits>,
    #[serde(default)]
    pub document_metadata_configurations: Vec<DocumentMetadataConfiguration>,
    #[serde(default)]
    pub index_statistics: Option<IndexStatistics>,
    #[serde(default)]
    pub user_context_policy: Option<String>,
    #[serde(default)]
    pub user_group_resolution_configuration: Option<UserGroupResolutionConfiguration>,
    #[serde(default)]
    pub user_token_configurations: Vec<UserTokenConfiguration>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateFaqRequest {
    pub index_id: String,
    pub name: String,
    pub role_arn: String,
    pub s3_path: S3Path,
    pub client_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Faq {
    pub id: String,
    pub index_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub s3_path: Option<S3Path>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub file_format: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateThesaurusRequest {
    pub index_id: String,
    pub name: String,
    pub role_arn: String,
    pub source_s3_path: S3Path,
    pub client_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Body of UpdateThesaurus and UpdateQuerySuggestionsBlockList
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateS3BackedRequest {
    pub id: String,
    pub index_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_s3_path: Option<S3Path>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Thesaurus {
    pub id: String,
    pub index_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub source_s3_path: Option<S3Path>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<f64>,
    #[serde(default)]
    pub file_size_bytes: Option<i64>,
    #[serde(default)]
    pub term_count: Option<i64>,
    #[serde(default)]
    pub synonym_rule_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperienceConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_source_configuration: Option<ContentSourceConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_identity_configuration: Option<UserIdentityConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContentSourceConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_source_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faq_ids: Vec<String>,
    #[serde(default)]
    pub direct_put_content: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserIdentityConfiguration {
    pub identity_attribute_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperienceEndpoint {
    #[serde(default)]
    pub endpoint_type: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateExperienceRequest {
    pub index_id: String,
    pub name: String,
    pub client_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ExperienceConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateExperienceRequest {
    pub id: String,
    pub index_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ExperienceConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Experience {
    pub id: String,
    pub index_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub configuration: Option<ExperienceConfiguration>,
    #[serde(default)]
    pub endpoints: Vec<ExperienceEndpoint>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateQuerySuggestionsBlockListRequest {
    pub index_id: String,
    pub name: String,
    pub role_arn: String,
    pub source_s3_path: S3Path,
    pub client_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuerySuggestionsBlockList {
    pub id: String,
    pub index_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub source_s3_path: Option<S3Path>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<f64>,
    #[serde(default)]
    pub item_count: Option<i64>,
    #[serde(default)]
    pub file_size_bytes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSourceConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_configuration: Option<S3DataSourceConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_configuration: Option<TemplateConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_crawler_configuration: Option<WebCrawlerConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3DataSourceConfiguration {
    pub bucket_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inclusion_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusion_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inclusion_prefixes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_control_list_configuration: Option<AccessControlListConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_metadata_configuration: Option<DocumentsMetadataConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessControlListConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentsMetadataConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateConfiguration {
    pub template: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebCrawlerConfiguration {
    pub urls: WebCrawlerUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_configuration: Option<AuthenticationConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_depth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_content_size_per_page_in_mega_bytes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_links_per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_urls_per_minute_crawl_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_configuration: Option<ProxyConfiguration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url_exclusion_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url_inclusion_patterns: Vec<String>,
}

/// Where a web crawl starts: seed pages or site maps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebCrawlerUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_url_configuration: Option<SeedUrlConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_maps_configuration: Option<SiteMapsConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeedUrlConfiguration {
    #[serde(default)]
    pub seed_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_crawler_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteMapsConfiguration {
    #[serde(default)]
    pub site_maps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub basic_authentication: Vec<BasicAuthenticationConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BasicAuthenticationConfiguration {
    pub credentials: String,
    pub host: String,
    pub port: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyConfiguration {
    pub host: String,
    pub port: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Document changes Kendra applies while ingesting from a data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomDocumentEnrichmentConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_configurations: Vec<InlineCustomDocumentEnrichmentConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_extraction_hook_configuration: Option<HookConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_extraction_hook_configuration: Option<HookConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlineCustomDocumentEnrichmentConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<DocumentAttributeCondition>,
    #[serde(default)]
    pub document_content_deletion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<DocumentAttributeTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentAttributeTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_document_attribute_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_document_attribute_value: Option<DocumentAttributeValue>,
    #[serde(default)]
    pub target_document_attribute_value_deletion: bool,
}

/// Lambda run before or after Kendra extracts document text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HookConfiguration {
    pub lambda_arn: String,
    pub s3_bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_condition: Option<DocumentAttributeCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentAttributeCondition {
    pub condition_document_attribute_key: String,
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_on_value: Option<DocumentAttributeValue>,
}

/// Exactly one field is set. `DateValue` is in epoch seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentAttributeValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_list_value: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateDataSourceRequest {
    pub index_id: String,
    pub name: String,
    #[serde(rename = "Type")]
    pub data_source_type: String,
    pub client_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<DataSourceConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_document_enrichment_configuration: Option<CustomDocumentEnrichmentConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateDataSourceRequest {
    pub id: String,
    pub index_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<DataSourceConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_document_enrichment_configuration: Option<CustomDocumentEnrichmentConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSource {
    pub id: String,
    pub index_id: String,
    pub name: String,
    #[serde(rename = "Type", default)]
    pub data_source_type: Option<String>,
    #[serde(default)]
    pub configuration: Option<DataSourceConfiguration>,
    #[serde(default)]
    pub custom_document_enrichment_configuration: Option<CustomDocumentEnrichmentConfiguration>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CreateResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListTagsResponse {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn index_parses_statistics_and_tokens() {
        let index: Index = serde_json::from_value(json!({
            "Id": "0123456789abcdef0123456789abcdef0123",
            "Name": "search",
            "Edition": "DEVELOPER_EDITION",
            "Status": "ACTIVE",
            "CreatedAt": 1_700_000_000.5,
            "IndexStatistics": {
                "FaqStatistics": {"IndexedQuestionAnswersCount": 4},
                "TextDocumentStatistics": {"IndexedTextDocumentsCount": 10, "IndexedTextBytes": 2048}
            },
            "UserTokenConfigurations": [{
                "JwtTokenTypeConfiguration": {"KeyLocation": "URL", "URL": "https://example.com/jwks"}
            }]
        }))
        .unwrap();

        let stats = index.index_statistics.unwrap();
        assert_eq!(stats.faq_statistics.unwrap().indexed_question_answers_count, 4);
        assert_eq!(stats.text_document_statistics.unwrap().indexed_text_bytes, 2048);
        let jwt = index.user_token_configurations[0]
            .jwt_token_type_configuration
            .clone()
            .unwrap();
        assert_eq!(jwt.url.as_deref(), Some("https://example.com/jwks"));
    }

    #[test]
    fn data_source_request_uses_type_field() {
        let request = CreateDataSourceRequest {
            index_id: "idx".to_string(),
            name: "docs".to_string(),
            data_source_type: "S3".to_string(),
            client_token: "token".to_string(),
            configuration: Some(DataSourceConfiguration {
                s3_configuration: Some(S3DataSourceConfiguration {
                    bucket_name: "bucket".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "IndexId": "idx",
                "Name": "docs",
                "Type": "S3",
                "ClientToken": "token",
                "Configuration": {"S3Configuration": {"BucketName": "bucket"}}
            })
        );
    }

    #[test]
    fn enrichment_and_crawler_use_kendra_field_names() {
        let request = UpdateDataSourceRequest {
            id: "ds".to_string(),
            index_id: "idx".to_string(),
            configuration: Some(DataSourceConfiguration {
                web_crawler_configuration: Some(WebCrawlerConfiguration {
                    urls: WebCrawlerUrls {
                        site_maps_configuration: Some(SiteMapsConfiguration {
                            site_maps: vec!["https://example.com/sitemap.xml".to_string()],
                        }),
                        ..Default::default()
                    },
                    max_content_size_per_page_in_mega_bytes: Some(0.5),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            custom_document_enrichment_configuration: Some(CustomDocumentEnrichmentConfiguration {
                post_extraction_hook_configuration: Some(HookConfiguration {
                    lambda_arn: "arn:aws:lambda:us-east-1:123456789012:function:tag".to_string(),
                    s3_bucket: "enrichment".to_string(),
                    invocation_condition: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "Id": "ds",
                "IndexId": "idx",
                "Configuration": {"WebCrawlerConfiguration": {
                    "Urls": {"SiteMapsConfiguration": {"SiteMaps": ["https://example.com/sitemap.xml"]}},
                    "MaxContentSizePerPageInMegaBytes": 0.5
                }},
                "CustomDocumentEnrichmentConfiguration": {"PostExtractionHookConfiguration": {
                    "LambdaArn": "arn:aws:lambda:us-east-1:123456789012:function:tag",
                    "S3Bucket": "enrichment"
                }}
            })
        );
    }
}
