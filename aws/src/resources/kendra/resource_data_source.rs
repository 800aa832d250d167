//! Kendra data source resource implementation

use async_trait::async_trait;
use std::time::Duration;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, SuppressEquivalent, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse, ValidateRequest,
    ValidateResponse,
};
use tfplug::validator::{
    ArnValidator, EachElementValidator, JsonStringValidator, ListLengthValidator,
    NumberRangeValidator, Rfc3339Validator, StringLengthValidator, StringOneOfValidator,
    StringPatternValidator,
};
use tfplug::{
    import_state_passthrough_id, retry_when, AttributeBuilder, AttributeType, BlockBuilder,
    Context, Diagnostics, Dynamic, ResourceSchema, ResourceV2, RetryError, SchemaBuilder, State,
    StateChangeConf,
};
use tracing::{debug, info, warn};

use super::{
    child_id, index_id_attribute, is_iam_propagation, kendra_arn, parse_child_id, plan_tags,
    read_tags, update_tags, PROPAGATION_TIMEOUT,
};
use crate::api::kendra::{
    AccessControlListConfiguration, AuthenticationConfiguration, BasicAuthenticationConfiguration,
    CreateDataSourceRequest, CustomDocumentEnrichmentConfiguration, DataSource,
    DataSourceConfiguration, DocumentAttributeCondition, DocumentAttributeTarget,
    DocumentAttributeValue, DocumentsMetadataConfiguration, HookConfiguration,
    InlineCustomDocumentEnrichmentConfiguration, ProxyConfiguration, S3DataSourceConfiguration,
    SeedUrlConfiguration, SiteMapsConfiguration, TemplateConfiguration, UpdateDataSourceRequest,
    WebCrawlerConfiguration, WebCrawlerUrls,
};
use crate::api::{ApiError, Client};
use crate::resources::flex::{self, object, Object, ObjectExt};
use crate::resources::timeouts::Timeouts;
use crate::resources::waiter::wait_for;
use crate::resources::{applied_state, configured, tags};
use crate::AwsProviderData;

const TIMEOUTS: Timeouts = Timeouts::minutes(30, 30, 30);

/// Returned while Kendra cannot yet read a data source's secret
const SECRETS_MANAGER_MESSAGE: &str = "Secrets Manager throws the exception";

const CUSTOM: &str = "CUSTOM";

const DATA_SOURCE_TYPES: [&str; 19] = [
    "S3",
    "SHAREPOINT",
    "DATABASE",
    "SALESFORCE",
    "ONEDRIVE",
    "SERVICENOW",
    "CUSTOM",
    "CONFLUENCE",
    "GOOGLEDRIVE",
    "WEBCRAWLER",
    "WORKDOCS",
    "FSX",
    "SLACK",
    "BOX",
    "QUIP",
    "JIRA",
    "GITHUB",
    "ALFRESCO",
    "TEMPLATE",
];

const CONDITION_OPERATORS: [&str; 11] = [
    "GreaterThan",
    "GreaterThanOrEquals",
    "LessThan",
    "LessThanOrEquals",
    "Equals",
    "NotEquals",
    "Contains",
    "NotContains",
    "Exists",
    "NotExists",
    "BeginsWith",
];

/// Attributes sent through UpdateDataSource when they change
const UPDATABLE: [&str; 7] = [
    "configuration",
    "custom_document_enrichment_configuration",
    "description",
    "language_code",
    "name",
    "role_arn",
    "schedule",
];

pub struct DataSourceResource {
    provider_data: Option<AwsProviderData>,
}

impl DataSourceResource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> ResourceSchema {
        let computed = |name: &str, description: &str| {
            AttributeBuilder::string(name)
                .computed()
                .description(description)
                .plan_modifier(Box::new(UseStateForUnknown))
        };

        SchemaBuilder::new()
            .description("Manages an Amazon Kendra data source")
            .attribute(
                "id",
                computed("id", "Data source and index identifiers separated by a slash"),
            )
            .attribute("index_id", index_id_attribute())
            .attribute(
                "name",
                AttributeBuilder::string("name")
                    .required()
                    .description("Name for the data source connector")
                    .validator(Box::new(StringLengthValidator::between(1, 1000)))
                    .validator(Box::new(StringPatternValidator::new(
                        r"^[0-9A-Za-z][0-9A-Za-z_-]*$",
                        "must start with an alphanumeric character and contain only alphanumerics, hyphens or underscores",
                    ))),
            )
            .attribute(
                "type",
                AttributeBuilder::string("type")
                    .required()
                    .description("Type of data source repository")
                    .validator(Box::new(StringOneOfValidator::new(DATA_SOURCE_TYPES)))
                    .plan_modifier(Box::new(RequiresReplaceIfChanged)),
            )
            .attribute(
                "description",
                AttributeBuilder::string("description")
                    .optional()
                    .description("Description for the data source connector")
                    .validator(Box::new(StringLengthValidator::between(1, 1000))),
            )
            .attribute(
                "language_code",
                AttributeBuilder::string("language_code")
                    .optional()
                    .computed()
                    .description("Code for the language of the documents")
                    .validator(Box::new(StringLengthValidator::between(2, 10)))
                    .validator(Box::new(StringPatternValidator::new(
                        r"^[A-Za-z-]*$",
                        "must contain only letters or hyphens",
                    )))
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "role_arn",
                AttributeBuilder::string("role_arn")
                    .optional()
                    .description("IAM role with permission to access the data source and its Kendra index")
                    .validator(Box::new(ArnValidator)),
            )
            .attribute(
                "schedule",
                AttributeBuilder::string("schedule")
                    .optional()
                    .description("Cron schedule for updating the index from the data source"),
            )
            .attribute("arn", computed("arn", "ARN of the data source"))
            .attribute("data_source_id", computed("data_source_id", "Identifier of the data source"))
            .attribute("created_at", computed("created_at", "When the data source was created, in RFC3339 format"))
            .attribute(
                "updated_at",
                AttributeBuilder::string("updated_at")
                    .computed()
                    .description("When the data source was last updated, in RFC3339 format"),
            )
            .attribute(
                "status",
                AttributeBuilder::string("status")
                    .computed()
                    .description("Current status of the data source"),
            )
            .attribute(
                "error_message",
                AttributeBuilder::string("error_message")
                    .computed()
                    .description("Why the data source failed, when it did"),
            )
            .attribute("tags", tags::tags_attribute())
            .attribute("tags_all", tags::tags_all_attribute())
            .block("configuration", configuration_block())
            .block(
                "custom_document_enrichment_configuration",
                enrichment_block(),
            )
            .block("timeouts", Timeouts::block(&["create", "update", "delete"]))
            .build_resource(0)
    }
}

fn configuration_block() -> BlockBuilder {
    let patterns = |name: &str, description: &str| {
        AttributeBuilder::set(name, AttributeType::String)
            .optional()
            .description(description)
            .validator(Box::new(ListLengthValidator {
                min: None,
                max: Some(100),
            }))
            .validator(Box::new(EachElementValidator(Box::new(
                StringLengthValidator::between(1, 150),
            ))))
    };
    let path = |name: &str, description: &str| {
        AttributeBuilder::string(name)
            .optional()
            .description(description)
            .validator(Box::new(StringLengthValidator::between(1, 1024)))
    };

    BlockBuilder::list("configuration")
        .max_items(1)
        .description("Connector configuration for the data source")
        .block(
            "s3_configuration",
            BlockBuilder::list("s3_configuration")
                .max_items(1)
                .description("Deprecated in favour of template_configuration. Connects an S3 bucket.")
                .attribute(
                    "bucket_name",
                    AttributeBuilder::string("bucket_name")
                        .required()
                        .description("Name of the bucket that contains the documents")
                        .validator(Box::new(StringLengthValidator::between(3, 63)))
                        .validator(Box::new(StringPatternValidator::new(
                            r"^[0-9a-z][0-9a-z.-]{1,61}[0-9a-z]$",
                            "must be a valid bucket name",
                        ))),
                )
                .attribute(
                    "inclusion_patterns",
                    patterns("inclusion_patterns", "Glob patterns of documents to index"),
                )
                .attribute(
                    "exclusion_patterns",
                    patterns("exclusion_patterns", "Glob patterns of documents to skip"),
                )
                .attribute(
                    "inclusion_prefixes",
                    patterns("inclusion_prefixes", "Key prefixes of documents to index"),
                )
                .block(
                    "access_control_list_configuration",
                    BlockBuilder::list("access_control_list_configuration")
                        .max_items(1)
                        .description("Location of the access control list file")
                        .attribute("key_path", path("key_path", "Path to the access control list file")),
                )
                .block(
                    "documents_metadata_configuration",
                    BlockBuilder::list("documents_metadata_configuration")
                        .max_items(1)
                        .description("Location of the document metadata files")
                        .attribute("s3_prefix", path("s3_prefix", "Prefix of the metadata files")),
                ),
        )
        .block(
            "template_configuration",
            BlockBuilder::list("template_configuration")
                .max_items(1)
                .description("Connector template, as JSON")
                .attribute(
                    "template",
                    AttributeBuilder::string("template")
                        .required()
                        .description("JSON connector template")
                        .validator(Box::new(JsonStringValidator))
                        .plan_modifier(Box::new(SuppressEquivalent::new(equivalent_templates))),
                ),
        )
        .block("web_crawler_configuration", web_crawler_block())
}

fn host(description: &str) -> AttributeBuilder {
    AttributeBuilder::string("host")
        .required()
        .description(description)
        .validator(Box::new(StringLengthValidator::between(1, 253)))
}

fn port(description: &str) -> AttributeBuilder {
    AttributeBuilder::number("port")
        .required()
        .description(description)
        .validator(Box::new(NumberRangeValidator::between(1.0, 65535.0)))
}

fn bounded_number(name: &str, description: &str, min: f64, max: f64) -> AttributeBuilder {
    AttributeBuilder::number(name)
        .optional()
        .description(description)
        .validator(Box::new(NumberRangeValidator::between(min, max)))
}

fn web_crawler_block() -> BlockBuilder {
    let url_patterns = |name: &str, description: &str| {
        AttributeBuilder::set(name, AttributeType::String)
            .optional()
            .description(description)
            .validator(Box::new(ListLengthValidator {
                min: None,
                max: Some(100),
            }))
            .validator(Box::new(EachElementValidator(Box::new(
                StringLengthValidator::between(1, 150),
            ))))
    };

    BlockBuilder::list("web_crawler_configuration")
        .max_items(1)
        .description("Deprecated in favour of template_configuration. Crawls websites.")
        .attribute(
            "crawl_depth",
            bounded_number("crawl_depth", "Levels of links to follow from the seed pages", 0.0, 10.0)
                .default(StaticDefault::number(2.0)),
        )
        .attribute(
            "max_content_size_per_page_in_mega_bytes",
            bounded_number(
                "max_content_size_per_page_in_mega_bytes",
                "Largest page or attachment to crawl, in MB",
                0.000001,
                50.0,
            )
            .computed(),
        )
        .attribute(
            "max_links_per_page",
            bounded_number("max_links_per_page", "Most links to follow on one page", 1.0, 1000.0)
                .default(StaticDefault::number(100.0)),
        )
        .attribute(
            "max_urls_per_minute_crawl_rate",
            bounded_number(
                "max_urls_per_minute_crawl_rate",
                "Most URLs crawled per website host per minute",
                1.0,
                300.0,
            )
            .default(StaticDefault::number(300.0)),
        )
        .attribute(
            "url_exclusion_patterns",
            url_patterns("url_exclusion_patterns", "Regular expressions of URLs to skip"),
        )
        .attribute(
            "url_inclusion_patterns",
            url_patterns("url_inclusion_patterns", "Regular expressions of URLs to crawl"),
        )
        .block(
            "authentication_configuration",
            BlockBuilder::list("authentication_configuration")
                .max_items(1)
                .description("Credentials for websites that require basic authentication")
                .block(
                    "basic_authentication",
                    BlockBuilder::set("basic_authentication")
                        .max_items(10)
                        .description("Basic authentication credentials for one host")
                        .attribute(
                            "credentials",
                            AttributeBuilder::string("credentials")
                                .required()
                                .description("Secrets Manager secret holding the user name and password")
                                .validator(Box::new(ArnValidator)),
                        )
                        .attribute("host", host("Host of the website"))
                        .attribute("port", port("Port of the website")),
                ),
        )
        .block(
            "proxy_configuration",
            BlockBuilder::list("proxy_configuration")
                .max_items(1)
                .description("Web proxy used to reach internal websites")
                .attribute(
                    "credentials",
                    AttributeBuilder::string("credentials")
                        .optional()
                        .description("Secrets Manager secret holding the proxy credentials")
                        .validator(Box::new(ArnValidator)),
                )
                .attribute("host", host("Host of the proxy server"))
                .attribute("port", port("Port of the proxy server")),
        )
        .block(
            "urls",
            BlockBuilder::list("urls")
                .min_items(1)
                .max_items(1)
                .description("Seed pages or site maps to start crawling from")
                .block(
                    "seed_url_configuration",
                    BlockBuilder::list("seed_url_configuration")
                        .max_items(1)
                        .description("Pages to start crawling from")
                        .attribute(
                            "seed_urls",
                            AttributeBuilder::set("seed_urls", AttributeType::String)
                                .required()
                                .description("Up to 100 seed URLs")
                                .validator(Box::new(ListLengthValidator {
                                    min: None,
                                    max: Some(100),
                                }))
                                .validator(Box::new(EachElementValidator(Box::new(
                                    StringLengthValidator::between(1, 2048),
                                ))))
                                .validator(Box::new(EachElementValidator(Box::new(
                                    StringPatternValidator::new(
                                        r"^(https?)://",
                                        "must start with http:// or https://",
                                    ),
                                )))),
                        )
                        .attribute(
                            "web_crawler_mode",
                            AttributeBuilder::string("web_crawler_mode")
                                .optional()
                                .description("Which hosts of the seed URLs to crawl")
                                .validator(Box::new(StringOneOfValidator::new([
                                    "HOST_ONLY",
                                    "SUBDOMAINS",
                                    "EVERYTHING",
                                ]))),
                        ),
                )
                .block(
                    "site_maps_configuration",
                    BlockBuilder::list("site_maps_configuration")
                        .max_items(1)
                        .description("Site maps to start crawling from")
                        .attribute(
                            "site_maps",
                            AttributeBuilder::set("site_maps", AttributeType::String)
                                .required()
                                .description("Up to three site map URLs")
                                .validator(Box::new(ListLengthValidator {
                                    min: None,
                                    max: Some(3),
                                }))
                                .validator(Box::new(EachElementValidator(Box::new(
                                    StringPatternValidator::new(
                                        r"^(https?)://",
                                        "must start with http:// or https://",
                                    ),
                                )))),
                        ),
                ),
        )
}

fn attribute_key(name: &str, required: bool) -> AttributeBuilder {
    let builder = AttributeBuilder::string(name)
        .description("Document attribute key")
        .validator(Box::new(StringLengthValidator::between(1, 200)));
    if required {
        builder.required()
    } else {
        builder.optional()
    }
}

fn attribute_value_block(name: &str) -> BlockBuilder {
    BlockBuilder::list(name)
        .max_items(1)
        .description("Document attribute value. Only the first of date, string, string list or long that is set is used.")
        .attribute(
            "date_value",
            AttributeBuilder::string("date_value")
                .optional()
                .description("Date in RFC3339 format")
                .validator(Box::new(Rfc3339Validator)),
        )
        .attribute(
            "long_value",
            AttributeBuilder::number("long_value")
                .optional()
                .description("Whole number value"),
        )
        .attribute(
            "string_list_value",
            AttributeBuilder::set("string_list_value", AttributeType::String)
                .optional()
                .description("List of strings"),
        )
        .attribute(
            "string_value",
            AttributeBuilder::string("string_value")
                .optional()
                .description("String value")
                .validator(Box::new(StringLengthValidator::between(1, 2048))),
        )
}

fn condition_block(name: &str) -> BlockBuilder {
    BlockBuilder::list(name)
        .max_items(1)
        .description("Condition on a document attribute")
        .attribute(
            "condition_document_attribute_key",
            attribute_key("condition_document_attribute_key", true),
        )
        .attribute(
            "operator",
            AttributeBuilder::string("operator")
                .required()
                .description("How the attribute is compared with the value")
                .validator(Box::new(StringOneOfValidator::new(CONDITION_OPERATORS))),
        )
        .block("condition_on_value", attribute_value_block("condition_on_value"))
}

fn hook_block(name: &str, description: &str) -> BlockBuilder {
    BlockBuilder::list(name)
        .max_items(1)
        .description(description)
        .attribute(
            "lambda_arn",
            AttributeBuilder::string("lambda_arn")
                .required()
                .description("Lambda function that alters the documents")
                .validator(Box::new(ArnValidator)),
        )
        .attribute(
            "s3_bucket",
            AttributeBuilder::string("s3_bucket")
                .required()
                .description("Bucket for the documents the function processes")
                .validator(Box::new(StringLengthValidator::between(3, 63)))
                .validator(Box::new(StringPatternValidator::new(
                    r"^[a-z0-9][.a-z0-9-]*[a-z0-9]$",
                    "must be a valid bucket name",
                ))),
        )
        .block("invocation_condition", condition_block("invocation_condition"))
}

fn enrichment_block() -> BlockBuilder {
    BlockBuilder::list("custom_document_enrichment_configuration")
        .max_items(1)
        .description("Changes Kendra applies to documents and their metadata while ingesting them")
        .attribute(
            "role_arn",
            AttributeBuilder::string("role_arn")
                .optional()
                .description("IAM role allowed to run the hooks and read their bucket")
                .validator(Box::new(ArnValidator)),
        )
        .block(
            "inline_configurations",
            BlockBuilder::set("inline_configurations")
                .max_items(100)
                .description("Conditions and targets applied without a Lambda function")
                .attribute(
                    "document_content_deletion",
                    AttributeBuilder::bool("document_content_deletion")
                        .optional()
                        .description("Whether to delete the content of matching documents"),
                )
                .block("condition", condition_block("condition"))
                .block(
                    "target",
                    BlockBuilder::list("target")
                        .max_items(1)
                        .description("Attribute to set on matching documents")
                        .attribute(
                            "target_document_attribute_key",
                            attribute_key("target_document_attribute_key", false),
                        )
                        .attribute(
                            "target_document_attribute_value_deletion",
                            AttributeBuilder::bool("target_document_attribute_value_deletion")
                                .optional()
                                .description("Whether to remove the target attribute's value"),
                        )
                        .block(
                            "target_document_attribute_value",
                            attribute_value_block("target_document_attribute_value"),
                        ),
                ),
        )
        .block(
            "pre_extraction_hook_configuration",
            hook_block(
                "pre_extraction_hook_configuration",
                "Lambda function run on documents before their text is extracted",
            ),
        )
        .block(
            "post_extraction_hook_configuration",
            hook_block(
                "post_extraction_hook_configuration",
                "Lambda function run on documents after their text is extracted",
            ),
        )
}

fn equivalent_templates(old: &Dynamic, new: &Dynamic) -> bool {
    match (old.as_string(), new.as_string()) {
        (Some(old), Some(new)) => json_equal(old, new),
        _ => false,
    }
}

fn json_equal(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn is_create_retryable(err: &ApiError) -> bool {
    is_iam_propagation(err) || err.message_contains("ValidationException", SECRETS_MANAGER_MESSAGE)
}

/// Attributes a CUSTOM data source must leave unset
fn custom_type_conflicts(values: &Object) -> Vec<&'static str> {
    if values.string("type").as_deref() != Some(CUSTOM) {
        return Vec::new();
    }
    let set = |key: &str| values.get(key).map(|v| v.is_known() && !v.is_empty()).unwrap_or(false);
    ["configuration", "role_arn", "schedule"]
        .into_iter()
        .filter(|key| set(key))
        .collect()
}

#[async_trait]
impl ResourceV2 for DataSourceResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn validate(&self, request: ValidateRequest) -> ValidateResponse {
        let mut diagnostics = Diagnostics::new();
        for key in custom_type_conflicts(&request.config.values) {
            diagnostics.add_attribute_error(
                key,
                format!("{} must not be set when type is {}", key, CUSTOM),
                "Remove the attribute or choose another data source type",
            );
        }
        ValidateResponse { diagnostics }
    }

    async fn modify_plan(&self, request: ModifyPlanRequest) -> ModifyPlanResponse {
        plan_tags(&self.provider_data, request)
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let Some(data) = configured(&self.provider_data, &mut diagnostics) else {
            return CreateResponse {
                state: request.planned_state,
                diagnostics,
            };
        };

        let mut values = request.planned_state.values;
        let timeouts = TIMEOUTS.resolve(&values);
        let name = values.string("name").unwrap_or_default();
        let index_id = values.string("index_id").unwrap_or_default();

        let expanded = expand_configuration(values.block("configuration")).and_then(|configuration| {
            let enrichment = expand_enrichment(values.block("custom_document_enrichment_configuration"))?;
            Ok((configuration, enrichment))
        });
        let (configuration, custom_document_enrichment_configuration) = match expanded {
            Ok(expanded) => expanded,
            Err(e) => {
                diagnostics.add_error(
                    format!("creating Kendra Data Source ({}): {}", name, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };

        let input = CreateDataSourceRequest {
            index_id: index_id.clone(),
            name: name.clone(),
            data_source_type: values.string("type").unwrap_or_default(),
            client_token: super::client_token(),
            configuration,
            custom_document_enrichment_configuration,
            description: values.string("description"),
            language_code: values.string("language_code"),
            role_arn: values.string("role_arn"),
            schedule: values.string("schedule"),
            tags: tags::create_tags(&values, &data.default_tags),
        };

        let api = data.client.kendra();
        let data_source_id = match retry_when(
            &request.context,
            PROPAGATION_TIMEOUT,
            || api.create_data_source(&input),
            is_create_retryable,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(
                    format!("creating Kendra Data Source ({}): {}", name, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };

        let id = child_id(&data_source_id, &index_id);
        info!("Created Kendra Data Source: {}", id);
        values.insert("id".to_string(), Dynamic::string(&id));

        if let Err(e) = wait_data_source(
            &request.context,
            &data.client,
            &data_source_id,
            &index_id,
            "CREATING",
            timeouts.create,
        )
        .await
        {
            diagnostics.add_error(
                format!("waiting for Data Source ({}) creation: {}", id, e),
                None::<String>,
            );
            return CreateResponse {
                state: applied_state(values),
                diagnostics,
            };
        }

        match read_data_source(data, &data_source_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("getting Kendra Data Source ({}): not found after creation", id),
                None::<String>,
            ),
            Err(e) => diagnostics.add_error(e, None::<String>),
        }

        CreateResponse {
            state: applied_state(values),
            diagnostics,
        }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let Some(data) = configured(&self.provider_data, &mut diagnostics) else {
            return ReadResponse {
                state: Some(request.current_state),
                diagnostics,
            };
        };

        let id = request.current_state.values.string("id").unwrap_or_default();
        let Some((data_source_id, index_id)) = parse_child_id(&id, "data-source", &mut diagnostics) else {
            return ReadResponse {
                state: Some(request.current_state),
                diagnostics,
            };
        };

        match read_data_source(data, &data_source_id, &index_id, &request.current_state.values).await {
            Ok(Some(values)) => ReadResponse {
                state: Some(State::from_values(values)),
                diagnostics,
            },
            Ok(None) => {
                warn!("Kendra Data Source ({}) not found, removing from state", id);
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error(e, None::<String>);
                ReadResponse {
                    state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let mut diagnostics = Diagnostics::new();
        let Some(data) = configured(&self.provider_data, &mut diagnostics) else {
            return UpdateResponse {
                state: request.current_state,
                diagnostics,
            };
        };

        let prior = request.current_state.values;
        let mut values = request.planned_state.values;
        let id = prior.string("id").unwrap_or_default();
        let timeouts = TIMEOUTS.resolve(&values);
        let Some((data_source_id, index_id)) = parse_child_id(&id, "data-source", &mut diagnostics) else {
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        };

        let input = match expand_update_request(&data_source_id, &index_id, &prior, &values) {
            Ok(input) => input,
            Err(e) => {
                diagnostics.add_error(
                    format!("updating Kendra Data Source ({}): {}", id, e),
                    None::<String>,
                );
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }
        };

        if let Some(input) = input {
            debug!("Updating Kendra Data Source: {}", id);
            let api = data.client.kendra();
            if let Err(e) = retry_when(
                &request.context,
                PROPAGATION_TIMEOUT,
                || api.update_data_source(&input),
                is_iam_propagation,
            )
            .await
            {
                diagnostics.add_error(
                    format!("updating Kendra Data Source ({}): {}", id, e),
                    None::<String>,
                );
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }

            if let Err(e) = wait_data_source(
                &request.context,
                &data.client,
                &data_source_id,
                &index_id,
                "UPDATING",
                timeouts.update,
            )
            .await
            {
                diagnostics.add_error(
                    format!("waiting for Kendra Data Source ({}) update: {}", id, e),
                    None::<String>,
                );
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }
        }

        let arn = prior.string("arn").unwrap_or_default();
        if let Err(e) = update_tags(&data.client, &arn, &prior, &values, &data.default_tags).await {
            diagnostics.add_error(
                format!("updating tags for Kendra Data Source ({}): {}", id, e),
                None::<String>,
            );
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        }

        match read_data_source(data, &data_source_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("getting Kendra Data Source ({}): not found after update", id),
                None::<String>,
            ),
            Err(e) => diagnostics.add_error(e, None::<String>),
        }

        UpdateResponse {
            state: applied_state(values),
            diagnostics,
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();
        let Some(data) = configured(&self.provider_data, &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        let values = &request.current_state.values;
        let id = values.string("id").unwrap_or_default();
        let timeouts = TIMEOUTS.resolve(values);
        let Some((data_source_id, index_id)) = parse_child_id(&id, "data-source", &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        debug!("Deleting Kendra Data Source: {}", id);
        match data.client.kendra().delete_data_source(&data_source_id, &index_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResponse { diagnostics },
            Err(e) => {
                diagnostics.add_error(
                    format!("deleting Kendra Data Source ({}): {}", id, e),
                    None::<String>,
                );
                return DeleteResponse { diagnostics };
            }
        }

        if let Err(e) = wait_data_source(
            &request.context,
            &data.client,
            &data_source_id,
            &index_id,
            "DELETING",
            timeouts.delete,
        )
        .await
        {
            diagnostics.add_error(
                format!("waiting for Kendra Data Source ({}) delete: {}", id, e),
                None::<String>,
            );
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request)
    }
}

async fn wait_data_source(
    ctx: &Context,
    client: &Client,
    data_source_id: &str,
    index_id: &str,
    pending: &str,
    timeout: Duration,
) -> Result<Option<DataSource>, RetryError> {
    let conf = if pending == "DELETING" {
        StateChangeConf::new(&[pending], &[], timeout)
    } else {
        StateChangeConf::new(&[pending], &["ACTIVE"], timeout)
            .not_found_checks(20)
            .continuous_target_occurence(2)
    };
    wait_for(ctx, conf, || async move {
        client.kendra().find_data_source(data_source_id, index_id).await
    })
    .await
}

async fn read_data_source(
    data: &AwsProviderData,
    data_source_id: &str,
    index_id: &str,
    prior: &Object,
) -> Result<Option<Object>, String> {
    let id = child_id(data_source_id, index_id);
    let data_source = match data.client.kendra().find_data_source(data_source_id, index_id).await {
        Ok(Some(data_source)) => data_source,
        Ok(None) => return Ok(None),
        Err(e) => return Err(format!("getting Kendra Data Source ({}): {}", id, e)),
    };
    let arn = kendra_arn(&data.client, index_id, Some(("data-source", data_source_id)))
        .await
        .map_err(|e| format!("getting Kendra Data Source ({}): {}", id, e))?;

    let mut values = prior.clone();
    values.insert("id".to_string(), Dynamic::String(id.clone()));
    flatten_data_source(&data_source, &arn, &mut values);
    flex::settle_zero_values(prior, &mut values);
    read_tags(&data.client, &arn, &mut values, &data.default_tags)
        .await
        .map_err(|e| format!("listing tags for Kendra Data Source ({}): {}", id, e))?;
    Ok(Some(values))
}

/// UpdateDataSource body carrying the changed attributes, `None` when
/// nothing it covers changed
fn expand_update_request(
    data_source_id: &str,
    index_id: &str,
    prior: &Object,
    planned: &Object,
) -> Result<Option<UpdateDataSourceRequest>, String> {
    let changed = |key: &str| flex::has_change(prior, planned, key);
    if !UPDATABLE.iter().any(|key| changed(key)) {
        return Ok(None);
    }

    let mut input = UpdateDataSourceRequest {
        id: data_source_id.to_string(),
        index_id: index_id.to_string(),
        ..Default::default()
    };
    if changed("configuration") {
        input.configuration = expand_configuration(planned.block("configuration"))?;
    }
    if changed("custom_document_enrichment_configuration") {
        input.custom_document_enrichment_configuration =
            expand_enrichment(planned.block("custom_document_enrichment_configuration"))?;
    }
    if changed("description") {
        input.description = Some(planned.string("description").unwrap_or_default());
    }
    if changed("language_code") {
        input.language_code = planned.string("language_code");
    }
    if changed("name") {
        input.name = planned.string("name");
    }
    if changed("role_arn") {
        input.role_arn = planned.string("role_arn");
    }
    if changed("schedule") {
        input.schedule = Some(planned.string("schedule").unwrap_or_default());
    }
    Ok(Some(input))
}

fn expand_configuration(block: Option<&Object>) -> Result<Option<DataSourceConfiguration>, String> {
    let Some(block) = block else {
        return Ok(None);
    };

    let s3_configuration = block.block("s3_configuration").map(|s3| S3DataSourceConfiguration {
        bucket_name: s3.string("bucket_name").unwrap_or_default(),
        inclusion_patterns: s3.strings("inclusion_patterns"),
        exclusion_patterns: s3.strings("exclusion_patterns"),
        inclusion_prefixes: s3.strings("inclusion_prefixes"),
        access_control_list_configuration: s3
            .block("access_control_list_configuration")
            .map(|acl| AccessControlListConfiguration {
                key_path: acl.string("key_path"),
            }),
        documents_metadata_configuration: s3
            .block("documents_metadata_configuration")
            .map(|metadata| DocumentsMetadataConfiguration {
                s3_prefix: metadata.string("s3_prefix"),
            }),
    });

    let template_configuration = match block.block("template_configuration") {
        Some(template) => {
            let document = template.string("template").unwrap_or_default();
            let template = serde_json::from_str(&document).map_err(|e| format!("decoding JSON: {}", e))?;
            Some(TemplateConfiguration { template })
        }
        None => None,
    };

    Ok(Some(DataSourceConfiguration {
        s3_configuration,
        template_configuration,
        web_crawler_configuration: block.block("web_crawler_configuration").map(expand_web_crawler),
    }))
}

fn expand_web_crawler(crawler: &Object) -> WebCrawlerConfiguration {
    let urls = crawler.block("urls");
    WebCrawlerConfiguration {
        urls: WebCrawlerUrls {
            seed_url_configuration: urls
                .and_then(|urls| urls.block("seed_url_configuration"))
                .map(|seed| SeedUrlConfiguration {
                    seed_urls: seed.strings("seed_urls"),
                    web_crawler_mode: seed.string("web_crawler_mode"),
                }),
            site_maps_configuration: urls
                .and_then(|urls| urls.block("site_maps_configuration"))
                .map(|maps| SiteMapsConfiguration {
                    site_maps: maps.strings("site_maps"),
                }),
        },
        authentication_configuration: crawler.block("authentication_configuration").map(|auth| {
            AuthenticationConfiguration {
                basic_authentication: auth
                    .blocks("basic_authentication")
                    .into_iter()
                    .map(|basic| BasicAuthenticationConfiguration {
                        credentials: basic.string("credentials").unwrap_or_default(),
                        host: basic.string("host").unwrap_or_default(),
                        port: basic.int("port").unwrap_or_default(),
                    })
                    .collect(),
            }
        }),
        crawl_depth: crawler.int("crawl_depth"),
        max_content_size_per_page_in_mega_bytes: crawler
            .get("max_content_size_per_page_in_mega_bytes")
            .and_then(Dynamic::as_number),
        max_links_per_page: crawler.int("max_links_per_page"),
        max_urls_per_minute_crawl_rate: crawler.int("max_urls_per_minute_crawl_rate"),
        proxy_configuration: crawler.block("proxy_configuration").map(|proxy| ProxyConfiguration {
            host: proxy.string("host").unwrap_or_default(),
            port: proxy.int("port").unwrap_or_default(),
            credentials: proxy.string("credentials"),
        }),
        url_exclusion_patterns: crawler.strings("url_exclusion_patterns"),
        url_inclusion_patterns: crawler.strings("url_inclusion_patterns"),
    }
}

fn expand_enrichment(
    block: Option<&Object>,
) -> Result<Option<CustomDocumentEnrichmentConfiguration>, String> {
    let Some(block) = block else {
        return Ok(None);
    };

    let inline_configurations = block
        .blocks("inline_configurations")
        .into_iter()
        .map(|inline| -> Result<_, String> {
            Ok(InlineCustomDocumentEnrichmentConfiguration {
                condition: inline.block("condition").map(expand_condition).transpose()?,
                document_content_deletion: inline.bool("document_content_deletion").unwrap_or(false),
                target: inline.block("target").map(expand_target).transpose()?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(CustomDocumentEnrichmentConfiguration {
        inline_configurations,
        pre_extraction_hook_configuration: block
            .block("pre_extraction_hook_configuration")
            .map(expand_hook)
            .transpose()?,
        post_extraction_hook_configuration: block
            .block("post_extraction_hook_configuration")
            .map(expand_hook)
            .transpose()?,
        role_arn: block.string("role_arn"),
    }))
}

fn expand_hook(hook: &Object) -> Result<HookConfiguration, String> {
    Ok(HookConfiguration {
        lambda_arn: hook.string("lambda_arn").unwrap_or_default(),
        s3_bucket: hook.string("s3_bucket").unwrap_or_default(),
        invocation_condition: hook.block("invocation_condition").map(expand_condition).transpose()?,
    })
}

fn expand_target(target: &Object) -> Result<DocumentAttributeTarget, String> {
    Ok(DocumentAttributeTarget {
        target_document_attribute_key: target.string("target_document_attribute_key"),
        target_document_attribute_value: target
            .block("target_document_attribute_value")
            .map(expand_attribute_value)
            .transpose()?,
        target_document_attribute_value_deletion: target
            .bool("target_document_attribute_value_deletion")
            .unwrap_or(false),
    })
}

fn expand_condition(condition: &Object) -> Result<DocumentAttributeCondition, String> {
    Ok(DocumentAttributeCondition {
        condition_document_attribute_key: condition
            .string("condition_document_attribute_key")
            .unwrap_or_default(),
        operator: condition.string("operator").unwrap_or_default(),
        condition_on_value: condition
            .block("condition_on_value")
            .map(expand_attribute_value)
            .transpose()?,
    })
}

/// Kendra accepts one field per value. The first set of date, string,
/// string list and long wins.
fn expand_attribute_value(value: &Object) -> Result<DocumentAttributeValue, String> {
    let mut expanded = DocumentAttributeValue::default();
    if let Some(date) = value.string("date_value") {
        let seconds = flex::epoch_seconds(&date)
            .ok_or_else(|| format!("date_value {:?} is not an RFC3339 timestamp", date))?;
        expanded.date_value = Some(seconds);
    } else if let Some(string) = value.string("string_value") {
        expanded.string_value = Some(string);
    } else if let Some(strings) = flex::non_empty(value.strings("string_list_value")) {
        expanded.string_list_value = Some(strings);
    } else {
        expanded.long_value = value.int("long_value");
    }
    Ok(expanded)
}

fn flatten_configuration(config: Option<&DataSourceConfiguration>, prior: &Object) -> Dynamic {
    let stored_template = prior
        .block("configuration")
        .and_then(|c| c.block("template_configuration"))
        .and_then(|t| t.string("template"));

    flex::block(config.map(|config| {
        object([
            (
                "s3_configuration",
                flex::block(config.s3_configuration.as_ref().map(|s3| {
                    object([
                        ("bucket_name", Dynamic::string(&s3.bucket_name)),
                        ("inclusion_patterns", flex::string_set(&s3.inclusion_patterns)),
                        ("exclusion_patterns", flex::string_set(&s3.exclusion_patterns)),
                        ("inclusion_prefixes", flex::string_set(&s3.inclusion_prefixes)),
                        (
                            "access_control_list_configuration",
                            flex::block(s3.access_control_list_configuration.as_ref().map(|acl| {
                                object([("key_path", Dynamic::from(acl.key_path.clone()))])
                            })),
                        ),
                        (
                            "documents_metadata_configuration",
                            flex::block(s3.documents_metadata_configuration.as_ref().map(|metadata| {
                                object([("s3_prefix", Dynamic::from(metadata.s3_prefix.clone()))])
                            })),
                        ),
                    ])
                })),
            ),
            (
                "template_configuration",
                flex::block(config.template_configuration.as_ref().map(|t| {
                    let remote = t.template.to_string();
                    let template = match &stored_template {
                        Some(stored) if json_equal(stored, &remote) => stored.clone(),
                        _ => remote,
                    };
                    object([("template", Dynamic::String(template))])
                })),
            ),
            (
                "web_crawler_configuration",
                flex::block(config.web_crawler_configuration.as_ref().map(flatten_web_crawler)),
            ),
        ])
    }))
}

fn flatten_web_crawler(crawler: &WebCrawlerConfiguration) -> Object {
    let urls = object([
        (
            "seed_url_configuration",
            flex::block(crawler.urls.seed_url_configuration.as_ref().map(|seed| {
                object([
                    ("seed_urls", flex::string_set(&seed.seed_urls)),
                    ("web_crawler_mode", Dynamic::from(seed.web_crawler_mode.clone())),
                ])
            })),
        ),
        (
            "site_maps_configuration",
            flex::block(
                crawler
                    .urls
                    .site_maps_configuration
                    .as_ref()
                    .map(|maps| object([("site_maps", flex::string_set(&maps.site_maps))])),
            ),
        ),
    ]);

    object([
        ("urls", flex::block(Some(urls))),
        (
            "authentication_configuration",
            flex::block(crawler.authentication_configuration.as_ref().map(|auth| {
                let credentials = auth
                    .basic_authentication
                    .iter()
                    .map(|basic| {
                        object([
                            ("credentials", Dynamic::string(&basic.credentials)),
                            ("host", Dynamic::string(&basic.host)),
                            ("port", Dynamic::from(basic.port)),
                        ])
                    })
                    .collect();
                object([("basic_authentication", flex::blocks(credentials))])
            })),
        ),
        ("crawl_depth", Dynamic::from(crawler.crawl_depth.unwrap_or_default())),
        (
            "max_content_size_per_page_in_mega_bytes",
            Dynamic::from(crawler.max_content_size_per_page_in_mega_bytes),
        ),
        ("max_links_per_page", Dynamic::from(crawler.max_links_per_page)),
        (
            "max_urls_per_minute_crawl_rate",
            Dynamic::from(crawler.max_urls_per_minute_crawl_rate),
        ),
        (
            "proxy_configuration",
            flex::block(crawler.proxy_configuration.as_ref().map(|proxy| {
                object([
                    ("credentials", Dynamic::from(proxy.credentials.clone())),
                    ("host", Dynamic::string(&proxy.host)),
                    ("port", Dynamic::from(proxy.port)),
                ])
            })),
        ),
        ("url_exclusion_patterns", flex::string_set(&crawler.url_exclusion_patterns)),
        ("url_inclusion_patterns", flex::string_set(&crawler.url_inclusion_patterns)),
    ])
}

fn flatten_enrichment(enrichment: &CustomDocumentEnrichmentConfiguration) -> Object {
    let inline_configurations = enrichment
        .inline_configurations
        .iter()
        .map(|inline| {
            object([
                ("condition", flex::block(inline.condition.as_ref().map(flatten_condition))),
                ("document_content_deletion", Dynamic::Bool(inline.document_content_deletion)),
                (
                    "target",
                    flex::block(inline.target.as_ref().map(|target| {
                        object([
                            (
                                "target_document_attribute_key",
                                Dynamic::from(target.target_document_attribute_key.clone()),
                            ),
                            (
                                "target_document_attribute_value",
                                flex::block(
                                    target
                                        .target_document_attribute_value
                                        .as_ref()
                                        .map(flatten_attribute_value),
                                ),
                            ),
                            (
                                "target_document_attribute_value_deletion",
                                Dynamic::Bool(target.target_document_attribute_value_deletion),
                            ),
                        ])
                    })),
                ),
            ])
        })
        .collect();

    object([
        ("inline_configurations", flex::blocks(inline_configurations)),
        (
            "pre_extraction_hook_configuration",
            flex::block(enrichment.pre_extraction_hook_configuration.as_ref().map(flatten_hook)),
        ),
        (
            "post_extraction_hook_configuration",
            flex::block(enrichment.post_extraction_hook_configuration.as_ref().map(flatten_hook)),
        ),
        ("role_arn", Dynamic::from(enrichment.role_arn.clone())),
    ])
}

fn flatten_hook(hook: &HookConfiguration) -> Object {
    object([
        (
            "invocation_condition",
            flex::block(hook.invocation_condition.as_ref().map(flatten_condition)),
        ),
        ("lambda_arn", Dynamic::string(&hook.lambda_arn)),
        ("s3_bucket", Dynamic::string(&hook.s3_bucket)),
    ])
}

fn flatten_condition(condition: &DocumentAttributeCondition) -> Object {
    object([
        (
            "condition_document_attribute_key",
            Dynamic::string(&condition.condition_document_attribute_key),
        ),
        (
            "condition_on_value",
            flex::block(condition.condition_on_value.as_ref().map(flatten_attribute_value)),
        ),
        ("operator", Dynamic::string(&condition.operator)),
    ])
}

/// Shows only the field Kendra would use, in the same order as on expand
fn flatten_attribute_value(value: &DocumentAttributeValue) -> Object {
    let mut flattened = object([
        ("date_value", Dynamic::Null),
        ("long_value", Dynamic::Null),
        ("string_list_value", Dynamic::Null),
        ("string_value", Dynamic::Null),
    ]);
    let chosen = if let Some(date) = value.date_value {
        Some(("date_value", flex::timestamp(Some(date))))
    } else if let Some(string) = &value.string_value {
        Some(("string_value", Dynamic::string(string)))
    } else if let Some(strings) = &value.string_list_value {
        Some(("string_list_value", flex::string_set(strings)))
    } else {
        value.long_value.map(|long| ("long_value", Dynamic::from(long)))
    };
    if let Some((key, field)) = chosen {
        flattened.insert(key.to_string(), field);
    }
    flattened
}

pub(crate) fn flatten_data_source(data_source: &DataSource, arn: &str, values: &mut Object) {
    let configuration = flatten_configuration(data_source.configuration.as_ref(), values);
    let enrichment = flex::block(
        data_source
            .custom_document_enrichment_configuration
            .as_ref()
            .map(flatten_enrichment),
    );
    let fields = [
        ("arn", Dynamic::string(arn)),
        ("data_source_id", Dynamic::string(&data_source.id)),
        ("index_id", Dynamic::string(&data_source.index_id)),
        ("name", Dynamic::string(&data_source.name)),
        ("type", Dynamic::from(data_source.data_source_type.clone())),
        ("description", Dynamic::from(data_source.description.clone())),
        ("language_code", Dynamic::from(data_source.language_code.clone())),
        ("role_arn", Dynamic::from(data_source.role_arn.clone())),
        ("schedule", Dynamic::from(data_source.schedule.clone())),
        ("status", Dynamic::from(data_source.status.clone())),
        ("error_message", Dynamic::from(data_source.error_message.clone())),
        ("created_at", flex::timestamp(data_source.created_at)),
        ("updated_at", flex::timestamp(data_source.updated_at)),
        ("configuration", configuration),
        ("custom_document_enrichment_configuration", enrichment),
    ];
    for (key, value) in fields {
        values.insert(key.to_string(), value);
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template_block(template: &str) -> Dynamic {
        flex::block(Some(object([(
            "template_configuration",
            flex::block(Some(object([("template", Dynamic::string(template))]))),
        )])))
    }

    #[test]
    fn custom_type_rejects_connector_settings() {
        let values = object([
            ("type", Dynamic::string("CUSTOM")),
            ("role_arn", Dynamic::string("arn:aws:iam::123456789012:role/kendra")),
            ("schedule", Dynamic::Null),
            ("configuration", Dynamic::List(vec![])),
        ]);
        assert_eq!(custom_type_conflicts(&values), vec!["role_arn"]);

        let s3 = object([
            ("type", Dynamic::string("S3")),
            ("role_arn", Dynamic::string("arn:aws:iam::123456789012:role/kendra")),
            ("schedule", Dynamic::string("cron(9 10 1 * ? *)")),
        ]);
        assert!(custom_type_conflicts(&s3).is_empty());
    }

    #[test]
    fn create_retries_on_propagation_messages() {
        let secrets = ApiError::from_service(
            400,
            "ValidationException",
            "Secrets Manager throws the exception: AccessDenied".to_string(),
        );
        assert!(is_create_retryable(&secrets));
        assert!(!is_iam_propagation(&secrets));
        assert!(!is_create_retryable(&ApiError::from_service(
            400,
            "ValidationException",
            "Invalid schedule".to_string()
        )));
    }

    #[test]
    fn s3_configuration_expands() {
        let configuration = object([(
            "s3_configuration",
            flex::block(Some(object([
                ("bucket_name", Dynamic::string("docs")),
                ("inclusion_prefixes", Dynamic::string_list(["public/"])),
                (
                    "documents_metadata_configuration",
                    flex::block(Some(object([("s3_prefix", Dynamic::string("meta/"))]))),
                ),
            ]))),
        )]);

        let config = expand_configuration(Some(&configuration)).unwrap().unwrap();
        let s3 = config.s3_configuration.unwrap();
        assert_eq!(s3.bucket_name, "docs");
        assert_eq!(s3.inclusion_prefixes, vec!["public/".to_string()]);
        assert!(s3.access_control_list_configuration.is_none());
        assert_eq!(
            s3.documents_metadata_configuration.unwrap().s3_prefix.as_deref(),
            Some("meta/")
        );
        assert!(config.template_configuration.is_none());
    }

    #[test]
    fn invalid_template_is_an_error() {
        let values = object([("configuration", template_block("{not json"))]);
        let err = expand_configuration(values.block("configuration")).unwrap_err();
        assert!(err.starts_with("decoding JSON"));
    }

    #[test]
    fn flatten_keeps_equivalent_template_text() {
        let written = r#"{ "type": "S3", "syncMode": "FULL_CRAWL" }"#;
        let mut values = object([("configuration", template_block(written))]);

        let data_source = DataSource {
            id: "ds".to_string(),
            index_id: "idx".to_string(),
            name: "docs".to_string(),
            data_source_type: Some("TEMPLATE".to_string()),
            configuration: Some(DataSourceConfiguration {
                template_configuration: Some(TemplateConfiguration {
                    template: json!({"syncMode": "FULL_CRAWL", "type": "S3"}),
                }),
                ..Default::default()
            }),
            created_at: Some(1_609_459_200.0),
            ..Default::default()
        };
        flatten_data_source(&data_source, "arn:aws:kendra:us-east-1:123456789012:index/idx/data-source/ds", &mut values);

        let template = values
            .block("configuration")
            .and_then(|c| c.block("template_configuration"))
            .and_then(|t| t.string("template"))
            .unwrap();
        assert_eq!(template, written);
        assert_eq!(values.string("created_at").unwrap(), "2021-01-01T00:00:00Z");
        assert_eq!(values.string("type").unwrap(), "TEMPLATE");
    }

    #[test]
    fn update_skips_unchanged_data_source() {
        let prior = object([
            ("name", Dynamic::string("docs")),
            ("schedule", Dynamic::string("cron(0 12 * * ? *)")),
        ]);
        assert!(expand_update_request("ds", "idx", &prior, &prior).unwrap().is_none());

        let planned = object([("name", Dynamic::string("docs"))]);
        let request = expand_update_request("ds", "idx", &prior, &planned).unwrap().unwrap();
        assert_eq!(request.schedule.as_deref(), Some(""));
        assert!(request.name.is_none());
        assert!(request.configuration.is_none());
    }

    fn condition(key: &str, operator: &str, value: Object) -> Dynamic {
        flex::block(Some(object([
            ("condition_document_attribute_key", Dynamic::string(key)),
            ("operator", Dynamic::string(operator)),
            ("condition_on_value", flex::block(Some(value))),
        ])))
    }

    #[test]
    fn web_crawler_configuration_expands_and_flattens() {
        let crawler = object([
            (
                "urls",
                flex::block(Some(object([(
                    "seed_url_configuration",
                    flex::block(Some(object([
                        (
                            "seed_urls",
                            Dynamic::string_list(["https://example.com/docs", "https://example.com/blog"]),
                        ),
                        ("web_crawler_mode", Dynamic::string("SUBDOMAINS")),
                    ]))),
                )]))),
            ),
            ("crawl_depth", Dynamic::Number(3.0)),
            ("max_content_size_per_page_in_mega_bytes", Dynamic::Number(0.5)),
            ("max_links_per_page", Dynamic::Number(100.0)),
            (
                "proxy_configuration",
                flex::block(Some(object([
                    ("host", Dynamic::string("proxy.internal")),
                    ("port", Dynamic::Number(3128.0)),
                ]))),
            ),
            (
                "authentication_configuration",
                flex::block(Some(object([(
                    "basic_authentication",
                    flex::blocks(vec![object([
                        (
                            "credentials",
                            Dynamic::string("arn:aws:secretsmanager:us-east-1:123456789012:secret:web"),
                        ),
                        ("host", Dynamic::string("example.com")),
                        ("port", Dynamic::Number(443.0)),
                    ])]),
                )]))),
            ),
        ]);
        let configuration = object([("web_crawler_configuration", flex::block(Some(crawler)))]);

        let config = expand_configuration(Some(&configuration)).unwrap().unwrap();
        let web = config.web_crawler_configuration.clone().unwrap();
        let seed = web.urls.seed_url_configuration.clone().unwrap();
        assert_eq!(seed.seed_urls.len(), 2);
        assert_eq!(seed.web_crawler_mode.as_deref(), Some("SUBDOMAINS"));
        assert!(web.urls.site_maps_configuration.is_none());
        assert_eq!(web.crawl_depth, Some(3));
        assert_eq!(web.max_content_size_per_page_in_mega_bytes, Some(0.5));
        assert_eq!(web.max_urls_per_minute_crawl_rate, None);
        assert_eq!(web.proxy_configuration.clone().unwrap().port, 3128);
        assert!(web.proxy_configuration.clone().unwrap().credentials.is_none());
        let auth = web.authentication_configuration.clone().unwrap();
        assert_eq!(auth.basic_authentication[0].host, "example.com");
        assert_eq!(auth.basic_authentication[0].port, 443);
        assert!(config.s3_configuration.is_none());

        let data_source = DataSource {
            id: "ds".to_string(),
            index_id: "idx".to_string(),
            name: "site".to_string(),
            configuration: Some(config),
            ..Default::default()
        };
        let mut values = Object::new();
        flatten_data_source(&data_source, "arn", &mut values);

        let web = values
            .block("configuration")
            .and_then(|c| c.block("web_crawler_configuration"))
            .unwrap();
        assert_eq!(web.int("crawl_depth"), Some(3));
        assert_eq!(web.int("max_links_per_page"), Some(100));
        assert_eq!(web["max_urls_per_minute_crawl_rate"], Dynamic::Null);
        let seed = web
            .block("urls")
            .and_then(|urls| urls.block("seed_url_configuration"))
            .unwrap();
        // sets come back sorted
        assert_eq!(
            seed.strings("seed_urls"),
            vec!["https://example.com/blog", "https://example.com/docs"]
        );
        assert_eq!(web.block("proxy_configuration").unwrap().string("host").unwrap(), "proxy.internal");
        assert_eq!(web.blocks("authentication_configuration").len(), 1);
    }

    #[test]
    fn attribute_value_takes_the_first_field_set() {
        let both = object([
            ("date_value", Dynamic::string("2021-01-01T00:00:00Z")),
            ("long_value", Dynamic::Number(0.0)),
            ("string_value", Dynamic::string("draft")),
        ]);
        let value = expand_attribute_value(&both).unwrap();
        assert_eq!(value.date_value, Some(1_609_459_200.0));
        assert!(value.long_value.is_none());
        assert!(value.string_value.is_none());

        let strings = object([
            ("string_value", Dynamic::string("")),
            ("string_list_value", Dynamic::string_list(["a", "b"])),
            ("long_value", Dynamic::Number(7.0)),
        ]);
        let value = expand_attribute_value(&strings).unwrap();
        assert_eq!(value.string_list_value, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(value.long_value.is_none());

        let long = object([
            ("string_list_value", Dynamic::List(vec![])),
            ("long_value", Dynamic::Number(0.0)),
        ]);
        assert_eq!(expand_attribute_value(&long).unwrap().long_value, Some(0));

        let bad = object([("date_value", Dynamic::string("yesterday"))]);
        assert!(expand_attribute_value(&bad).unwrap_err().contains("RFC3339"));
    }

    #[test]
    fn enrichment_expands_and_flattens() {
        let enrichment = object([
            ("role_arn", Dynamic::string("arn:aws:iam::123456789012:role/enrich")),
            (
                "inline_configurations",
                flex::blocks(vec![object([
                    (
                        "condition",
                        condition(
                            "_source_uri",
                            "Contains",
                            object([("string_value", Dynamic::string("archive"))]),
                        ),
                    ),
                    ("document_content_deletion", Dynamic::Bool(false)),
                    (
                        "target",
                        flex::block(Some(object([
                            ("target_document_attribute_key", Dynamic::string("_created_at")),
                            (
                                "target_document_attribute_value",
                                flex::block(Some(object([(
                                    "date_value",
                                    Dynamic::string("2021-01-01T00:00:00Z"),
                                )]))),
                            ),
                            ("target_document_attribute_value_deletion", Dynamic::Bool(false)),
                        ]))),
                    ),
                ])]),
            ),
            (
                "pre_extraction_hook_configuration",
                flex::block(Some(object([
                    ("lambda_arn", Dynamic::string("arn:aws:lambda:us-east-1:123456789012:function:clean")),
                    ("s3_bucket", Dynamic::string("enrichment")),
                    (
                        "invocation_condition",
                        condition("_file_type", "Equals", object([("string_value", Dynamic::string("PDF"))])),
                    ),
                ]))),
            ),
        ]);
        let values = object([(
            "custom_document_enrichment_configuration",
            flex::block(Some(enrichment)),
        )]);

        let expanded = expand_enrichment(values.block("custom_document_enrichment_configuration"))
            .unwrap()
            .unwrap();
        assert_eq!(expanded.inline_configurations.len(), 1);
        let inline = &expanded.inline_configurations[0];
        assert_eq!(inline.condition.as_ref().unwrap().operator, "Contains");
        let target = inline.target.as_ref().unwrap();
        assert_eq!(
            target.target_document_attribute_value.as_ref().unwrap().date_value,
            Some(1_609_459_200.0)
        );
        let hook = expanded.pre_extraction_hook_configuration.as_ref().unwrap();
        assert_eq!(hook.s3_bucket, "enrichment");
        assert_eq!(
            hook.invocation_condition.as_ref().unwrap().condition_document_attribute_key,
            "_file_type"
        );
        assert!(expanded.post_extraction_hook_configuration.is_none());

        let flattened = flatten_enrichment(&expanded);
        let inline = flattened.blocks("inline_configurations");
        let target = inline[0].block("target").unwrap();
        let value = target.block("target_document_attribute_value").unwrap();
        assert_eq!(value.string("date_value").unwrap(), "2021-01-01T00:00:00Z");
        assert_eq!(value["long_value"], Dynamic::Null);
        assert_eq!(flattened.string("role_arn").unwrap(), "arn:aws:iam::123456789012:role/enrich");
        assert!(flattened.blocks("post_extraction_hook_configuration").is_empty());
    }

    #[test]
    fn update_sends_changed_enrichment_only() {
        let prior = object([("name", Dynamic::string("docs"))]);
        let planned = object([
            ("name", Dynamic::string("docs")),
            (
                "custom_document_enrichment_configuration",
                flex::block(Some(object([(
                    "role_arn",
                    Dynamic::string("arn:aws:iam::123456789012:role/enrich"),
                )]))),
            ),
        ]);

        let request = expand_update_request("ds", "idx", &prior, &planned).unwrap().unwrap();
        let enrichment = request.custom_document_enrichment_configuration.unwrap();
        assert_eq!(enrichment.role_arn.as_deref(), Some("arn:aws:iam::123456789012:role/enrich"));
        assert!(enrichment.inline_configurations.is_empty());
        assert!(request.configuration.is_none());
        assert!(request.name.is_none());
    }
}
