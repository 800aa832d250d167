//! Kendra index resource implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::validator::{
    ArnValidator, NumberRangeValidator, StringLengthValidator, StringOneOfValidator,
    StringPatternValidator,
};
use tfplug::{
    import_state_passthrough_id, retry_when, AttributeBuilder, AttributeType, BlockBuilder,
    Context, Diagnostics, Dynamic, ResourceSchema, ResourceV2, RetryError, SchemaBuilder, State,
    StateChangeConf,
};
use tracing::{debug, info, warn};

use super::{client_token, is_iam_propagation, kendra_arn, plan_tags, read_tags, update_tags, PROPAGATION_TIMEOUT};
use crate::api::kendra::{
    CapacityUnits, CreateIndexRequest, DocumentMetadataConfiguration, Index,
    JsonTokenTypeConfiguration, JwtTokenTypeConfiguration, Relevance, Search,
    ServerSideEncryptionConfiguration, UpdateIndexRequest, UserGroupResolutionConfiguration,
    UserTokenConfiguration,
};
use crate::api::Client;
use crate::resources::flex::{self, object, Object, ObjectExt};
use crate::resources::plan::KeepUnconfiguredBlock;
use crate::resources::timeouts::Timeouts;
use crate::resources::waiter::wait_for;
use crate::resources::{applied_state, configured, tags};
use crate::AwsProviderData;

const TIMEOUTS: Timeouts = Timeouts::minutes(40, 40, 40);

const EDITIONS: [&str; 2] = ["DEVELOPER_EDITION", "ENTERPRISE_EDITION"];
const METADATA_TYPES: [&str; 4] = ["STRING_VALUE", "STRING_LIST_VALUE", "LONG_VALUE", "DATE_VALUE"];

/// Attributes sent through UpdateIndex when they change
const UPDATABLE: [&str; 8] = [
    "capacity_units",
    "description",
    "document_metadata_configuration_updates",
    "name",
    "role_arn",
    "user_context_policy",
    "user_group_resolution_configuration",
    "user_token_configurations",
];

pub struct IndexResource {
    provider_data: Option<AwsProviderData>,
}

impl IndexResource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Manages an Amazon Kendra index")
            .attribute(
                "id",
                AttributeBuilder::string("id")
                    .computed()
                    .description("Identifier of the index")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "name",
                AttributeBuilder::string("name")
                    .required()
                    .description("Name of the index")
                    .validator(Box::new(StringLengthValidator::between(1, 1000)))
                    .validator(Box::new(StringPatternValidator::new(
                        r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$",
                        "must begin with a letter or number and contain only alphanumerics, hyphens or underscores",
                    ))),
            )
            .attribute(
                "description",
                AttributeBuilder::string("description")
                    .optional()
                    .description("Description of the index")
                    .validator(Box::new(StringLengthValidator::between(0, 1000))),
            )
            .attribute(
                "edition",
                AttributeBuilder::string("edition")
                    .description("Kendra edition to use for the index")
                    .validator(Box::new(StringOneOfValidator::new(EDITIONS)))
                    .default(StaticDefault::string("ENTERPRISE_EDITION"))
                    .plan_modifier(Box::new(RequiresReplaceIfChanged)),
            )
            .attribute(
                "role_arn",
                AttributeBuilder::string("role_arn")
                    .required()
                    .description("IAM role that gives Kendra permission to access CloudWatch logs and metrics")
                    .validator(Box::new(ArnValidator)),
            )
            .attribute(
                "user_context_policy",
                AttributeBuilder::string("user_context_policy")
                    .description("User context policy")
                    .validator(Box::new(StringOneOfValidator::new([
                        "ATTRIBUTE_FILTER",
                        "USER_TOKEN",
                    ])))
                    .default(StaticDefault::string("ATTRIBUTE_FILTER")),
            )
            .attribute("arn", computed("arn", "ARN of the index"))
            .attribute("created_at", computed("created_at", "When the index was created, in RFC3339 format"))
            .attribute(
                "updated_at",
                AttributeBuilder::string("updated_at")
                    .computed()
                    .description("When the index was last updated, in RFC3339 format"),
            )
            .attribute(
                "status",
                AttributeBuilder::string("status")
                    .computed()
                    .description("Current status of the index"),
            )
            .attribute(
                "error_message",
                AttributeBuilder::string("error_message")
                    .computed()
                    .description("Why the index failed, when it did"),
            )
            .attribute(
                "index_statistics",
                AttributeBuilder::list(
                    "index_statistics",
                    AttributeType::Object(HashMap::from([
                        (
                            "faq_statistics".to_string(),
                            AttributeType::List(Box::new(AttributeType::Object(HashMap::from([(
                                "indexed_question_answers_count".to_string(),
                                AttributeType::Number,
                            )])))),
                        ),
                        (
                            "text_document_statistics".to_string(),
                            AttributeType::List(Box::new(AttributeType::Object(HashMap::from([
                                ("indexed_text_bytes".to_string(), AttributeType::Number),
                                ("indexed_text_documents_count".to_string(), AttributeType::Number),
                            ])))),
                        ),
                    ])),
                )
                .computed()
                .description("Number of question and answer topics and documents indexed"),
            )
            .attribute("tags", tags::tags_attribute())
            .attribute("tags_all", tags::tags_all_attribute())
            .block("capacity_units", capacity_units_block())
            .block(
                "server_side_encryption_configuration",
                BlockBuilder::list("server_side_encryption_configuration")
                    .max_items(1)
                    .description("KMS key used to encrypt data indexed by Kendra")
                    .attribute(
                        "kms_key_id",
                        AttributeBuilder::string("kms_key_id")
                            .optional()
                            .description("Identifier of the KMS customer managed key")
                            .sensitive()
                            .validator(Box::new(StringLengthValidator::between(1, 2048)))
                            .plan_modifier(Box::new(RequiresReplaceIfChanged)),
                    ),
            )
            .block(
                "user_group_resolution_configuration",
                BlockBuilder::list("user_group_resolution_configuration")
                    .max_items(1)
                    .description("Fetches access levels of groups and users from an identity source")
                    .attribute(
                        "user_group_resolution_mode",
                        AttributeBuilder::string("user_group_resolution_mode")
                            .required()
                            .description("Identity store provider (mode) you want to use")
                            .validator(Box::new(StringOneOfValidator::new(["AWS_SSO", "NONE"]))),
                    ),
            )
            .block("user_token_configurations", user_token_block())
            .block(
                "document_metadata_configuration_updates",
                document_metadata_block(),
            )
            .block("timeouts", Timeouts::block(&["create", "update", "delete"]))
            .build_resource(0)
    }
}

fn computed(name: &str, description: &str) -> AttributeBuilder {
    AttributeBuilder::string(name)
        .computed()
        .description(description)
        .plan_modifier(Box::new(UseStateForUnknown))
}

fn optional_computed_number(name: &str, description: &str) -> AttributeBuilder {
    AttributeBuilder::number(name)
        .optional()
        .computed()
        .description(description)
        .plan_modifier(Box::new(UseStateForUnknown))
}

fn optional_computed_bool(name: &str, description: &str) -> AttributeBuilder {
    AttributeBuilder::bool(name)
        .optional()
        .computed()
        .description(description)
        .plan_modifier(Box::new(UseStateForUnknown))
}

fn capacity_units_block() -> BlockBuilder {
    BlockBuilder::list("capacity_units")
        .max_items(1)
        .description("Capacity units to add on top of the edition's base capacity")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .attribute(
            "query_capacity_units",
            optional_computed_number("query_capacity_units", "Additional query capacity units")
                .validator(Box::new(NumberRangeValidator::at_least(0.0))),
        )
        .attribute(
            "storage_capacity_units",
            optional_computed_number("storage_capacity_units", "Additional storage capacity units")
                .validator(Box::new(NumberRangeValidator::at_least(0.0))),
        )
}

fn user_token_block() -> BlockBuilder {
    let string = |name: &str, description: &str, max: usize| {
        AttributeBuilder::string(name)
            .optional()
            .description(description)
            .validator(Box::new(StringLengthValidator::between(1, max)))
    };

    BlockBuilder::list("user_token_configurations")
        .max_items(1)
        .description("User token configuration")
        .block(
            "json_token_type_configuration",
            BlockBuilder::list("json_token_type_configuration")
                .max_items(1)
                .description("Information about the JSON token type configuration")
                .attribute(
                    "group_attribute_field",
                    string("group_attribute_field", "Group attribute field", 100).required(),
                )
                .attribute(
                    "user_name_attribute_field",
                    string("user_name_attribute_field", "User name attribute field", 100).required(),
                ),
        )
        .block(
            "jwt_token_type_configuration",
            BlockBuilder::list("jwt_token_type_configuration")
                .max_items(1)
                .description("Information about the JWT token type configuration")
                .attribute("claim_regex", string("claim_regex", "Regular expression that identifies the claim", 100))
                .attribute("group_attribute_field", string("group_attribute_field", "Group attribute field", 100))
                .attribute("issuer", string("issuer", "Issuer of the token", 65))
                .attribute(
                    "key_location",
                    AttributeBuilder::string("key_location")
                        .required()
                        .description("Location of the key")
                        .validator(Box::new(StringOneOfValidator::new(["SECRET_MANAGER", "URL"]))),
                )
                .attribute(
                    "secrets_manager_arn",
                    AttributeBuilder::string("secrets_manager_arn")
                        .optional()
                        .description("ARN of the secret")
                        .validator(Box::new(ArnValidator)),
                )
                .attribute(
                    "url",
                    string("url", "Signing key URL", 2048).validator(Box::new(StringPatternValidator::new(
                        r"^(https?|ftp|file)://([^\s]*)",
                        "must be a valid URL",
                    ))),
                )
                .attribute(
                    "user_name_attribute_field",
                    string("user_name_attribute_field", "User name attribute field", 100),
                ),
        )
}

fn document_metadata_block() -> BlockBuilder {
    BlockBuilder::set("document_metadata_configuration_updates")
        .max_items(500)
        .description("Document metadata fields and how Kendra uses them. Kendra reports its reserved fields here too.")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .attribute(
            "name",
            AttributeBuilder::string("name")
                .required()
                .description("Name of the index field")
                .validator(Box::new(StringLengthValidator::between(1, 30))),
        )
        .attribute(
            "type",
            AttributeBuilder::string("type")
                .required()
                .description("Data type of the index field")
                .validator(Box::new(StringOneOfValidator::new(METADATA_TYPES))),
        )
        .block(
            "relevance",
            BlockBuilder::list("relevance")
                .max_items(1)
                .description("How the field is used to determine the relevance of a document")
                .attribute(
                    "duration",
                    AttributeBuilder::string("duration")
                        .optional()
                        .computed()
                        .description("Time period during which the document is boosted, in seconds such as `86400s`")
                        .validator(Box::new(StringLengthValidator::between(1, 10)))
                        .validator(Box::new(StringPatternValidator::new(
                            r"^[0-9]+s$",
                            "must be a number of seconds followed by `s`",
                        )))
                        .plan_modifier(Box::new(UseStateForUnknown)),
                )
                .attribute(
                    "freshness",
                    optional_computed_bool("freshness", "Whether the document is boosted by this date field"),
                )
                .attribute(
                    "importance",
                    optional_computed_number("importance", "Relative importance of the field")
                        .validator(Box::new(NumberRangeValidator::between(1.0, 10.0))),
                )
                .attribute(
                    "rank_order",
                    AttributeBuilder::string("rank_order")
                        .optional()
                        .computed()
                        .description("Whether higher or lower values of the field rank higher")
                        .validator(Box::new(StringOneOfValidator::new(["ASCENDING", "DESCENDING"])))
                        .plan_modifier(Box::new(UseStateForUnknown)),
                )
                .attribute(
                    "values_importance_map",
                    AttributeBuilder::map("values_importance_map", AttributeType::Number)
                        .optional()
                        .computed()
                        .description("Importance of specific string field values")
                        .plan_modifier(Box::new(UseStateForUnknown)),
                ),
        )
        .block(
            "search",
            BlockBuilder::list("search")
                .max_items(1)
                .description("How the field is used in search")
                .attribute("displayable", optional_computed_bool("displayable", "Whether the field is returned in query results"))
                .attribute("facetable", optional_computed_bool("facetable", "Whether the field can be used to create facets"))
                .attribute("searchable", optional_computed_bool("searchable", "Whether the field is used in search"))
                .attribute("sortable", optional_computed_bool("sortable", "Whether the field can be used to sort results")),
        )
}

#[async_trait]
impl ResourceV2 for IndexResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
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
        let input = expand_create_request(&values, &data.default_tags);

        let api = data.client.kendra();
        let id = match retry_when(
            &request.context,
            PROPAGATION_TIMEOUT,
            || api.create_index(&input),
            is_iam_propagation,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(format!("creating Kendra Index ({}): {}", name, e), None::<String>);
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };
        info!("Created Kendra Index: {}", id);
        values.insert("id".to_string(), Dynamic::string(&id));

        if let Err(e) = wait_index(&request.context, &data.client, &id, "CREATING", timeouts.create).await {
            diagnostics.add_error(
                format!("waiting for Kendra Index ({}) creation: {}", id, e),
                None::<String>,
            );
            return CreateResponse {
                state: applied_state(values),
                diagnostics,
            };
        }

        // capacity and metadata fields can only be set through UpdateIndex
        let follow_up = UpdateIndexRequest {
            id: id.clone(),
            capacity_units: expand_capacity_units(values.block("capacity_units")),
            document_metadata_configuration_updates: expand_document_metadata(&values),
            ..Default::default()
        };
        if follow_up.capacity_units.is_some() || follow_up.document_metadata_configuration_updates.is_some() {
            if let Err(e) = api.update_index(&follow_up).await {
                diagnostics.add_error(
                    format!("updating Kendra Index ({}) after creation: {}", id, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: applied_state(values),
                    diagnostics,
                };
            }
            if let Err(e) = wait_index(&request.context, &data.client, &id, "UPDATING", timeouts.create).await {
                diagnostics.add_error(
                    format!("waiting for Kendra Index ({}) update: {}", id, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: applied_state(values),
                    diagnostics,
                };
            }
        }

        match read_index(data, &id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra Index ({}): not found after creation", id),
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
        match read_index(data, &id, &request.current_state.values).await {
            Ok(Some(values)) => ReadResponse {
                state: Some(State::from_values(values)),
                diagnostics,
            },
            Ok(None) => {
                warn!("Kendra Index ({}) not found, removing from state", id);
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
        let api = data.client.kendra();

        if let Some(input) = expand_update_request(&id, &prior, &values) {
            debug!("Updating Kendra Index: {}", id);
            if let Err(e) = retry_when(
                &request.context,
                PROPAGATION_TIMEOUT,
                || api.update_index(&input),
                is_iam_propagation,
            )
            .await
            {
                diagnostics.add_error(format!("updating Kendra Index ({}): {}", id, e), None::<String>);
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }
            if let Err(e) = wait_index(&request.context, &data.client, &id, "UPDATING", timeouts.update).await {
                diagnostics.add_error(
                    format!("waiting for Kendra Index ({}) update: {}", id, e),
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
                format!("updating tags for Kendra Index ({}): {}", id, e),
                None::<String>,
            );
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        }

        match read_index(data, &id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra Index ({}): not found after update", id),
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

        debug!("Deleting Kendra Index: {}", id);
        match data.client.kendra().delete_index(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResponse { diagnostics },
            Err(e) => {
                diagnostics.add_error(format!("deleting Kendra Index ({}): {}", id, e), None::<String>);
                return DeleteResponse { diagnostics };
            }
        }

        if let Err(e) = wait_index(&request.context, &data.client, &id, "DELETING", timeouts.delete).await {
            diagnostics.add_error(
                format!("waiting for Kendra Index ({}) delete: {}", id, e),
                None::<String>,
            );
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request)
    }
}

async fn wait_index(
    ctx: &Context,
    client: &Client,
    id: &str,
    pending: &str,
    timeout: Duration,
) -> Result<Option<Index>, RetryError> {
    let target: &[&str] = if pending == "DELETING" { &[] } else { &["ACTIVE"] };
    let conf = StateChangeConf::new(&[pending], target, timeout);
    wait_for(ctx, conf, || async move { client.kendra().find_index(id).await }).await
}

pub(crate) async fn read_index(data: &AwsProviderData, id: &str, prior: &Object) -> Result<Option<Object>, String> {
    let index = match data.client.kendra().find_index(id).await {
        Ok(Some(index)) => index,
        Ok(None) => return Ok(None),
        Err(e) => return Err(format!("reading Kendra Index ({}): {}", id, e)),
    };
    let arn = kendra_arn(&data.client, id, None)
        .await
        .map_err(|e| format!("reading Kendra Index ({}): {}", id, e))?;

    let mut values = prior.clone();
    flatten_index(&index, &arn, &mut values);
    flex::settle_zero_values(prior, &mut values);
    read_tags(&data.client, &arn, &mut values, &data.default_tags)
        .await
        .map_err(|e| format!("listing tags for Kendra Index ({}): {}", id, e))?;
    Ok(Some(values))
}

fn expand_create_request(values: &Object, default_tags: &HashMap<String, String>) -> CreateIndexRequest {
    CreateIndexRequest {
        name: values.string("name").unwrap_or_default(),
        edition: values
            .string("edition")
            .unwrap_or_else(|| "ENTERPRISE_EDITION".to_string()),
        role_arn: values.string("role_arn").unwrap_or_default(),
        client_token: client_token(),
        description: values.string("description"),
        server_side_encryption_configuration: values
            .block("server_side_encryption_configuration")
            .map(|b| ServerSideEncryptionConfiguration {
                kms_key_id: b.string("kms_key_id"),
            }),
        user_context_policy: values.string("user_context_policy"),
        user_group_resolution_configuration: expand_user_group_resolution(values),
        user_token_configurations: expand_user_tokens(values),
        tags: tags::create_tags(values, default_tags),
    }
}

/// UpdateIndex body carrying the changed attributes, `None` when nothing
/// it covers changed
fn expand_update_request(id: &str, prior: &Object, planned: &Object) -> Option<UpdateIndexRequest> {
    let changed = |key: &str| flex::has_change(prior, planned, key);
    if !UPDATABLE.iter().any(|key| changed(key)) {
        return None;
    }

    let mut input = UpdateIndexRequest {
        id: id.to_string(),
        ..Default::default()
    };
    if changed("capacity_units") {
        input.capacity_units = expand_capacity_units(planned.block("capacity_units"));
    }
    if changed("description") {
        input.description = Some(planned.string("description").unwrap_or_default());
    }
    if changed("document_metadata_configuration_updates") {
        input.document_metadata_configuration_updates = expand_document_metadata(planned);
    }
    if changed("name") {
        input.name = planned.string("name");
    }
    if changed("role_arn") {
        input.role_arn = planned.string("role_arn");
    }
    if changed("user_context_policy") {
        input.user_context_policy = planned.string("user_context_policy");
    }
    if changed("user_group_resolution_configuration") {
        input.user_group_resolution_configuration = expand_user_group_resolution(planned);
    }
    if changed("user_token_configurations") {
        input.user_token_configurations = Some(expand_user_tokens(planned));
    }
    Some(input)
}

fn expand_capacity_units(block: Option<&Object>) -> Option<CapacityUnits> {
    let block = block?;
    Some(CapacityUnits {
        query_capacity_units: block.int("query_capacity_units").unwrap_or_default(),
        storage_capacity_units: block.int("storage_capacity_units").unwrap_or_default(),
    })
}

fn expand_user_group_resolution(values: &Object) -> Option<UserGroupResolutionConfiguration> {
    values
        .block("user_group_resolution_configuration")
        .map(|b| UserGroupResolutionConfiguration {
            user_group_resolution_mode: b.string("user_group_resolution_mode").unwrap_or_default(),
        })
}

fn expand_user_tokens(values: &Object) -> Vec<UserTokenConfiguration> {
    values
        .blocks("user_token_configurations")
        .into_iter()
        .map(|b| UserTokenConfiguration {
            json_token_type_configuration: b.block("json_token_type_configuration").map(|json| {
                JsonTokenTypeConfiguration {
                    group_attribute_field: json.string("group_attribute_field").unwrap_or_default(),
                    user_name_attribute_field: json.string("user_name_attribute_field").unwrap_or_default(),
                }
            }),
            jwt_token_type_configuration: b.block("jwt_token_type_configuration").map(|jwt| {
                JwtTokenTypeConfiguration {
                    key_location: jwt.string("key_location").unwrap_or_default(),
                    url: jwt.string("url"),
                    secret_manager_arn: jwt.string("secrets_manager_arn"),
                    user_name_attribute_field: jwt.string("user_name_attribute_field"),
                    group_attribute_field: jwt.string("group_attribute_field"),
                    issuer: jwt.string("issuer"),
                    claim_regex: jwt.string("claim_regex"),
                }
            }),
        })
        .collect()
}

fn expand_document_metadata(values: &Object) -> Option<Vec<DocumentMetadataConfiguration>> {
    let items = values.blocks("document_metadata_configuration_updates");
    if items.is_empty() {
        return None;
    }
    let configurations = items
        .into_iter()
        .map(|item| DocumentMetadataConfiguration {
            name: item.string("name").unwrap_or_default(),
            metadata_type: item.string("type").unwrap_or_default(),
            relevance: item.block("relevance").map(|r| Relevance {
                freshness: r.bool("freshness"),
                importance: r.int("importance"),
                duration: r.string("duration"),
                rank_order: r.string("rank_order"),
                value_importance_map: r.get("values_importance_map").and_then(|map| {
                    let map = map.as_map()?;
                    let parsed: HashMap<String, i64> = map
                        .iter()
                        .filter_map(|(k, v)| v.as_i64().map(|n| (k.clone(), n)))
                        .collect();
                    (!parsed.is_empty()).then_some(parsed)
                }),
            }),
            search: item.block("search").map(|s| Search {
                facetable: s.bool("facetable"),
                searchable: s.bool("searchable"),
                displayable: s.bool("displayable"),
                sortable: s.bool("sortable"),
            }),
        })
        .collect();
    Some(configurations)
}

fn flatten_index(index: &Index, arn: &str, values: &mut Object) {
    let fields = [
        ("id", Dynamic::string(&index.id)),
        ("arn", Dynamic::string(arn)),
        ("name", Dynamic::string(&index.name)),
        ("description", Dynamic::from(index.description.clone())),
        ("edition", Dynamic::from(index.edition.clone())),
        ("role_arn", Dynamic::from(index.role_arn.clone())),
        ("status", Dynamic::from(index.status.clone())),
        ("error_message", Dynamic::from(index.error_message.clone())),
        ("created_at", flex::timestamp(index.created_at)),
        ("updated_at", flex::timestamp(index.updated_at)),
        ("user_context_policy", Dynamic::from(index.user_context_policy.clone())),
        (
            "capacity_units",
            flex::block(index.capacity_units.as_ref().map(|c| {
                object([
                    ("query_capacity_units", Dynamic::from(c.query_capacity_units)),
                    ("storage_capacity_units", Dynamic::from(c.storage_capacity_units)),
                ])
            })),
        ),
        (
            "server_side_encryption_configuration",
            flex::block(
                index
                    .server_side_encryption_configuration
                    .as_ref()
                    .map(|s| object([("kms_key_id", Dynamic::from(s.kms_key_id.clone()))])),
            ),
        ),
        (
            "user_group_resolution_configuration",
            flex::block(index.user_group_resolution_configuration.as_ref().map(|u| {
                object([(
                    "user_group_resolution_mode",
                    Dynamic::string(&u.user_group_resolution_mode),
                )])
            })),
        ),
        (
            "user_token_configurations",
            flex::blocks(index.user_token_configurations.iter().map(flatten_user_token).collect()),
        ),
        (
            "document_metadata_configuration_updates",
            flex::blocks(
                index
                    .document_metadata_configurations
                    .iter()
                    .map(flatten_document_metadata)
                    .collect(),
            ),
        ),
        ("index_statistics", flatten_statistics(index)),
    ];
    for (key, value) in fields {
        values.insert(key.to_string(), value);
    }
}

fn flatten_user_token(config: &UserTokenConfiguration) -> Object {
    object([
        (
            "json_token_type_configuration",
            flex::block(config.json_token_type_configuration.as_ref().map(|json| {
                object([
                    ("group_attribute_field", Dynamic::string(&json.group_attribute_field)),
                    ("user_name_attribute_field", Dynamic::string(&json.user_name_attribute_field)),
                ])
            })),
        ),
        (
            "jwt_token_type_configuration",
            flex::block(config.jwt_token_type_configuration.as_ref().map(|jwt| {
                object([
                    ("claim_regex", Dynamic::from(jwt.claim_regex.clone())),
                    ("group_attribute_field", Dynamic::from(jwt.group_attribute_field.clone())),
                    ("issuer", Dynamic::from(jwt.issuer.clone())),
                    ("key_location", Dynamic::string(&jwt.key_location)),
                    ("secrets_manager_arn", Dynamic::from(jwt.secret_manager_arn.clone())),
                    ("url", Dynamic::from(jwt.url.clone())),
                    ("user_name_attribute_field", Dynamic::from(jwt.user_name_attribute_field.clone())),
                ])
            })),
        ),
    ])
}

fn flatten_document_metadata(config: &DocumentMetadataConfiguration) -> Object {
    object([
        ("name", Dynamic::string(&config.name)),
        ("type", Dynamic::string(&config.metadata_type)),
        (
            "relevance",
            flex::block(config.relevance.as_ref().map(|r| {
                object([
                    ("duration", Dynamic::from(r.duration.clone())),
                    ("freshness", Dynamic::from(r.freshness)),
                    ("importance", Dynamic::from(r.importance)),
                    ("rank_order", Dynamic::from(r.rank_order.clone())),
                    (
                        "values_importance_map",
                        r.value_importance_map
                            .as_ref()
                            .map(|map| {
                                Dynamic::Map(
                                    map.iter()
                                        .map(|(k, v)| (k.clone(), Dynamic::from(*v)))
                                        .collect(),
                                )
                            })
                            .unwrap_or(Dynamic::Map(HashMap::new())),
                    ),
                ])
            })),
        ),
        (
            "search",
            flex::block(config.search.as_ref().map(|s| {
                object([
                    ("displayable", Dynamic::from(s.displayable)),
                    ("facetable", Dynamic::from(s.facetable)),
                    ("searchable", Dynamic::from(s.searchable)),
                    ("sortable", Dynamic::from(s.sortable)),
                ])
            })),
        ),
    ])
}

fn flatten_statistics(index: &Index) -> Dynamic {
    flex::block(index.index_statistics.as_ref().map(|stats| {
        object([
            (
                "faq_statistics",
                flex::block(stats.faq_statistics.as_ref().map(|faq| {
                    object([(
                        "indexed_question_answers_count",
                        Dynamic::from(faq.indexed_question_answers_count),
                    )])
                })),
            ),
            (
                "text_document_statistics",
                flex::block(stats.text_document_statistics.as_ref().map(|text| {
                    object([
                        ("indexed_text_bytes", Dynamic::from(text.indexed_text_bytes)),
                        (
                            "indexed_text_documents_count",
                            Dynamic::from(text.indexed_text_documents_count),
                        ),
                    ])
                })),
            ),
        ])
    }))
}
