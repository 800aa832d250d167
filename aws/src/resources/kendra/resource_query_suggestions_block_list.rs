//! Kendra query suggestions block list resource implementation

use async_trait::async_trait;
use std::time::Duration;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::validator::{ArnValidator, StringLengthValidator};
use tfplug::{
    import_state_passthrough_id, retry_when, AttributeBuilder, Context, Diagnostics, Dynamic,
    ResourceSchema, ResourceV2, RetryError, SchemaBuilder, State, StateChangeConf,
};
use tracing::{debug, warn};

use super::{
    child_id, client_token, expand_s3_path, flatten_s3_path, index_id_attribute,
    is_iam_propagation, kendra_arn, parse_child_id, plan_tags, read_tags, s3_path_block,
    update_failure, update_tags, PROPAGATION_TIMEOUT,
};
use crate::api::kendra::{
    CreateQuerySuggestionsBlockListRequest, QuerySuggestionsBlockList, UpdateS3BackedRequest,
};
use crate::api::Client;
use crate::resources::flex::{self, Object, ObjectExt};
use crate::resources::timeouts::Timeouts;
use crate::resources::waiter::wait_for;
use crate::resources::{applied_state, configured, tags};
use crate::AwsProviderData;

const TIMEOUTS: Timeouts = Timeouts::minutes(30, 30, 30);

pub struct QuerySuggestionsBlockListResource {
    provider_data: Option<AwsProviderData>,
}

impl QuerySuggestionsBlockListResource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Manages an Amazon Kendra block list of words and phrases kept out of query suggestions")
            .attribute(
                "id",
                AttributeBuilder::string("id")
                    .computed()
                    .description("Block list and index identifiers separated by a slash")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute("index_id", index_id_attribute())
            .attribute(
                "name",
                AttributeBuilder::string("name")
                    .required()
                    .description("Name of the block list")
                    .validator(Box::new(StringLengthValidator::between(1, 60))),
            )
            .attribute(
                "role_arn",
                AttributeBuilder::string("role_arn")
                    .required()
                    .description("IAM role that gives Kendra permission to access the block list file")
                    .validator(Box::new(ArnValidator)),
            )
            .attribute(
                "description",
                AttributeBuilder::string("description")
                    .optional()
                    .description("Description for the block list")
                    .validator(Box::new(StringLengthValidator::between(1, 1000))),
            )
            .attribute(
                "arn",
                AttributeBuilder::string("arn")
                    .computed()
                    .description("ARN of the block list")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "query_suggestions_block_list_id",
                AttributeBuilder::string("query_suggestions_block_list_id")
                    .computed()
                    .description("Identifier of the block list")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "status",
                AttributeBuilder::string("status")
                    .computed()
                    .description("Current status of the block list"),
            )
            .attribute("tags", tags::tags_attribute())
            .attribute("tags_all", tags::tags_all_attribute())
            .block(
                "source_s3_path",
                s3_path_block("source_s3_path", "S3 location of the block list text file", false),
            )
            .block("timeouts", Timeouts::block(&["create", "update", "delete"]))
            .build_resource(0)
    }
}

#[async_trait]
impl ResourceV2 for QuerySuggestionsBlockListResource {
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
        let index_id = values.string("index_id").unwrap_or_default();

        let input = CreateQuerySuggestionsBlockListRequest {
            index_id: index_id.clone(),
            name: name.clone(),
            role_arn: values.string("role_arn").unwrap_or_default(),
            source_s3_path: expand_s3_path(values.block("source_s3_path")),
            client_token: client_token(),
            description: values.string("description"),
            tags: tags::create_tags(&values, &data.default_tags),
        };

        let api = data.client.kendra();
        let block_list_id = match retry_when(
            &request.context,
            PROPAGATION_TIMEOUT,
            || api.create_query_suggestions_block_list(&input),
            is_iam_propagation,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(
                    format!("creating Kendra QuerySuggestionsBlockList ({}): {}", name, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };

        let id = child_id(&block_list_id, &index_id);
        values.insert("id".to_string(), Dynamic::string(&id));

        if let Err(e) = wait_block_list(
            &request.context,
            &data.client,
            &block_list_id,
            &index_id,
            &["CREATING"],
            &["ACTIVE"],
            timeouts.create,
        )
        .await
        {
            diagnostics.add_error(
                format!("waiting for Kendra QuerySuggestionsBlockList ({}) creation: {}", id, e),
                None::<String>,
            );
            return CreateResponse {
                state: applied_state(values),
                diagnostics,
            };
        }

        match read_block_list(data, &block_list_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra QuerySuggestionsBlockList ({}): not found after creation", id),
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
        let Some((block_list_id, index_id)) = parse_child_id(&id, "query-suggestions-block-list", &mut diagnostics) else {
            return ReadResponse {
                state: Some(request.current_state),
                diagnostics,
            };
        };

        match read_block_list(data, &block_list_id, &index_id, &request.current_state.values).await {
            Ok(Some(values)) => ReadResponse {
                state: Some(State::from_values(values)),
                diagnostics,
            },
            Ok(None) => {
                warn!("Kendra QuerySuggestionsBlockList ({}) not found, removing from state", id);
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
        let Some((block_list_id, index_id)) = parse_child_id(&id, "query-suggestions-block-list", &mut diagnostics) else {
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        };

        if let Some(input) = expand_update_request(&block_list_id, &index_id, &prior, &values) {
            debug!("Updating Kendra QuerySuggestionsBlockList: {}", id);
            let api = data.client.kendra();
            if let Err(e) = retry_when(
                &request.context,
                PROPAGATION_TIMEOUT,
                || api.update_query_suggestions_block_list(&input),
                is_iam_propagation,
            )
            .await
            {
                diagnostics.add_error(
                    format!("updating Kendra QuerySuggestionsBlockList ({}): {}", id, e),
                    None::<String>,
                );
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }

            let waited = wait_block_list(
                &request.context,
                &data.client,
                &block_list_id,
                &index_id,
                &["UPDATING"],
                &["ACTIVE", "ACTIVE_BUT_UPDATE_FAILED"],
                timeouts.update,
            )
            .await;
            let failure = match waited {
                Ok(found) => found.and_then(|t| update_failure(t.status.as_deref(), t.error_message)),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = failure {
                diagnostics.add_error(
                    format!("waiting for Kendra QuerySuggestionsBlockList ({}) update: {}", id, reason),
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
                format!("updating tags for Kendra QuerySuggestionsBlockList ({}): {}", id, e),
                None::<String>,
            );
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        }

        match read_block_list(data, &block_list_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra QuerySuggestionsBlockList ({}): not found after update", id),
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
        let Some((block_list_id, index_id)) = parse_child_id(&id, "query-suggestions-block-list", &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        debug!("Deleting Kendra QuerySuggestionsBlockList: {}", id);
        match data.client.kendra().delete_query_suggestions_block_list(&block_list_id, &index_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResponse { diagnostics },
            Err(e) => {
                diagnostics.add_error(
                    format!("deleting Kendra QuerySuggestionsBlockList ({}): {}", id, e),
                    None::<String>,
                );
                return DeleteResponse { diagnostics };
            }
        }

        if let Err(e) = wait_block_list(
            &request.context,
            &data.client,
            &block_list_id,
            &index_id,
            &["DELETING"],
            &[],
            timeouts.delete,
        )
        .await
        {
            diagnostics.add_error(
                format!("waiting for Kendra QuerySuggestionsBlockList ({}) delete: {}", id, e),
                None::<String>,
            );
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request)
    }
}

async fn wait_block_list(
    ctx: &Context,
    client: &Client,
    block_list_id: &str,
    index_id: &str,
    pending: &[&str],
    target: &[&str],
    timeout: Duration,
) -> Result<Option<QuerySuggestionsBlockList>, RetryError> {
    let conf = StateChangeConf::new(pending, target, timeout);
    wait_for(ctx, conf, || async move {
        client.kendra().find_query_suggestions_block_list(block_list_id, index_id).await
    })
    .await
}

pub(crate) async fn read_block_list(
    data: &AwsProviderData,
    block_list_id: &str,
    index_id: &str,
    prior: &Object,
) -> Result<Option<Object>, String> {
    let id = child_id(block_list_id, index_id);
    let block_list = match data.client.kendra().find_query_suggestions_block_list(block_list_id, index_id).await {
        Ok(Some(block_list)) => block_list,
        Ok(None) => return Ok(None),
        Err(e) => return Err(format!("reading Kendra QuerySuggestionsBlockList ({}): {}", id, e)),
    };
    let arn = kendra_arn(&data.client, index_id, Some(("query-suggestions-block-list", block_list_id)))
        .await
        .map_err(|e| format!("reading Kendra QuerySuggestionsBlockList ({}): {}", id, e))?;

    let mut values = prior.clone();
    values.insert("id".to_string(), Dynamic::String(id.clone()));
    flatten_block_list(&block_list, &arn, &mut values);
    flex::settle_zero_values(prior, &mut values);
    read_tags(&data.client, &arn, &mut values, &data.default_tags)
        .await
        .map_err(|e| format!("listing tags for Kendra QuerySuggestionsBlockList ({}): {}", id, e))?;
    Ok(Some(values))
}

/// UpdateQuerySuggestionsBlockList body, `None` when no updatable attribute changed
fn expand_update_request(
    block_list_id: &str,
    index_id: &str,
    prior: &Object,
    planned: &Object,
) -> Option<UpdateS3BackedRequest> {
    let changed = |key: &str| flex::has_change(prior, planned, key);
    if !["description", "name", "role_arn", "source_s3_path"]
        .iter()
        .any(|key| changed(key))
    {
        return None;
    }

    Some(UpdateS3BackedRequest {
        id: block_list_id.to_string(),
        index_id: index_id.to_string(),
        name: changed("name").then(|| planned.string("name")).flatten(),
        description: changed("description")
            .then(|| planned.string("description").unwrap_or_default()),
        role_arn: changed("role_arn").then(|| planned.string("role_arn")).flatten(),
        source_s3_path: changed("source_s3_path")
            .then(|| expand_s3_path(planned.block("source_s3_path"))),
    })
}

pub(crate) fn flatten_block_list(block_list: &QuerySuggestionsBlockList, arn: &str, values: &mut Object) {
    let fields = [
        ("arn", Dynamic::string(arn)),
        ("query_suggestions_block_list_id", Dynamic::string(&block_list.id)),
        ("index_id", Dynamic::string(&block_list.index_id)),
        ("name", Dynamic::string(&block_list.name)),
        ("description", Dynamic::from(block_list.description.clone())),
        ("role_arn", Dynamic::from(block_list.role_arn.clone())),
        ("status", Dynamic::from(block_list.status.clone())),
        ("source_s3_path", flatten_s3_path(block_list.source_s3_path.as_ref())),
    ];
    for (key, value) in fields {
        values.insert(key.to_string(), value);
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::kendra::S3Path;
    use crate::resources::flex::object;

    #[test]
    fn renaming_sends_only_the_name() {
        let prior = object([
            ("name", Dynamic::string("blocked-terms")),
            ("role_arn", Dynamic::string("arn:aws:iam::123456789012:role/kendra")),
        ]);
        let mut planned = prior.clone();
        planned.insert("name".to_string(), Dynamic::string("profanity"));

        let request = expand_update_request("bl", "idx", &prior, &planned).unwrap();
        assert_eq!(request.id, "bl");
        assert_eq!(request.name.as_deref(), Some("profanity"));
        assert!(request.source_s3_path.is_none());
        assert!(request.description.is_none());
    }

    #[test]
    fn flatten_reads_source_and_status() {
        let block_list = QuerySuggestionsBlockList {
            id: "bl".to_string(),
            index_id: "idx".to_string(),
            name: "blocked-terms".to_string(),
            source_s3_path: Some(S3Path {
                bucket: "lists".to_string(),
                key: "blocked.txt".to_string(),
            }),
            status: Some("ACTIVE_BUT_UPDATE_FAILED".to_string()),
            item_count: Some(12),
            ..Default::default()
        };

        let mut values = Object::new();
        flatten_block_list(&block_list, "arn", &mut values);
        assert_eq!(values.string("query_suggestions_block_list_id").unwrap(), "bl");
        assert_eq!(values.string("status").unwrap(), "ACTIVE_BUT_UPDATE_FAILED");
        assert_eq!(
            values.block("source_s3_path").unwrap().string("bucket").unwrap(),
            "lists"
        );
    }
}
