//! Kendra thesaurus resource implementation

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
use crate::api::kendra::{CreateThesaurusRequest, Thesaurus, UpdateS3BackedRequest};
use crate::api::Client;
use crate::resources::flex::{self, Object, ObjectExt};
use crate::resources::timeouts::Timeouts;
use crate::resources::waiter::wait_for;
use crate::resources::{applied_state, configured, tags};
use crate::AwsProviderData;

const TIMEOUTS: Timeouts = Timeouts::minutes(30, 30, 30);

pub struct ThesaurusResource {
    provider_data: Option<AwsProviderData>,
}

impl ThesaurusResource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Manages an Amazon Kendra thesaurus")
            .attribute(
                "id",
                AttributeBuilder::string("id")
                    .computed()
                    .description("Thesaurus and index identifiers separated by a slash")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute("index_id", index_id_attribute())
            .attribute(
                "name",
                AttributeBuilder::string("name")
                    .required()
                    .description("Name of the thesaurus")
                    .validator(Box::new(StringLengthValidator::between(1, 100))),
            )
            .attribute(
                "role_arn",
                AttributeBuilder::string("role_arn")
                    .required()
                    .description("IAM role that gives Kendra permission to access the thesaurus file")
                    .validator(Box::new(ArnValidator)),
            )
            .attribute(
                "description",
                AttributeBuilder::string("description")
                    .optional()
                    .description("Description for the thesaurus")
                    .validator(Box::new(StringLengthValidator::between(1, 1000))),
            )
            .attribute(
                "arn",
                AttributeBuilder::string("arn")
                    .computed()
                    .description("ARN of the thesaurus")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "thesaurus_id",
                AttributeBuilder::string("thesaurus_id")
                    .computed()
                    .description("Identifier of the thesaurus")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "status",
                AttributeBuilder::string("status")
                    .computed()
                    .description("Current status of the thesaurus"),
            )
            .attribute("tags", tags::tags_attribute())
            .attribute("tags_all", tags::tags_all_attribute())
            .block(
                "source_s3_path",
                s3_path_block("source_s3_path", "S3 location of the thesaurus input data", false),
            )
            .block("timeouts", Timeouts::block(&["create", "update", "delete"]))
            .build_resource(0)
    }
}

#[async_trait]
impl ResourceV2 for ThesaurusResource {
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

        let input = CreateThesaurusRequest {
            index_id: index_id.clone(),
            name: name.clone(),
            role_arn: values.string("role_arn").unwrap_or_default(),
            source_s3_path: expand_s3_path(values.block("source_s3_path")),
            client_token: client_token(),
            description: values.string("description"),
            tags: tags::create_tags(&values, &data.default_tags),
        };

        let api = data.client.kendra();
        let thesaurus_id = match retry_when(
            &request.context,
            PROPAGATION_TIMEOUT,
            || api.create_thesaurus(&input),
            is_iam_propagation,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(
                    format!("creating Kendra Thesaurus ({}): {}", name, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };

        let id = child_id(&thesaurus_id, &index_id);
        values.insert("id".to_string(), Dynamic::string(&id));

        if let Err(e) = wait_thesaurus(
            &request.context,
            &data.client,
            &thesaurus_id,
            &index_id,
            &["CREATING"],
            &["ACTIVE"],
            timeouts.create,
        )
        .await
        {
            diagnostics.add_error(
                format!("waiting for Kendra Thesaurus ({}) creation: {}", id, e),
                None::<String>,
            );
            return CreateResponse {
                state: applied_state(values),
                diagnostics,
            };
        }

        match read_thesaurus(data, &thesaurus_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra Thesaurus ({}): not found after creation", id),
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
        let Some((thesaurus_id, index_id)) = parse_child_id(&id, "thesaurus", &mut diagnostics) else {
            return ReadResponse {
                state: Some(request.current_state),
                diagnostics,
            };
        };

        match read_thesaurus(data, &thesaurus_id, &index_id, &request.current_state.values).await {
            Ok(Some(values)) => ReadResponse {
                state: Some(State::from_values(values)),
                diagnostics,
            },
            Ok(None) => {
                warn!("Kendra Thesaurus ({}) not found, removing from state", id);
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
        let Some((thesaurus_id, index_id)) = parse_child_id(&id, "thesaurus", &mut diagnostics) else {
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        };

        if let Some(input) = expand_update_request(&thesaurus_id, &index_id, &prior, &values) {
            debug!("Updating Kendra Thesaurus: {}", id);
            let api = data.client.kendra();
            if let Err(e) = retry_when(
                &request.context,
                PROPAGATION_TIMEOUT,
                || api.update_thesaurus(&input),
                is_iam_propagation,
            )
            .await
            {
                diagnostics.add_error(
                    format!("updating Kendra Thesaurus ({}): {}", id, e),
                    None::<String>,
                );
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }

            let waited = wait_thesaurus(
                &request.context,
                &data.client,
                &thesaurus_id,
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
                    format!("waiting for Kendra Thesaurus ({}) update: {}", id, reason),
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
                format!("updating tags for Kendra Thesaurus ({}): {}", id, e),
                None::<String>,
            );
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        }

        match read_thesaurus(data, &thesaurus_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra Thesaurus ({}): not found after update", id),
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
        let Some((thesaurus_id, index_id)) = parse_child_id(&id, "thesaurus", &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        debug!("Deleting Kendra Thesaurus: {}", id);
        match data.client.kendra().delete_thesaurus(&thesaurus_id, &index_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResponse { diagnostics },
            Err(e) => {
                diagnostics.add_error(
                    format!("deleting Kendra Thesaurus ({}): {}", id, e),
                    None::<String>,
                );
                return DeleteResponse { diagnostics };
            }
        }

        if let Err(e) = wait_thesaurus(
            &request.context,
            &data.client,
            &thesaurus_id,
            &index_id,
            &["DELETING"],
            &[],
            timeouts.delete,
        )
        .await
        {
            diagnostics.add_error(
                format!("waiting for Kendra Thesaurus ({}) delete: {}", id, e),
                None::<String>,
            );
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request)
    }
}

async fn wait_thesaurus(
    ctx: &Context,
    client: &Client,
    thesaurus_id: &str,
    index_id: &str,
    pending: &[&str],
    target: &[&str],
    timeout: Duration,
) -> Result<Option<Thesaurus>, RetryError> {
    let conf = StateChangeConf::new(pending, target, timeout);
    wait_for(ctx, conf, || async move {
        client.kendra().find_thesaurus(thesaurus_id, index_id).await
    })
    .await
}

pub(crate) async fn read_thesaurus(
    data: &AwsProviderData,
    thesaurus_id: &str,
    index_id: &str,
    prior: &Object,
) -> Result<Option<Object>, String> {
    let id = child_id(thesaurus_id, index_id);
    let thesaurus = match data.client.kendra().find_thesaurus(thesaurus_id, index_id).await {
        Ok(Some(thesaurus)) => thesaurus,
        Ok(None) => return Ok(None),
        Err(e) => return Err(format!("reading Kendra Thesaurus ({}): {}", id, e)),
    };
    let arn = kendra_arn(&data.client, index_id, Some(("thesaurus", thesaurus_id)))
        .await
        .map_err(|e| format!("reading Kendra Thesaurus ({}): {}", id, e))?;

    let mut values = prior.clone();
    values.insert("id".to_string(), Dynamic::String(id.clone()));
    flatten_thesaurus(&thesaurus, &arn, &mut values);
    flex::settle_zero_values(prior, &mut values);
    read_tags(&data.client, &arn, &mut values, &data.default_tags)
        .await
        .map_err(|e| format!("listing tags for Kendra Thesaurus ({}): {}", id, e))?;
    Ok(Some(values))
}

/// UpdateThesaurus body, `None` when no updatable attribute changed
fn expand_update_request(
    thesaurus_id: &str,
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
        id: thesaurus_id.to_string(),
        index_id: index_id.to_string(),
        name: changed("name").then(|| planned.string("name")).flatten(),
        description: changed("description")
            .then(|| planned.string("description").unwrap_or_default()),
        role_arn: changed("role_arn").then(|| planned.string("role_arn")).flatten(),
        source_s3_path: changed("source_s3_path")
            .then(|| expand_s3_path(planned.block("source_s3_path"))),
    })
}

pub(crate) fn flatten_thesaurus(thesaurus: &Thesaurus, arn: &str, values: &mut Object) {
    let fields = [
        ("arn", Dynamic::string(arn)),
        ("thesaurus_id", Dynamic::string(&thesaurus.id)),
        ("index_id", Dynamic::string(&thesaurus.index_id)),
        ("name", Dynamic::string(&thesaurus.name)),
        ("description", Dynamic::from(thesaurus.description.clone())),
        ("role_arn", Dynamic::from(thesaurus.role_arn.clone())),
        ("status", Dynamic::from(thesaurus.status.clone())),
        ("source_s3_path", flatten_s3_path(thesaurus.source_s3_path.as_ref())),
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

    fn thesaurus_values(key: &str) -> Object {
        object([
            ("name", Dynamic::string("synonyms")),
            ("role_arn", Dynamic::string("arn:aws:iam::123456789012:role/kendra")),
            (
                "source_s3_path",
                flatten_s3_path(Some(&S3Path {
                    bucket: "docs".to_string(),
                    key: key.to_string(),
                })),
            ),
        ])
    }

    #[test]
    fn update_sends_changed_source_only() {
        let prior = thesaurus_values("v1.txt");
        assert!(expand_update_request("th", "idx", &prior, &prior).is_none());

        let planned = thesaurus_values("v2.txt");
        let request = expand_update_request("th", "idx", &prior, &planned).unwrap();
        assert_eq!(request.source_s3_path.unwrap().key, "v2.txt");
        assert!(request.name.is_none());
        assert!(request.role_arn.is_none());
    }

    #[test]
    fn removing_description_clears_it() {
        let mut prior = thesaurus_values("v1.txt");
        prior.insert("description".to_string(), Dynamic::string("old"));
        let planned = thesaurus_values("v1.txt");

        let request = expand_update_request("th", "idx", &prior, &planned).unwrap();
        assert_eq!(request.description.as_deref(), Some(""));
    }

    #[test]
    fn schema_allows_in_place_source_changes() {
        let schema = ThesaurusResource::schema_static();
        let block = &schema.blocks["source_s3_path"];
        assert!(block.attributes["key"].plan_modifiers.is_empty());
        assert!(!schema.attributes["index_id"].plan_modifiers.is_empty());
    }
}
