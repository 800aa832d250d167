//! Kendra FAQ resource implementation

use async_trait::async_trait;
use std::time::Duration;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::validator::{ArnValidator, StringLengthValidator, StringOneOfValidator, StringPatternValidator};
use tfplug::{
    import_state_passthrough_id, retry_when, AttributeBuilder, Context, Diagnostics, Dynamic,
    ResourceSchema, ResourceV2, RetryError, SchemaBuilder, State, StateChangeConf,
};
use tracing::{debug, warn};

use super::{
    child_id, client_token, expand_s3_path, flatten_s3_path, index_id_attribute,
    is_iam_propagation, kendra_arn, parse_child_id, plan_tags, read_tags, s3_path_block,
    update_tags, PROPAGATION_TIMEOUT,
};
use crate::api::kendra::{CreateFaqRequest, Faq};
use crate::api::Client;
use crate::resources::flex::{self, Object, ObjectExt};
use crate::resources::timeouts::Timeouts;
use crate::resources::waiter::wait_for;
use crate::resources::{applied_state, configured, tags};
use crate::AwsProviderData;

const TIMEOUTS: Timeouts = Timeouts::minutes(30, 30, 30);

pub struct FaqResource {
    provider_data: Option<AwsProviderData>,
}

impl FaqResource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> ResourceSchema {
        let replace = || Box::new(RequiresReplaceIfChanged);

        SchemaBuilder::new()
            .description("Manages an Amazon Kendra FAQ")
            .attribute(
                "id",
                AttributeBuilder::string("id")
                    .computed()
                    .description("FAQ and index identifiers separated by a slash")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute("index_id", index_id_attribute())
            .attribute(
                "name",
                AttributeBuilder::string("name")
                    .required()
                    .description("Name that should be associated with the FAQ")
                    .validator(Box::new(StringLengthValidator::between(1, 100)))
                    .validator(Box::new(StringPatternValidator::new(
                        r"^[0-9A-Za-z][0-9A-Za-z_-]*$",
                        "must start with an alphanumeric character and contain only alphanumerics, hyphens or underscores",
                    )))
                    .plan_modifier(replace()),
            )
            .attribute(
                "role_arn",
                AttributeBuilder::string("role_arn")
                    .required()
                    .description("ARN of a role with permission to access the S3 bucket that contains the FAQs")
                    .validator(Box::new(ArnValidator))
                    .plan_modifier(replace()),
            )
            .attribute(
                "description",
                AttributeBuilder::string("description")
                    .optional()
                    .description("Description for the FAQ")
                    .validator(Box::new(StringLengthValidator::between(1, 1000)))
                    .plan_modifier(replace()),
            )
            .attribute(
                "file_format",
                AttributeBuilder::string("file_format")
                    .optional()
                    .description("File format used by the input files for the FAQ")
                    .validator(Box::new(StringOneOfValidator::new([
                        "CSV",
                        "CSV_WITH_HEADER",
                        "JSON",
                    ])))
                    .plan_modifier(replace()),
            )
            .attribute(
                "language_code",
                AttributeBuilder::string("language_code")
                    .optional()
                    .computed()
                    .description("Code for a language")
                    .validator(Box::new(StringLengthValidator::between(2, 10)))
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .plan_modifier(replace()),
            )
            .attribute("arn", computed("arn", "ARN of the FAQ"))
            .attribute("faq_id", computed("faq_id", "Identifier of the FAQ"))
            .attribute("status", AttributeBuilder::string("status").computed().description("Status of the FAQ"))
            .attribute(
                "error_message",
                AttributeBuilder::string("error_message")
                    .computed()
                    .description("Reason the FAQ failed, when it did"),
            )
            .attribute("created_at", computed("created_at", "When the FAQ was created, in RFC3339 format"))
            .attribute(
                "updated_at",
                AttributeBuilder::string("updated_at")
                    .computed()
                    .description("When the FAQ was last updated, in RFC3339 format"),
            )
            .attribute("tags", tags::tags_attribute())
            .attribute("tags_all", tags::tags_all_attribute())
            .block(
                "s3_path",
                s3_path_block("s3_path", "S3 location of the FAQ input data", true),
            )
            .block("timeouts", Timeouts::block(&["create", "delete"]))
            .build_resource(0)
    }
}

fn computed(name: &str, description: &str) -> AttributeBuilder {
    AttributeBuilder::string(name)
        .computed()
        .description(description)
        .plan_modifier(Box::new(UseStateForUnknown))
}

#[async_trait]
impl ResourceV2 for FaqResource {
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

        let input = CreateFaqRequest {
            index_id: index_id.clone(),
            name: name.clone(),
            role_arn: values.string("role_arn").unwrap_or_default(),
            s3_path: expand_s3_path(values.block("s3_path")),
            client_token: client_token(),
            description: values.string("description"),
            file_format: values.string("file_format"),
            language_code: values.string("language_code"),
            tags: tags::create_tags(&values, &data.default_tags),
        };

        let api = data.client.kendra();
        let faq_id = match retry_when(
            &request.context,
            PROPAGATION_TIMEOUT,
            || api.create_faq(&input),
            is_iam_propagation,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(format!("creating Kendra Faq ({}): {}", name, e), None::<String>);
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };

        let id = child_id(&faq_id, &index_id);
        values.insert("id".to_string(), Dynamic::string(&id));

        if let Err(e) = wait_faq(&request.context, &data.client, &faq_id, &index_id, "CREATING", timeouts.create).await {
            diagnostics.add_error(
                format!("waiting for Kendra Faq ({}) creation: {}", id, e),
                None::<String>,
            );
            return CreateResponse {
                state: applied_state(values),
                diagnostics,
            };
        }

        match read_faq(data, &faq_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra Faq ({}): not found after creation", id),
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
        let Some((faq_id, index_id)) = parse_child_id(&id, "faq", &mut diagnostics) else {
            return ReadResponse {
                state: Some(request.current_state),
                diagnostics,
            };
        };

        match read_faq(data, &faq_id, &index_id, &request.current_state.values).await {
            Ok(Some(values)) => ReadResponse {
                state: Some(State::from_values(values)),
                diagnostics,
            },
            Ok(None) => {
                warn!("Kendra Faq ({}) not found, removing from state", id);
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

    /// Everything but tags replaces the FAQ
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
        let arn = prior.string("arn").unwrap_or_default();

        if let Err(e) = update_tags(&data.client, &arn, &prior, &values, &data.default_tags).await {
            diagnostics.add_error(
                format!("updating tags for Kendra Faq ({}): {}", id, e),
                None::<String>,
            );
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        }

        let Some((faq_id, index_id)) = parse_child_id(&id, "faq", &mut diagnostics) else {
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        };
        match read_faq(data, &faq_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra Faq ({}): not found after update", id),
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
        let Some((faq_id, index_id)) = parse_child_id(&id, "faq", &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        debug!("Deleting Kendra Faq: {}", id);
        match data.client.kendra().delete_faq(&faq_id, &index_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResponse { diagnostics },
            Err(e) => {
                diagnostics.add_error(format!("deleting Kendra Faq ({}): {}", id, e), None::<String>);
                return DeleteResponse { diagnostics };
            }
        }

        if let Err(e) = wait_faq(&request.context, &data.client, &faq_id, &index_id, "DELETING", timeouts.delete).await {
            diagnostics.add_error(
                format!("waiting for Kendra Faq ({}) delete: {}", id, e),
                None::<String>,
            );
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request)
    }
}

async fn wait_faq(
    ctx: &Context,
    client: &Client,
    faq_id: &str,
    index_id: &str,
    pending: &str,
    timeout: Duration,
) -> Result<Option<Faq>, RetryError> {
    let target: &[&str] = if pending == "DELETING" { &[] } else { &["ACTIVE"] };
    let conf = StateChangeConf::new(&[pending], target, timeout);
    wait_for(ctx, conf, || async move { client.kendra().find_faq(faq_id, index_id).await }).await
}

pub(crate) async fn read_faq(
    data: &AwsProviderData,
    faq_id: &str,
    index_id: &str,
    prior: &Object,
) -> Result<Option<Object>, String> {
    let id = child_id(faq_id, index_id);
    let faq = match data.client.kendra().find_faq(faq_id, index_id).await {
        Ok(Some(faq)) => faq,
        Ok(None) => return Ok(None),
        Err(e) => return Err(format!("reading Kendra Faq ({}): {}", id, e)),
    };
    let arn = kendra_arn(&data.client, index_id, Some(("faq", faq_id)))
        .await
        .map_err(|e| format!("reading Kendra Faq ({}): {}", id, e))?;

    let mut values = prior.clone();
    values.insert("id".to_string(), Dynamic::String(id.clone()));
    flatten_faq(&faq, &arn, &mut values);
    flex::settle_zero_values(prior, &mut values);
    read_tags(&data.client, &arn, &mut values, &data.default_tags)
        .await
        .map_err(|e| format!("listing tags for Kendra Faq ({}): {}", id, e))?;
    Ok(Some(values))
}

pub(crate) fn flatten_faq(faq: &Faq, arn: &str, values: &mut Object) {
    let fields = [
        ("arn", Dynamic::string(arn)),
        ("faq_id", Dynamic::string(&faq.id)),
        ("index_id", Dynamic::string(&faq.index_id)),
        ("name", Dynamic::string(&faq.name)),
        ("description", Dynamic::from(faq.description.clone())),
        ("role_arn", Dynamic::from(faq.role_arn.clone())),
        ("file_format", Dynamic::from(faq.file_format.clone())),
        ("language_code", Dynamic::from(faq.language_code.clone())),
        ("status", Dynamic::from(faq.status.clone())),
        ("error_message", Dynamic::from(faq.error_message.clone())),
        ("created_at", flex::timestamp(faq.created_at)),
        ("updated_at", flex::timestamp(faq.updated_at)),
        ("s3_path", flatten_s3_path(faq.s3_path.as_ref())),
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

    #[test]
    fn flatten_renders_timestamps_and_path() {
        let faq = Faq {
            id: "faq-1".to_string(),
            index_id: "idx".to_string(),
            name: "questions".to_string(),
            s3_path: Some(S3Path {
                bucket: "docs".to_string(),
                key: "faq.csv".to_string(),
            }),
            file_format: Some("CSV".to_string()),
            status: Some("ACTIVE".to_string()),
            created_at: Some(1_609_459_200.0),
            ..Default::default()
        };

        let mut values = Object::new();
        flatten_faq(&faq, "arn:aws:kendra:us-east-1:123456789012:index/idx/faq/faq-1", &mut values);

        assert_eq!(values.string("faq_id").unwrap(), "faq-1");
        assert_eq!(values.string("created_at").unwrap(), "2021-01-01T00:00:00Z");
        assert_eq!(values.block("s3_path").unwrap().string("key").unwrap(), "faq.csv");
        assert_eq!(values.get("description"), Some(&Dynamic::Null));
    }

    #[test]
    fn schema_replaces_on_content_changes() {
        let schema = FaqResource::schema_static();
        for name in ["name", "role_arn", "file_format", "index_id"] {
            assert!(!schema.attributes[name].plan_modifiers.is_empty(), "{}", name);
        }
        assert!(schema.attributes["tags"].plan_modifiers.is_empty());
        assert_eq!(schema.blocks["s3_path"].max_items, 1);
    }
}
