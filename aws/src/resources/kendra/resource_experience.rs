//! Kendra experience (search application) resource implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ReadRequest, ReadResponse, ResourceSchemaResponse, SchemaRequest,
    UpdateRequest, UpdateResponse,
};
use tfplug::validator::{ArnValidator, StringLengthValidator, StringPatternValidator};
use tfplug::{
    import_state_passthrough_id, retry_when, AttributeBuilder, AttributeType, BlockBuilder,
    Context, Diagnostics, Dynamic, ResourceSchema, ResourceV2, RetryError, SchemaBuilder, State,
    StateChangeConf,
};
use tracing::{debug, warn};

use super::{
    child_id, client_token, index_id_attribute, is_iam_propagation, kendra_arn, parse_child_id,
    PROPAGATION_TIMEOUT,
};
use crate::api::kendra::{
    ContentSourceConfiguration, CreateExperienceRequest, Experience, ExperienceConfiguration,
    UpdateExperienceRequest, UserIdentityConfiguration,
};
use crate::api::Client;
use crate::resources::flex::{self, object, Object, ObjectExt};
use crate::resources::plan::KeepUnconfiguredBlock;
use crate::resources::timeouts::Timeouts;
use crate::resources::waiter::wait_for;
use crate::resources::{applied_state, configured};
use crate::AwsProviderData;

const TIMEOUTS: Timeouts = Timeouts::minutes(30, 30, 30);

pub struct ExperienceResource {
    provider_data: Option<AwsProviderData>,
}

impl ExperienceResource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Manages an Amazon Kendra experience, a search application endpoint")
            .attribute(
                "id",
                AttributeBuilder::string("id")
                    .computed()
                    .description("Experience and index identifiers separated by a slash")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute("index_id", index_id_attribute())
            .attribute(
                "name",
                AttributeBuilder::string("name")
                    .required()
                    .description("Name of the experience")
                    .validator(Box::new(StringLengthValidator::between(1, 1000)))
                    .validator(Box::new(StringPatternValidator::new(
                        r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$",
                        "must begin with a letter or number and contain only alphanumerics, hyphens or underscores",
                    ))),
            )
            .attribute(
                "role_arn",
                AttributeBuilder::string("role_arn")
                    .required()
                    .description("IAM role with permission to access the query API, sessions and user identities")
                    .validator(Box::new(ArnValidator)),
            )
            .attribute(
                "description",
                AttributeBuilder::string("description")
                    .optional()
                    .description("Description of the experience")
                    .validator(Box::new(StringLengthValidator::between(0, 1000))),
            )
            .attribute(
                "arn",
                AttributeBuilder::string("arn")
                    .computed()
                    .description("ARN of the experience")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "experience_id",
                AttributeBuilder::string("experience_id")
                    .computed()
                    .description("Identifier of the experience")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "status",
                AttributeBuilder::string("status")
                    .computed()
                    .description("Current status of the experience"),
            )
            .attribute(
                "endpoints",
                AttributeBuilder::set(
                    "endpoints",
                    AttributeType::Object(HashMap::from([
                        ("endpoint".to_string(), AttributeType::String),
                        ("endpoint_type".to_string(), AttributeType::String),
                    ])),
                )
                .computed()
                .description("Endpoints of the experience")
                .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .block("configuration", configuration_block())
            .block("timeouts", Timeouts::block(&["create", "update", "delete"]))
            .build_resource(0)
    }
}

fn configuration_block() -> BlockBuilder {
    let ids = |name: &str, description: &str| {
        AttributeBuilder::set(name, AttributeType::String)
            .optional()
            .description(description)
    };

    BlockBuilder::list("configuration")
        .max_items(1)
        .description("Data sources, FAQs and identity settings for the experience")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .block(
            "content_source_configuration",
            BlockBuilder::list("content_source_configuration")
                .max_items(1)
                .description("Sources the experience searches")
                .attribute("data_source_ids", ids("data_source_ids", "Identifiers of the data sources"))
                .attribute("faq_ids", ids("faq_ids", "Identifiers of the FAQs"))
                .attribute(
                    "direct_put_content",
                    AttributeBuilder::bool("direct_put_content")
                        .optional()
                        .description("Whether to use documents indexed through BatchPutDocument"),
                ),
        )
        .block(
            "user_identity_configuration",
            BlockBuilder::list("user_identity_configuration")
                .max_items(1)
                .description("IAM Identity Center field name that identifies users and groups")
                .attribute(
                    "identity_attribute_name",
                    AttributeBuilder::string("identity_attribute_name")
                        .required()
                        .description("IAM Identity Center field name")
                        .validator(Box::new(StringLengthValidator::between(1, 1000))),
                ),
        )
}

#[async_trait]
impl ResourceV2 for ExperienceResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
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

        let input = CreateExperienceRequest {
            index_id: index_id.clone(),
            name: name.clone(),
            client_token: client_token(),
            role_arn: values.string("role_arn"),
            description: values.string("description"),
            configuration: expand_configuration(values.block("configuration")),
        };

        let api = data.client.kendra();
        let experience_id = match retry_when(
            &request.context,
            PROPAGATION_TIMEOUT,
            || api.create_experience(&input),
            is_iam_propagation,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                diagnostics.add_error(
                    format!("creating Kendra Experience ({}): {}", name, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };

        let id = child_id(&experience_id, &index_id);
        values.insert("id".to_string(), Dynamic::string(&id));

        if let Err(e) = wait_experience(
            &request.context,
            &data.client,
            &experience_id,
            &index_id,
            "CREATING",
            timeouts.create,
        )
        .await
        {
            diagnostics.add_error(
                format!("waiting for Kendra Experience ({}) creation: {}", id, e),
                None::<String>,
            );
            return CreateResponse {
                state: applied_state(values),
                diagnostics,
            };
        }

        match read_experience(data, &experience_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra Experience ({}): not found after creation", id),
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
        let Some((experience_id, index_id)) = parse_child_id(&id, "experience", &mut diagnostics) else {
            return ReadResponse {
                state: Some(request.current_state),
                diagnostics,
            };
        };

        match read_experience(data, &experience_id, &index_id, &request.current_state.values).await {
            Ok(Some(values)) => ReadResponse {
                state: Some(State::from_values(values)),
                diagnostics,
            },
            Ok(None) => {
                warn!("Kendra Experience ({}) not found, removing from state", id);
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
        let Some((experience_id, index_id)) = parse_child_id(&id, "experience", &mut diagnostics) else {
            return UpdateResponse {
                state: State::from_values(prior),
                diagnostics,
            };
        };

        if let Some(input) = expand_update_request(&experience_id, &index_id, &prior, &values) {
            debug!("Updating Kendra Experience: {}", id);
            let api = data.client.kendra();
            if let Err(e) = retry_when(
                &request.context,
                PROPAGATION_TIMEOUT,
                || api.update_experience(&input),
                is_iam_propagation,
            )
            .await
            {
                diagnostics.add_error(
                    format!("updating Kendra Experience ({}): {}", id, e),
                    None::<String>,
                );
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }

            if let Err(e) = wait_experience(
                &request.context,
                &data.client,
                &experience_id,
                &index_id,
                "UPDATING",
                timeouts.update,
            )
            .await
            {
                diagnostics.add_error(
                    format!("waiting for Kendra Experience ({}) update: {}", id, e),
                    None::<String>,
                );
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }
        }

        match read_experience(data, &experience_id, &index_id, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Kendra Experience ({}): not found after update", id),
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
        let Some((experience_id, index_id)) = parse_child_id(&id, "experience", &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        debug!("Deleting Kendra Experience: {}", id);
        match data.client.kendra().delete_experience(&experience_id, &index_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResponse { diagnostics },
            Err(e) => {
                diagnostics.add_error(
                    format!("deleting Kendra Experience ({}): {}", id, e),
                    None::<String>,
                );
                return DeleteResponse { diagnostics };
            }
        }

        if let Err(e) = wait_experience(
            &request.context,
            &data.client,
            &experience_id,
            &index_id,
            "DELETING",
            timeouts.delete,
        )
        .await
        {
            diagnostics.add_error(
                format!("waiting for Kendra Experience ({}) delete: {}", id, e),
                None::<String>,
            );
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request)
    }
}

async fn wait_experience(
    ctx: &Context,
    client: &Client,
    experience_id: &str,
    index_id: &str,
    pending: &str,
    timeout: Duration,
) -> Result<Option<Experience>, RetryError> {
    let target: &[&str] = if pending == "DELETING" { &[] } else { &["ACTIVE"] };
    let conf = StateChangeConf::new(&[pending], target, timeout);
    wait_for(ctx, conf, || async move {
        client.kendra().find_experience(experience_id, index_id).await
    })
    .await
}

pub(crate) async fn read_experience(
    data: &AwsProviderData,
    experience_id: &str,
    index_id: &str,
    prior: &Object,
) -> Result<Option<Object>, String> {
    let id = child_id(experience_id, index_id);
    let experience = match data.client.kendra().find_experience(experience_id, index_id).await {
        Ok(Some(experience)) => experience,
        Ok(None) => return Ok(None),
        Err(e) => return Err(format!("reading Kendra Experience ({}): {}", id, e)),
    };
    let arn = kendra_arn(&data.client, index_id, Some(("experience", experience_id)))
        .await
        .map_err(|e| format!("reading Kendra Experience ({}): {}", id, e))?;

    let mut values = prior.clone();
    values.insert("id".to_string(), Dynamic::String(id));
    flatten_experience(&experience, &arn, &mut values);
    flex::settle_zero_values(prior, &mut values);
    Ok(Some(values))
}

/// UpdateExperience body, `None` when nothing changed
fn expand_update_request(
    experience_id: &str,
    index_id: &str,
    prior: &Object,
    planned: &Object,
) -> Option<UpdateExperienceRequest> {
    let changed = |key: &str| flex::has_change(prior, planned, key);
    if !["configuration", "description", "name", "role_arn"]
        .iter()
        .any(|key| changed(key))
    {
        return None;
    }

    let mut input = UpdateExperienceRequest {
        id: experience_id.to_string(),
        index_id: index_id.to_string(),
        ..Default::default()
    };
    if changed("configuration") {
        input.configuration = Some(expand_configuration(planned.block("configuration")).unwrap_or_default());
    }
    if changed("description") {
        input.description = Some(planned.string("description").unwrap_or_default());
    }
    if changed("name") {
        input.name = planned.string("name");
    }
    if changed("role_arn") {
        input.role_arn = planned.string("role_arn");
    }
    Some(input)
}

fn expand_configuration(block: Option<&Object>) -> Option<ExperienceConfiguration> {
    let block = block?;
    Some(ExperienceConfiguration {
        content_source_configuration: block.block("content_source_configuration").map(|content| {
            ContentSourceConfiguration {
                data_source_ids: content.strings("data_source_ids"),
                faq_ids: content.strings("faq_ids"),
                direct_put_content: content.bool("direct_put_content").unwrap_or(false),
            }
        }),
        user_identity_configuration: block.block("user_identity_configuration").map(|identity| {
            UserIdentityConfiguration {
                identity_attribute_name: identity.string("identity_attribute_name").unwrap_or_default(),
            }
        }),
    })
}

fn flatten_configuration(config: Option<&ExperienceConfiguration>) -> Dynamic {
    flex::block(config.map(|config| {
        object([
            (
                "content_source_configuration",
                flex::block(config.content_source_configuration.as_ref().map(|content| {
                    object([
                        ("data_source_ids", flex::string_set(&content.data_source_ids)),
                        ("faq_ids", flex::string_set(&content.faq_ids)),
                        ("direct_put_content", Dynamic::Bool(content.direct_put_content)),
                    ])
                })),
            ),
            (
                "user_identity_configuration",
                flex::block(config.user_identity_configuration.as_ref().map(|identity| {
                    object([(
                        "identity_attribute_name",
                        Dynamic::string(&identity.identity_attribute_name),
                    )])
                })),
            ),
        ])
    }))
}

pub(crate) fn flatten_experience(experience: &Experience, arn: &str, values: &mut Object) {
    let endpoints = experience
        .endpoints
        .iter()
        .map(|e| {
            object([
                ("endpoint", Dynamic::from(e.endpoint.clone())),
                ("endpoint_type", Dynamic::from(e.endpoint_type.clone())),
            ])
        })
        .collect();

    let fields = [
        ("arn", Dynamic::string(arn)),
        ("experience_id", Dynamic::string(&experience.id)),
        ("index_id", Dynamic::string(&experience.index_id)),
        ("name", Dynamic::string(&experience.name)),
        ("description", Dynamic::from(experience.description.clone())),
        ("role_arn", Dynamic::from(experience.role_arn.clone())),
        ("status", Dynamic::from(experience.status.clone())),
        ("endpoints", flex::blocks(endpoints)),
        ("configuration", flatten_configuration(experience.configuration.as_ref())),
    ];
    for (key, value) in fields {
        values.insert(key.to_string(), value);
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::kendra::ExperienceEndpoint;

    fn configuration(faq_ids: &[&str]) -> Object {
        object([
            (
                "content_source_configuration",
                flex::block(Some(object([
                    ("faq_ids", Dynamic::string_list(faq_ids.iter().copied())),
                    ("direct_put_content", Dynamic::Bool(true)),
                ]))),
            ),
            ("user_identity_configuration", Dynamic::List(vec![])),
        ])
    }

    #[test]
    fn configuration_expands_sources() {
        let config = expand_configuration(Some(&configuration(&["faq-1", "faq-2"]))).unwrap();
        let content = config.content_source_configuration.unwrap();
        assert_eq!(content.faq_ids, vec!["faq-1".to_string(), "faq-2".to_string()]);
        assert!(content.data_source_ids.is_empty());
        assert!(content.direct_put_content);
        assert!(config.user_identity_configuration.is_none());
        assert!(expand_configuration(None).is_none());
    }

    #[test]
    fn reordered_ids_are_not_an_update() {
        let prior = object([
            ("name", Dynamic::string("portal")),
            ("configuration", flex::block(Some(configuration(&["a", "b"])))),
        ]);
        let planned = object([
            ("name", Dynamic::string("portal")),
            ("configuration", flex::block(Some(configuration(&["b", "a"])))),
        ]);
        assert!(expand_update_request("exp", "idx", &prior, &planned).is_none());

        let renamed = object([
            ("name", Dynamic::string("intranet")),
            ("configuration", flex::block(Some(configuration(&["a", "b"])))),
        ]);
        let request = expand_update_request("exp", "idx", &prior, &renamed).unwrap();
        assert_eq!(request.name.as_deref(), Some("intranet"));
        assert!(request.configuration.is_none());
    }

    #[test]
    fn flatten_lists_endpoints() {
        let experience = Experience {
            id: "exp".to_string(),
            index_id: "idx".to_string(),
            name: "portal".to_string(),
            endpoints: vec![ExperienceEndpoint {
                endpoint_type: Some("HOME".to_string()),
                endpoint: Some("https://portal.kendra.aws".to_string()),
            }],
            ..Default::default()
        };

        let mut values = Object::new();
        flatten_experience(&experience, "arn:aws:kendra:us-east-1:123456789012:index/idx/experience/exp", &mut values);

        let endpoints = values.blocks("endpoints");
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].string("endpoint_type").unwrap(), "HOME");
        assert_eq!(values.get("configuration"), Some(&Dynamic::List(vec![])));
    }
}
