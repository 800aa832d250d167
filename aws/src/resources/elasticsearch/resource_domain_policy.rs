//! Elasticsearch domain access policy resource implementation

use async_trait::async_trait;
use std::time::Duration;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, SuppressEquivalent, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::validator::JsonStringValidator;
use tfplug::{
    AttributeBuilder, Context, Diagnostics, Dynamic, ResourceSchema, ResourceV2, SchemaBuilder,
    State, StateChangeConf,
};
use tracing::{debug, warn};

use crate::api::elasticsearch::UpdateDomainConfigRequest;
use crate::api::{not_found_as_none, Client};
use crate::resources::flex::{self, Object, ObjectExt};
use crate::resources::waiter::wait_for;
use crate::resources::configured;
use crate::AwsProviderData;

const POLICY_TIMEOUT: Duration = Duration::from_secs(50 * 60);

pub struct DomainPolicyResource {
    provider_data: Option<AwsProviderData>,
}

impl DomainPolicyResource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Manages the access policy of an AWS Elasticsearch domain")
            .attribute(
                "id",
                AttributeBuilder::string("id")
                    .computed()
                    .description("Identifier of the policy, `esd-policy-` followed by the domain name")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "domain_name",
                AttributeBuilder::string("domain_name")
                    .required()
                    .description("Name of the domain")
                    .plan_modifier(Box::new(RequiresReplaceIfChanged)),
            )
            .attribute(
                "access_policies",
                AttributeBuilder::string("access_policies")
                    .required()
                    .description("IAM policy document specifying the access policies for the domain")
                    .validator(Box::new(JsonStringValidator))
                    .plan_modifier(Box::new(SuppressEquivalent::new(
                        flex::equivalent_policy_values,
                    ))),
            )
            .build_resource(0)
    }
}

pub fn policy_id(domain_name: &str) -> String {
    format!("esd-policy-{}", domain_name)
}

#[async_trait]
impl ResourceV2 for DomainPolicyResource {
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
        let name = values.string("domain_name").unwrap_or_default();
        let policy = values.string("access_policies").unwrap_or_default();

        if let Err(e) = put_policy(&request.context, &data.client, &name, &policy).await {
            diagnostics.add_error(
                format!("updating Elasticsearch Domain Policy ({}): {}", name, e),
                None::<String>,
            );
            return CreateResponse {
                state: State::new(),
                diagnostics,
            };
        }

        values.insert("id".to_string(), Dynamic::String(policy_id(&name)));
        CreateResponse {
            state: State::from_values(values),
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

        let mut values = request.current_state.values.clone();
        let name = values.string("domain_name").unwrap_or_default();

        let status = match data.client.elasticsearch().find_domain(&name).await {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!(
                    "Elasticsearch Domain Policy ({}) not found, removing from state",
                    policy_id(&name)
                );
                return ReadResponse {
                    state: None,
                    diagnostics,
                };
            }
            Err(e) => {
                diagnostics.add_error(
                    format!("reading Elasticsearch Domain Policy ({}): {}", policy_id(&name), e),
                    None::<String>,
                );
                return ReadResponse {
                    state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        let remote = status.access_policies.unwrap_or_default();
        let policy = read_policy(&values, &remote);
        values.insert("access_policies".to_string(), Dynamic::String(policy));

        ReadResponse {
            state: Some(State::from_values(values)),
            diagnostics,
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

        let values = request.planned_state.values;
        let name = values.string("domain_name").unwrap_or_default();
        let policy = values.string("access_policies").unwrap_or_default();

        if let Err(e) = put_policy(&request.context, &data.client, &name, &policy).await {
            diagnostics.add_error(
                format!("updating Elasticsearch Domain Policy ({}): {}", policy_id(&name), e),
                None::<String>,
            );
            return UpdateResponse {
                state: request.current_state,
                diagnostics,
            };
        }

        UpdateResponse {
            state: State::from_values(values),
            diagnostics,
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();
        let Some(data) = configured(&self.provider_data, &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        let name = request
            .current_state
            .values
            .string("domain_name")
            .unwrap_or_default();

        debug!("Deleting Elasticsearch Domain Policy: {}", policy_id(&name));
        match put_policy(&request.context, &data.client, &name, "").await {
            Ok(()) => {}
            Err(PolicyError::Api(e)) if e.is_not_found() => {}
            Err(e) => diagnostics.add_error(
                format!("deleting Elasticsearch Domain Policy ({}): {}", policy_id(&name), e),
                None::<String>,
            ),
        }

        DeleteResponse { diagnostics }
    }
}

#[derive(Debug, thiserror::Error)]
enum PolicyError {
    #[error(transparent)]
    Api(#[from] crate::api::ApiError),
    #[error("waiting for completion: {0}")]
    Wait(#[from] tfplug::RetryError),
}

/// Sets the domain's access policy and waits for the domain to apply it
async fn put_policy(ctx: &Context, client: &Client, name: &str, policy: &str) -> Result<(), PolicyError> {
    let input = UpdateDomainConfigRequest {
        access_policies: Some(policy.to_string()),
        ..Default::default()
    };
    client.elasticsearch().update_domain_config(name, &input).await?;

    let conf = StateChangeConf::new(&["Modifying"], &["Active"], POLICY_TIMEOUT);
    wait_for(ctx, conf, || async move {
        not_found_as_none(client.elasticsearch().describe_domain(name).await)
    })
    .await?;
    Ok(())
}

/// The stored policy when the remote one grants the same access
fn read_policy(values: &Object, remote: &str) -> String {
    match values.string("access_policies") {
        Some(stored) if flex::policies_equivalent(&stored, remote) => stored,
        _ => flex::normalize_json(remote).unwrap_or_else(|_| remote.to_string()),
    }
}
