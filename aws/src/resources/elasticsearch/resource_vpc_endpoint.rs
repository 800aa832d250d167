//! Elasticsearch VPC endpoint resource implementation

use async_trait::async_trait;
use std::time::Duration;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ReadRequest, ReadResponse, ResourceSchemaResponse, SchemaRequest,
    UpdateRequest, UpdateResponse,
};
use tfplug::validator::ArnValidator;
use tfplug::{
    import_state_passthrough_id, AttributeBuilder, AttributeType, BlockBuilder, Context,
    Diagnostics, Dynamic, ResourceSchema, ResourceV2, RetryError, SchemaBuilder, State,
    StateChangeConf,
};
use tracing::{debug, warn};

use crate::api::elasticsearch::{VpcEndpoint, VpcOptions};
use crate::api::Client;
use crate::resources::flex::{self, object, Object, ObjectExt};
use crate::resources::timeouts::Timeouts;
use crate::resources::waiter::wait_for;
use crate::resources::{applied_state, configured};
use crate::AwsProviderData;

const TIMEOUTS: Timeouts = Timeouts::minutes(60, 60, 90);

pub struct VpcEndpointResource {
    provider_data: Option<AwsProviderData>,
}

impl VpcEndpointResource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Manages an AWS Elasticsearch VPC endpoint")
            .attribute(
                "id",
                AttributeBuilder::string("id")
                    .computed()
                    .description("Identifier of the VPC endpoint")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "domain_arn",
                AttributeBuilder::string("domain_arn")
                    .required()
                    .description("ARN of the domain the endpoint connects to")
                    .validator(Box::new(ArnValidator))
                    .plan_modifier(Box::new(RequiresReplaceIfChanged)),
            )
            .attribute(
                "endpoint",
                AttributeBuilder::string("endpoint")
                    .computed()
                    .description("Connection endpoint ID for connecting to the domain")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .block(
                "vpc_options",
                BlockBuilder::list("vpc_options")
                    .min_items(1)
                    .max_items(1)
                    .description("Options to specify the subnets and security groups for the endpoint")
                    .attribute(
                        "availability_zones",
                        AttributeBuilder::set("availability_zones", AttributeType::String)
                            .computed()
                            .description("Availability zones used by the endpoint"),
                    )
                    .attribute(
                        "security_group_ids",
                        AttributeBuilder::set("security_group_ids", AttributeType::String)
                            .optional()
                            .computed()
                            .description("Security group IDs for the endpoint. The VPC default security group is used when unset"),
                    )
                    .attribute(
                        "subnet_ids",
                        AttributeBuilder::set("subnet_ids", AttributeType::String)
                            .required()
                            .description("Subnet IDs for the endpoint"),
                    )
                    .attribute(
                        "vpc_id",
                        AttributeBuilder::string("vpc_id")
                            .computed()
                            .description("VPC of the endpoint"),
                    ),
            )
            .block("timeouts", Timeouts::block(&["create", "update", "delete"]))
            .build_resource(0)
    }
}

#[async_trait]
impl ResourceV2 for VpcEndpointResource {
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
        let domain_arn = values.string("domain_arn").unwrap_or_default();
        let vpc_options = expand_vpc_options(&values);
        let client_token = uuid::Uuid::new_v4().to_string();

        let endpoint = match data
            .client
            .elasticsearch()
            .create_vpc_endpoint(&domain_arn, &vpc_options, &client_token)
            .await
        {
            Ok(endpoint) => endpoint,
            Err(e) => {
                diagnostics.add_error(
                    format!("creating Elasticsearch VPC Endpoint ({}): {}", domain_arn, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };

        let id = endpoint.vpc_endpoint_id.clone();
        values.insert("id".to_string(), Dynamic::string(&id));

        match wait_vpc_endpoint(&request.context, &data.client, &id, "CREATING", timeouts.create).await {
            Ok(Some(endpoint)) => flatten_vpc_endpoint(&endpoint, &mut values),
            Ok(None) => diagnostics.add_error(
                format!("waiting for Elasticsearch VPC Endpoint ({}) create: not found", id),
                None::<String>,
            ),
            Err(e) => diagnostics.add_error(
                format!("waiting for Elasticsearch VPC Endpoint ({}) create: {}", id, e),
                None::<String>,
            ),
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

        let mut values = request.current_state.values.clone();
        let id = values.string("id").unwrap_or_default();

        match data.client.elasticsearch().describe_vpc_endpoint(&id).await {
            Ok(Some(endpoint)) => {
                flatten_vpc_endpoint(&endpoint, &mut values);
                ReadResponse {
                    state: Some(State::from_values(values)),
                    diagnostics,
                }
            }
            Ok(None) => {
                warn!("Elasticsearch VPC Endpoint ({}) not found, removing from state", id);
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error(
                    format!("reading Elasticsearch VPC Endpoint ({}): {}", id, e),
                    None::<String>,
                );
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
        let timeouts = TIMEOUTS.resolve(&values);
        let id = prior.string("id").unwrap_or_default();
        values.insert("id".to_string(), Dynamic::string(&id));

        if flex::has_change(&prior, &values, "vpc_options") {
            let vpc_options = expand_vpc_options(&values);
            if let Err(e) = data
                .client
                .elasticsearch()
                .update_vpc_endpoint(&id, &vpc_options)
                .await
            {
                diagnostics.add_error(
                    format!("updating Elasticsearch VPC Endpoint ({}): {}", id, e),
                    None::<String>,
                );
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }

            match wait_vpc_endpoint(&request.context, &data.client, &id, "UPDATING", timeouts.update).await {
                Ok(Some(endpoint)) => flatten_vpc_endpoint(&endpoint, &mut values),
                Ok(None) => diagnostics.add_error(
                    format!("waiting for Elasticsearch VPC Endpoint ({}) update: not found", id),
                    None::<String>,
                ),
                Err(e) => diagnostics.add_error(
                    format!("waiting for Elasticsearch VPC Endpoint ({}) update: {}", id, e),
                    None::<String>,
                ),
            }
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

        debug!("Deleting Elasticsearch VPC Endpoint: {}", id);
        match data.client.elasticsearch().delete_vpc_endpoint(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResponse { diagnostics },
            Err(e) => {
                diagnostics.add_error(
                    format!("deleting Elasticsearch VPC Endpoint ({}): {}", id, e),
                    None::<String>,
                );
                return DeleteResponse { diagnostics };
            }
        }

        if let Err(e) = wait_vpc_endpoint(&request.context, &data.client, &id, "DELETING", timeouts.delete).await {
            diagnostics.add_error(
                format!("waiting for Elasticsearch VPC Endpoint ({}) delete: {}", id, e),
                None::<String>,
            );
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        import_state_passthrough_id("id", &request)
    }
}

/// Waits for the endpoint to leave `pending`. Deletion completes once the
/// endpoint is gone.
async fn wait_vpc_endpoint(
    ctx: &Context,
    client: &Client,
    id: &str,
    pending: &str,
    timeout: Duration,
) -> Result<Option<VpcEndpoint>, RetryError> {
    let target: &[&str] = if pending == "DELETING" { &[] } else { &["ACTIVE"] };
    let conf = StateChangeConf::new(&[pending], target, timeout)
        .delay(Duration::from_secs(10))
        .min_timeout(Duration::from_secs(5));

    wait_for(ctx, conf, || async move {
        client.elasticsearch().describe_vpc_endpoint(id).await
    })
    .await
}

fn expand_vpc_options(values: &Object) -> VpcOptions {
    let block = values.block("vpc_options");
    VpcOptions {
        subnet_ids: block.and_then(|b| flex::non_empty(b.strings("subnet_ids"))),
        security_group_ids: block.and_then(|b| flex::non_empty(b.strings("security_group_ids"))),
    }
}

fn flatten_vpc_endpoint(endpoint: &VpcEndpoint, values: &mut Object) {
    values.insert("id".to_string(), Dynamic::string(&endpoint.vpc_endpoint_id));
    if let Some(arn) = &endpoint.domain_arn {
        values.insert("domain_arn".to_string(), Dynamic::string(arn));
    }
    values.insert("endpoint".to_string(), Dynamic::from(endpoint.endpoint.clone()));
    values.insert(
        "vpc_options".to_string(),
        flex::block(endpoint.vpc_options.as_ref().map(|vpc| {
            object([
                ("availability_zones", flex::string_set(&vpc.availability_zones)),
                ("security_group_ids", flex::string_set(&vpc.security_group_ids)),
                ("subnet_ids", flex::string_set(&vpc.subnet_ids)),
                ("vpc_id", Dynamic::from(vpc.vpc_id.clone())),
            ])
        })),
    );
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::elasticsearch::VpcDerivedInfo;

    #[test]
    fn vpc_options_skip_empty_lists() {
        let values = object([(
            "vpc_options",
            Dynamic::block(object([
                ("subnet_ids", Dynamic::string_list(["subnet-1", "subnet-2"])),
                ("security_group_ids", Dynamic::Unknown),
            ])),
        )]);
        let options = expand_vpc_options(&values);
        assert_eq!(
            options.subnet_ids,
            Some(vec!["subnet-1".to_string(), "subnet-2".to_string()])
        );
        assert_eq!(options.security_group_ids, None);
    }

    #[test]
    fn flatten_reports_derived_vpc_values() {
        let endpoint = VpcEndpoint {
            vpc_endpoint_id: "aos-0123456789".to_string(),
            domain_arn: Some("arn:aws:es:us-east-1:123456789012:domain/search".to_string()),
            endpoint: Some("vpc-search-0123456789.us-east-1.es.amazonaws.com".to_string()),
            status: Some("ACTIVE".to_string()),
            vpc_options: Some(VpcDerivedInfo {
                vpc_id: Some("vpc-1".to_string()),
                subnet_ids: vec!["subnet-2".to_string(), "subnet-1".to_string()],
                availability_zones: vec!["us-east-1a".to_string()],
                security_group_ids: vec!["sg-1".to_string()],
            }),
            ..Default::default()
        };

        let mut values = Object::new();
        flatten_vpc_endpoint(&endpoint, &mut values);

        assert_eq!(values.string("id").unwrap(), "aos-0123456789");
        assert_eq!(
            values.string("endpoint").unwrap(),
            "vpc-search-0123456789.us-east-1.es.amazonaws.com"
        );
        let vpc = values.block("vpc_options").unwrap();
        assert_eq!(vpc.strings("subnet_ids"), vec!["subnet-1", "subnet-2"]);
        assert_eq!(vpc.string("vpc_id").unwrap(), "vpc-1");
    }
}
