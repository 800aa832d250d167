//! Elasticsearch domain resource implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, SuppressEquivalent, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, ModifyPlanRequest, ModifyPlanResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::validator::{
    ArnValidator, JsonStringValidator, NumberOneOfValidator, NumberRangeValidator,
    Rfc3339Validator, StringOneOfValidator, StringPatternValidator,
};
use tfplug::{
    retry_when, AttributeBuilder, AttributeType, BlockBuilder, Context, Diagnostics, Dynamic,
    ResourceSchema, ResourceV2, RetryError, SchemaBuilder, State, StateChangeConf,
};
use tracing::{debug, error, warn};

use crate::api::elasticsearch::{
    AdvancedSecurityOptions, AutoTuneOptions, ClusterConfig, CognitoOptions, ColdStorageOptions,
    CreateDomainRequest, DomainConfig, DomainEndpointOptions, DomainStatus, EbsOptions,
    EncryptionAtRestOptions, LogPublishingOption, MaintenanceDuration, MaintenanceSchedule,
    MasterUserOptions, NodeToNodeEncryptionOptions, SnapshotOptions, UpdateDomainConfigRequest,
    UpgradeStatus, VpcOptions, ZoneAwarenessConfig,
};
use crate::api::{not_found_as_none, ApiError, Client};
use crate::resources::flex::{self, object, Object, ObjectExt};
use crate::resources::plan::{self, KeepUnconfiguredBlock};
use crate::resources::timeouts::Timeouts;
use crate::resources::waiter::wait_for;
use crate::resources::{applied_state, configured, tags};
use crate::AwsProviderData;

const TIMEOUTS: Timeouts = Timeouts::minutes(60, 60, 90);

/// How long to retry creation while IAM changes propagate
const PROPAGATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Create errors that clear up once IAM roles and policies propagate
const CREATE_RETRYABLE: [(&str, &str); 8] = [
    ("InvalidTypeException", "Error setting policy"),
    (
        "ValidationException",
        "enable a service-linked role to give Amazon ES permissions",
    ),
    ("ValidationException", "Domain is still being deleted"),
    (
        "ValidationException",
        "Amazon Elasticsearch must be allowed to use the passed role",
    ),
    ("ValidationException", "The passed role has not propagated yet"),
    ("ValidationException", "Authentication error"),
    (
        "ValidationException",
        "Unauthorized Operation: Elasticsearch must be authorised to describe",
    ),
    (
        "ValidationException",
        "The passed role must authorize Amazon Elasticsearch to describe",
    ),
];

/// Advanced options the service adds on its own
const DEFAULT_ADVANCED_OPTIONS: [(&str, &str); 2] = [
    ("override_main_response_version", "false"),
    ("rest.action.multi.allow_explicit_index", "true"),
];

/// First version that can turn on encryption without replacing the domain
const IN_PLACE_ENCRYPTION_VERSION: &str = "6.7";

/// First version that accepts cold storage options
const COLD_STORAGE_VERSION: &str = "7.9";

const WARM_TYPES: [&str; 3] = [
    "ultrawarm1.medium.elasticsearch",
    "ultrawarm1.large.elasticsearch",
    "ultrawarm1.xlarge.elasticsearch",
];

const LOG_TYPES: [&str; 4] = [
    "INDEX_SLOW_LOGS",
    "SEARCH_SLOW_LOGS",
    "ES_APPLICATION_LOGS",
    "AUDIT_LOGS",
];

const TLS_POLICIES: [&str; 3] = [
    "Policy-Min-TLS-1-0-2019-07",
    "Policy-Min-TLS-1-2-2019-07",
    "Policy-Min-TLS-1-2-PFS-2023-10",
];

#[derive(Default)]
pub struct DomainResource {
    provider_data: Option<AwsProviderData>,
}

impl DomainResource {
    pub fn new(provider_data: Option<AwsProviderData>) -> Self {
        Self { provider_data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .description("Manages an AWS Elasticsearch domain")
            .attribute(
                "id",
                AttributeBuilder::string("id")
                    .computed()
                    .description("ARN of the domain")
                    .plan_modifier(Box::new(UseStateForUnknown)),
            )
            .attribute(
                "domain_name",
                AttributeBuilder::string("domain_name")
                    .required()
                    .description("Name of the domain")
                    .validator(Box::new(StringPatternValidator::new(
                        r"^[a-z][0-9a-z\-]{2,27}$",
                        "must start with a lowercase letter and contain 3 to 28 lowercase letters, digits or hyphens",
                    )))
                    .plan_modifier(Box::new(RequiresReplaceIfChanged)),
            )
            .attribute(
                "elasticsearch_version",
                AttributeBuilder::string("elasticsearch_version")
                    .description("Version of Elasticsearch to deploy")
                    .default(StaticDefault::string("1.5")),
            )
            .attribute(
                "access_policies",
                AttributeBuilder::string("access_policies")
                    .optional()
                    .computed()
                    .description("IAM policy document specifying the access policies for the domain")
                    .validator(Box::new(JsonStringValidator))
                    .plan_modifier(Box::new(SuppressEquivalent::new(
                        flex::equivalent_policy_values,
                    ))),
            )
            .attribute(
                "advanced_options",
                AttributeBuilder::map("advanced_options", AttributeType::String)
                    .optional()
                    .computed()
                    .description("Key-value string pairs to specify advanced configuration options"),
            )
            .attribute("arn", computed_string("arn", "ARN of the domain"))
            .attribute("domain_id", computed_string("domain_id", "Unique identifier for the domain"))
            .attribute(
                "endpoint",
                computed_string("endpoint", "Domain-specific endpoint used to submit index, search, and data upload requests"),
            )
            .attribute(
                "kibana_endpoint",
                computed_string("kibana_endpoint", "Domain-specific endpoint for Kibana without https scheme"),
            )
            .attribute("tags", tags::tags_attribute())
            .attribute("tags_all", tags::tags_all_attribute())
            .block("advanced_security_options", advanced_security_options_block())
            .block("auto_tune_options", auto_tune_options_block())
            .block("cluster_config", cluster_config_block())
            .block("cognito_options", cognito_options_block())
            .block("domain_endpoint_options", domain_endpoint_options_block())
            .block("ebs_options", ebs_options_block())
            .block("encrypt_at_rest", encrypt_at_rest_block())
            .block("log_publishing_options", log_publishing_options_block())
            .block(
                "node_to_node_encryption",
                BlockBuilder::list("node_to_node_encryption")
                    .max_items(1)
                    .description("Node-to-node encryption options")
                    .plan_modifier(Box::new(KeepUnconfiguredBlock))
                    .attribute(
                        "enabled",
                        AttributeBuilder::bool("enabled")
                            .required()
                            .description("Whether to enable node-to-node encryption"),
                    ),
            )
            .block(
                "snapshot_options",
                BlockBuilder::list("snapshot_options")
                    .max_items(1)
                    .description("Snapshot related options")
                    .plan_modifier(Box::new(KeepUnconfiguredBlock))
                    .attribute(
                        "automated_snapshot_start_hour",
                        AttributeBuilder::number("automated_snapshot_start_hour")
                            .required()
                            .description("Hour during which the service takes an automated daily snapshot of the indices in the domain"),
                    ),
            )
            .block("vpc_options", vpc_options_block())
            .block("timeouts", Timeouts::block(&["create", "update", "delete"]))
            .build_resource(0)
    }
}

fn computed_string(name: &str, description: &str) -> AttributeBuilder {
    AttributeBuilder::string(name)
        .computed()
        .description(description)
        .plan_modifier(Box::new(UseStateForUnknown))
}

fn one_of(values: &[&str]) -> Box<StringOneOfValidator> {
    Box::new(StringOneOfValidator::new(values.iter().copied()))
}

fn advanced_security_options_block() -> BlockBuilder {
    BlockBuilder::list("advanced_security_options")
        .max_items(1)
        .description("Fine-grained access control options")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .attribute(
            "enabled",
            AttributeBuilder::bool("enabled")
                .required()
                .description("Whether advanced security is enabled")
                .plan_modifier(Box::new(RequiresReplaceIfChanged)),
        )
        .attribute(
            "internal_user_database_enabled",
            AttributeBuilder::bool("internal_user_database_enabled")
                .description("Whether the internal user database is enabled")
                .default(StaticDefault::bool(false)),
        )
        .block(
            "master_user_options",
            BlockBuilder::list("master_user_options")
                .max_items(1)
                .description("Credentials for the master user")
                .attribute(
                    "master_user_arn",
                    AttributeBuilder::string("master_user_arn")
                        .optional()
                        .description("ARN for the main user. Only specify if `internal_user_database_enabled` is not set or set to `false`")
                        .validator(Box::new(ArnValidator)),
                )
                .attribute(
                    "master_user_name",
                    AttributeBuilder::string("master_user_name")
                        .optional()
                        .description("Main user's username, stored in the internal database"),
                )
                .attribute(
                    "master_user_password",
                    AttributeBuilder::string("master_user_password")
                        .optional()
                        .sensitive()
                        .description("Main user's password, stored in the internal database"),
                ),
        )
}

fn auto_tune_options_block() -> BlockBuilder {
    BlockBuilder::list("auto_tune_options")
        .max_items(1)
        .description("Auto-Tune options")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .attribute(
            "desired_state",
            AttributeBuilder::string("desired_state")
                .required()
                .description("Auto-Tune desired state for the domain")
                .validator(one_of(&["ENABLED", "DISABLED"])),
        )
        .attribute(
            "rollback_on_disable",
            AttributeBuilder::string("rollback_on_disable")
                .optional()
                .computed()
                .description("Whether to roll back to default Auto-Tune settings when disabling Auto-Tune")
                .validator(one_of(&["DEFAULT_ROLLBACK", "NO_ROLLBACK"])),
        )
        .block(
            "maintenance_schedule",
            BlockBuilder::set("maintenance_schedule")
                .description("Maintenance windows for Auto-Tune")
                .attribute(
                    "start_at",
                    AttributeBuilder::string("start_at")
                        .required()
                        .description("Date and time at which to start the Auto-Tune maintenance schedule in RFC3339 format")
                        .validator(Box::new(Rfc3339Validator)),
                )
                .attribute(
                    "cron_expression_for_recurrence",
                    AttributeBuilder::string("cron_expression_for_recurrence")
                        .required()
                        .description("Cron expression specifying the recurrence pattern for an Auto-Tune maintenance schedule"),
                )
                .block(
                    "duration",
                    BlockBuilder::list("duration")
                        .min_items(1)
                        .max_items(1)
                        .description("Duration of an Auto-Tune maintenance window")
                        .attribute(
                            "value",
                            AttributeBuilder::number("value")
                                .required()
                                .description("Duration of an Auto-Tune maintenance window"),
                        )
                        .attribute(
                            "unit",
                            AttributeBuilder::string("unit")
                                .required()
                                .description("Unit of time specifying the duration of an Auto-Tune maintenance window")
                                .validator(one_of(&["HOURS"])),
                        ),
                ),
        )
}

fn cluster_config_block() -> BlockBuilder {
    BlockBuilder::list("cluster_config")
        .max_items(1)
        .description("Cluster configuration of the domain")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .attribute(
            "dedicated_master_count",
            AttributeBuilder::number("dedicated_master_count")
                .optional()
                .description("Number of dedicated main nodes in the cluster"),
        )
        .attribute(
            "dedicated_master_enabled",
            AttributeBuilder::bool("dedicated_master_enabled")
                .description("Whether dedicated main nodes are enabled for the cluster")
                .default(StaticDefault::bool(false)),
        )
        .attribute(
            "dedicated_master_type",
            AttributeBuilder::string("dedicated_master_type")
                .optional()
                .description("Instance type of the dedicated main nodes in the cluster"),
        )
        .attribute(
            "instance_count",
            AttributeBuilder::number("instance_count")
                .description("Number of instances in the cluster")
                .default(StaticDefault::number(1.0)),
        )
        .attribute(
            "instance_type",
            AttributeBuilder::string("instance_type")
                .description("Instance type of data nodes in the cluster")
                .default(StaticDefault::string("m3.medium.elasticsearch")),
        )
        .attribute(
            "warm_count",
            AttributeBuilder::number("warm_count")
                .optional()
                .description("Number of warm nodes in the cluster")
                .validator(Box::new(NumberRangeValidator::between(2.0, 150.0))),
        )
        .attribute(
            "warm_enabled",
            AttributeBuilder::bool("warm_enabled")
                .optional()
                .description("Whether to enable warm storage"),
        )
        .attribute(
            "warm_type",
            AttributeBuilder::string("warm_type")
                .optional()
                .description("Instance type for the Elasticsearch cluster's warm nodes")
                .validator(one_of(&WARM_TYPES)),
        )
        .attribute(
            "zone_awareness_enabled",
            AttributeBuilder::bool("zone_awareness_enabled")
                .optional()
                .description("Whether zone awareness is enabled"),
        )
        .block(
            "cold_storage_options",
            BlockBuilder::list("cold_storage_options")
                .max_items(1)
                .description("Cold storage options")
                .plan_modifier(Box::new(KeepUnconfiguredBlock))
                .attribute(
                    "enabled",
                    AttributeBuilder::bool("enabled")
                        .optional()
                        .computed()
                        .description("Whether to enable cold storage for the domain"),
                ),
        )
        .block(
            "zone_awareness_config",
            BlockBuilder::list("zone_awareness_config")
                .max_items(1)
                .description("Zone awareness configuration, used when `zone_awareness_enabled` is `true`")
                .plan_modifier(Box::new(KeepUnconfiguredBlock))
                .attribute(
                    "availability_zone_count",
                    AttributeBuilder::number("availability_zone_count")
                        .description("Number of Availability Zones for the domain to use")
                        .validator(Box::new(NumberOneOfValidator {
                            values: vec![2.0, 3.0],
                        }))
                        .default(StaticDefault::number(2.0)),
                ),
        )
}

fn cognito_options_block() -> BlockBuilder {
    BlockBuilder::list("cognito_options")
        .max_items(1)
        .description("Amazon Cognito authentication for Kibana")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .attribute(
            "enabled",
            AttributeBuilder::bool("enabled")
                .description("Whether Amazon Cognito authentication with Kibana is enabled")
                .default(StaticDefault::bool(false)),
        )
        .attribute(
            "user_pool_id",
            AttributeBuilder::string("user_pool_id")
                .required()
                .description("ID of the Cognito User Pool to use"),
        )
        .attribute(
            "identity_pool_id",
            AttributeBuilder::string("identity_pool_id")
                .required()
                .description("ID of the Cognito Identity Pool to use"),
        )
        .attribute(
            "role_arn",
            AttributeBuilder::string("role_arn")
                .required()
                .description("ARN of the IAM role that has the AmazonESCognitoAccess policy attached")
                .validator(Box::new(ArnValidator)),
        )
}

fn domain_endpoint_options_block() -> BlockBuilder {
    BlockBuilder::list("domain_endpoint_options")
        .max_items(1)
        .description("Domain endpoint HTTP(S) related options")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .attribute(
            "enforce_https",
            AttributeBuilder::bool("enforce_https")
                .description("Whether or not to require HTTPS")
                .default(StaticDefault::bool(true)),
        )
        .attribute(
            "tls_security_policy",
            AttributeBuilder::string("tls_security_policy")
                .optional()
                .computed()
                .description("Name of the TLS security policy that needs to be applied to the HTTPS endpoint")
                .validator(one_of(&TLS_POLICIES)),
        )
        .attribute(
            "custom_endpoint_enabled",
            AttributeBuilder::bool("custom_endpoint_enabled")
                .description("Whether to enable custom endpoint for the Elasticsearch domain")
                .default(StaticDefault::bool(false)),
        )
        .attribute(
            "custom_endpoint",
            AttributeBuilder::string("custom_endpoint")
                .optional()
                .description("Fully qualified domain for your custom endpoint"),
        )
        .attribute(
            "custom_endpoint_certificate_arn",
            AttributeBuilder::string("custom_endpoint_certificate_arn")
                .optional()
                .description("ACM certificate ARN for your custom endpoint")
                .validator(Box::new(ArnValidator)),
        )
}

fn ebs_options_block() -> BlockBuilder {
    BlockBuilder::list("ebs_options")
        .max_items(1)
        .description("EBS related options")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .attribute(
            "ebs_enabled",
            AttributeBuilder::bool("ebs_enabled")
                .required()
                .description("Whether EBS volumes are attached to data nodes in the domain"),
        )
        .attribute(
            "iops",
            AttributeBuilder::number("iops")
                .optional()
                .computed()
                .description("Baseline input/output (I/O) performance of EBS volumes attached to data nodes"),
        )
        .attribute(
            "throughput",
            AttributeBuilder::number("throughput")
                .optional()
                .computed()
                .description("Throughput (in MiB/s) of the EBS volumes attached to data nodes. Applicable only for the gp3 volume type")
                .validator(Box::new(NumberRangeValidator::at_least(125.0))),
        )
        .attribute(
            "volume_size",
            AttributeBuilder::number("volume_size")
                .optional()
                .description("Size of EBS volumes attached to data nodes (in GiB)"),
        )
        .attribute(
            "volume_type",
            AttributeBuilder::string("volume_type")
                .optional()
                .computed()
                .description("Type of EBS volumes attached to data nodes")
                .validator(one_of(&["standard", "gp2", "io1", "gp3"])),
        )
}

fn encrypt_at_rest_block() -> BlockBuilder {
    BlockBuilder::list("encrypt_at_rest")
        .max_items(1)
        .description("Encrypt at rest options")
        .plan_modifier(Box::new(KeepUnconfiguredBlock))
        .attribute(
            "enabled",
            AttributeBuilder::bool("enabled")
                .required()
                .description("Whether to enable encryption at rest"),
        )
        .attribute(
            "kms_key_id",
            AttributeBuilder::string("kms_key_id")
                .optional()
                .computed()
                .description("KMS key id to encrypt the Elasticsearch domain with")
                .plan_modifier(Box::new(SuppressEquivalent::new(equivalent_kms_key_ids)))
                .plan_modifier(Box::new(RequiresReplaceIfChanged)),
        )
}

fn log_publishing_options_block() -> BlockBuilder {
    BlockBuilder::set("log_publishing_options")
        .description("Options for publishing slow and application logs to CloudWatch Logs")
        .attribute(
            "cloudwatch_log_group_arn",
            AttributeBuilder::string("cloudwatch_log_group_arn")
                .required()
                .description("ARN of the Cloudwatch log group to which log needs to be published")
                .validator(Box::new(ArnValidator)),
        )
        .attribute(
            "enabled",
            AttributeBuilder::bool("enabled")
                .description("Whether given log publishing option is enabled or not")
                .default(StaticDefault::bool(true)),
        )
        .attribute(
            "log_type",
            AttributeBuilder::string("log_type")
                .required()
                .description("Type of Elasticsearch log")
                .validator(one_of(&LOG_TYPES)),
        )
}

fn vpc_options_block() -> BlockBuilder {
    BlockBuilder::list("vpc_options")
        .max_items(1)
        .description("VPC related options. Adding or removing this block replaces the domain")
        .attribute(
            "availability_zones",
            AttributeBuilder::set("availability_zones", AttributeType::String)
                .computed()
                .description("Availability zones used by the domain")
                .plan_modifier(Box::new(UseStateForUnknown)),
        )
        .attribute(
            "security_group_ids",
            AttributeBuilder::set("security_group_ids", AttributeType::String)
                .optional()
                .description("List of VPC Security Group IDs to be applied to the domain endpoints"),
        )
        .attribute(
            "subnet_ids",
            AttributeBuilder::set("subnet_ids", AttributeType::String)
                .optional()
                .description("List of VPC Subnet IDs for the domain endpoints to be created in"),
        )
        .attribute(
            "vpc_id",
            AttributeBuilder::string("vpc_id")
                .computed()
                .description("VPC used by the domain")
                .plan_modifier(Box::new(UseStateForUnknown)),
        )
}

/// The API takes a short KMS key id but reports the key ARN
fn equivalent_kms_key_ids(old: &Dynamic, new: &Dynamic) -> bool {
    match (old.as_string(), new.as_string()) {
        (Some(old), Some(new)) => old.contains(new.as_str()),
        _ => false,
    }
}

fn is_create_retryable(err: &ApiError) -> bool {
    CREATE_RETRYABLE
        .iter()
        .any(|(code, message)| err.message_contains(code, message))
}

#[async_trait]
impl ResourceV2 for DomainResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn modify_plan(&self, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut planned = request.planned_state.values;
        let mut requires_replace = Vec::new();

        if let Some(data) = &self.provider_data {
            tags::plan_tags_all(&mut planned, &data.default_tags);
        }

        if let Some(prior) = &request.prior_state {
            let prior = &prior.values;
            let version = planned.string("elasticsearch_version").unwrap_or_default();

            if let (Some(data), Some(old)) = (&self.provider_data, prior.string("elasticsearch_version")) {
                let known = planned
                    .get("elasticsearch_version")
                    .map(Dynamic::is_known)
                    .unwrap_or(false);
                if known && old != version {
                    let name = prior.string("domain_name").unwrap_or_default();
                    if upgrade_requires_replacement(&data.client, &name, &version).await {
                        requires_replace.push("elasticsearch_version".to_string());
                    }
                }
            }

            for block in ["encrypt_at_rest", "node_to_node_encryption"] {
                if encryption_requires_replacement(prior, &planned, block, &version) {
                    requires_replace.push(block.to_string());
                }
            }

            if vpc_options_changed(prior, &planned) {
                requires_replace.push("vpc_options".to_string());
            }
        }

        ModifyPlanResponse {
            planned_state: State::from_values(planned),
            requires_replace,
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
        let name = values.string("domain_name").unwrap_or_default();
        let api = data.client.elasticsearch();

        // the API upserts, so an existing domain would be silently adopted
        match api.find_domain(&name).await {
            Ok(Some(_)) => {
                diagnostics.add_error(
                    format!("Elasticsearch Domain ({}) already exists", name),
                    None::<String>,
                );
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
            Ok(None) => {}
            Err(e) => debug!("Unable to check for existing Elasticsearch Domain {}: {}", name, e),
        }

        let input = match expand_create_request(&values, &name, &data.default_tags) {
            Ok(input) => input,
            Err(e) => {
                diagnostics.add_error(e, None::<String>);
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };

        let created = retry_when(
            &request.context,
            PROPAGATION_TIMEOUT,
            || api.create_domain(&input),
            is_create_retryable,
        )
        .await;

        let status = match created {
            Ok(status) => status,
            Err(e) => {
                diagnostics.add_error(
                    format!("creating Elasticsearch Domain ({}): {}", name, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: State::new(),
                    diagnostics,
                };
            }
        };

        let id = status.arn.clone();
        values.insert("id".to_string(), Dynamic::string(&id));

        if let Err(e) = wait_domain(&request.context, &data.client, &name, "Creating", timeouts.create).await {
            diagnostics.add_error(
                format!("waiting for Elasticsearch Domain ({}) create: {}", id, e),
                None::<String>,
            );
            return CreateResponse {
                state: applied_state(values),
                diagnostics,
            };
        }

        if let Some(auto_tune) = values.block("auto_tune_options") {
            let input = UpdateDomainConfigRequest {
                auto_tune_options: Some(expand_auto_tune_options(auto_tune, true)),
                ..Default::default()
            };
            if let Err(e) = api.update_domain_config(&name, &input).await {
                diagnostics.add_error(
                    format!("updating Elasticsearch Domain ({}) Config: {}", id, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: applied_state(values),
                    diagnostics,
                };
            }
            if let Err(e) = wait_domain(&request.context, &data.client, &name, "Modifying", timeouts.create).await {
                diagnostics.add_error(
                    format!("waiting for Elasticsearch Domain ({}) Config update: {}", id, e),
                    None::<String>,
                );
                return CreateResponse {
                    state: applied_state(values),
                    diagnostics,
                };
            }
        }

        match read_domain(data, &name, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => diagnostics.add_error(
                format!("reading Elasticsearch Domain ({}): not found after creation", id),
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

        let prior = request.current_state.values.clone();
        let name = prior.string("domain_name").unwrap_or_default();

        match read_domain(data, &name, &prior).await {
            Ok(Some(values)) => ReadResponse {
                state: Some(State::from_values(values)),
                diagnostics,
            },
            Ok(None) => {
                warn!(
                    "Elasticsearch Domain ({}) not found, removing from state",
                    prior.string("id").unwrap_or(name)
                );
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
        let timeouts = TIMEOUTS.resolve(&values);
        let name = values.string("domain_name").unwrap_or_default();
        let id = prior.string("id").unwrap_or_else(|| name.clone());
        let api = data.client.elasticsearch();

        let fail = |diagnostics: &mut Diagnostics, message: String| {
            diagnostics.add_error(message, None::<String>);
        };

        let config_changed = prior
            .keys()
            .chain(values.keys())
            .filter(|key| !matches!(key.as_str(), "tags" | "tags_all" | "timeouts"))
            .any(|key| flex::has_change(&prior, &values, key));

        if config_changed {
            let input = match expand_update_request(&prior, &values) {
                Ok(input) => input,
                Err(e) => {
                    fail(&mut diagnostics, e);
                    return UpdateResponse {
                        state: State::from_values(prior),
                        diagnostics,
                    };
                }
            };

            if !input.is_empty() {
                if let Err(e) = api.update_domain_config(&name, &input).await {
                    fail(
                        &mut diagnostics,
                        format!("updating Elasticsearch Domain ({}) Config: {}", id, e),
                    );
                    return UpdateResponse {
                        state: State::from_values(prior),
                        diagnostics,
                    };
                }
                if let Err(e) = wait_domain(&request.context, &data.client, &name, "Modifying", timeouts.update).await {
                    fail(
                        &mut diagnostics,
                        format!("waiting for Elasticsearch Domain ({}) Config update: {}", id, e),
                    );
                    return UpdateResponse {
                        state: State::from_values(prior),
                        diagnostics,
                    };
                }
            }

            if flex::has_change(&prior, &values, "elasticsearch_version") {
                let version = values.string("elasticsearch_version").unwrap_or_default();
                if let Err(e) = api.upgrade_domain(&name, &version).await {
                    fail(
                        &mut diagnostics,
                        format!("upgrading Elasticsearch Domain ({}): {}", id, e),
                    );
                    return UpdateResponse {
                        state: State::from_values(prior),
                        diagnostics,
                    };
                }
                if let Err(e) = wait_upgrade(&request.context, &data.client, &name, timeouts.update).await {
                    fail(
                        &mut diagnostics,
                        format!("waiting for Elasticsearch Domain ({}) upgrade: {}", id, e),
                    );
                    return UpdateResponse {
                        state: State::from_values(prior),
                        diagnostics,
                    };
                }
            }
        }

        let diff = tags::update_diff(&prior, &values, &data.default_tags);
        if !diff.is_empty() {
            let arn = prior.string("arn").unwrap_or_else(|| id.clone());
            let mut result = Ok(());
            if !diff.remove.is_empty() {
                result = api.remove_tags(&arn, &diff.remove).await;
            }
            if result.is_ok() && !diff.upsert.is_empty() {
                result = api.add_tags(&arn, &diff.upsert).await;
            }
            if let Err(e) = result {
                fail(
                    &mut diagnostics,
                    format!("updating tags for Elasticsearch Domain ({}): {}", id, e),
                );
                return UpdateResponse {
                    state: State::from_values(prior),
                    diagnostics,
                };
            }
        }

        match read_domain(data, &name, &values).await {
            Ok(Some(read)) => values = read,
            Ok(None) => fail(
                &mut diagnostics,
                format!("reading Elasticsearch Domain ({}): not found after update", id),
            ),
            Err(e) => fail(&mut diagnostics, e),
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
        let name = values.string("domain_name").unwrap_or_default();
        let id = values.string("id").unwrap_or_else(|| name.clone());
        let timeouts = TIMEOUTS.resolve(values);

        debug!("Deleting Elasticsearch Domain: {}", id);
        match data.client.elasticsearch().delete_domain(&name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResponse { diagnostics },
            Err(e) => {
                diagnostics.add_error(
                    format!("deleting Elasticsearch Domain ({}): {}", id, e),
                    None::<String>,
                );
                return DeleteResponse { diagnostics };
            }
        }

        if let Err(e) = wait_domain(&request.context, &data.client, &name, "Deleting", timeouts.delete).await {
            diagnostics.add_error(
                format!("waiting for Elasticsearch Domain ({}) delete: {}", id, e),
                None::<String>,
            );
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        let mut diagnostics = Diagnostics::new();
        let Some(data) = configured(&self.provider_data, &mut diagnostics) else {
            return ImportStateResponse {
                state: None,
                diagnostics,
            };
        };

        let name = request.id.trim();
        match data.client.elasticsearch().find_domain(name).await {
            Ok(Some(status)) => {
                let mut state = State::new();
                state.set("id", status.arn);
                state.set("domain_name", status.domain_name);
                ImportStateResponse {
                    state: Some(state),
                    diagnostics,
                }
            }
            Ok(None) => {
                diagnostics.add_error(
                    format!("importing Elasticsearch Domain ({}): couldn't find resource", name),
                    None::<String>,
                );
                ImportStateResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error(
                    format!("importing Elasticsearch Domain ({}): {}", name, e),
                    None::<String>,
                );
                ImportStateResponse {
                    state: None,
                    diagnostics,
                }
            }
        }
    }
}

/// Whether moving to `version` needs a new domain rather than an in-place
/// upgrade. Lookup failures leave the decision to the upgrade itself.
async fn upgrade_requires_replacement(client: &Client, name: &str, version: &str) -> bool {
    match client.elasticsearch().compatible_versions(name).await {
        Err(e) => {
            error!("Failed to get compatible Elasticsearch versions {}: {}", name, e);
            false
        }
        Ok(versions) if versions.len() != 1 => true,
        Ok(versions) => !versions[0].target_versions.iter().any(|v| v == version),
    }
}

/// Encryption can never be turned off in place, and can only be turned on in
/// place from version 6.7
fn encryption_requires_replacement(prior: &Object, planned: &Object, block: &str, version: &str) -> bool {
    let enabled = |values: &Object| {
        values
            .block(block)
            .and_then(|b| b.bool("enabled"))
            .unwrap_or(false)
    };
    let known = planned
        .block(block)
        .map(|b| b.get("enabled").map(Dynamic::is_known).unwrap_or(true))
        .unwrap_or(true);

    let (old, new) = (enabled(prior), enabled(planned));
    if !known || old == new {
        return false;
    }
    if old && !new {
        return true;
    }
    !plan::version_at_least(version, IN_PLACE_ENCRYPTION_VERSION)
}

/// Any change to `vpc_options` other than its computed attributes
fn vpc_options_changed(prior: &Object, planned: &Object) -> bool {
    let (before, after) = (prior.block("vpc_options"), planned.block("vpc_options"));
    match (before, after) {
        (None, None) => false,
        (Some(_), None) | (None, Some(_)) => true,
        (Some(before), Some(after)) => ["security_group_ids", "subnet_ids"].iter().any(|key| {
            after.get(*key).map(Dynamic::is_known).unwrap_or(true)
                && flex::has_change(before, after, key)
        }),
    }
}

/// Waits for the domain to leave `pending`. Deleting has no target; the
/// domain disappearing completes the wait.
async fn wait_domain(
    ctx: &Context,
    client: &Client,
    name: &str,
    pending: &str,
    timeout: Duration,
) -> Result<Option<DomainStatus>, RetryError> {
    let target: &[&str] = if pending == "Deleting" { &[] } else { &["Active"] };
    wait_for(ctx, StateChangeConf::new(&[pending], target, timeout), || async move {
        not_found_as_none(client.elasticsearch().describe_domain(name).await)
    })
    .await
}

async fn wait_upgrade(
    ctx: &Context,
    client: &Client,
    name: &str,
    timeout: Duration,
) -> Result<Option<UpgradeStatus>, RetryError> {
    let conf = StateChangeConf::new(
        &["IN_PROGRESS"],
        &["SUCCEEDED", "SUCCEEDED_WITH_ISSUES"],
        timeout,
    )
    .min_timeout(Duration::from_secs(10))
    .delay(Duration::from_secs(30));

    wait_for(ctx, conf, || async move {
        not_found_as_none(client.elasticsearch().upgrade_status(name).await)
    })
    .await
}

/// Reads the domain into a copy of `prior`, or `None` when it no longer exists
pub(crate) async fn read_domain(data: &AwsProviderData, name: &str, prior: &Object) -> Result<Option<Object>, String> {
    let id = prior.string("id").unwrap_or_else(|| name.to_string());
    let api = data.client.elasticsearch();

    let status = match api.find_domain(name).await {
        Ok(Some(status)) => status,
        Ok(None) => return Ok(None),
        Err(e) => return Err(format!("reading Elasticsearch Domain ({}): {}", id, e)),
    };
    let config = api
        .describe_domain_config(name)
        .await
        .map_err(|e| format!("reading Elasticsearch Domain ({}) config: {}", id, e))?;
    let tag_list = api
        .list_tags(&status.arn)
        .await
        .map_err(|e| format!("listing tags for Elasticsearch Domain ({}): {}", id, e))?;

    let mut values = prior.clone();
    flatten_domain(&status, &config, &mut values)?;
    flex::settle_zero_values(prior, &mut values);
    tags::set_state(&mut values, tags::from_api(tag_list), &data.default_tags);
    Ok(Some(values))
}

fn flatten_domain(status: &DomainStatus, config: &DomainConfig, values: &mut Object) -> Result<(), String> {
    let prior = values.clone();
    let id = prior.string("id").unwrap_or_else(|| status.arn.clone());

    values.insert("id".to_string(), Dynamic::string(&status.arn));

    if let Some(policies) = status.access_policies.as_deref().filter(|p| !p.is_empty()) {
        let keep = prior
            .string("access_policies")
            .filter(|old| flex::policies_equivalent(old, policies));
        let policies = match keep {
            Some(old) => old,
            None => flex::normalize_json(policies)
                .map_err(|e| format!("reading Elasticsearch Domain ({}) access policies: {}", id, e))?,
        };
        values.insert("access_policies".to_string(), Dynamic::String(policies));
    }

    let mut advanced_options = status.advanced_options.clone().unwrap_or_default();
    let configured_options = prior.string_map("advanced_options");
    for (key, default) in DEFAULT_ADVANCED_OPTIONS {
        if advanced_options.get(key).map(String::as_str) == Some(default)
            && !configured_options.contains_key(key)
        {
            advanced_options.remove(key);
        }
    }
    values.insert("advanced_options".to_string(), flex::string_map(&advanced_options));

    if let Some(security) = &status.advanced_security_options {
        let prior_security = prior.block("advanced_security_options");
        let enabled = security.enabled.unwrap_or(false);
        let internal_user_database = if enabled {
            Dynamic::from(security.internal_user_database_enabled.unwrap_or(false))
        } else {
            prior_security
                .and_then(|b| b.get("internal_user_database_enabled"))
                .cloned()
                .unwrap_or(Dynamic::Bool(false))
        };
        // master user credentials are write-only
        let master_user_options = prior_security
            .and_then(|b| b.get("master_user_options"))
            .cloned()
            .unwrap_or(Dynamic::List(vec![]));
        values.insert(
            "advanced_security_options".to_string(),
            flex::block(Some(object([
                ("enabled", Dynamic::Bool(enabled)),
                ("internal_user_database_enabled", internal_user_database),
                ("master_user_options", master_user_options),
            ]))),
        );
    }

    values.insert("arn".to_string(), Dynamic::string(&status.arn));

    if let Some(auto_tune) = config.auto_tune_options.as_ref().and_then(|o| o.options.as_ref()) {
        values.insert(
            "auto_tune_options".to_string(),
            flex::block(Some(flatten_auto_tune_options(auto_tune))),
        );
    }

    let prior_cluster = prior.block("cluster_config");
    values.insert(
        "cluster_config".to_string(),
        flex::block(Some(flatten_cluster_config(
            status.elasticsearch_cluster_config.as_ref().cloned().unwrap_or_default(),
            prior_cluster,
        ))),
    );

    values.insert(
        "cognito_options".to_string(),
        flex::block(Some(flatten_cognito_options(status.cognito_options.as_ref()))),
    );

    values.insert(
        "domain_endpoint_options".to_string(),
        flex::block(
            status
                .domain_endpoint_options
                .as_ref()
                .map(|o| flatten_domain_endpoint_options(o, prior.block("domain_endpoint_options"))),
        ),
    );

    values.insert("domain_id".to_string(), Dynamic::string(&status.domain_id));
    values.insert("domain_name".to_string(), Dynamic::string(&status.domain_name));

    values.insert(
        "ebs_options".to_string(),
        flex::block(status.ebs_options.as_ref().map(flatten_ebs_options)),
    );

    values.insert(
        "elasticsearch_version".to_string(),
        Dynamic::from(status.elasticsearch_version.clone()),
    );

    values.insert(
        "encrypt_at_rest".to_string(),
        flex::block(status.encryption_at_rest_options.as_ref().map(|o| {
            object([
                ("enabled", Dynamic::from(o.enabled.unwrap_or(false))),
                ("kms_key_id", Dynamic::from(o.kms_key_id.clone())),
            ])
        })),
    );

    values.insert(
        "log_publishing_options".to_string(),
        flatten_log_publishing_options(status.log_publishing_options.as_ref()),
    );

    values.insert(
        "node_to_node_encryption".to_string(),
        flex::block(
            status
                .node_to_node_encryption_options
                .as_ref()
                .map(|o| object([("enabled", Dynamic::from(o.enabled))])),
        ),
    );

    values.insert(
        "snapshot_options".to_string(),
        flex::block(status.snapshot_options.as_ref().map(|o| {
            object([(
                "automated_snapshot_start_hour",
                Dynamic::from(o.automated_snapshot_start_hour.unwrap_or(0)),
            )])
        })),
    );

    match &status.vpc_options {
        Some(vpc) => {
            values.insert(
                "vpc_options".to_string(),
                flex::block(Some(object([
                    ("availability_zones", flex::string_set(&vpc.availability_zones)),
                    ("security_group_ids", flex::string_set(&vpc.security_group_ids)),
                    ("subnet_ids", flex::string_set(&vpc.subnet_ids)),
                    ("vpc_id", Dynamic::from(vpc.vpc_id.clone())),
                ]))),
            );

            let endpoint = status
                .endpoints
                .as_ref()
                .and_then(|e| e.get("vpc"))
                .cloned()
                .unwrap_or_default();
            values.insert("kibana_endpoint".to_string(), Dynamic::String(kibana_endpoint(&endpoint)));
            values.insert("endpoint".to_string(), Dynamic::String(endpoint));
            if status.endpoint.is_some() {
                return Err(format!(
                    "{:?}: Elasticsearch domain in VPC expected to have null Endpoint value",
                    id
                ));
            }
        }
        None => {
            if let Some(endpoint) = &status.endpoint {
                values.insert("endpoint".to_string(), Dynamic::string(endpoint));
                values.insert("kibana_endpoint".to_string(), Dynamic::String(kibana_endpoint(endpoint)));
            }
            if status.endpoints.is_some() {
                return Err(format!(
                    "{:?}: Elasticsearch domain not in VPC expected to have null Endpoints value",
                    id
                ));
            }
        }
    }

    Ok(())
}

fn kibana_endpoint(endpoint: &str) -> String {
    format!("{}/_plugin/kibana/", endpoint)
}

fn flatten_auto_tune_options(options: &AutoTuneOptions) -> Object {
    let schedules = options
        .maintenance_schedules
        .iter()
        .flatten()
        .map(|schedule| {
            let duration = schedule.duration.as_ref().map(|d| {
                object([
                    ("value", Dynamic::from(d.value)),
                    ("unit", Dynamic::from(d.unit.clone())),
                ])
            });
            object([
                ("start_at", flex::timestamp(schedule.start_at)),
                ("duration", flex::block(duration)),
                (
                    "cron_expression_for_recurrence",
                    Dynamic::from(schedule.cron_expression_for_recurrence.clone()),
                ),
            ])
        })
        .collect();

    object([
        ("desired_state", Dynamic::from(options.desired_state.clone())),
        ("rollback_on_disable", Dynamic::from(options.rollback_on_disable.clone())),
        ("maintenance_schedule", flex::blocks(schedules)),
    ])
}

/// Attributes that only apply while a feature is on keep their configured
/// values while it is off
fn flatten_cluster_config(config: ClusterConfig, prior: Option<&Object>) -> Object {
    let from_prior = |key: &str| {
        prior
            .and_then(|p| p.get(key))
            .cloned()
            .unwrap_or_default()
    };
    let dedicated_master = config.dedicated_master_enabled.unwrap_or(false);

    let mut values = object([
        ("instance_type", Dynamic::from(config.instance_type)),
        ("instance_count", Dynamic::from(config.instance_count)),
        ("dedicated_master_enabled", Dynamic::from(config.dedicated_master_enabled)),
        ("zone_awareness_enabled", Dynamic::Bool(config.zone_awareness_enabled.unwrap_or(false))),
        (
            "zone_awareness_config",
            flex::block(config.zone_awareness_config.map(|z| {
                object([(
                    "availability_zone_count",
                    Dynamic::from(z.availability_zone_count.unwrap_or(0)),
                )])
            })),
        ),
        ("warm_enabled", Dynamic::from(config.warm_enabled)),
        ("warm_count", Dynamic::from(config.warm_count)),
        ("warm_type", Dynamic::String(config.warm_type.unwrap_or_default())),
        (
            "cold_storage_options",
            flex::block(
                config
                    .cold_storage_options
                    .map(|c| object([("enabled", Dynamic::Bool(c.enabled.unwrap_or(false)))])),
            ),
        ),
    ]);

    if dedicated_master {
        values.insert("dedicated_master_count".to_string(), Dynamic::from(config.dedicated_master_count));
        values.insert(
            "dedicated_master_type".to_string(),
            Dynamic::String(config.dedicated_master_type.unwrap_or_default()),
        );
    } else {
        values.insert("dedicated_master_count".to_string(), from_prior("dedicated_master_count"));
        values.insert("dedicated_master_type".to_string(), from_prior("dedicated_master_type"));
    }

    values
}

fn flatten_cognito_options(options: Option<&CognitoOptions>) -> Object {
    let options = options.cloned().unwrap_or_default();
    object([
        ("enabled", Dynamic::Bool(options.enabled.unwrap_or(false))),
        ("user_pool_id", Dynamic::String(options.user_pool_id.unwrap_or_default())),
        ("identity_pool_id", Dynamic::String(options.identity_pool_id.unwrap_or_default())),
        ("role_arn", Dynamic::String(options.role_arn.unwrap_or_default())),
    ])
}

fn flatten_domain_endpoint_options(options: &DomainEndpointOptions, prior: Option<&Object>) -> Object {
    let custom = options.custom_endpoint_enabled.unwrap_or(false);
    let mut values = object([
        ("enforce_https", Dynamic::Bool(options.enforce_https.unwrap_or(false))),
        ("tls_security_policy", Dynamic::from(options.tls_security_policy.clone())),
        ("custom_endpoint_enabled", Dynamic::Bool(custom)),
    ]);
    for (key, value) in [
        ("custom_endpoint", &options.custom_endpoint),
        ("custom_endpoint_certificate_arn", &options.custom_endpoint_certificate_arn),
    ] {
        let value = if custom {
            Dynamic::from(value.clone())
        } else {
            prior.and_then(|p| p.get(key)).cloned().unwrap_or_default()
        };
        values.insert(key.to_string(), value);
    }
    values
}

fn flatten_ebs_options(options: &EbsOptions) -> Object {
    let enabled = options.ebs_enabled.unwrap_or(false);
    let mut values = object([("ebs_enabled", Dynamic::Bool(enabled))]);
    if enabled {
        values.insert("iops".to_string(), Dynamic::from(options.iops.unwrap_or(0)));
        values.insert("throughput".to_string(), Dynamic::from(options.throughput.unwrap_or(0)));
        values.insert("volume_size".to_string(), Dynamic::from(options.volume_size.unwrap_or(0)));
        values.insert("volume_type".to_string(), Dynamic::from(options.volume_type.clone()));
    }
    values
}

fn flatten_log_publishing_options(options: Option<&HashMap<String, LogPublishingOption>>) -> Dynamic {
    let mut entries: Vec<(&String, &LogPublishingOption)> = options.into_iter().flatten().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    flex::blocks(
        entries
            .into_iter()
            .map(|(log_type, option)| {
                object([
                    ("log_type", Dynamic::string(log_type)),
                    (
                        "cloudwatch_log_group_arn",
                        Dynamic::String(option.cloud_watch_logs_log_group_arn.clone().unwrap_or_default()),
                    ),
                    ("enabled", Dynamic::Bool(option.enabled.unwrap_or(false))),
                ])
            })
            .collect(),
    )
}

fn expand_create_request(
    values: &Object,
    name: &str,
    default_tags: &HashMap<String, String>,
) -> Result<CreateDomainRequest, String> {
    let access_policies = values
        .string("access_policies")
        .map(|p| flex::normalize_json(&p))
        .transpose()
        .map_err(|e| format!("access_policies is not valid JSON: {}", e))?;

    Ok(CreateDomainRequest {
        domain_name: name.to_string(),
        elasticsearch_version: values.string("elasticsearch_version").unwrap_or_default(),
        access_policies,
        advanced_options: Some(values.string_map("advanced_options")).filter(|m| !m.is_empty()),
        advanced_security_options: values
            .block("advanced_security_options")
            .map(expand_advanced_security_options),
        auto_tune_options: values
            .block("auto_tune_options")
            .map(|b| expand_auto_tune_options(b, false)),
        elasticsearch_cluster_config: values.block("cluster_config").map(expand_cluster_config),
        ebs_options: values.block("ebs_options").map(expand_ebs_options),
        snapshot_options: values.block("snapshot_options").map(expand_snapshot_options),
        vpc_options: values.block("vpc_options").map(expand_vpc_options),
        cognito_options: values
            .block("cognito_options")
            .map(|b| expand_cognito_options(Some(b))),
        encryption_at_rest_options: values.block("encrypt_at_rest").map(expand_encrypt_at_rest),
        node_to_node_encryption_options: values
            .block("node_to_node_encryption")
            .map(expand_node_to_node_encryption),
        log_publishing_options: Some(expand_log_publishing_options(values)).filter(|m| !m.is_empty()),
        domain_endpoint_options: values
            .block("domain_endpoint_options")
            .map(expand_domain_endpoint_options),
        tag_list: tags::create_tags(values, default_tags),
    })
}

/// Config changes for the fields that differ between `prior` and `planned`
fn expand_update_request(prior: &Object, planned: &Object) -> Result<UpdateDomainConfigRequest, String> {
    let changed = |key: &str| flex::has_change(prior, planned, key);
    let mut input = UpdateDomainConfigRequest::default();

    if changed("access_policies") {
        let old = prior.string("access_policies").unwrap_or_default();
        let new = planned.string("access_policies").unwrap_or_default();
        if !flex::policies_equivalent(&old, &new) {
            input.access_policies = Some(new);
        }
    }

    if changed("advanced_options") {
        input.advanced_options = Some(planned.string_map("advanced_options"));
    }

    if changed("advanced_security_options") {
        input.advanced_security_options = planned
            .block("advanced_security_options")
            .map(expand_advanced_security_options);
    }

    if changed("auto_tune_options") {
        input.auto_tune_options = planned
            .block("auto_tune_options")
            .map(|b| expand_auto_tune_options(b, true));
    }

    if changed("domain_endpoint_options") {
        input.domain_endpoint_options = planned
            .block("domain_endpoint_options")
            .map(expand_domain_endpoint_options);
    }

    if changed("ebs_options") || changed("cluster_config") {
        input.ebs_options = planned.block("ebs_options").map(expand_ebs_options);

        if changed("cluster_config") {
            input.elasticsearch_cluster_config = planned.block("cluster_config").map(|b| {
                let mut config = expand_cluster_config(b);
                let version = planned.string("elasticsearch_version").unwrap_or_default();
                if plan::version_below(&version, COLD_STORAGE_VERSION) {
                    config.cold_storage_options = None;
                }
                config
            });
        }
    }

    if changed("encrypt_at_rest") {
        input.encryption_at_rest_options = planned.block("encrypt_at_rest").map(expand_encrypt_at_rest);
    }

    if changed("node_to_node_encryption") {
        input.node_to_node_encryption_options = planned
            .block("node_to_node_encryption")
            .map(expand_node_to_node_encryption);
    }

    if changed("snapshot_options") {
        input.snapshot_options = planned.block("snapshot_options").map(expand_snapshot_options);
    }

    if changed("vpc_options") {
        input.vpc_options = planned.block("vpc_options").map(expand_vpc_options);
    }

    if changed("cognito_options") {
        input.cognito_options = Some(expand_cognito_options(planned.block("cognito_options")));
    }

    if changed("log_publishing_options") {
        input.log_publishing_options = Some(expand_log_publishing_options(planned));
    }

    Ok(input)
}

fn expand_advanced_security_options(block: &Object) -> AdvancedSecurityOptions {
    let enabled = block.bool("enabled").unwrap_or(false);
    let mut options = AdvancedSecurityOptions {
        enabled: Some(enabled),
        ..Default::default()
    };
    if enabled {
        options.internal_user_database_enabled = block.bool("internal_user_database_enabled");
        options.master_user_options = block.block("master_user_options").map(|m| MasterUserOptions {
            master_user_arn: m.string("master_user_arn"),
            master_user_name: m.string("master_user_name"),
            master_user_password: m.string("master_user_password"),
        });
    }
    options
}

/// Rollback only applies when changing an existing domain
fn expand_auto_tune_options(block: &Object, with_rollback: bool) -> AutoTuneOptions {
    let schedules = block
        .blocks("maintenance_schedule")
        .into_iter()
        .map(|schedule| MaintenanceSchedule {
            start_at: schedule
                .string("start_at")
                .and_then(|s| flex::epoch_seconds(&s)),
            duration: schedule.block("duration").map(|d| MaintenanceDuration {
                value: d.int("value"),
                unit: d.string("unit"),
            }),
            cron_expression_for_recurrence: schedule.string("cron_expression_for_recurrence"),
        })
        .collect();

    AutoTuneOptions {
        desired_state: block.string("desired_state"),
        rollback_on_disable: if with_rollback {
            block.string("rollback_on_disable")
        } else {
            None
        },
        maintenance_schedules: Some(schedules),
    }
}

fn expand_cluster_config(block: &Object) -> ClusterConfig {
    let mut config = ClusterConfig {
        instance_type: block.string("instance_type"),
        instance_count: block.int("instance_count"),
        cold_storage_options: block.block("cold_storage_options").map(|c| ColdStorageOptions {
            enabled: c.bool("enabled"),
        }),
        ..Default::default()
    };

    if let Some(enabled) = block.bool("dedicated_master_enabled") {
        config.dedicated_master_enabled = Some(enabled);
        if enabled {
            config.dedicated_master_count = block.int("dedicated_master_count").filter(|c| *c > 0);
            config.dedicated_master_type = block.string("dedicated_master_type");
        }
    }

    if let Some(enabled) = block.bool("zone_awareness_enabled") {
        config.zone_awareness_enabled = Some(enabled);
        if enabled {
            config.zone_awareness_config = block.block("zone_awareness_config").map(|z| ZoneAwarenessConfig {
                availability_zone_count: z.int("availability_zone_count").filter(|c| *c > 0),
            });
        }
    }

    if let Some(enabled) = block.bool("warm_enabled") {
        config.warm_enabled = Some(enabled);
        if enabled {
            config.warm_count = block.int("warm_count");
            config.warm_type = block.string("warm_type");
        }
    }

    config
}

/// IOPS apply to gp3 and io1 volumes and throughput to gp3 only; sending
/// them for other types fails validation
fn expand_ebs_options(block: &Object) -> EbsOptions {
    let enabled = block.bool("ebs_enabled").unwrap_or(false);
    let mut options = EbsOptions {
        ebs_enabled: Some(enabled),
        ..Default::default()
    };
    if enabled {
        let volume_type = block.string("volume_type");
        let kind = volume_type.as_deref().unwrap_or_default();
        options.volume_size = block.int("volume_size").filter(|s| *s > 0);
        if matches!(kind, "gp3" | "io1") {
            options.iops = block.int("iops").filter(|i| *i > 0);
        }
        if kind == "gp3" {
            options.throughput = block.int("throughput").filter(|t| *t > 0);
        }
        options.volume_type = volume_type;
    }
    options
}

fn expand_snapshot_options(block: &Object) -> SnapshotOptions {
    SnapshotOptions {
        automated_snapshot_start_hour: block.int("automated_snapshot_start_hour"),
    }
}

fn expand_vpc_options(block: &Object) -> VpcOptions {
    VpcOptions {
        subnet_ids: flex::non_empty(block.strings("subnet_ids")),
        security_group_ids: flex::non_empty(block.strings("security_group_ids")),
    }
}

/// A missing block turns Cognito authentication off
fn expand_cognito_options(block: Option<&Object>) -> CognitoOptions {
    let Some(block) = block else {
        return CognitoOptions {
            enabled: Some(false),
            ..Default::default()
        };
    };
    let enabled = block.bool("enabled").unwrap_or(false);
    let mut options = CognitoOptions {
        enabled: Some(enabled),
        ..Default::default()
    };
    if enabled {
        options.user_pool_id = block.string("user_pool_id");
        options.identity_pool_id = block.string("identity_pool_id");
        options.role_arn = block.string("role_arn");
    }
    options
}

fn expand_encrypt_at_rest(block: &Object) -> EncryptionAtRestOptions {
    EncryptionAtRestOptions {
        enabled: block.bool("enabled"),
        kms_key_id: block.string("kms_key_id"),
    }
}

fn expand_node_to_node_encryption(block: &Object) -> NodeToNodeEncryptionOptions {
    NodeToNodeEncryptionOptions {
        enabled: block.bool("enabled"),
    }
}

fn expand_log_publishing_options(values: &Object) -> HashMap<String, LogPublishingOption> {
    values
        .blocks("log_publishing_options")
        .into_iter()
        .filter_map(|option| {
            let log_type = option.string("log_type")?;
            Some((
                log_type,
                LogPublishingOption {
                    cloud_watch_logs_log_group_arn: option.string("cloudwatch_log_group_arn"),
                    enabled: option.bool("enabled"),
                },
            ))
        })
        .collect()
}

fn expand_domain_endpoint_options(block: &Object) -> DomainEndpointOptions {
    let custom = block.bool("custom_endpoint_enabled").unwrap_or(false);
    let mut options = DomainEndpointOptions {
        enforce_https: block.bool("enforce_https"),
        tls_security_policy: block.string("tls_security_policy"),
        custom_endpoint_enabled: Some(custom),
        ..Default::default()
    };
    if custom {
        options.custom_endpoint = block.string("custom_endpoint");
        options.custom_endpoint_certificate_arn = block.string("custom_endpoint_certificate_arn");
    }
    options
}
