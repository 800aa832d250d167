//! Provider, resource and data source traits plus the schema model
//!
//! Providers are factories: the gRPC layer asks for a fresh resource or data
//! source per call, so implementations hold only cheap, cloneable handles to
//! the configured API client.

use crate::attribute_type::AttributeType;
use crate::defaults::Default as DefaultValue;
use crate::plan_modifier::PlanModifier;
use crate::request::{
    ConfigureRequest, ConfigureResponse, CreateRequest, CreateResponse, DataSourceSchemaResponse,
    DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse, ModifyPlanRequest,
    ModifyPlanResponse, ReadRequest, ReadResponse, ResourceSchemaResponse, SchemaRequest,
    UpdateRequest, UpdateResponse, ValidateRequest, ValidateResponse,
};
use crate::types::Diagnostics;
use crate::validator::Validator;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait ProviderV2: Send + Sync {
    /// Schema of the provider configuration block
    async fn schema(&self) -> ProviderSchema;

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse;

    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceV2>>;

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSourceV2>>;

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema>;

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema>;
}

#[async_trait]
pub trait ResourceV2: Send + Sync {
    async fn schema(&self, request: SchemaRequest) -> ResourceSchemaResponse;

    /// Cross-attribute validation beyond per-attribute validators
    async fn validate(&self, _request: ValidateRequest) -> ValidateResponse {
        ValidateResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    /// Resource-wide plan customization, run after attribute plan modifiers
    async fn modify_plan(&self, request: ModifyPlanRequest) -> ModifyPlanResponse {
        ModifyPlanResponse {
            planned_state: request.planned_state,
            requires_replace: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse;

    async fn read(&self, request: ReadRequest) -> ReadResponse;

    async fn update(&self, request: UpdateRequest) -> UpdateResponse;

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse;

    /// Builds the state Terraform reads right after `terraform import`
    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        crate::import::import_state_passthrough_id("id", &request)
    }
}

#[async_trait]
pub trait DataSourceV2: Send + Sync {
    async fn schema(&self, request: SchemaRequest) -> DataSourceSchemaResponse;

    async fn read(&self, request: ReadRequest) -> ReadResponse;
}

#[derive(Debug, Clone, Default)]
pub struct ResourceSchema {
    pub version: i64,
    pub attributes: HashMap<String, Attribute>,
    pub blocks: HashMap<String, NestedBlock>,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct DataSourceSchema {
    pub version: i64,
    pub attributes: HashMap<String, Attribute>,
    pub blocks: HashMap<String, NestedBlock>,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderSchema {
    pub version: i64,
    pub attributes: HashMap<String, Attribute>,
    pub blocks: HashMap<String, NestedBlock>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingMode {
    /// A single object, null when absent
    Single,
    /// An ordered list of objects
    List,
    /// An unordered set of objects
    Set,
}

#[derive(Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub attributes: HashMap<String, Attribute>,
    pub blocks: HashMap<String, NestedBlock>,
    pub nesting: NestingMode,
    pub min_items: i64,
    /// 0 means unlimited
    pub max_items: i64,
    pub description: String,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
}

impl std::fmt::Debug for NestedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedBlock")
            .field("type_name", &self.type_name)
            .field("attributes", &self.attributes)
            .field("blocks", &self.blocks)
            .field("nesting", &self.nesting)
            .field("min_items", &self.min_items)
            .field("max_items", &self.max_items)
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .finish()
    }
}

#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub deprecated: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn DefaultValue>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::builders::{AttributeBuilder, BlockBuilder, SchemaBuilder};
    use crate::context::Context;
    use crate::types::{Dynamic, State};

    struct NamedResource;

    #[async_trait]
    impl ResourceV2 for NamedResource {
        async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
            ResourceSchemaResponse {
                schema: SchemaBuilder::new()
                    .attribute("id", AttributeBuilder::string("id").computed())
                    .build_resource(0),
                diagnostics: Diagnostics::new(),
            }
        }

        async fn create(&self, request: CreateRequest) -> CreateResponse {
            CreateResponse {
                state: request.planned_state,
                diagnostics: Diagnostics::new(),
            }
        }

        async fn read(&self, request: ReadRequest) -> ReadResponse {
            ReadResponse {
                state: Some(request.current_state),
                diagnostics: Diagnostics::new(),
            }
        }

        async fn update(&self, request: UpdateRequest) -> UpdateResponse {
            UpdateResponse {
                state: request.planned_state,
                diagnostics: Diagnostics::new(),
            }
        }

        async fn delete(&self, _request: DeleteRequest) -> DeleteResponse {
            DeleteResponse {
                diagnostics: Diagnostics::new(),
            }
        }
    }

    #[tokio::test]
    async fn default_import_passes_id_through() {
        let response = NamedResource
            .import_state(ImportStateRequest {
                context: Context::new(),
                id: "my-domain".to_string(),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_string("id"), Some("my-domain".to_string()));
        assert!(!response.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn default_modify_plan_keeps_planned_state() {
        let mut planned = State::new();
        planned.set("id", Dynamic::Unknown);

        let response = NamedResource
            .modify_plan(ModifyPlanRequest {
                context: Context::new(),
                config: crate::types::Config::new(),
                prior_state: None,
                planned_state: planned.clone(),
            })
            .await;

        assert_eq!(response.planned_state, planned);
        assert!(response.requires_replace.is_empty());
    }

    #[test]
    fn attribute_clone_keeps_validators() {
        let attr = AttributeBuilder::string("name")
            .required()
            .validator(Box::new(crate::validator::StringLengthValidator::between(
                1, 10,
            )))
            .build();

        let cloned = attr.clone();
        assert_eq!(cloned.validators.len(), 1);
    }

    #[test]
    fn nested_block_debug_is_readable() {
        let block = BlockBuilder::list("ebs_options")
            .max_items(1)
            .attribute("ebs_enabled", AttributeBuilder::bool("ebs_enabled").required())
            .build();

        let rendered = format!("{:?}", block);
        assert!(rendered.contains("ebs_options"));
        assert!(rendered.contains("ebs_enabled"));
    }
}
