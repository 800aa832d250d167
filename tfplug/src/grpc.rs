//! gRPC service implementation for ProviderV2
//!
//! Implements the Terraform Plugin Protocol v6 on top of the factory-based
//! ProviderV2 traits: resources and data sources are created per call, values
//! are decoded from msgpack into `Dynamic`, and planning (defaults, computed
//! unknowns, plan modifiers) happens here before the resource sees the plan.

use crate::context::Context;
use crate::plan_modifier::PlanModifyRequest;
use crate::proto::{
    self, attribute_path, diagnostic, get_functions, get_metadata, get_provider_schema,
    get_resource_identity_schemas, import_resource_state, plan_resource_change,
    provider_server::Provider as ProtoProvider, read_data_source, read_resource, schema,
    stop_provider, upgrade_resource_state, validate_data_resource_config,
    validate_provider_config, validate_resource_config, apply_resource_change,
    configure_provider, ServerCapabilities, StringKind,
};
use crate::provider::{Attribute, NestedBlock, NestingMode, ProviderV2};
use crate::request::{
    ConfigureRequest, CreateRequest, DeleteRequest, ImportStateRequest, ModifyPlanRequest,
    ReadRequest, UpdateRequest, ValidateRequest,
};
use crate::types::{Config, Diagnostics, Dynamic, State};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

type Values = HashMap<String, Dynamic>;
type GrpcResult<T> = std::result::Result<Response<T>, Status>;

pub struct ProviderService<P: ProviderV2> {
    provider: Arc<RwLock<P>>,
    stop: Context,
}

impl<P: ProviderV2 + 'static> ProviderService<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            stop: Context::new(),
        }
    }

    async fn resource(&self, type_name: &str) -> std::result::Result<Box<dyn crate::provider::ResourceV2>, Status> {
        let provider = self.provider.read().await;
        provider.create_resource(type_name).await.map_err(|e| {
            Status::not_found(format!("Failed to create resource {}: {}", type_name, e))
        })
    }

    async fn resource_schema(
        &self,
        type_name: &str,
    ) -> std::result::Result<crate::provider::ResourceSchema, Status> {
        let provider = self.provider.read().await;
        provider
            .resource_schemas()
            .await
            .remove(type_name)
            .ok_or_else(|| Status::not_found(format!("Unknown resource type: {}", type_name)))
    }

    async fn data_source_schema(
        &self,
        type_name: &str,
    ) -> std::result::Result<crate::provider::DataSourceSchema, Status> {
        let provider = self.provider.read().await;
        provider
            .data_source_schemas()
            .await
            .remove(type_name)
            .ok_or_else(|| Status::not_found(format!("Unknown data source type: {}", type_name)))
    }
}

#[tonic::async_trait]
impl<P: ProviderV2 + 'static> ProtoProvider for ProviderService<P> {
    async fn get_metadata(
        &self,
        _request: Request<get_metadata::Request>,
    ) -> GrpcResult<get_metadata::Response> {
        let provider = self.provider.read().await;
        let mut resources: Vec<String> = provider.resource_schemas().await.into_keys().collect();
        let mut data_sources: Vec<String> =
            provider.data_source_schemas().await.into_keys().collect();
        resources.sort();
        data_sources.sort();

        Ok(Response::new(get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            data_sources: data_sources
                .into_iter()
                .map(|type_name| get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: resources
                .into_iter()
                .map(|type_name| get_metadata::ResourceMetadata { type_name })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<get_provider_schema::Request>,
    ) -> GrpcResult<get_provider_schema::Response> {
        let provider = self.provider.read().await;
        let provider_schema = provider.schema().await;
        let resource_schemas = provider.resource_schemas().await;
        let data_source_schemas = provider.data_source_schemas().await;

        let resource_schemas = resource_schemas
            .into_iter()
            .map(|(name, s)| {
                let schema = schema_to_proto(s.version, &s.description, &s.attributes, &s.blocks);
                (name, schema)
            })
            .collect();
        let data_source_schemas = data_source_schemas
            .into_iter()
            .map(|(name, s)| {
                let schema = schema_to_proto(s.version, &s.description, &s.attributes, &s.blocks);
                (name, schema)
            })
            .collect();

        Ok(Response::new(get_provider_schema::Response {
            provider: Some(schema_to_proto(
                provider_schema.version,
                &provider_schema.description,
                &provider_schema.attributes,
                &provider_schema.blocks,
            )),
            resource_schemas,
            data_source_schemas,
            diagnostics: vec![],
            provider_meta: None,
            server_capabilities: Some(server_capabilities()),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<validate_provider_config::Request>,
    ) -> GrpcResult<validate_provider_config::Response> {
        let req = request.into_inner();
        let config = decode_object(&req.config)?.unwrap_or_default();
        let provider_schema = self.provider.read().await.schema().await;

        let mut diags = Diagnostics::new();
        validate_object(
            &provider_schema.attributes,
            &provider_schema.blocks,
            &config,
            "",
            &mut diags,
        );

        Ok(Response::new(validate_provider_config::Response {
            diagnostics: convert_diagnostics(diags),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<validate_resource_config::Request>,
    ) -> GrpcResult<validate_resource_config::Response> {
        let req = request.into_inner();
        let schema = match self.resource_schema(&req.type_name).await {
            Ok(schema) => schema,
            Err(status) => {
                let mut diags = Diagnostics::new();
                diags.add_error(status.message(), None::<String>);
                return Ok(Response::new(validate_resource_config::Response {
                    diagnostics: convert_diagnostics(diags),
                }));
            }
        };
        let config = decode_object(&req.config)?.unwrap_or_default();

        let mut diags = Diagnostics::new();
        validate_object(&schema.attributes, &schema.blocks, &config, "", &mut diags);

        if !diags.has_errors() {
            let resource = self.resource(&req.type_name).await?;
            let response = resource
                .validate(ValidateRequest {
                    context: self.stop.clone(),
                    config: Config::from_values(config),
                })
                .await;
            diags.extend(response.diagnostics);
        }

        Ok(Response::new(validate_resource_config::Response {
            diagnostics: convert_diagnostics(diags),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<validate_data_resource_config::Request>,
    ) -> GrpcResult<validate_data_resource_config::Response> {
        let req = request.into_inner();
        let schema = self.data_source_schema(&req.type_name).await?;
        let config = decode_object(&req.config)?.unwrap_or_default();

        let mut diags = Diagnostics::new();
        validate_object(&schema.attributes, &schema.blocks, &config, "", &mut diags);

        Ok(Response::new(validate_data_resource_config::Response {
            diagnostics: convert_diagnostics(diags),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<upgrade_resource_state::Request>,
    ) -> GrpcResult<upgrade_resource_state::Response> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;

        let raw = req.raw_state.map(|raw| raw.json).unwrap_or_default();
        let values: Values = if raw.is_empty() {
            HashMap::new()
        } else {
            serde_json::from_slice::<Option<Values>>(&raw)
                .map_err(|e| Status::invalid_argument(format!("Failed to decode raw state: {}", e)))?
                .unwrap_or_default()
        };

        let upgraded = conform(&schema.attributes, &schema.blocks, values);
        debug!(type_name = %req.type_name, version = req.version, "Upgraded resource state");

        Ok(Response::new(upgrade_resource_state::Response {
            upgraded_state: Some(encode_object(&upgraded)?),
            diagnostics: vec![],
        }))
    }

    async fn get_resource_identity_schemas(
        &self,
        _request: Request<get_resource_identity_schemas::Request>,
    ) -> GrpcResult<get_resource_identity_schemas::Response> {
        Ok(Response::new(get_resource_identity_schemas::Response {
            identity_schemas: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<configure_provider::Request>,
    ) -> GrpcResult<configure_provider::Response> {
        let req = request.into_inner();
        let config = decode_object(&req.config)?.unwrap_or_default();

        debug!(
            terraform_version = %req.terraform_version,
            keys = ?config.keys().collect::<Vec<_>>(),
            "Configuring provider"
        );

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(ConfigureRequest {
                context: self.stop.clone(),
                config: Config::from_values(config),
                terraform_version: req.terraform_version,
            })
            .await;

        Ok(Response::new(configure_provider::Response {
            diagnostics: convert_diagnostics(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<read_resource::Request>,
    ) -> GrpcResult<read_resource::Response> {
        let req = request.into_inner();
        let current = match decode_object(&req.current_state)? {
            Some(values) => values,
            None => {
                return Ok(Response::new(read_resource::Response {
                    new_state: Some(encode_null()?),
                    diagnostics: vec![],
                    private: req.private,
                }))
            }
        };

        let schema = self.resource_schema(&req.type_name).await?;
        let resource = self.resource(&req.type_name).await?;
        let response = resource
            .read(ReadRequest {
                context: self.stop.clone(),
                current_state: State::from_values(current.clone()),
            })
            .await;

        let new_state = match response.state {
            Some(state) => encode_object(&conform(&schema.attributes, &schema.blocks, state.values))?,
            None if response.diagnostics.has_errors() => encode_object(&current)?,
            None => {
                warn!(type_name = %req.type_name, "Resource not found, removing from state");
                encode_null()?
            }
        };

        Ok(Response::new(read_resource::Response {
            new_state: Some(new_state),
            diagnostics: convert_diagnostics(response.diagnostics),
            private: req.private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<plan_resource_change::Request>,
    ) -> GrpcResult<plan_resource_change::Response> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;

        let prior = decode_object(&req.prior_state)?;
        let config = decode_object(&req.config)?.unwrap_or_default();
        let mut planned = match decode_object(&req.proposed_new_state)? {
            Some(values) => values,
            None => {
                // destroy
                return Ok(Response::new(plan_resource_change::Response {
                    planned_state: Some(encode_null()?),
                    requires_replace: vec![],
                    planned_private: req.prior_private,
                    diagnostics: vec![],
                    legacy_type_system: true,
                }));
            }
        };

        let mut diags = Diagnostics::new();
        let mut requires_replace: Vec<Vec<PathStep>> = Vec::new();

        apply_defaults(&schema.attributes, &schema.blocks, &config, &mut planned);

        match &prior {
            None => mark_computed_unknown(&schema.attributes, &schema.blocks, &config, &mut planned),
            Some(prior) => {
                if plan_differs(&schema.attributes, &schema.blocks, prior, &planned) {
                    for (name, attr) in &schema.attributes {
                        let configured = config.get(name).map(|v| !v.is_null()).unwrap_or(false);
                        if attr.computed && !attr.optional && !configured {
                            planned.insert(name.clone(), Dynamic::Unknown);
                        }
                    }
                }
            }
        }

        let empty = HashMap::new();
        run_plan_modifiers(
            &schema.attributes,
            &schema.blocks,
            prior.as_ref().unwrap_or(&empty),
            &config,
            &mut planned,
            &[],
            &mut requires_replace,
            &mut diags,
        );

        let resource = self.resource(&req.type_name).await?;
        let response = resource
            .modify_plan(ModifyPlanRequest {
                context: self.stop.clone(),
                config: Config::from_values(config),
                prior_state: prior.clone().map(State::from_values),
                planned_state: State::from_values(planned),
            })
            .await;
        diags.extend(response.diagnostics);
        for name in response.requires_replace {
            requires_replace.push(vec![PathStep::Attribute(name)]);
        }

        // replacement only matters when something exists to replace
        if prior.is_none() {
            requires_replace.clear();
        }
        requires_replace.dedup();

        let planned = conform(&schema.attributes, &schema.blocks, response.planned_state.values);

        Ok(Response::new(plan_resource_change::Response {
            planned_state: Some(encode_object(&planned)?),
            requires_replace: requires_replace.iter().map(|p| path_to_proto(p)).collect(),
            planned_private: req.prior_private,
            diagnostics: convert_diagnostics(diags),
            legacy_type_system: true,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<apply_resource_change::Request>,
    ) -> GrpcResult<apply_resource_change::Response> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;
        let resource = self.resource(&req.type_name).await?;

        let prior = decode_object(&req.prior_state)?;
        let planned = decode_object(&req.planned_state)?;
        let config = decode_object(&req.config)?.unwrap_or_default();
        let context = self.stop.clone();

        let (new_state, diagnostics) = match (prior, planned) {
            (None, Some(planned)) => {
                info!(type_name = %req.type_name, "Creating resource");
                let response = resource
                    .create(CreateRequest {
                        context,
                        config: Config::from_values(config),
                        planned_state: State::from_values(planned),
                    })
                    .await;
                let state = if response.diagnostics.has_errors() && !has_id(&response.state) {
                    None
                } else {
                    Some(response.state.values)
                };
                (state, response.diagnostics)
            }
            (Some(prior), None) => {
                info!(type_name = %req.type_name, "Deleting resource");
                let response = resource
                    .delete(DeleteRequest {
                        context,
                        current_state: State::from_values(prior.clone()),
                    })
                    .await;
                let state = if response.diagnostics.has_errors() {
                    Some(prior)
                } else {
                    None
                };
                (state, response.diagnostics)
            }
            (Some(prior), Some(planned)) => {
                info!(type_name = %req.type_name, "Updating resource");
                let response = resource
                    .update(UpdateRequest {
                        context,
                        config: Config::from_values(config),
                        planned_state: State::from_values(planned),
                        current_state: State::from_values(prior.clone()),
                    })
                    .await;
                let state = if response.diagnostics.has_errors() && !has_id(&response.state) {
                    Some(prior)
                } else {
                    Some(response.state.values)
                };
                (state, response.diagnostics)
            }
            (None, None) => (None, Diagnostics::new()),
        };

        let new_state = match new_state {
            Some(values) => encode_object(&conform(&schema.attributes, &schema.blocks, values))?,
            None => encode_null()?,
        };

        Ok(Response::new(apply_resource_change::Response {
            new_state: Some(new_state),
            private: vec![],
            diagnostics: convert_diagnostics(diagnostics),
            legacy_type_system: true,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<import_resource_state::Request>,
    ) -> GrpcResult<import_resource_state::Response> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;
        let resource = self.resource(&req.type_name).await?;

        info!(type_name = %req.type_name, id = %req.id, "Importing resource");
        let response = resource
            .import_state(ImportStateRequest {
                context: self.stop.clone(),
                id: req.id,
            })
            .await;

        let imported_resources = match response.state {
            Some(state) if !response.diagnostics.has_errors() => {
                vec![import_resource_state::ImportedResource {
                    type_name: req.type_name,
                    state: Some(encode_object(&conform(
                        &schema.attributes,
                        &schema.blocks,
                        state.values,
                    ))?),
                    private: vec![],
                }]
            }
            _ => vec![],
        };

        Ok(Response::new(import_resource_state::Response {
            imported_resources,
            diagnostics: convert_diagnostics(response.diagnostics),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<read_data_source::Request>,
    ) -> GrpcResult<read_data_source::Response> {
        let req = request.into_inner();
        let schema = self.data_source_schema(&req.type_name).await?;
        let config = decode_object(&req.config)?.unwrap_or_default();

        let data_source = {
            let provider = self.provider.read().await;
            provider
                .create_data_source(&req.type_name)
                .await
                .map_err(|e| Status::not_found(e.to_string()))?
        };

        debug!(type_name = %req.type_name, "Reading data source");
        let response = data_source
            .read(ReadRequest {
                context: self.stop.clone(),
                current_state: State::from_values(config.clone()),
            })
            .await;

        let values = response.state.map(|s| s.values).unwrap_or(config);
        Ok(Response::new(read_data_source::Response {
            state: Some(encode_object(&conform(&schema.attributes, &schema.blocks, values))?),
            diagnostics: convert_diagnostics(response.diagnostics),
        }))
    }

    async fn get_functions(
        &self,
        _request: Request<get_functions::Request>,
    ) -> GrpcResult<get_functions::Response> {
        Ok(Response::new(get_functions::Response {
            diagnostics: vec![],
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<stop_provider::Request>,
    ) -> GrpcResult<stop_provider::Response> {
        info!("Stop requested, cancelling in-flight operations");
        self.stop.cancel();
        Ok(Response::new(stop_provider::Response {
            error: String::new(),
        }))
    }
}

fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        plan_destroy: false,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

fn schema_to_proto(
    version: i64,
    description: &str,
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, NestedBlock>,
) -> proto::Schema {
    proto::Schema {
        version,
        block: Some(block_to_proto(version, description, attributes, blocks)),
    }
}

fn block_to_proto(
    version: i64,
    description: &str,
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, NestedBlock>,
) -> schema::Block {
    let mut attrs: Vec<schema::Attribute> = attributes
        .iter()
        .map(|(name, attr)| schema::Attribute {
            name: name.clone(),
            r#type: attr.r#type.to_bytes(),
            nested_type: None,
            description: attr.description.clone(),
            required: attr.required,
            optional: attr.optional,
            computed: attr.computed,
            sensitive: attr.sensitive,
            description_kind: StringKind::Plain as i32,
            deprecated: attr.deprecated,
            write_only: false,
        })
        .collect();
    attrs.sort_by(|a, b| a.name.cmp(&b.name));

    let mut block_types: Vec<schema::NestedBlock> = blocks
        .iter()
        .map(|(name, block)| schema::NestedBlock {
            type_name: name.clone(),
            block: Some(block_to_proto(
                0,
                &block.description,
                &block.attributes,
                &block.blocks,
            )),
            nesting: match block.nesting {
                NestingMode::Single => schema::nested_block::NestingMode::Single,
                NestingMode::List => schema::nested_block::NestingMode::List,
                NestingMode::Set => schema::nested_block::NestingMode::Set,
            } as i32,
            min_items: block.min_items,
            max_items: block.max_items,
        })
        .collect();
    block_types.sort_by(|a, b| a.type_name.cmp(&b.type_name));

    schema::Block {
        version,
        attributes: attrs,
        block_types,
        description: description.to_string(),
        description_kind: StringKind::Plain as i32,
        deprecated: false,
    }
}

/// Decodes an object value; `None` means the whole object is null
#[allow(clippy::result_large_err)]
fn decode_object(value: &Option<proto::DynamicValue>) -> std::result::Result<Option<Values>, Status> {
    let value = match value {
        Some(v) => v,
        None => return Ok(None),
    };

    if !value.msgpack.is_empty() {
        rmp_serde::from_slice::<Option<Values>>(&value.msgpack)
            .map_err(|e| Status::invalid_argument(format!("Failed to decode msgpack: {}", e)))
    } else if !value.json.is_empty() {
        serde_json::from_slice::<Option<Values>>(&value.json)
            .map_err(|e| Status::invalid_argument(format!("Failed to decode json: {}", e)))
    } else {
        Ok(None)
    }
}

#[allow(clippy::result_large_err)]
fn encode_object(values: &Values) -> std::result::Result<proto::DynamicValue, Status> {
    let msgpack = rmp_serde::to_vec_named(values)
        .map_err(|e| Status::internal(format!("Failed to encode msgpack: {}", e)))?;
    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

#[allow(clippy::result_large_err)]
fn encode_null() -> std::result::Result<proto::DynamicValue, Status> {
    let msgpack = rmp_serde::to_vec(&Dynamic::Null)
        .map_err(|e| Status::internal(format!("Failed to encode msgpack: {}", e)))?;
    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn has_id(state: &State) -> bool {
    state
        .get_string("id")
        .map(|id| !id.is_empty())
        .unwrap_or(false)
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn block_items(value: Option<&Dynamic>) -> Vec<&HashMap<String, Dynamic>> {
    match value {
        Some(Dynamic::List(items)) => items.iter().filter_map(Dynamic::as_map).collect(),
        Some(Dynamic::Map(map)) => vec![map],
        _ => vec![],
    }
}

fn validate_object(
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, NestedBlock>,
    values: &Values,
    prefix: &str,
    diags: &mut Diagnostics,
) {
    for (name, attr) in attributes {
        let missing = values.get(name).map(Dynamic::is_null).unwrap_or(true);
        if attr.required && missing {
            let path = join_path(prefix, name);
            diags.add_attribute_error(
                path.clone(),
                "Missing required argument",
                format!(
                    "The argument \"{}\" is required, but no definition was found.",
                    path
                ),
            );
        }
    }

    for (name, value) in values {
        let path = join_path(prefix, name);
        if let Some(attr) = attributes.get(name) {
            if !attr.r#type.accepts(value) {
                diags.add_attribute_error(
                    path.clone(),
                    format!("Incorrect attribute value type for {}", path),
                    format!("Expected {}, got {}", attr.r#type, value.type_name()),
                );
                continue;
            }
            if value.is_null() || !value.is_known() {
                continue;
            }
            for validator in &attr.validators {
                validator.validate(value, &path, diags);
            }
        } else if let Some(block) = blocks.get(name) {
            if value.is_unknown() {
                continue;
            }
            let items = block_items(Some(value));
            let count = items.len() as i64;
            if count < block.min_items {
                diags.add_attribute_error(
                    path.clone(),
                    format!("Insufficient {} blocks", name),
                    format!("At least {} \"{}\" blocks are required.", block.min_items, name),
                );
            }
            if block.max_items > 0 && count > block.max_items {
                diags.add_attribute_error(
                    path.clone(),
                    format!("Too many {} blocks", name),
                    format!("No more than {} \"{}\" blocks are allowed.", block.max_items, name),
                );
            }
            for (i, item) in items.into_iter().enumerate() {
                validate_object(
                    &block.attributes,
                    &block.blocks,
                    item,
                    &format!("{}.{}", path, i),
                    diags,
                );
            }
        } else {
            diags.add_attribute_error(
                path.clone(),
                "Unsupported argument",
                format!("An argument named \"{}\" is not expected here.", path),
            );
        }
    }

    for (name, block) in blocks {
        if block.min_items > 0 && !values.contains_key(name) {
            diags.add_attribute_error(
                join_path(prefix, name),
                format!("Insufficient {} blocks", name),
                format!("At least {} \"{}\" blocks are required.", block.min_items, name),
            );
        }
    }
}

fn apply_defaults(
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, NestedBlock>,
    config: &Values,
    planned: &mut Values,
) {
    for (name, attr) in attributes {
        let Some(default) = &attr.default else {
            continue;
        };
        if config.get(name).map(Dynamic::is_null).unwrap_or(true) {
            let response = default.default_value(crate::defaults::DefaultRequest {
                attribute_path: name.clone(),
            });
            planned.insert(name.clone(), response.value);
        }
    }

    for (name, block) in blocks {
        let config_items: Vec<Values> = block_items(config.get(name)).into_iter().cloned().collect();
        with_block_items(planned, name, |i, item| {
            let empty = HashMap::new();
            let item_config = config_items.get(i).unwrap_or(&empty);
            apply_defaults(&block.attributes, &block.blocks, item_config, item);
        });
    }
}

fn mark_computed_unknown(
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, NestedBlock>,
    config: &Values,
    planned: &mut Values,
) {
    for (name, attr) in attributes {
        if !attr.computed {
            continue;
        }
        let configured = config.get(name).map(|v| !v.is_null()).unwrap_or(false);
        let planned_null = planned.get(name).map(Dynamic::is_null).unwrap_or(true);
        if !configured && planned_null {
            planned.insert(name.clone(), Dynamic::Unknown);
        }
    }

    for (name, block) in blocks {
        let config_items: Vec<Values> = block_items(config.get(name)).into_iter().cloned().collect();
        with_block_items(planned, name, |i, item| {
            let empty = HashMap::new();
            let item_config = config_items.get(i).unwrap_or(&empty);
            mark_computed_unknown(&block.attributes, &block.blocks, item_config, item);
        });
    }
}

/// Runs `f` over each object of a block value in place
fn with_block_items<F>(values: &mut Values, name: &str, mut f: F)
where
    F: FnMut(usize, &mut Values),
{
    match values.get_mut(name) {
        Some(Dynamic::List(items)) => {
            for (i, item) in items.iter_mut().enumerate() {
                if let Dynamic::Map(map) = item {
                    f(i, map);
                }
            }
        }
        Some(Dynamic::Map(map)) => f(0, map),
        _ => {}
    }
}

/// Whether any user-controlled value differs between prior state and plan
fn plan_differs(
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, NestedBlock>,
    prior: &Values,
    planned: &Values,
) -> bool {
    let attr_changed = attributes.iter().any(|(name, attr)| {
        if attr.computed && !attr.optional {
            return false;
        }
        let before = prior.get(name).unwrap_or(&Dynamic::Null);
        let after = planned.get(name).unwrap_or(&Dynamic::Null);
        !after.is_known() || !before.set_equal(after)
    });
    let block_changed = blocks.keys().any(|name| {
        let before = normalize_block(prior.get(name));
        let after = normalize_block(planned.get(name));
        !after.is_known() || !before.set_equal(&after)
    });
    attr_changed || block_changed
}

fn normalize_block(value: Option<&Dynamic>) -> Dynamic {
    match value {
        None | Some(Dynamic::Null) => Dynamic::List(vec![]),
        Some(Dynamic::Map(m)) => Dynamic::List(vec![Dynamic::Map(m.clone())]),
        Some(other) => other.clone(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PathStep {
    Attribute(String),
    Index(i64),
}

fn path_to_proto(steps: &[PathStep]) -> proto::AttributePath {
    proto::AttributePath {
        steps: steps
            .iter()
            .map(|step| attribute_path::Step {
                selector: Some(match step {
                    PathStep::Attribute(name) => {
                        attribute_path::step::Selector::AttributeName(name.clone())
                    }
                    PathStep::Index(i) => attribute_path::step::Selector::ElementKeyInt(*i),
                }),
            })
            .collect(),
    }
}

fn path_from_str(path: &str) -> Vec<PathStep> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(|segment| match segment.parse::<i64>() {
            Ok(i) => PathStep::Index(i),
            Err(_) => PathStep::Attribute(segment.to_string()),
        })
        .collect()
}

fn path_string(steps: &[PathStep]) -> String {
    steps
        .iter()
        .map(|s| match s {
            PathStep::Attribute(name) => name.clone(),
            PathStep::Index(i) => i.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[allow(clippy::too_many_arguments)]
fn run_plan_modifiers(
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, NestedBlock>,
    prior: &Values,
    config: &Values,
    planned: &mut Values,
    path: &[PathStep],
    requires_replace: &mut Vec<Vec<PathStep>>,
    diags: &mut Diagnostics,
) {
    for (name, attr) in attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }
        let mut attr_path = path.to_vec();
        attr_path.push(PathStep::Attribute(name.clone()));

        let state_value = prior.get(name).cloned().unwrap_or_default();
        let config_value = config.get(name).cloned().unwrap_or_default();
        let mut plan_value = planned.get(name).cloned().unwrap_or_default();

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify_plan(PlanModifyRequest {
                state: state_value.clone(),
                plan: plan_value,
                config: config_value.clone(),
                attribute_path: path_string(&attr_path),
            });
            plan_value = response.plan_value;
            if response.requires_replace {
                requires_replace.push(attr_path.clone());
            }
            diags.extend(response.diagnostics);
        }
        planned.insert(name.clone(), plan_value);
    }

    for (name, block) in blocks {
        let mut block_path = path.to_vec();
        block_path.push(PathStep::Attribute(name.clone()));

        if !block.plan_modifiers.is_empty() {
            let state_value = normalize_block(prior.get(name));
            let config_value = normalize_block(config.get(name));
            let mut plan_value = planned.get(name).cloned().unwrap_or_default();
            for modifier in &block.plan_modifiers {
                let response = modifier.modify_plan(PlanModifyRequest {
                    state: state_value.clone(),
                    plan: normalize_block(Some(&plan_value)),
                    config: config_value.clone(),
                    attribute_path: path_string(&block_path),
                });
                plan_value = response.plan_value;
                if response.requires_replace {
                    requires_replace.push(block_path.clone());
                }
                diags.extend(response.diagnostics);
            }
            planned.insert(name.clone(), plan_value);
        }

        // set elements have no stable identity to pair with prior state
        if block.nesting == NestingMode::Set {
            continue;
        }
        let prior_items: Vec<Values> = block_items(prior.get(name)).into_iter().cloned().collect();
        let config_items: Vec<Values> = block_items(config.get(name)).into_iter().cloned().collect();
        with_block_items(planned, name, |i, item| {
            let empty = HashMap::new();
            let mut item_path = block_path.clone();
            if block.nesting != NestingMode::Single {
                item_path.push(PathStep::Index(i as i64));
            }
            run_plan_modifiers(
                &block.attributes,
                &block.blocks,
                prior_items.get(i).unwrap_or(&empty),
                config_items.get(i).unwrap_or(&empty),
                item,
                &item_path,
                requires_replace,
                diags,
            );
        });
    }
}

/// Shapes values to exactly the schema: unknown keys are dropped, missing
/// attributes become null and absent list or set blocks become empty lists.
fn conform(
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, NestedBlock>,
    mut values: Values,
) -> Values {
    let mut out = HashMap::with_capacity(attributes.len() + blocks.len());
    for name in attributes.keys() {
        out.insert(name.clone(), values.remove(name).unwrap_or_default());
    }
    for (name, block) in blocks {
        let value = values.remove(name).unwrap_or_default();
        out.insert(name.clone(), conform_block(block, value));
    }
    out
}

fn conform_block(block: &NestedBlock, value: Dynamic) -> Dynamic {
    let conform_item = |item: Dynamic| match item {
        Dynamic::Map(map) => Some(Dynamic::Map(conform(&block.attributes, &block.blocks, map))),
        Dynamic::Unknown => Some(Dynamic::Unknown),
        _ => None,
    };

    match (block.nesting, value) {
        (_, Dynamic::Unknown) => Dynamic::Unknown,
        (NestingMode::Single, Dynamic::Map(map)) => conform_item(Dynamic::Map(map)).unwrap_or_default(),
        (NestingMode::Single, Dynamic::List(items)) => items
            .into_iter()
            .find_map(conform_item)
            .unwrap_or_default(),
        (NestingMode::Single, _) => Dynamic::Null,
        (_, Dynamic::List(items)) => Dynamic::List(items.into_iter().filter_map(conform_item).collect()),
        (_, Dynamic::Map(map)) => Dynamic::List(conform_item(Dynamic::Map(map)).into_iter().collect()),
        (_, _) => Dynamic::List(vec![]),
    }
}

fn convert_diagnostics(diags: Diagnostics) -> Vec<proto::Diagnostic> {
    let to_proto = |severity: diagnostic::Severity, diag: crate::types::Diagnostic| proto::Diagnostic {
        severity: severity as i32,
        summary: diag.summary,
        detail: diag.detail.unwrap_or_default(),
        attribute: diag
            .attribute
            .as_deref()
            .map(|path| path_to_proto(&path_from_str(path))),
    };

    diags
        .errors
        .into_iter()
        .map(|d| to_proto(diagnostic::Severity::Error, d))
        .chain(
            diags
                .warnings
                .into_iter()
                .map(|d| to_proto(diagnostic::Severity::Warning, d)),
        )
        .collect()
}
