use crate::attribute_type::AttributeType;
use crate::defaults::Default as DefaultValue;
use crate::plan_modifier::PlanModifier;
use crate::provider::{
    Attribute, DataSourceSchema, NestedBlock, NestingMode, ProviderSchema, ResourceSchema,
};
use crate::validator::Validator;
use std::collections::HashMap;
use std::sync::Arc;

pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, r#type: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                deprecated: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn list(name: &str, element_type: AttributeType) -> Self {
        Self::new(name, AttributeType::list_of(element_type))
    }

    pub fn set(name: &str, element_type: AttributeType) -> Self {
        Self::new(name, AttributeType::set_of(element_type))
    }

    pub fn map(name: &str, element_type: AttributeType) -> Self {
        Self::new(name, AttributeType::map_of(element_type))
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(Arc::from(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(Arc::from(modifier));
        self
    }

    /// Sets a default; the attribute becomes optional and computed
    pub fn default(mut self, default: Box<dyn DefaultValue>) -> Self {
        self.attribute.default = Some(Arc::from(default));
        if !self.attribute.required {
            self.attribute.optional = true;
        }
        self.attribute.computed = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

pub struct BlockBuilder {
    block: NestedBlock,
}

impl BlockBuilder {
    pub fn new(type_name: &str, nesting: NestingMode) -> Self {
        Self {
            block: NestedBlock {
                type_name: type_name.to_string(),
                attributes: HashMap::new(),
                blocks: HashMap::new(),
                nesting,
                min_items: 0,
                max_items: 0,
                description: String::new(),
                plan_modifiers: Vec::new(),
            },
        }
    }

    pub fn list(type_name: &str) -> Self {
        Self::new(type_name, NestingMode::List)
    }

    pub fn set(type_name: &str) -> Self {
        Self::new(type_name, NestingMode::Set)
    }

    pub fn single(type_name: &str) -> Self {
        Self::new(type_name, NestingMode::Single)
    }

    pub fn attribute(mut self, name: &str, builder: AttributeBuilder) -> Self {
        self.block
            .attributes
            .insert(name.to_string(), builder.build());
        self
    }

    pub fn block(mut self, name: &str, builder: BlockBuilder) -> Self {
        self.block.blocks.insert(name.to_string(), builder.build());
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.block.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.block.max_items = max;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block.description = desc.to_string();
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.block.plan_modifiers.push(Arc::from(modifier));
        self
    }

    pub fn build(self) -> NestedBlock {
        self.block
    }
}

pub struct SchemaBuilder {
    attributes: HashMap<String, Attribute>,
    blocks: HashMap<String, NestedBlock>,
    description: String,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            attributes: HashMap::new(),
            blocks: HashMap::new(),
            description: String::new(),
        }
    }

    pub fn attribute(mut self, name: &str, builder: AttributeBuilder) -> Self {
        self.attributes.insert(name.to_string(), builder.build());
        self
    }

    pub fn block(mut self, name: &str, builder: BlockBuilder) -> Self {
        self.blocks.insert(name.to_string(), builder.build());
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    pub fn build_resource(self, version: i64) -> ResourceSchema {
        ResourceSchema {
            version,
            attributes: self.attributes,
            blocks: self.blocks,
            description: self.description,
        }
    }

    pub fn build_data_source(self, version: i64) -> DataSourceSchema {
        DataSourceSchema {
            version,
            attributes: self.attributes,
            blocks: self.blocks,
            description: self.description,
        }
    }

    pub fn build_provider(self, version: i64) -> ProviderSchema {
        ProviderSchema {
            version,
            attributes: self.attributes,
            blocks: self.blocks,
            description: self.description,
        }
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for read-only data source schemas
#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::plan_modifier::RequiresReplaceIfChanged;

    #[test]
    fn schema_builder_collects_attributes_and_blocks() {
        let schema = SchemaBuilder::new()
            .attribute(
                "domain_name",
                AttributeBuilder::string("domain_name")
                    .required()
                    .plan_modifier(Box::new(RequiresReplaceIfChanged)),
            )
            .attribute(
                "elasticsearch_version",
                AttributeBuilder::string("elasticsearch_version")
                    .default(StaticDefault::string("1.5")),
            )
            .block(
                "ebs_options",
                BlockBuilder::list("ebs_options")
                    .max_items(1)
                    .attribute("ebs_enabled", AttributeBuilder::bool("ebs_enabled").required()),
            )
            .build_resource(1);

        assert_eq!(schema.version, 1);
        assert_eq!(schema.attributes.len(), 2);

        let name = schema.attributes.get("domain_name").unwrap();
        assert!(name.required);
        assert_eq!(name.plan_modifiers.len(), 1);

        let version = schema.attributes.get("elasticsearch_version").unwrap();
        assert!(version.optional);
        assert!(version.computed);
        assert!(version.default.is_some());

        let ebs = schema.blocks.get("ebs_options").unwrap();
        assert_eq!(ebs.nesting, NestingMode::List);
        assert_eq!(ebs.max_items, 1);
        assert!(ebs.attributes.contains_key("ebs_enabled"));
    }
}
