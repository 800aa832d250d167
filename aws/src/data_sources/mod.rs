//! Read-only lookups of the objects the resources manage

pub mod elasticsearch_domain;
pub mod kendra_experience;
pub mod kendra_faq;
pub mod kendra_index;
pub mod kendra_query_suggestions_block_list;
pub mod kendra_thesaurus;

pub use elasticsearch_domain::ElasticsearchDomainDataSource;
pub use kendra_experience::KendraExperienceDataSource;
pub use kendra_faq::KendraFaqDataSource;
pub use kendra_index::KendraIndexDataSource;
pub use kendra_query_suggestions_block_list::KendraQuerySuggestionsBlockListDataSource;
pub use kendra_thesaurus::KendraThesaurusDataSource;

use std::collections::HashMap;
use tfplug::provider::{Attribute, DataSourceSchema, NestedBlock, ResourceSchema};
use tfplug::request::ReadResponse;
use tfplug::{Diagnostics, State};

use crate::resources::flex::Object;

/// Data source schema mirroring a resource: the `lookup` attributes become
/// required arguments and everything else is computed. `timeouts` and
/// `tags_all` are dropped.
pub fn from_resource_schema(resource: ResourceSchema, lookup: &[&str], description: &str) -> DataSourceSchema {
    let attributes = resource
        .attributes
        .into_iter()
        .filter(|(name, _)| name != "tags_all")
        .map(|(name, attribute)| {
            let attribute = if lookup.contains(&name.as_str()) {
                argument(attribute)
            } else {
                computed(attribute)
            };
            (name, attribute)
        })
        .collect();

    DataSourceSchema {
        version: 0,
        attributes,
        blocks: computed_blocks(resource.blocks.into_iter().filter(|(name, _)| name != "timeouts")),
        description: description.to_string(),
    }
}

fn argument(mut attribute: Attribute) -> Attribute {
    attribute.required = true;
    attribute.optional = false;
    attribute.computed = false;
    attribute.plan_modifiers.clear();
    attribute.default = None;
    attribute
}

fn computed(mut attribute: Attribute) -> Attribute {
    attribute.required = false;
    attribute.optional = false;
    attribute.computed = true;
    attribute.validators.clear();
    attribute.plan_modifiers.clear();
    attribute.default = None;
    attribute
}

fn computed_blocks(blocks: impl IntoIterator<Item = (String, NestedBlock)>) -> HashMap<String, NestedBlock> {
    blocks
        .into_iter()
        .map(|(name, mut block)| {
            block.attributes = block
                .attributes
                .into_iter()
                .map(|(name, attribute)| (name, computed(attribute)))
                .collect();
            block.blocks = computed_blocks(block.blocks);
            block.min_items = 0;
            block.max_items = 0;
            block.plan_modifiers.clear();
            (name, block)
        })
        .collect()
}

/// Turns the outcome of a resource-style read into a data source response.
/// A missing object is an error, and `tags` reports every tag on it.
pub fn found(result: Result<Option<Object>, String>, what: String) -> ReadResponse {
    let mut diagnostics = Diagnostics::new();
    let state = match result {
        Ok(Some(mut values)) => {
            if let Some(all) = values.remove("tags_all") {
                values.insert("tags".to_string(), all);
            }
            Some(State::from_values(values))
        }
        Ok(None) => {
            diagnostics.add_error(format!("{} not found", what), None::<String>);
            None
        }
        Err(e) => {
            diagnostics.add_error(e, None::<String>);
            None
        }
    };
    ReadResponse { state, diagnostics }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::resources::flex::object;
    use crate::resources::kendra::FaqResource;
    use std::collections::HashMap;
    use tfplug::Dynamic;

    #[test]
    fn lookup_keys_become_required_arguments() {
        let schema = from_resource_schema(FaqResource::schema_static(), &["faq_id", "index_id"], "FAQ");

        assert!(schema.attributes["faq_id"].required);
        assert!(schema.attributes["index_id"].required);
        assert!(schema.attributes["name"].computed);
        assert!(!schema.attributes["name"].optional);
        assert!(schema.attributes["name"].validators.is_empty());
        assert!(schema.attributes["tags"].computed);
        assert!(!schema.attributes.contains_key("tags_all"));
        assert!(!schema.blocks.contains_key("timeouts"));

        let s3_path = &schema.blocks["s3_path"];
        assert_eq!(s3_path.min_items, 0);
        assert!(s3_path.attributes["bucket"].computed);
        assert!(!s3_path.attributes["bucket"].required);
    }

    #[test]
    fn missing_objects_are_errors() {
        let response = found(Ok(None), "Kendra Faq (f/i)".to_string());
        assert!(response.state.is_none());
        assert_eq!(response.diagnostics.errors[0].summary, "Kendra Faq (f/i) not found");

        let response = found(Err("reading Kendra Faq (f/i): boom".to_string()), String::new());
        assert!(response.diagnostics.errors[0].summary.contains("boom"));
    }

    #[test]
    fn tags_report_every_tag() {
        let values = object([
            ("tags", Dynamic::Null),
            (
                "tags_all",
                Dynamic::string_map(HashMap::from([("team".to_string(), "search".to_string())])),
            ),
        ]);

        let state = found(Ok(Some(values)), String::new()).state.unwrap();
        assert!(!state.values.contains_key("tags_all"));
        assert_eq!(
            state.values["tags"].as_map().unwrap()["team"],
            Dynamic::string("search")
        );
    }
}
