//! `tags` and `tags_all` handling for taggable resources

use std::collections::HashMap;
use tfplug::{AttributeBuilder, AttributeType, Dynamic};

use super::flex::{self, Object, ObjectExt};
use crate::api::Tag;

/// Keys with this prefix are managed by AWS and never shown or diffed
const AWS_TAG_PREFIX: &str = "aws:";

pub fn tags_attribute() -> AttributeBuilder {
    AttributeBuilder::map("tags", AttributeType::String)
        .optional()
        .description("Map of tags to assign to the resource")
}

pub fn tags_all_attribute() -> AttributeBuilder {
    AttributeBuilder::map("tags_all", AttributeType::String)
        .computed()
        .description("Map of tags assigned to the resource, including provider default tags")
}

/// Provider default tags overlaid with the resource's own tags
pub fn merged(
    default_tags: &HashMap<String, String>,
    resource_tags: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut all = default_tags.clone();
    all.extend(resource_tags.iter().map(|(k, v)| (k.clone(), v.clone())));
    all
}

/// Wire form, sorted by key
pub fn to_api(tags: &HashMap<String, String>) -> Vec<Tag> {
    let mut list: Vec<Tag> = tags.iter().map(|(k, v)| Tag::new(k, v)).collect();
    list.sort_by(|a, b| a.key.cmp(&b.key));
    list
}

pub fn from_api(tags: Vec<Tag>) -> HashMap<String, String> {
    tags.into_iter()
        .filter(|tag| !tag.key.starts_with(AWS_TAG_PREFIX))
        .map(|tag| (tag.key, tag.value))
        .collect()
}

#[derive(Debug, Default, PartialEq)]
pub struct TagDiff {
    pub upsert: Vec<Tag>,
    pub remove: Vec<String>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.remove.is_empty()
    }
}

pub fn diff(old: &HashMap<String, String>, new: &HashMap<String, String>) -> TagDiff {
    let upsert: HashMap<String, String> = new
        .iter()
        .filter(|(k, v)| old.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let mut remove: Vec<String> = old
        .keys()
        .filter(|k| !new.contains_key(*k) && !k.starts_with(AWS_TAG_PREFIX))
        .cloned()
        .collect();
    remove.sort();

    TagDiff {
        upsert: to_api(&upsert),
        remove,
    }
}

/// Writes `tags_all` and the resource-level `tags` view of it into `values`.
/// Default tags the resource does not override are left out of `tags`.
pub fn set_state(values: &mut Object, all: HashMap<String, String>, default_tags: &HashMap<String, String>) {
    let own: HashMap<String, String> = all
        .iter()
        .filter(|(k, v)| default_tags.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let tags = if own.is_empty() {
        // keep an explicit `tags = {}` as written
        match values.get("tags") {
            Some(Dynamic::Map(prior)) if prior.is_empty() => Dynamic::Map(HashMap::new()),
            _ => Dynamic::Null,
        }
    } else {
        flex::string_map(&own)
    };

    values.insert("tags".to_string(), tags);
    values.insert("tags_all".to_string(), flex::string_map(&all));
}

/// Plans `tags_all` from the planned `tags` so tag-only changes show as a
/// known value instead of "known after apply"
pub fn plan_tags_all(planned: &mut Object, default_tags: &HashMap<String, String>) {
    let tags = planned.string_map("tags");
    if planned.get("tags").map(Dynamic::is_known).unwrap_or(true) {
        planned.insert(
            "tags_all".to_string(),
            flex::string_map(&merged(default_tags, &tags)),
        );
    }
}

/// Tags to send on create
pub fn create_tags(values: &Object, default_tags: &HashMap<String, String>) -> Vec<Tag> {
    to_api(&merged(default_tags, &values.string_map("tags")))
}

/// Difference between the stored `tags_all` and what the plan asks for
pub fn update_diff(
    prior: &Object,
    planned: &Object,
    default_tags: &HashMap<String, String>,
) -> TagDiff {
    diff(
        &prior.string_map("tags_all"),
        &merged(default_tags, &planned.string_map("tags")),
    )
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resource_tags_override_defaults() {
        let all = merged(
            &map(&[("env", "dev"), ("team", "search")]),
            &map(&[("env", "prod")]),
        );
        assert_eq!(all, map(&[("env", "prod"), ("team", "search")]));
    }

    #[test]
    fn diff_reports_changes_and_removals() {
        let diff = diff(
            &map(&[("a", "1"), ("b", "2"), ("aws:cloudformation:stack-name", "x")]),
            &map(&[("a", "1"), ("b", "3"), ("c", "4")]),
        );
        assert_eq!(diff.upsert, vec![Tag::new("b", "3"), Tag::new("c", "4")]);
        assert!(diff.remove.is_empty());

        let diff = super::diff(&map(&[("a", "1"), ("b", "2")]), &map(&[("a", "1")]));
        assert_eq!(diff.remove, vec!["b".to_string()]);
        assert!(super::diff(&map(&[("a", "1")]), &map(&[("a", "1")])).is_empty());
    }

    #[test]
    fn aws_managed_tags_are_hidden() {
        let tags = from_api(vec![
            Tag::new("aws:cloudformation:stack-name", "stack"),
            Tag::new("Name", "search"),
        ]);
        assert_eq!(tags, map(&[("Name", "search")]));
    }

    #[test]
    fn state_separates_default_tags() {
        let mut values = Object::new();
        set_state(
            &mut values,
            map(&[("env", "dev"), ("Name", "search")]),
            &map(&[("env", "dev")]),
        );
        assert_eq!(values.string_map("tags"), map(&[("Name", "search")]));
        assert_eq!(values.string_map("tags_all").len(), 2);

        let mut values = Object::new();
        set_state(&mut values, map(&[("env", "dev")]), &map(&[("env", "dev")]));
        assert_eq!(values.get("tags"), Some(&Dynamic::Null));
    }

    #[test]
    fn tags_all_is_planned_from_tags() {
        let mut planned = Object::new();
        planned.insert("tags".to_string(), Dynamic::string_map([("Name", "search")]));
        plan_tags_all(&mut planned, &map(&[("env", "dev")]));
        assert_eq!(
            planned.string_map("tags_all"),
            map(&[("Name", "search"), ("env", "dev")])
        );

        let mut planned = Object::new();
        planned.insert("tags".to_string(), Dynamic::Unknown);
        plan_tags_all(&mut planned, &HashMap::new());
        assert!(!planned.contains_key("tags_all"));
    }
}
