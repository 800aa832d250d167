//! Amazon Kendra resources and the pieces they share

pub mod resource_data_source;
pub mod resource_experience;
pub mod resource_faq;
pub mod resource_index;
pub mod resource_query_suggestions_block_list;
pub mod resource_thesaurus;

pub use resource_data_source::DataSourceResource;
pub use resource_experience::ExperienceResource;
pub use resource_faq::FaqResource;
pub use resource_index::IndexResource;
pub use resource_query_suggestions_block_list::QuerySuggestionsBlockListResource;
pub use resource_thesaurus::ThesaurusResource;

use std::collections::HashMap;
use std::time::Duration;
use tfplug::plan_modifier::RequiresReplaceIfChanged;
use tfplug::validator::StringPatternValidator;
use tfplug::request::{ModifyPlanRequest, ModifyPlanResponse};
use tfplug::{split_import_id, AttributeBuilder, BlockBuilder, Diagnostics, Dynamic, State};

use crate::api::kendra::S3Path;
use crate::api::{ApiError, Client};
use crate::resources::flex::{self, object, Object, ObjectExt};
use crate::resources::tags;
use crate::AwsProviderData;

/// Returned while a newly created IAM role is not yet trusted by Kendra
pub const IAM_PROPAGATION_MESSAGE: &str =
    "Please make sure your role exists and has `kendra.amazonaws.com` as trusted entity";

/// How long to retry calls that fail with [`IAM_PROPAGATION_MESSAGE`]
pub const PROPAGATION_TIMEOUT: Duration = Duration::from_secs(120);

pub fn is_iam_propagation(err: &ApiError) -> bool {
    err.message_contains("ValidationException", IAM_PROPAGATION_MESSAGE)
}

/// The reason an update wait ended in `ACTIVE_BUT_UPDATE_FAILED`, if it did
pub fn update_failure(status: Option<&str>, error_message: Option<String>) -> Option<String> {
    (status == Some("ACTIVE_BUT_UPDATE_FAILED"))
        .then(|| error_message.unwrap_or_else(|| "status ACTIVE_BUT_UPDATE_FAILED".to_string()))
}

/// Resource id of an index child, `<child id>/<index id>`
pub fn child_id(id: &str, index_id: &str) -> String {
    format!("{}/{}", id, index_id)
}

/// Splits a child resource id into its child and index ids
pub fn parse_child_id(id: &str, kind: &str, diagnostics: &mut Diagnostics) -> Option<(String, String)> {
    let expected = format!("{}-id/index-id", kind);
    split_import_id(id, &expected, diagnostics).map(|(child, index)| (child.to_string(), index.to_string()))
}

/// `arn:<partition>:kendra:<region>:<account>:index/<index id>[/<kind>/<id>]`
pub async fn kendra_arn(client: &Client, index_id: &str, child: Option<(&str, &str)>) -> Result<String, ApiError> {
    let account_id = client.account_id().await?;
    let resource = match child {
        Some((kind, id)) => format!("index/{}/{}/{}", index_id, kind, id),
        None => format!("index/{}", index_id),
    };
    Ok(client.arn("kendra", &account_id, &resource))
}

pub fn client_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reconciles the resource's tags with the plan
pub async fn update_tags(
    client: &Client,
    arn: &str,
    prior: &Object,
    planned: &Object,
    default_tags: &HashMap<String, String>,
) -> Result<(), ApiError> {
    let diff = tags::update_diff(prior, planned, default_tags);
    let api = client.kendra();
    if !diff.remove.is_empty() {
        api.untag_resource(arn, &diff.remove).await?;
    }
    if !diff.upsert.is_empty() {
        api.tag_resource(arn, &diff.upsert).await?;
    }
    Ok(())
}

/// Reads the resource's tags into `values`
pub async fn read_tags(
    client: &Client,
    arn: &str,
    values: &mut Object,
    default_tags: &HashMap<String, String>,
) -> Result<(), ApiError> {
    let tag_list = client.kendra().list_tags(arn).await?;
    tags::set_state(values, tags::from_api(tag_list), default_tags);
    Ok(())
}

pub fn index_id_attribute() -> AttributeBuilder {
    AttributeBuilder::string("index_id")
        .required()
        .description("Identifier of the index")
        .validator(Box::new(StringPatternValidator::new(
            r"^[0-9A-Za-z][0-9A-Za-z-]{35}$",
            "must be 36 alphanumeric characters or hyphens, starting with an alphanumeric character",
        )))
        .plan_modifier(Box::new(RequiresReplaceIfChanged))
}

/// `{bucket, key}` block naming an S3 object
pub fn s3_path_block(name: &str, description: &str, force_new: bool) -> BlockBuilder {
    let field = |name: &str, description: &str| {
        let attribute = AttributeBuilder::string(name).required().description(description);
        if force_new {
            attribute.plan_modifier(Box::new(RequiresReplaceIfChanged))
        } else {
            attribute
        }
    };
    BlockBuilder::list(name)
        .min_items(1)
        .max_items(1)
        .description(description)
        .attribute("bucket", field("bucket", "Name of the S3 bucket that contains the file"))
        .attribute("key", field("key", "Name of the file"))
}

/// Plans `tags_all` for taggable index children
pub fn plan_tags(provider_data: &Option<AwsProviderData>, request: ModifyPlanRequest) -> ModifyPlanResponse {
    let mut planned = request.planned_state.values;
    if let Some(data) = provider_data {
        tags::plan_tags_all(&mut planned, &data.default_tags);
    }
    ModifyPlanResponse {
        planned_state: State::from_values(planned),
        requires_replace: Vec::new(),
        diagnostics: Diagnostics::new(),
    }
}

pub fn expand_s3_path(block: Option<&Object>) -> S3Path {
    block
        .map(|b| S3Path {
            bucket: b.string("bucket").unwrap_or_default(),
            key: b.string("key").unwrap_or_default(),
        })
        .unwrap_or_default()
}

pub fn flatten_s3_path(path: Option<&S3Path>) -> Dynamic {
    flex::block(path.map(|p| {
        object([
            ("bucket", Dynamic::string(&p.bucket)),
            ("key", Dynamic::string(&p.key)),
        ])
    }))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn child_ids_round_trip() {
        let id = child_id("faq-1", "0123456789abcdef0123456789abcdef0123");
        let mut diags = Diagnostics::new();
        let (faq, index) = parse_child_id(&id, "faq", &mut diags).unwrap();
        assert_eq!(faq, "faq-1");
        assert_eq!(index, "0123456789abcdef0123456789abcdef0123");
        assert!(!diags.has_errors());
    }

    #[test]
    fn malformed_child_id_is_reported() {
        let mut diags = Diagnostics::new();
        assert!(parse_child_id("faq-1", "faq", &mut diags).is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn iam_propagation_is_recognised() {
        let err = ApiError::from_service(
            400,
            "ValidationException",
            format!("{}.", IAM_PROPAGATION_MESSAGE),
        );
        assert!(is_iam_propagation(&err));
        assert!(!is_iam_propagation(&ApiError::from_service(
            400,
            "ValidationException",
            "Name is invalid".to_string()
        )));
    }

    #[test]
    fn failed_updates_report_their_reason() {
        assert_eq!(
            update_failure(Some("ACTIVE_BUT_UPDATE_FAILED"), Some("bad file".to_string())),
            Some("bad file".to_string())
        );
        assert!(update_failure(Some("ACTIVE"), Some("stale".to_string())).is_none());
        assert!(update_failure(None, None).is_none());
    }

    #[test]
    fn s3_paths_convert_both_ways() {
        let values = object([(
            "s3_path",
            flatten_s3_path(Some(&S3Path {
                bucket: "docs".to_string(),
                key: "faq.csv".to_string(),
            })),
        )]);
        let path = expand_s3_path(values.block("s3_path"));
        assert_eq!(path.bucket, "docs");
        assert_eq!(path.key, "faq.csv");
    }
}
