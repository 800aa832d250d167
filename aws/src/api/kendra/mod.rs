//! Amazon Kendra API (`AWSKendraFrontendService`, JSON 1.1)

pub mod types;

pub use types::*;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::json;

use crate::api::{not_found_as_none, ApiError, Client, Service, Tag};

const TARGET_PREFIX: &str = "AWSKendraFrontendService";

/// Kendra API providing index and index-child operations
pub struct KendraApi<'a> {
    client: &'a Client,
}

impl<'a> KendraApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    async fn call<T: DeserializeOwned, B: Serialize>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.client
            .json_rpc(Service::Kendra, TARGET_PREFIX, operation, body)
            .await
    }

    async fn call_ignore<B: Serialize>(&self, operation: &str, body: &B) -> Result<(), ApiError> {
        self.call::<IgnoredAny, _>(operation, body).await.map(|_| ())
    }

    /// `{Id, IndexId}` body used by every index-child operation
    fn child(id: &str, index_id: &str) -> serde_json::Value {
        json!({ "Id": id, "IndexId": index_id })
    }

    // Index

    pub async fn create_index(&self, request: &CreateIndexRequest) -> Result<String, ApiError> {
        let response: CreateResponse = self.call("CreateIndex", request).await?;
        Ok(response.id)
    }

    pub async fn describe_index(&self, id: &str) -> Result<Index, ApiError> {
        self.call("DescribeIndex", &json!({ "Id": id })).await
    }

    pub async fn find_index(&self, id: &str) -> Result<Option<Index>, ApiError> {
        not_found_as_none(self.describe_index(id).await)
    }

    pub async fn update_index(&self, request: &UpdateIndexRequest) -> Result<(), ApiError> {
        self.call_ignore("UpdateIndex", request).await
    }

    pub async fn delete_index(&self, id: &str) -> Result<(), ApiError> {
        self.call_ignore("DeleteIndex", &json!({ "Id": id })).await
    }

    // FAQ

    pub async fn create_faq(&self, request: &CreateFaqRequest) -> Result<String, ApiError> {
        let response: CreateResponse = self.call("CreateFaq", request).await?;
        Ok(response.id)
    }

    pub async fn find_faq(&self, id: &str, index_id: &str) -> Result<Option<Faq>, ApiError> {
        not_found_as_none(self.call("DescribeFaq", &Self::child(id, index_id)).await)
    }

    pub async fn delete_faq(&self, id: &str, index_id: &str) -> Result<(), ApiError> {
        self.call_ignore("DeleteFaq", &Self::child(id, index_id)).await
    }

    // Thesaurus

    pub async fn create_thesaurus(&self, request: &CreateThesaurusRequest) -> Result<String, ApiError> {
        let response: CreateResponse = self.call("CreateThesaurus", request).await?;
        Ok(response.id)
    }

    pub async fn find_thesaurus(&self, id: &str, index_id: &str) -> Result<Option<Thesaurus>, ApiError> {
        not_found_as_none(self.call("DescribeThesaurus", &Self::child(id, index_id)).await)
    }

    pub async fn update_thesaurus(&self, request: &UpdateS3BackedRequest) -> Result<(), ApiError> {
        self.call_ignore("UpdateThesaurus", request).await
    }

    pub async fn delete_thesaurus(&self, id: &str, index_id: &str) -> Result<(), ApiError> {
        self.call_ignore("DeleteThesaurus", &Self::child(id, index_id)).await
    }

    // Experience

    pub async fn create_experience(&self, request: &CreateExperienceRequest) -> Result<String, ApiError> {
        let response: CreateResponse = self.call("CreateExperience", request).await?;
        Ok(response.id)
    }

    pub async fn find_experience(&self, id: &str, index_id: &str) -> Result<Option<Experience>, ApiError> {
        not_found_as_none(self.call("DescribeExperience", &Self::child(id, index_id)).await)
    }

    pub async fn update_experience(&self, request: &UpdateExperienceRequest) -> Result<(), ApiError> {
        self.call_ignore("UpdateExperience", request).await
    }

    pub async fn delete_experience(&self, id: &str, index_id: &str) -> Result<(), ApiError> {
        self.call_ignore("DeleteExperience", &Self::child(id, index_id)).await
    }

    // Query suggestions block list

    pub async fn create_query_suggestions_block_list(
        &self,
        request: &CreateQuerySuggestionsBlockListRequest,
    ) -> Result<String, ApiError> {
        let response: CreateResponse = self.call("CreateQuerySuggestionsBlockList", request).await?;
        Ok(response.id)
    }

    pub async fn find_query_suggestions_block_list(
        &self,
        id: &str,
        index_id: &str,
    ) -> Result<Option<QuerySuggestionsBlockList>, ApiError> {
        not_found_as_none(
            self.call("DescribeQuerySuggestionsBlockList", &Self::child(id, index_id))
                .await,
        )
    }

    pub async fn update_query_suggestions_block_list(
        &self,
        request: &UpdateS3BackedRequest,
    ) -> Result<(), ApiError> {
        self.call_ignore("UpdateQuerySuggestionsBlockList", request).await
    }

    pub async fn delete_query_suggestions_block_list(
        &self,
        id: &str,
        index_id: &str,
    ) -> Result<(), ApiError> {
        self.call_ignore("DeleteQuerySuggestionsBlockList", &Self::child(id, index_id))
            .await
    }

    // Data source

    pub async fn create_data_source(&self, request: &CreateDataSourceRequest) -> Result<String, ApiError> {
        let response: CreateResponse = self.call("CreateDataSource", request).await?;
        Ok(response.id)
    }

    pub async fn find_data_source(&self, id: &str, index_id: &str) -> Result<Option<DataSource>, ApiError> {
        not_found_as_none(self.call("DescribeDataSource", &Self::child(id, index_id)).await)
    }

    pub async fn update_data_source(&self, request: &UpdateDataSourceRequest) -> Result<(), ApiError> {
        self.call_ignore("UpdateDataSource", request).await
    }

    pub async fn delete_data_source(&self, id: &str, index_id: &str) -> Result<(), ApiError> {
        self.call_ignore("DeleteDataSource", &Self::child(id, index_id)).await
    }

    // Tags

    pub async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, ApiError> {
        let response: ListTagsResponse = self
            .call("ListTagsForResource", &json!({ "ResourceARN": arn }))
            .await?;
        Ok(response.tags)
    }

    pub async fn tag_resource(&self, arn: &str, tags: &[Tag]) -> Result<(), ApiError> {
        self.call_ignore("TagResource", &json!({ "ResourceARN": arn, "Tags": tags }))
            .await
    }

    pub async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<(), ApiError> {
        self.call_ignore("UntagResource", &json!({ "ResourceARN": arn, "TagKeys": keys }))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::{static_credentials, ClientConfig, Endpoints, RetryConfig};
    use mockito::{Matcher, Server};

    fn client(url: &str) -> Client {
        Client::with_config(
            ClientConfig {
                endpoints: Endpoints::all(url),
                retry_config: RetryConfig {
                    max_retries: 0,
                    ..Default::default()
                },
                ..ClientConfig::new("us-east-1")
            },
            static_credentials("AKIDEXAMPLE", "secret", None),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_faq_returns_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", "AWSKendraFrontendService.CreateFaq")
            .match_body(Matcher::PartialJson(json!({
                "IndexId": "idx",
                "Name": "faq",
                "S3Path": {"Bucket": "bucket", "Key": "faq.csv"}
            })))
            .with_body(r#"{"Id":"faq-1"}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let id = client
            .kendra()
            .create_faq(&CreateFaqRequest {
                index_id: "idx".to_string(),
                name: "faq".to_string(),
                role_arn: "arn:aws:iam::123456789012:role/kendra".to_string(),
                s3_path: S3Path {
                    bucket: "bucket".to_string(),
                    key: "faq.csv".to_string(),
                },
                client_token: "token".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(id, "faq-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn find_returns_none_when_missing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", "AWSKendraFrontendService.DescribeThesaurus")
            .with_status(400)
            .with_body(r#"{"__type":"ResourceNotFoundException","Message":"missing"}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let found = client.kendra().find_thesaurus("th-1", "idx").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn other_errors_propagate_from_find() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(400)
            .with_body(r#"{"__type":"AccessDeniedException","Message":"denied"}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let err = client.kendra().find_index("idx").await.unwrap_err();
        assert!(err.code_is("AccessDeniedException"));
    }

    #[tokio::test]
    async fn tags_use_resource_arn() {
        let mut server = Server::new_async().await;
        let arn = "arn:aws:kendra:us-east-1:123456789012:index/idx";
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", "AWSKendraFrontendService.ListTagsForResource")
            .match_body(Matcher::PartialJson(json!({"ResourceARN": arn})))
            .with_body(r#"{"Tags":[{"Key":"env","Value":"prod"}]}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let tags = client.kendra().list_tags(arn).await.unwrap();
        assert_eq!(tags, vec![Tag::new("env", "prod")]);
        mock.assert_async().await;
    }
}
