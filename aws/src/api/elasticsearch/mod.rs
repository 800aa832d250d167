//! Elasticsearch Service configuration API (`/2015-01-01`)

pub mod types;

pub use types::*;

use serde::de::IgnoredAny;
use serde_json::json;

use crate::api::{ApiError, Client, Service, Tag};

const API_VERSION: &str = "/2015-01-01";

/// Elasticsearch API providing domain, VPC endpoint and tag operations
pub struct ElasticsearchApi<'a> {
    client: &'a Client,
}

impl<'a> ElasticsearchApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn path(suffix: &str) -> String {
        format!("{}{}", API_VERSION, suffix)
    }

    /// POST /2015-01-01/es/domain
    pub async fn create_domain(&self, request: &CreateDomainRequest) -> Result<DomainStatus, ApiError> {
        let response: DomainStatusResponse = self
            .client
            .post(Service::Elasticsearch, &Self::path("/es/domain"), request)
            .await?;
        Ok(response.domain_status)
    }

    /// GET /2015-01-01/es/domain/{name}
    pub async fn describe_domain(&self, name: &str) -> Result<DomainStatus, ApiError> {
        let response: DomainStatusResponse = self
            .client
            .get(Service::Elasticsearch, &Self::path(&format!("/es/domain/{}", name)), &[])
            .await?;
        Ok(response.domain_status)
    }

    /// Describe a domain, treating a domain flagged `Deleted` as not found
    pub async fn find_domain(&self, name: &str) -> Result<Option<DomainStatus>, ApiError> {
        match self.describe_domain(name).await {
            Ok(status) if status.deleted == Some(true) => Ok(None),
            Ok(status) => Ok(Some(status)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// DELETE /2015-01-01/es/domain/{name}
    pub async fn delete_domain(&self, name: &str) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(Service::Elasticsearch, &Self::path(&format!("/es/domain/{}", name)))
            .await
            .map(|_| ())
    }

    /// GET /2015-01-01/es/domain/{name}/config
    pub async fn describe_domain_config(&self, name: &str) -> Result<DomainConfig, ApiError> {
        let response: DomainConfigResponse = self
            .client
            .get(
                Service::Elasticsearch,
                &Self::path(&format!("/es/domain/{}/config", name)),
                &[],
            )
            .await?;
        Ok(response.domain_config)
    }

    /// POST /2015-01-01/es/domain/{name}/config
    pub async fn update_domain_config(
        &self,
        name: &str,
        request: &UpdateDomainConfigRequest,
    ) -> Result<(), ApiError> {
        self.client
            .post::<IgnoredAny, _>(
                Service::Elasticsearch,
                &Self::path(&format!("/es/domain/{}/config", name)),
                request,
            )
            .await
            .map(|_| ())
    }

    /// GET /2015-01-01/es/compatibleVersions?domainName={name}
    pub async fn compatible_versions(&self, name: &str) -> Result<Vec<CompatibleVersionsMap>, ApiError> {
        let response: CompatibleVersionsResponse = self
            .client
            .get(
                Service::Elasticsearch,
                &Self::path("/es/compatibleVersions"),
                &[("domainName", name)],
            )
            .await?;
        Ok(response.compatible_elasticsearch_versions)
    }

    /// POST /2015-01-01/es/upgradeDomain
    pub async fn upgrade_domain(&self, name: &str, target_version: &str) -> Result<(), ApiError> {
        let body = json!({
            "DomainName": name,
            "TargetVersion": target_version,
        });
        self.client
            .post::<IgnoredAny, _>(Service::Elasticsearch, &Self::path("/es/upgradeDomain"), &body)
            .await
            .map(|_| ())
    }

    /// GET /2015-01-01/es/upgradeDomain/{name}/status
    pub async fn upgrade_status(&self, name: &str) -> Result<UpgradeStatus, ApiError> {
        self.client
            .get(
                Service::Elasticsearch,
                &Self::path(&format!("/es/upgradeDomain/{}/status", name)),
                &[],
            )
            .await
    }

    /// POST /2015-01-01/es/vpcEndpoints
    pub async fn create_vpc_endpoint(
        &self,
        domain_arn: &str,
        vpc_options: &VpcOptions,
        client_token: &str,
    ) -> Result<VpcEndpoint, ApiError> {
        let body = json!({
            "DomainArn": domain_arn,
            "VpcOptions": vpc_options,
            "ClientToken": client_token,
        });
        let response: VpcEndpointResponse = self
            .client
            .post(Service::Elasticsearch, &Self::path("/es/vpcEndpoints"), &body)
            .await?;
        Ok(response.vpc_endpoint)
    }

    /// POST /2015-01-01/es/vpcEndpoints/describe
    ///
    /// Returns `None` when the endpoint does not exist.
    pub async fn describe_vpc_endpoint(&self, id: &str) -> Result<Option<VpcEndpoint>, ApiError> {
        let body = json!({ "VpcEndpointIds": [id] });
        let response: DescribeVpcEndpointsResponse = self
            .client
            .post(
                Service::Elasticsearch,
                &Self::path("/es/vpcEndpoints/describe"),
                &body,
            )
            .await?;

        if let Some(error) = response.vpc_endpoint_errors.into_iter().next() {
            let code = error.error_code.unwrap_or_default();
            if code == "ENDPOINT_NOT_FOUND" {
                return Ok(None);
            }
            return Err(ApiError::Service {
                status: 200,
                code,
                message: format!(
                    "{}: {}",
                    error.vpc_endpoint_id.unwrap_or_else(|| id.to_string()),
                    error.error_message.unwrap_or_default()
                ),
            });
        }

        Ok(response.vpc_endpoints.into_iter().next())
    }

    /// POST /2015-01-01/es/vpcEndpoints/update
    pub async fn update_vpc_endpoint(
        &self,
        id: &str,
        vpc_options: &VpcOptions,
    ) -> Result<VpcEndpoint, ApiError> {
        let body = json!({
            "VpcEndpointId": id,
            "VpcOptions": vpc_options,
        });
        let response: VpcEndpointResponse = self
            .client
            .post(Service::Elasticsearch, &Self::path("/es/vpcEndpoints/update"), &body)
            .await?;
        Ok(response.vpc_endpoint)
    }

    /// DELETE /2015-01-01/es/vpcEndpoints/{id}
    pub async fn delete_vpc_endpoint(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(
                Service::Elasticsearch,
                &Self::path(&format!("/es/vpcEndpoints/{}", id)),
            )
            .await
            .map(|_| ())
    }

    /// GET /2015-01-01/tags/?arn={arn}
    pub async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>, ApiError> {
        let response: ListTagsResponse = self
            .client
            .get(Service::Elasticsearch, &Self::path("/tags/"), &[("arn", arn)])
            .await?;
        Ok(response.tag_list)
    }

    /// POST /2015-01-01/tags
    pub async fn add_tags(&self, arn: &str, tags: &[Tag]) -> Result<(), ApiError> {
        let body = json!({ "ARN": arn, "TagList": tags });
        self.client
            .post::<IgnoredAny, _>(Service::Elasticsearch, &Self::path("/tags"), &body)
            .await
            .map(|_| ())
    }

    /// POST /2015-01-01/tags-removal
    pub async fn remove_tags(&self, arn: &str, keys: &[String]) -> Result<(), ApiError> {
        let body = json!({ "ARN": arn, "TagKeys": keys });
        self.client
            .post::<IgnoredAny, _>(Service::Elasticsearch, &Self::path("/tags-removal"), &body)
            .await
            .map(|_| ())
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
    async fn find_domain_treats_deleted_as_missing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/2015-01-01/es/domain/search")
            .with_body(
                r#"{"DomainStatus":{"DomainId":"1/search","DomainName":"search","ARN":"arn:aws:es:us-east-1:1:domain/search","Deleted":true,"DomainProcessingStatus":"Deleting"}}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        assert!(client.elasticsearch().find_domain("search").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_domain_maps_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/2015-01-01/es/domain/missing")
            .with_status(409)
            .with_header("x-amzn-ErrorType", "ResourceNotFoundException")
            .with_body(r#"{"message":"Domain not found: missing"}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        assert!(client.elasticsearch().find_domain("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn describe_vpc_endpoint_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/2015-01-01/es/vpcEndpoints/describe")
            .match_body(Matcher::PartialJson(json!({"VpcEndpointIds": ["aos-1"]})))
            .with_body(
                r#"{"VpcEndpoints":[],"VpcEndpointErrors":[{"VpcEndpointId":"aos-1","ErrorCode":"ENDPOINT_NOT_FOUND","ErrorMessage":"not found"}]}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        assert!(client
            .elasticsearch()
            .describe_vpc_endpoint("aos-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn describe_vpc_endpoint_other_errors_fail() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/2015-01-01/es/vpcEndpoints/describe")
            .with_body(
                r#"{"VpcEndpoints":[],"VpcEndpointErrors":[{"VpcEndpointId":"aos-1","ErrorCode":"SERVER_ERROR","ErrorMessage":"boom"}]}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        let err = client
            .elasticsearch()
            .describe_vpc_endpoint("aos-1")
            .await
            .unwrap_err();
        assert!(err.code_is("SERVER_ERROR"));
    }

    #[tokio::test]
    async fn compatible_versions_are_listed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/2015-01-01/es/compatibleVersions")
            .match_query(Matcher::UrlEncoded("domainName".into(), "search".into()))
            .with_body(
                r#"{"CompatibleElasticsearchVersions":[{"SourceVersion":"7.9","TargetVersions":["7.10"]}]}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        let versions = client
            .elasticsearch()
            .compatible_versions("search")
            .await
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].target_versions, vec!["7.10".to_string()]);
    }

    #[tokio::test]
    async fn tags_are_added_and_removed() {
        let mut server = Server::new_async().await;
        let arn = "arn:aws:es:us-east-1:1:domain/search";
        let add = server
            .mock("POST", "/2015-01-01/tags")
            .match_body(Matcher::PartialJson(json!({
                "ARN": arn,
                "TagList": [{"Key": "env", "Value": "prod"}]
            })))
            .with_body("")
            .create_async()
            .await;
        let remove = server
            .mock("POST", "/2015-01-01/tags-removal")
            .match_body(Matcher::PartialJson(json!({"ARN": arn, "TagKeys": ["old"]})))
            .with_body("")
            .create_async()
            .await;

        let client = client(&server.url());
        let api = client.elasticsearch();
        api.add_tags(arn, &[Tag::new("env", "prod")]).await.unwrap();
        api.remove_tags(arn, &["old".to_string()]).await.unwrap();
        add.assert_async().await;
        remove.assert_async().await;
    }
}
