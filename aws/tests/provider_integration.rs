#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use aws::AwsProvider;
use mockito::{Matcher, Server, ServerGuard};
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::request::{ConfigureRequest, ReadRequest};
use tfplug::{Config, DataSourceV2, Dynamic, ProviderV2, ResourceV2, State};

const IDENTITY: &str = r#"<GetCallerIdentityResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <GetCallerIdentityResult>
    <Arn>arn:aws:iam::123456789012:user/terraform</Arn>
    <UserId>AIDAEXAMPLE</UserId>
    <Account>123456789012</Account>
  </GetCallerIdentityResult>
</GetCallerIdentityResponse>"#;

async fn configured_provider(server: &ServerGuard) -> AwsProvider {
    let endpoints = HashMap::from([
        ("elasticsearch".to_string(), Dynamic::string(server.url())),
        ("kendra".to_string(), Dynamic::string(server.url())),
        ("sts".to_string(), Dynamic::string(server.url())),
    ]);
    let values = HashMap::from([
        ("region".to_string(), Dynamic::string("us-east-1")),
        ("access_key".to_string(), Dynamic::string("AKIDEXAMPLE")),
        ("secret_key".to_string(), Dynamic::string("secret")),
        ("max_retries".to_string(), Dynamic::Number(0.0)),
        ("endpoints".to_string(), Dynamic::List(vec![Dynamic::Map(endpoints)])),
        (
            "default_tags".to_string(),
            Dynamic::List(vec![Dynamic::Map(HashMap::from([(
                "tags".to_string(),
                Dynamic::string_map([("owner", "platform")]),
            )]))]),
        ),
    ]);

    let mut provider = AwsProvider::new();
    let response = provider
        .configure(ConfigureRequest {
            context: Context::new(),
            config: Config { values },
            terraform_version: "1.9.0".to_string(),
        })
        .await;
    assert!(response.diagnostics.errors.is_empty());
    provider
}

async fn mock_identity(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::Regex("Action=GetCallerIdentity".to_string()))
        .with_body(IDENTITY)
        .create_async()
        .await
}

fn read_request(values: &[(&str, &str)]) -> ReadRequest {
    ReadRequest {
        context: Context::new(),
        current_state: State::from_values(
            values
                .iter()
                .map(|(k, v)| (k.to_string(), Dynamic::string(*v)))
                .collect(),
        ),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn faq_data_source_reads_through_the_provider() {
    let mut server = Server::new_async().await;
    let _identity = mock_identity(&mut server).await;
    let _faq = server
        .mock("POST", "/")
        .match_header("x-amz-target", "AWSKendraFrontendService.DescribeFaq")
        .match_body(Matcher::PartialJson(serde_json::json!({"Id": "faq-1", "IndexId": "idx"})))
        .with_body(
            r#"{"Id":"faq-1","IndexId":"idx","Name":"support","FileFormat":"CSV","LanguageCode":"en",
                "S3Path":{"Bucket":"faqs","Key":"support.csv"},"Status":"ACTIVE",
                "CreatedAt":1609459200.0,"UpdatedAt":1609459200.0}"#,
        )
        .create_async()
        .await;
    let _tags = server
        .mock("POST", "/")
        .match_header("x-amz-target", "AWSKendraFrontendService.ListTagsForResource")
        .with_body(r#"{"Tags":[{"Key":"owner","Value":"platform"},{"Key":"team","Value":"search"}]}"#)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let data_source = provider.create_data_source("aws_kendra_faq").await.unwrap();
    let response = data_source
        .read(read_request(&[("faq_id", "faq-1"), ("index_id", "idx")]))
        .await;

    assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics.errors);
    let state = response.state.unwrap();
    assert_eq!(state.values["id"], Dynamic::string("faq-1/idx"));
    assert_eq!(state.values["name"], Dynamic::string("support"));
    assert_eq!(
        state.values["arn"],
        Dynamic::string("arn:aws:kendra:us-east-1:123456789012:index/idx/faq/faq-1")
    );
    assert_eq!(state.values["created_at"], Dynamic::string("2021-01-01T00:00:00Z"));

    // data sources report default tags too
    let tags = state.values["tags"].as_map().unwrap();
    assert_eq!(tags.len(), 2);
    assert!(!state.values.contains_key("tags_all"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_index_is_a_data_source_error() {
    let mut server = Server::new_async().await;
    let _index = server
        .mock("POST", "/")
        .match_header("x-amz-target", "AWSKendraFrontendService.DescribeIndex")
        .with_status(400)
        .with_body(r#"{"__type":"ResourceNotFoundException","Message":"Index missing"}"#)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let data_source = provider.create_data_source("aws_kendra_index").await.unwrap();
    let response = data_source.read(read_request(&[("id", "missing")])).await;

    assert!(response.state.is_none());
    assert_eq!(
        response.diagnostics.errors[0].summary,
        "Kendra Index (missing) not found"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn vanished_thesaurus_is_removed_from_state() {
    let mut server = Server::new_async().await;
    let _thesaurus = server
        .mock("POST", "/")
        .match_header("x-amz-target", "AWSKendraFrontendService.DescribeThesaurus")
        .with_status(400)
        .with_body(r#"{"__type":"ResourceNotFoundException","Message":"gone"}"#)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let resource = provider.create_resource("aws_kendra_thesaurus").await.unwrap();
    let response = resource.read(read_request(&[("id", "th-1/idx")])).await;

    assert!(response.diagnostics.errors.is_empty());
    assert!(response.state.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn api_errors_keep_the_prior_state() {
    let mut server = Server::new_async().await;
    let _faq = server
        .mock("POST", "/")
        .match_header("x-amz-target", "AWSKendraFrontendService.DescribeFaq")
        .with_status(400)
        .with_body(r#"{"__type":"AccessDeniedException","Message":"not allowed"}"#)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let resource = provider.create_resource("aws_kendra_faq").await.unwrap();
    let response = resource.read(read_request(&[("id", "faq-1/idx")])).await;

    assert!(response.state.is_some());
    assert!(response.diagnostics.errors[0].summary.contains("reading Kendra Faq (faq-1/idx)"));
    assert!(response.diagnostics.errors[0].summary.contains("not allowed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn elasticsearch_domain_data_source_needs_an_existing_domain() {
    let mut server = Server::new_async().await;
    let _domain = server
        .mock("GET", "/2015-01-01/es/domain/logs")
        .with_status(409)
        .with_header("x-amzn-ErrorType", "ResourceNotFoundException")
        .with_body(r#"{"message":"Domain not found: logs"}"#)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let data_source = provider
        .create_data_source("aws_elasticsearch_domain")
        .await
        .unwrap();
    let response = data_source.read(read_request(&[("domain_name", "logs")])).await;

    assert!(response.state.is_none());
    assert_eq!(
        response.diagnostics.errors[0].summary,
        "Elasticsearch Domain (logs) not found"
    );
}
