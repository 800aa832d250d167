use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::OnceCell;

use super::endpoints::{Endpoints, Partition, Service};
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager};

const JSON_1_1: &str = "application/x-amz-json-1.1";
const REST_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// SigV4-signed client for the AWS services used by the provider
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    region: String,
    partition: Partition,
    endpoints: Endpoints,
    credentials: SharedCredentialsProvider,
    retry_config: RetryConfig,
    account_id: OnceCell<String>,
    skip_account_id: bool,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 60,
        }
    }
}

#[derive(Clone)]
pub struct ClientConfig {
    pub region: String,
    pub endpoints: Endpoints,
    pub retry_config: RetryConfig,
    pub skip_requesting_account_id: bool,
}

impl ClientConfig {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            endpoints: Endpoints::default(),
            retry_config: RetryConfig::default(),
            skip_requesting_account_id: false,
        }
    }
}

/// One request, kept unsigned so every retry attempt is signed afresh
struct PreparedRequest {
    service: Service,
    method: Method,
    url: String,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Code")]
    code: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Static access keys as a credentials provider
pub fn static_credentials(
    access_key: &str,
    secret_key: &str,
    session_token: Option<String>,
) -> SharedCredentialsProvider {
    SharedCredentialsProvider::new(Credentials::new(
        access_key,
        secret_key,
        session_token,
        None,
        "terraform",
    ))
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(region: &str, credentials: SharedCredentialsProvider) -> Result<Self, ApiError> {
        Self::with_config(ClientConfig::new(region), credentials)
    }

    /// Create a new API client with custom endpoints and retry configuration
    pub fn with_config(
        config: ClientConfig,
        credentials: SharedCredentialsProvider,
    ) -> Result<Self, ApiError> {
        let pool_config = ConnectionPoolConfig {
            request_timeout: std::time::Duration::from_secs(config.retry_config.timeout_seconds),
            ..Default::default()
        };

        let pool_manager = ConnectionPoolManager::new(pool_config);
        let http_client = pool_manager.build_client()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                partition: Partition::for_region(&config.region),
                region: config.region,
                endpoints: config.endpoints,
                credentials,
                retry_config: config.retry_config,
                account_id: OnceCell::new(),
                skip_account_id: config.skip_requesting_account_id,
            }),
        })
    }

    pub fn region(&self) -> &str {
        &self.inner.region
    }

    pub fn partition(&self) -> &Partition {
        &self.inner.partition
    }

    pub fn endpoint(&self, service: Service) -> String {
        self.inner
            .endpoints
            .resolve(service, &self.inner.region, &self.inner.partition)
    }

    /// Account of the configured credentials, looked up once through STS.
    /// Empty when `skip_requesting_account_id` is set.
    pub async fn account_id(&self) -> Result<String, ApiError> {
        if self.inner.skip_account_id {
            return Ok(String::new());
        }
        self.inner
            .account_id
            .get_or_try_init(|| async {
                let identity = self.sts().get_caller_identity().await?;
                tracing::debug!(account = %identity.account, "Resolved account id");
                Ok::<_, ApiError>(identity.account)
            })
            .await
            .cloned()
    }

    /// `arn:<partition>:<service>:<region>:<account>:<resource>`
    pub fn arn(&self, service: &str, account_id: &str, resource: &str) -> String {
        format!(
            "arn:{}:{}:{}:{}:{}",
            self.inner.partition.id, service, self.inner.region, account_id, resource
        )
    }

    /// Elasticsearch Service API operations
    pub fn elasticsearch(&self) -> crate::api::elasticsearch::ElasticsearchApi<'_> {
        crate::api::elasticsearch::ElasticsearchApi::new(self)
    }

    /// Kendra API operations
    pub fn kendra(&self) -> crate::api::kendra::KendraApi<'_> {
        crate::api::kendra::KendraApi::new(self)
    }

    /// STS API operations
    pub fn sts(&self) -> crate::api::sts::StsApi<'_> {
        crate::api::sts::StsApi::new(self)
    }

    /// Execute a REST-JSON GET request with retry logic
    pub async fn get<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = PreparedRequest {
            service,
            method: Method::GET,
            url: self.url(service, path, query)?,
            headers: Vec::new(),
            body: Vec::new(),
        };
        let text = self.execute_with_retry(&request).await?;
        parse_json(&text)
    }

    /// Execute a REST-JSON POST request with retry logic
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_vec(body)
            .map_err(|e| ApiError::ParseError(format!("Failed to encode request: {}", e)))?;
        let request = PreparedRequest {
            service,
            method: Method::POST,
            url: self.url(service, path, &[])?,
            headers: vec![("content-type", REST_JSON.to_string())],
            body,
        };
        let text = self.execute_with_retry(&request).await?;
        parse_json(&text)
    }

    /// Execute a REST-JSON DELETE request with retry logic
    pub async fn delete<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
    ) -> Result<T, ApiError> {
        let request = PreparedRequest {
            service,
            method: Method::DELETE,
            url: self.url(service, path, &[])?,
            headers: Vec::new(),
            body: Vec::new(),
        };
        let text = self.execute_with_retry(&request).await?;
        parse_json(&text)
    }

    /// Execute an AWS JSON 1.1 call, `POST /` with an `X-Amz-Target` header
    pub async fn json_rpc<T: DeserializeOwned, B: Serialize>(
        &self,
        service: Service,
        target_prefix: &str,
        operation: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_vec(body)
            .map_err(|e| ApiError::ParseError(format!("Failed to encode request: {}", e)))?;
        let request = PreparedRequest {
            service,
            method: Method::POST,
            url: self.url(service, "/", &[])?,
            headers: vec![
                ("content-type", JSON_1_1.to_string()),
                ("x-amz-target", format!("{}.{}", target_prefix, operation)),
            ],
            body,
        };
        let text = self.execute_with_retry(&request).await?;
        parse_json(&text)
    }

    /// Execute an AWS query-protocol call and return the raw XML body
    pub async fn query(
        &self,
        service: Service,
        params: &[(&str, &str)],
    ) -> Result<String, ApiError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        let request = PreparedRequest {
            service,
            method: Method::POST,
            url: self.url(service, "/", &[])?,
            headers: vec![("content-type", FORM_URLENCODED.to_string())],
            body: body.into_bytes(),
        };
        self.execute_with_retry(&request).await
    }

    fn url(&self, service: Service, path: &str, query: &[(&str, &str)]) -> Result<String, ApiError> {
        let base = self.endpoint(service);
        let mut url = url::Url::parse(&format!("{}{}", base, path))
            .map_err(|e| ApiError::ParseError(format!("Invalid endpoint {}: {}", base, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.to_string())
    }

    /// Sign and send one attempt of `request`
    async fn send(&self, request: &PreparedRequest) -> Result<reqwest::Response, ApiError> {
        let credentials = self
            .inner
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| ApiError::Credentials(e.to_string()))?;

        let identity = credentials.into();
        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.inner.region)
            .name(request.service.signing_name())
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ApiError::Signing(e.to_string()))?
            .into();

        let signable = SignableRequest::new(
            request.method.as_str(),
            request.url.as_str(),
            request.headers.iter().map(|(name, value)| (*name, value.as_str())),
            SignableBody::Bytes(&request.body),
        )
        .map_err(|e| ApiError::Signing(e.to_string()))?;
        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| ApiError::Signing(e.to_string()))?
            .into_parts();

        let mut builder = self
            .inner
            .http_client
            .request(request.method.clone(), &request.url)
            .body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        for (name, value) in instructions.headers() {
            builder = builder.header(name, value);
        }

        Ok(builder.send().await?)
    }

    /// Execute request with retry logic
    async fn execute_with_retry(&self, request: &PreparedRequest) -> Result<String, ApiError> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(&self.inner.retry_config, attempt);
                tracing::debug!(
                    "Retrying {} {} after {}ms (attempt {})",
                    request.method,
                    request.url,
                    backoff,
                    attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            tracing::debug!("{} request to: {}", request.method, request.url);

            match self.send(request).await {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!("Response status: {}", status);

                    if status.is_success() {
                        return Ok(response.text().await?);
                    }

                    let err = error_from_response(response).await;

                    if status == StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error()
                        || err.is_throttling()
                    {
                        last_error = Some(err);
                    } else {
                        return Err(err);
                    }
                }
                Err(ApiError::RequestError(e)) => {
                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
                Err(e) => return Err(e),
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

/// Exponential back-off before retry `attempt`, capped at `max_backoff_ms`
fn backoff_ms(config: &RetryConfig, attempt: u32) -> u64 {
    2_u64
        .checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| config.initial_backoff_ms.checked_mul(factor))
        .map_or(config.max_backoff_ms, |backoff| backoff.min(config.max_backoff_ms))
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let text = if text.trim().is_empty() { "{}" } else { text };
    serde_json::from_str::<T>(text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::ParseError(format!("Failed to parse response: {}", e))
    })
}

/// Turns a non-2xx response into an `ApiError`, reading the error code from
/// the `x-amzn-ErrorType` header, a JSON body or a query-protocol XML body
async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let header_code = response
        .headers()
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let (body_code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error_type.or(body.code), body.message),
        Err(_) => (
            super::sts::xml_element(&text, "Code"),
            super::sts::xml_element(&text, "Message"),
        ),
    };
    let message = message.unwrap_or_else(|| text.clone());

    match header_code.or(body_code) {
        Some(code) if !code.is_empty() => ApiError::from_service(status.as_u16(), &code, message),
        _ if status == StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited,
        _ if status.is_server_error() => ApiError::ServiceUnavailable,
        _ if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            ApiError::AuthError(message)
        }
        _ => ApiError::Service {
            status: status.as_u16(),
            code: "UnknownError".to_string(),
            message,
        },
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn test_client(url: &str, max_retries: u32) -> Client {
        let config = ClientConfig {
            region: "us-east-1".to_string(),
            endpoints: Endpoints::all(url),
            retry_config: RetryConfig {
                max_retries,
                initial_backoff_ms: 1,
                max_backoff_ms: 5,
                timeout_seconds: 5,
            },
            skip_requesting_account_id: false,
        };
        Client::with_config(config, static_credentials("AKIDEXAMPLE", "secret", None)).unwrap()
    }

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[tokio::test]
    async fn requests_are_signed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/2015-01-01/es/domain/search")
            .match_header(
                "authorization",
                Matcher::Regex(
                    r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/us-east-1/es/aws4_request"
                        .to_string(),
                ),
            )
            .match_header("x-amz-date", Matcher::Any)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = test_client(&server.url(), 0);
        let body: serde_json::Value = client
            .get(Service::Elasticsearch, "/2015-01-01/es/domain/search", &[])
            .await
            .unwrap();

        assert_eq!(body["ok"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn session_token_is_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-security-token", "session")
            .with_body("{}")
            .create_async()
            .await;

        let client = Client::with_config(
            ClientConfig {
                endpoints: Endpoints::all(&server.url()),
                ..ClientConfig::new("us-east-1")
            },
            static_credentials("AKIDEXAMPLE", "secret", Some("session".to_string())),
        )
        .unwrap();

        let _: serde_json::Value = client
            .json_rpc(Service::Kendra, "AWSKendraFrontendService", "DescribeIndex", &json!({"Id": "idx"}))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn json_rpc_sets_target_and_content_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", "AWSKendraFrontendService.DescribeIndex")
            .match_header("content-type", JSON_1_1)
            .match_body(Matcher::PartialJson(json!({"Id": "idx-1"})))
            .with_body(r#"{"Id":"idx-1","Status":"ACTIVE"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url(), 0);
        let body: serde_json::Value = client
            .json_rpc(
                Service::Kendra,
                "AWSKendraFrontendService",
                "DescribeIndex",
                &json!({"Id": "idx-1"}),
            )
            .await
            .unwrap();

        assert_eq!(body["Status"], "ACTIVE");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn service_errors_are_parsed_from_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(400)
            .with_body(r#"{"__type":"com.amazonaws.kendra#ResourceNotFoundException","Message":"Index idx-1 not found"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        let err = client
            .json_rpc::<serde_json::Value, _>(
                Service::Kendra,
                "AWSKendraFrontendService",
                "DescribeIndex",
                &json!({"Id": "idx-1"}),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("Index idx-1 not found"));
    }

    #[tokio::test]
    async fn service_errors_are_parsed_from_header() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/2015-01-01/es/domain/missing")
            .with_status(409)
            .with_header("x-amzn-ErrorType", "ResourceNotFoundException:http://internal.amazon.com/")
            .with_body(r#"{"message":"Domain not found: missing"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url(), 0);
        let err = client
            .get::<serde_json::Value>(Service::Elasticsearch, "/2015-01-01/es/domain/missing", &[])
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("Domain not found: missing"));
    }

    #[tokio::test]
    async fn throttling_is_retried() {
        let mut server = Server::new_async().await;
        let throttled = server
            .mock("POST", "/")
            .with_status(400)
            .with_body(r#"{"__type":"ThrottlingException","message":"Rate exceeded"}"#)
            .expect(3)
            .create_async()
            .await;

        let client = test_client(&server.url(), 2);
        let err = client
            .json_rpc::<serde_json::Value, _>(
                Service::Kendra,
                "AWSKendraFrontendService",
                "ListFaqs",
                &json!({}),
            )
            .await
            .unwrap_err();

        assert!(err.is_throttling());
        throttled.assert_async().await;
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let config = RetryConfig::default();
        assert_eq!(backoff_ms(&config, 1), 100);
        assert_eq!(backoff_ms(&config, 2), 200);
        assert_eq!(backoff_ms(&config, 7), 6400);
        assert_eq!(backoff_ms(&config, 8), 10000);
    }

    #[test]
    fn backoff_saturates_for_large_retry_counts() {
        let config = RetryConfig {
            max_retries: 200,
            ..RetryConfig::default()
        };
        assert_eq!(backoff_ms(&config, 58), 10000);
        assert_eq!(backoff_ms(&config, 64), 10000);
        assert_eq!(backoff_ms(&config, 100), 10000);
        assert_eq!(backoff_ms(&config, u32::MAX), 10000);
    }

    #[tokio::test]
    async fn bare_server_errors_become_service_unavailable() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/2015-01-01/es/domain/search")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server.url(), 1);
        let err = client
            .get::<serde_json::Value>(Service::Elasticsearch, "/2015-01-01/es/domain/search", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ServiceUnavailable));
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/2015-01-01/es/domain")
            .with_status(400)
            .with_header("x-amzn-ErrorType", "ValidationException")
            .with_body(r#"{"message":"Domain is still being deleted"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), 3);
        let err = client
            .post::<serde_json::Value, _>(
                Service::Elasticsearch,
                "/2015-01-01/es/domain",
                &json!({"DomainName": "search"}),
            )
            .await
            .unwrap_err();

        assert!(err.message_contains("ValidationException", "still being deleted"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn query_parameters_are_encoded() {
        let mut server = Server::new_async().await;
        let arn = "arn:aws:es:us-east-1:123456789012:domain/search";
        let mock = server
            .mock("GET", "/2015-01-01/tags/")
            .match_query(Matcher::UrlEncoded("arn".to_string(), arn.to_string()))
            .with_body(r#"{"TagList":[]}"#)
            .create_async()
            .await;

        let client = test_client(&server.url(), 0);
        let _: serde_json::Value = client
            .get(Service::Elasticsearch, "/2015-01-01/tags/", &[("arn", arn)])
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_success_body_parses_as_empty_object() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/2015-01-01/es/vpcEndpoints/aos-1")
            .with_body("")
            .create_async()
            .await;

        let client = test_client(&server.url(), 0);
        let result: Result<serde::de::IgnoredAny, _> = client
            .delete(Service::Elasticsearch, "/2015-01-01/es/vpcEndpoints/aos-1")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn connection_failures_exhaust_retries() {
        let client = test_client("http://127.0.0.1:1", 1);
        let err = client
            .get::<serde_json::Value>(Service::Elasticsearch, "/2015-01-01/es/domain/search", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable));
    }

    #[test]
    fn arn_uses_partition_and_region() {
        let client = Client::new("cn-north-1", static_credentials("a", "b", None)).unwrap();
        assert_eq!(
            client.arn("kendra", "123456789012", "index/idx-1"),
            "arn:aws-cn:kendra:cn-north-1:123456789012:index/idx-1"
        );
    }
}
