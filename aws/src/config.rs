//! Provider configuration: the `provider "aws"` block and its environment fallbacks

use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::Region;
use aws_credential_types::provider::SharedCredentialsProvider;
use std::collections::HashMap;
use tfplug::validator::NumberRangeValidator;
use tfplug::{AttributeBuilder, AttributeType, BlockBuilder, ProviderSchema, SchemaBuilder};

use crate::api::client::{static_credentials, ClientConfig, RetryConfig};
use crate::api::endpoints::Endpoints;
use crate::resources::flex::{Object, ObjectExt};

const DEFAULT_MAX_RETRIES: u32 = 25;

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub token: Option<String>,
    pub profile: Option<String>,
    pub max_retries: u32,
    pub skip_requesting_account_id: bool,
    pub endpoints: Endpoints,
    pub default_tags: HashMap<String, String>,
}

impl ProviderConfig {
    pub fn schema() -> ProviderSchema {
        let endpoint = |name: &str| {
            AttributeBuilder::string(name)
                .optional()
                .description(&format!("Use this to override the default {} service endpoint URL", name))
        };

        SchemaBuilder::new()
            .description("Amazon Elasticsearch Service and Amazon Kendra")
            .attribute(
                "region",
                AttributeBuilder::string("region")
                    .optional()
                    .description("AWS region. Can also be set with AWS_REGION or AWS_DEFAULT_REGION"),
            )
            .attribute(
                "access_key",
                AttributeBuilder::string("access_key")
                    .optional()
                    .description("Access key. Can also be set with AWS_ACCESS_KEY_ID"),
            )
            .attribute(
                "secret_key",
                AttributeBuilder::string("secret_key")
                    .optional()
                    .sensitive()
                    .description("Secret key. Can also be set with AWS_SECRET_ACCESS_KEY"),
            )
            .attribute(
                "token",
                AttributeBuilder::string("token")
                    .optional()
                    .sensitive()
                    .description("Session token. Can also be set with AWS_SESSION_TOKEN"),
            )
            .attribute(
                "profile",
                AttributeBuilder::string("profile")
                    .optional()
                    .description("Shared config profile. Can also be set with AWS_PROFILE"),
            )
            .attribute(
                "max_retries",
                AttributeBuilder::number("max_retries")
                    .optional()
                    .description("Maximum number of times an API call is retried")
                    .validator(Box::new(NumberRangeValidator::between(0.0, 100.0))),
            )
            .attribute(
                "skip_requesting_account_id",
                AttributeBuilder::bool("skip_requesting_account_id")
                    .optional()
                    .description("Skip the STS call that looks up the account id"),
            )
            .block(
                "endpoints",
                BlockBuilder::list("endpoints")
                    .max_items(1)
                    .attribute("elasticsearch", endpoint("elasticsearch"))
                    .attribute("kendra", endpoint("kendra"))
                    .attribute("sts", endpoint("sts")),
            )
            .block(
                "default_tags",
                BlockBuilder::list("default_tags")
                    .max_items(1)
                    .description("Tags applied to every resource that supports them")
                    .attribute(
                        "tags",
                        AttributeBuilder::map("tags", AttributeType::String)
                            .optional()
                            .description("Resource tags to default across all resources"),
                    ),
            )
            .build_provider(0)
    }

    /// Reads the provider block, falling back to the standard AWS environment variables
    pub fn from_values(values: &Object) -> Result<Self, String> {
        let setting = |key: &str, vars: &[&str]| {
            values
                .string(key)
                .or_else(|| vars.iter().find_map(|var| env_var(var)))
        };

        let region = setting("region", &["AWS_REGION", "AWS_DEFAULT_REGION"]).ok_or_else(|| {
            "region is required (set in provider config or the AWS_REGION env var)".to_string()
        })?;
        let access_key = setting("access_key", &["AWS_ACCESS_KEY_ID"]);
        let secret_key = setting("secret_key", &["AWS_SECRET_ACCESS_KEY"]);
        if access_key.is_some() != secret_key.is_some() {
            return Err("access_key and secret_key must be set together".to_string());
        }

        let endpoints = values
            .block("endpoints")
            .map(|block| Endpoints {
                elasticsearch: block.string("elasticsearch"),
                kendra: block.string("kendra"),
                sts: block.string("sts"),
            })
            .unwrap_or_default();

        let max_retries = match values.int("max_retries") {
            Some(n) => u32::try_from(n).map_err(|_| format!("max_retries out of range: {}", n))?,
            None => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            region,
            access_key,
            secret_key,
            token: setting("token", &["AWS_SESSION_TOKEN"]),
            profile: setting("profile", &["AWS_PROFILE"]),
            max_retries,
            skip_requesting_account_id: values.bool("skip_requesting_account_id").unwrap_or(false),
            endpoints,
            default_tags: values
                .block("default_tags")
                .map(|block| block.string_map("tags"))
                .unwrap_or_default(),
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            region: self.region.clone(),
            endpoints: self.endpoints.clone(),
            retry_config: RetryConfig {
                max_retries: self.max_retries,
                ..RetryConfig::default()
            },
            skip_requesting_account_id: self.skip_requesting_account_id,
        }
    }

    /// Static keys when configured, otherwise the default AWS credentials chain
    pub async fn credentials(&self) -> SharedCredentialsProvider {
        if let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key) {
            return static_credentials(access_key, secret_key, self.token.clone());
        }

        let mut chain = DefaultCredentialsChain::builder().region(Region::new(self.region.clone()));
        if let Some(profile) = &self.profile {
            chain = chain.profile_name(profile);
        }
        SharedCredentialsProvider::new(chain.build().await)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::resources::flex::object;
    use serial_test::serial;
    use tfplug::Dynamic;

    const VARS: [&str; 6] = [
        "AWS_REGION",
        "AWS_DEFAULT_REGION",
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_SESSION_TOKEN",
        "AWS_PROFILE",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn provider_block_wins_over_environment() {
        clear_env();
        std::env::set_var("AWS_REGION", "eu-west-1");

        let config = ProviderConfig::from_values(&object([("region", Dynamic::string("us-west-2"))])).unwrap();
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert!(!config.skip_requesting_account_id);

        clear_env();
    }

    #[test]
    #[serial]
    fn environment_fills_unset_settings() {
        clear_env();
        std::env::set_var("AWS_DEFAULT_REGION", "ap-southeast-2");
        std::env::set_var("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "secret");
        std::env::set_var("AWS_SESSION_TOKEN", "session");

        let config = ProviderConfig::from_values(&Object::new()).unwrap();
        assert_eq!(config.region, "ap-southeast-2");
        assert_eq!(config.access_key.as_deref(), Some("AKIDEXAMPLE"));
        assert_eq!(config.token.as_deref(), Some("session"));

        clear_env();
    }

    #[test]
    #[serial]
    fn region_is_required() {
        clear_env();

        let err = ProviderConfig::from_values(&Object::new()).unwrap_err();
        assert!(err.contains("region is required"));
    }

    #[test]
    #[serial]
    fn keys_must_come_in_pairs() {
        clear_env();

        let values = object([
            ("region", Dynamic::string("us-east-1")),
            ("access_key", Dynamic::string("AKIDEXAMPLE")),
        ]);
        let err = ProviderConfig::from_values(&values).unwrap_err();
        assert!(err.contains("must be set together"));
    }

    #[test]
    #[serial]
    fn blocks_configure_endpoints_and_default_tags() {
        clear_env();

        let values = object([
            ("region", Dynamic::string("us-east-1")),
            ("max_retries", Dynamic::Number(5.0)),
            ("skip_requesting_account_id", Dynamic::Bool(true)),
            (
                "endpoints",
                Dynamic::List(vec![Dynamic::Map(object([
                    ("kendra", Dynamic::string("http://localhost:4566")),
                    ("elasticsearch", Dynamic::Null),
                ]))]),
            ),
            (
                "default_tags",
                Dynamic::List(vec![Dynamic::Map(object([(
                    "tags",
                    Dynamic::string_map([("env", "test")]),
                )]))]),
            ),
        ]);

        let config = ProviderConfig::from_values(&values).unwrap();
        assert_eq!(config.endpoints.kendra.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.endpoints.elasticsearch, None);
        assert_eq!(config.default_tags.get("env").map(String::as_str), Some("test"));

        let client_config = config.client_config();
        assert_eq!(client_config.retry_config.max_retries, 5);
        assert!(client_config.skip_requesting_account_id);
    }

    #[test]
    fn schema_marks_secrets_sensitive() {
        let schema = ProviderConfig::schema();
        assert!(schema.attributes["secret_key"].sensitive);
        assert!(schema.attributes["token"].sensitive);
        assert!(!schema.attributes["region"].required);
        assert_eq!(schema.blocks["endpoints"].max_items, 1);
        assert!(schema.blocks["default_tags"].attributes.contains_key("tags"));
    }

    #[test]
    fn max_retries_is_bounded() {
        let schema = ProviderConfig::schema();
        let validator = &schema.attributes["max_retries"].validators[0];

        let mut diags = tfplug::Diagnostics::new();
        validator.validate(&Dynamic::Number(25.0), "max_retries", &mut diags);
        assert!(diags.errors.is_empty());

        validator.validate(&Dynamic::Number(1000.0), "max_retries", &mut diags);
        assert_eq!(diags.errors[0].summary, "max_retries must be at most 100");
    }
}
