pub mod client;
pub mod elasticsearch;
pub mod endpoints;
pub mod error;
pub mod kendra;
pub mod pool;
pub mod sts;

pub use client::{static_credentials, Client, ClientConfig, RetryConfig};
pub use endpoints::{Endpoints, Partition, Service};
pub use error::{not_found_as_none, ApiError};

use serde::{Deserialize, Serialize};

/// Key/value tag as both services put it on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
