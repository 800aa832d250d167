//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AwsProviderData {
    pub client: Arc<Client>,
    /// `default_tags.tags` from the provider block
    pub default_tags: HashMap<String, String>,
}

impl AwsProviderData {
    pub fn new(client: Client, default_tags: HashMap<String, String>) -> Self {
        Self {
            client: Arc::new(client),
            default_tags,
        }
    }
}
