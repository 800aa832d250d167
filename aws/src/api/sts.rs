//! STS GetCallerIdentity, used to learn the account id for ARNs

use super::{ApiError, Client, Service};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub user_id: String,
}

pub struct StsApi<'a> {
    client: &'a Client,
}

impl<'a> StsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST / Action=GetCallerIdentity
    pub async fn get_caller_identity(&self) -> Result<CallerIdentity, ApiError> {
        let body = self
            .client
            .query(
                Service::Sts,
                &[("Action", "GetCallerIdentity"), ("Version", "2011-06-15")],
            )
            .await?;

        let account = xml_element(&body, "Account").ok_or_else(|| {
            ApiError::ParseError("GetCallerIdentity response has no Account".to_string())
        })?;

        Ok(CallerIdentity {
            account,
            arn: xml_element(&body, "Arn").unwrap_or_default(),
            user_id: xml_element(&body, "UserId").unwrap_or_default(),
        })
    }
}

/// Text of the first `<name>` element in a query-protocol XML document
pub(crate) fn xml_element(body: &str, name: &str) -> Option<String> {
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].trim().to_string())
}
