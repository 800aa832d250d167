//! Import helpers for simplifying resource import implementations

use crate::request::{ImportStateRequest, ImportStateResponse};
use crate::types::{Diagnostics, State};

/// Sets the import ID to a single attribute in state
///
/// Example: ID "my-domain" -> state.domain_name = "my-domain"
pub fn import_state_passthrough_id(attribute: &str, request: &ImportStateRequest) -> ImportStateResponse {
    let mut diagnostics = Diagnostics::new();

    if request.id.trim().is_empty() {
        diagnostics.add_error(
            "Import ID must not be empty",
            Some(format!("Expected a value for '{}'", attribute)),
        );
        return ImportStateResponse {
            state: None,
            diagnostics,
        };
    }

    let mut state = State::new();
    state.set(attribute, request.id.clone());
    if attribute != "id" {
        state.set("id", request.id.clone());
    }

    ImportStateResponse {
        state: Some(state),
        diagnostics,
    }
}

/// Splits a composite `part1/part2` import ID such as `faqId/indexId`
pub fn split_import_id<'a>(
    id: &'a str,
    expected: &str,
    diagnostics: &mut Diagnostics,
) -> Option<(&'a str, &'a str)> {
    match id.split_once('/') {
        Some((first, second)) if !first.is_empty() && !second.is_empty() && !second.contains('/') => {
            Some((first, second))
        }
        _ => {
            diagnostics.add_error(
                format!("unexpected format of ID ({}), expected {}", id, expected),
                None::<String>,
            );
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn request(id: &str) -> ImportStateRequest {
        ImportStateRequest {
            context: Context::new(),
            id: id.to_string(),
        }
    }

    #[test]
    fn passthrough_sets_attribute_and_id() {
        let response = import_state_passthrough_id("domain_name", &request("search"));
        let state = response.state.unwrap();
        assert_eq!(state.get_string("domain_name"), Some("search".to_string()));
        assert_eq!(state.get_string("id"), Some("search".to_string()));
    }

    #[test]
    fn passthrough_rejects_empty_id() {
        let response = import_state_passthrough_id("id", &request(" "));
        assert!(response.state.is_none());
        assert!(response.diagnostics.has_errors());
    }

    #[test]
    fn split_import_id_requires_two_parts() {
        let mut diags = Diagnostics::new();
        assert_eq!(
            split_import_id("faq-1/index-1", "FaqID/IndexID", &mut diags),
            Some(("faq-1", "index-1"))
        );
        assert!(split_import_id("faq-1", "FaqID/IndexID", &mut diags).is_none());
        assert!(split_import_id("a/b/c", "FaqID/IndexID", &mut diags).is_none());
        assert_eq!(diags.errors.len(), 2);
        assert!(diags.errors[0].summary.contains("expected FaqID/IndexID"));
    }
}
