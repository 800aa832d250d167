use crate::types::{Diagnostics, Dynamic};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub state: Dynamic,
    pub plan: Dynamic,
    pub config: Dynamic,
    pub attribute_path: String,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

/// Trait for modifying terraform plan behavior
///
/// Plan modifiers run after Terraform has generated a plan and can:
/// - Modify the planned value
/// - Mark an attribute as requiring replacement
/// - Add warnings or errors to the plan
pub trait PlanModifier: Send + Sync {
    /// Modify the plan for an attribute
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplaceIfChanged;

impl PlanModifier for RequiresReplaceIfChanged {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = !matches!(
            (&request.state, &request.plan),
            (Dynamic::Null, Dynamic::Null) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && !values_equal(&request.state, &request.plan);

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Uses the prior state value when the planned value is unknown, so computed
/// attributes such as ARNs do not show as "known after apply" on every update
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match &request.plan {
            Dynamic::Unknown => match &request.state {
                Dynamic::Null => request.plan,
                _ => request.state.clone(),
            },
            _ => request.plan,
        };

        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Keeps the prior state value when the planned value is semantically the same,
/// e.g. reformatted JSON or a KMS key id versus its ARN
pub struct SuppressEquivalent<F>
where
    F: Fn(&Dynamic, &Dynamic) -> bool + Send + Sync,
{
    equivalent: F,
}

impl<F> SuppressEquivalent<F>
where
    F: Fn(&Dynamic, &Dynamic) -> bool + Send + Sync,
{
    pub fn new(equivalent: F) -> Self {
        Self { equivalent }
    }
}

impl<F> PlanModifier for SuppressEquivalent<F>
where
    F: Fn(&Dynamic, &Dynamic) -> bool + Send + Sync,
{
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = if request.state.is_null()
            || request.state.is_unknown()
            || request.plan.is_null()
            || request.plan.is_unknown()
        {
            request.plan
        } else if (self.equivalent)(&request.state, &request.plan) {
            request.state
        } else {
            request.plan
        };

        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Compares two Dynamic values for equality
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn change(state: Dynamic, plan: Dynamic) -> PlanModifyRequest {
        PlanModifyRequest {
            config: plan.clone(),
            state,
            plan,
            attribute_path: "index_id".to_string(),
        }
    }

    fn json_equal(a: &Dynamic, b: &Dynamic) -> bool {
        match (a.as_string(), b.as_string()) {
            (Some(a), Some(b)) => {
                serde_json::from_str::<serde_json::Value>(a).ok()
                    == serde_json::from_str::<serde_json::Value>(b).ok()
            }
            _ => false,
        }
    }

    #[test]
    fn replacement_follows_value_changes() {
        let cases = [
            (Dynamic::string("idx-1"), Dynamic::string("idx-1"), false),
            (Dynamic::string("idx-1"), Dynamic::string("idx-2"), true),
            (Dynamic::Null, Dynamic::Null, false),
            (Dynamic::Null, Dynamic::string("idx-1"), true),
            (Dynamic::Unknown, Dynamic::string("idx-1"), false),
            (Dynamic::string("idx-1"), Dynamic::Unknown, false),
        ];

        for (state, plan, replace) in cases {
            let response = RequiresReplaceIfChanged.modify_plan(change(state.clone(), plan.clone()));
            assert_eq!(response.requires_replace, replace, "{:?} -> {:?}", state, plan);
            assert_eq!(response.plan_value, plan);
            assert!(response.diagnostics.errors.is_empty());
        }
    }

    #[test]
    fn unknown_plan_takes_the_stored_value() {
        let arn = Dynamic::string("arn:aws:kendra:us-east-1:123456789012:index/idx-1");

        let response = UseStateForUnknown.modify_plan(change(arn.clone(), Dynamic::Unknown));
        assert_eq!(response.plan_value, arn);

        // nothing stored yet
        let response = UseStateForUnknown.modify_plan(change(Dynamic::Null, Dynamic::Unknown));
        assert!(response.plan_value.is_unknown());

        let response = UseStateForUnknown.modify_plan(change(arn.clone(), Dynamic::string("other")));
        assert_eq!(response.plan_value, Dynamic::string("other"));

        let response = UseStateForUnknown.modify_plan(change(arn, Dynamic::Null));
        assert!(response.plan_value.is_null());
        assert!(!response.requires_replace);
    }

    #[test]
    fn equivalent_json_keeps_the_stored_document() {
        let modifier = SuppressEquivalent::new(json_equal);
        let stored = Dynamic::string(r#"{"Version":"2012-10-17","Statement":[]}"#);

        let response = modifier.modify_plan(change(
            stored.clone(),
            Dynamic::string(r#"{ "Statement": [], "Version": "2012-10-17" }"#),
        ));
        assert_eq!(response.plan_value, stored);

        let edited = Dynamic::string(r#"{"Version":"2008-10-17","Statement":[]}"#);
        let response = modifier.modify_plan(change(stored.clone(), edited.clone()));
        assert_eq!(response.plan_value, edited);

        let response = modifier.modify_plan(change(stored, Dynamic::Unknown));
        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn nested_values_compare_structurally() {
        assert!(values_equal(&Dynamic::Number(3.0), &Dynamic::Number(3.0)));
        assert!(!values_equal(&Dynamic::Number(3.0), &Dynamic::Number(3.5)));
        assert!(!values_equal(&Dynamic::Bool(true), &Dynamic::string("true")));

        let user_token = |claim: &str| {
            Dynamic::Map(HashMap::from([
                ("user_name_attribute_field".to_string(), Dynamic::string(claim)),
                ("key_location".to_string(), Dynamic::string("URL")),
            ]))
        };
        assert!(values_equal(
            &Dynamic::List(vec![user_token("sub")]),
            &Dynamic::List(vec![user_token("sub")])
        ));
        assert!(!values_equal(
            &Dynamic::List(vec![user_token("sub")]),
            &Dynamic::List(vec![user_token("email")])
        ));
        assert!(!values_equal(
            &Dynamic::List(vec![user_token("sub")]),
            &Dynamic::List(vec![user_token("sub"), user_token("sub")])
        ));
    }
}
