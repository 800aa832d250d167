use crate::context::Context;
use crate::types::{Config, Diagnostics, State};

#[derive(Clone)]
pub struct ConfigureRequest {
    pub context: Context,
    pub config: Config,
    pub terraform_version: String,
}

#[derive(Clone)]
pub struct ConfigureResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct SchemaRequest {
    pub context: Context,
}

pub struct ResourceSchemaResponse {
    pub schema: crate::provider::ResourceSchema,
    pub diagnostics: Diagnostics,
}

pub struct DataSourceSchemaResponse {
    pub schema: crate::provider::DataSourceSchema,
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct ValidateRequest {
    pub context: Context,
    pub config: Config,
}

#[derive(Clone)]
pub struct ValidateResponse {
    pub diagnostics: Diagnostics,
}

/// Resource-level plan customization after attribute defaults and modifiers ran.
/// `prior_state` is `None` on create.
#[derive(Clone)]
pub struct ModifyPlanRequest {
    pub context: Context,
    pub config: Config,
    pub prior_state: Option<State>,
    pub planned_state: State,
}

#[derive(Clone)]
pub struct ModifyPlanResponse {
    pub planned_state: State,
    /// Top-level attribute names that force replacement
    pub requires_replace: Vec<String>,
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct CreateRequest {
    pub context: Context,
    pub config: Config,
    pub planned_state: State,
}

#[derive(Clone)]
pub struct CreateResponse {
    pub state: State,
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct ReadRequest {
    pub context: Context,
    pub current_state: State,
}

#[derive(Clone)]
pub struct ReadResponse {
    pub state: Option<State>,
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct UpdateRequest {
    pub context: Context,
    pub config: Config,
    pub planned_state: State,
    pub current_state: State,
}

#[derive(Clone)]
pub struct UpdateResponse {
    pub state: State,
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct DeleteRequest {
    pub context: Context,
    pub current_state: State,
}

#[derive(Clone)]
pub struct DeleteResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct ImportStateRequest {
    pub context: Context,
    pub id: String,
}

#[derive(Clone)]
pub struct ImportStateResponse {
    pub state: Option<State>,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Config, Dynamic, State};
    use std::collections::HashMap;

    #[test]
    fn create_request_contains_config_and_planned_state() {
        let mut config = Config::new();
        config.set("name", "products");
        let planned_state = State::new();

        let req = CreateRequest {
            context: Context::new(),
            config,
            planned_state,
        };

        assert_eq!(req.config.get_string("name").as_deref(), Some("products"));
        assert_eq!(req.planned_state.values.len(), 0);
    }

    #[test]
    fn read_request_contains_current_state() {
        let mut values = HashMap::new();
        values.insert(
            "id".to_string(),
            Dynamic::String("arn:aws:es:us-east-1:123456789012:domain/search".to_string()),
        );

        let req = ReadRequest {
            context: Context::new(),
            current_state: State { values },
        };

        assert_eq!(req.current_state.values.len(), 1);
    }

    #[test]
    fn modify_plan_request_marks_create_with_no_prior_state() {
        let req = ModifyPlanRequest {
            context: Context::new(),
            config: Config::new(),
            prior_state: None,
            planned_state: State::new(),
        };

        assert!(req.prior_state.is_none());
    }
}
