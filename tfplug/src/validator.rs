use crate::types::{Diagnostics, Dynamic};

/// Attribute validators run during ValidateResourceConfig against known, non-null values
pub trait Validator: Send + Sync {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics);

    fn description(&self) -> String {
        String::new()
    }
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for StringLengthValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            let len = s.chars().count();
            if let Some(min) = self.min {
                if len < min {
                    diagnostics.add_attribute_error(
                        attribute_path,
                        format!("{} must have minimum length of {}", attribute_path, min),
                        format!("Got length {}", len),
                    );
                }
            }
            if let Some(max) = self.max {
                if len > max {
                    diagnostics.add_attribute_error(
                        attribute_path,
                        format!("{} must have maximum length of {}", attribute_path, max),
                        format!("Got length {}", len),
                    );
                }
            }
        }
    }

    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }
}

pub struct StringPatternValidator {
    pattern: Result<regex::Regex, regex::Error>,
    description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: &str, description: impl Into<String>) -> Self {
        Self {
            pattern: regex::Regex::new(pattern),
            description: description.into(),
        }
    }
}

impl Validator for StringPatternValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        let pattern = match &self.pattern {
            Ok(pattern) => pattern,
            Err(e) => {
                diagnostics.add_error(
                    format!("Invalid validation pattern for {}", attribute_path),
                    Some(e.to_string()),
                );
                return;
            }
        };
        if let Some(s) = value.as_string() {
            if !pattern.is_match(s) {
                diagnostics.add_attribute_error(
                    attribute_path,
                    format!("{} must match {}", attribute_path, self.description),
                    format!("Value '{}' does not match pattern {}", s, pattern),
                );
            }
        }
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

pub struct StringOneOfValidator {
    pub values: Vec<String>,
}

impl StringOneOfValidator {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for StringOneOfValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if !self.values.iter().any(|v| v == s) {
                diagnostics.add_attribute_error(
                    attribute_path,
                    format!(
                        "{} must be one of: {}",
                        attribute_path,
                        self.values.join(", ")
                    ),
                    format!("Got '{}'", s),
                );
            }
        }
    }

    fn description(&self) -> String {
        format!("one of {}", self.values.join(", "))
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

impl Validator for NumberRangeValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.add_attribute_error(
                        attribute_path,
                        format!("{} must be at least {}", attribute_path, min),
                        format!("Got {}", n),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.add_attribute_error(
                        attribute_path,
                        format!("{} must be at most {}", attribute_path, max),
                        format!("Got {}", n),
                    );
                }
            }
        }
    }

    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }
}

pub struct NumberOneOfValidator {
    pub values: Vec<f64>,
}

impl Validator for NumberOneOfValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_number() {
            if !self.values.iter().any(|v| (v - n).abs() < f64::EPSILON) {
                let allowed: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
                diagnostics.add_attribute_error(
                    attribute_path,
                    format!("{} must be one of: {}", attribute_path, allowed.join(", ")),
                    format!("Got {}", n),
                );
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Dynamic::List(items) = value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.add_attribute_error(
                        attribute_path,
                        format!("{} must have at least {} items", attribute_path, min),
                        format!("Got {} items", items.len()),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.add_attribute_error(
                        attribute_path,
                        format!("{} must have at most {} items", attribute_path, max),
                        format!("Got {} items", items.len()),
                    );
                }
            }
        }
    }
}

/// Applies the wrapped validator to every item of a list or set
pub struct EachElementValidator(pub Box<dyn Validator>);

impl Validator for EachElementValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Dynamic::List(items) = value {
            for (i, item) in items.iter().enumerate() {
                if item.is_known() && !item.is_null() {
                    self.0
                        .validate(item, &format!("{}[{}]", attribute_path, i), diagnostics);
                }
            }
        }
    }

    fn description(&self) -> String {
        format!("each element: {}", self.0.description())
    }
}

/// Accepts any string that parses as a JSON document
pub struct JsonStringValidator;

impl Validator for JsonStringValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(s) {
                diagnostics.add_attribute_error(
                    attribute_path,
                    format!("{} contains an invalid JSON", attribute_path),
                    e.to_string(),
                );
            }
        }
    }

    fn description(&self) -> String {
        "valid JSON document".to_string()
    }
}

/// Accepts `arn:partition:service:region:account:resource`
pub struct ArnValidator;

pub fn is_valid_arn(value: &str) -> bool {
    let parts: Vec<&str> = value.splitn(6, ':').collect();
    if parts.len() != 6 || parts[0] != "arn" {
        return false;
    }
    let (partition, service, account, resource) = (parts[1], parts[2], parts[4], parts[5]);
    partition.starts_with("aws")
        && !service.is_empty()
        && !resource.is_empty()
        && (account.is_empty()
            || account == "aws"
            || (account.len() == 12 && account.chars().all(|c| c.is_ascii_digit())))
}

impl Validator for ArnValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if !is_valid_arn(s) {
                diagnostics.add_attribute_error(
                    attribute_path,
                    format!("{} is an invalid ARN", attribute_path),
                    format!("Got '{}'", s),
                );
            }
        }
    }

    fn description(&self) -> String {
        "valid ARN".to_string()
    }
}

/// Accepts RFC 3339 timestamps such as `2021-01-01T00:00:00Z`
pub struct Rfc3339Validator;

impl Validator for Rfc3339Validator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if chrono::DateTime::parse_from_rfc3339(s).is_err() {
                diagnostics.add_attribute_error(
                    attribute_path,
                    format!("{} must be a valid RFC3339 timestamp", attribute_path),
                    format!("Got '{}'", s),
                );
            }
        }
    }
}
