//! The `timeouts` block: per-operation overrides such as `create = "90m"`

use std::time::Duration;
use tfplug::validator::Validator;
use tfplug::{AttributeBuilder, BlockBuilder, Diagnostics, Dynamic};

use super::flex::{Object, ObjectExt};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const fn minutes(create: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * 60),
            update: Duration::from_secs(update * 60),
            delete: Duration::from_secs(delete * 60),
        }
    }

    /// Schema for the block, with one attribute per operation
    pub fn block(operations: &[&str]) -> BlockBuilder {
        operations.iter().fold(
            BlockBuilder::single("timeouts").description("Operation timeouts"),
            |block, op| {
                block.attribute(
                    op,
                    AttributeBuilder::string(op)
                        .optional()
                        .description("Duration such as \"30s\", \"10m\" or \"2h\"")
                        .validator(Box::new(DurationValidator)),
                )
            },
        )
    }

    /// These defaults with the overrides from the `timeouts` block in `values`
    pub fn resolve(self, values: &Object) -> Self {
        let Some(block) = values.block("timeouts") else {
            return self;
        };
        let pick = |op: &str, default: Duration| {
            block
                .string(op)
                .and_then(|v| parse_duration(&v))
                .unwrap_or(default)
        };
        Self {
            create: pick("create", self.create),
            update: pick("update", self.update),
            delete: pick("delete", self.delete),
        }
    }
}

/// Parses Go-style durations: `90s`, `45m`, `1h30m`, `1.5h`
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let mut total = 0f64;
    let mut rest = value;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 0.001,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += number * seconds;
    }

    Some(Duration::from_secs_f64(total))
}

pub struct DurationValidator;

impl Validator for DurationValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if parse_duration(s).is_none() {
                diagnostics.add_attribute_error(
                    attribute_path,
                    format!("{} must be a duration", attribute_path),
                    format!("Got '{}', expected a value like \"60m\"", s),
                );
            }
        }
    }

    fn description(&self) -> String {
        "duration".to_string()
    }
}
