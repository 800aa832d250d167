//! Plan modifiers shared by the AWS resources

use std::cmp::Ordering;
use tfplug::plan_modifier::{PlanModifier, PlanModifyRequest, PlanModifyResponse};
use tfplug::{Diagnostics, Dynamic};

/// Keeps the stored items of an optional block the API fills in when the
/// configuration leaves the block out, so server-side values do not show as
/// a removal on every plan
pub struct KeepUnconfiguredBlock;

impl PlanModifier for KeepUnconfiguredBlock {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let unconfigured = matches!(&request.config, Dynamic::List(items) if items.is_empty())
            || request.config.is_null();
        let stored = matches!(&request.state, Dynamic::List(items) if !items.is_empty());

        PlanModifyResponse {
            plan_value: if unconfigured && stored {
                request.state
            } else {
                request.plan
            },
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Version strings such as `7.10` as comparable components
fn version_parts(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Orders two dotted versions, treating missing components as zero so `7`
/// and `7.0` are the same version. `None` when either is not a dotted number.
fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let (a, b) = (version_parts(a)?, version_parts(b)?);
    let len = a.len().max(b.len());
    let part = |parts: &[u64], i: usize| parts.get(i).copied().unwrap_or(0);
    Some(
        (0..len)
            .map(|i| part(&a, i).cmp(&part(&b, i)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal),
    )
}

/// `version >= minimum`, false when either is not a dotted number
pub fn version_at_least(version: &str, minimum: &str) -> bool {
    compare_versions(version, minimum).is_some_and(Ordering::is_ge)
}

/// `version < maximum`, false when either is not a dotted number
pub fn version_below(version: &str, maximum: &str) -> bool {
    compare_versions(version, maximum).is_some_and(Ordering::is_lt)
}
