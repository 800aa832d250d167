pub mod elasticsearch;
pub mod flex;
pub mod kendra;
pub mod plan;
pub mod tags;
pub mod timeouts;
pub mod waiter;

use tfplug::{Diagnostics, State};

use crate::AwsProviderData;
use flex::Object;

/// Provider data, or a "Provider not configured" error in `diagnostics`
pub fn configured<'a>(
    provider_data: &'a Option<AwsProviderData>,
    diagnostics: &mut Diagnostics,
) -> Option<&'a AwsProviderData> {
    if provider_data.is_none() {
        diagnostics.add_error(
            "Provider not configured",
            Some("Provider data was not properly configured"),
        );
    }
    provider_data.as_ref()
}

/// State to hand back after apply, with anything left unknown nulled
pub fn applied_state(mut values: Object) -> State {
    flex::resolve_unknowns(&mut values);
    State::from_values(values)
}
