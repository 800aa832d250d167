//! Polling helpers shared by resources with asynchronous lifecycles

use std::future::Future;
use std::sync::{Arc, Mutex};
use tfplug::{Context, RetryError, StateChangeConf};

use crate::api::elasticsearch::{DomainStatus, UpgradeStatus, VpcEndpoint};
use crate::api::kendra::{DataSource, Experience, Faq, Index, QuerySuggestionsBlockList, Thesaurus};
use crate::api::ApiError;

/// An API object that reports a lifecycle status
pub trait Observed {
    fn status(&self) -> String;

    /// Why the object is in its current status, reported when a wait fails
    fn status_reason(&self) -> Option<String> {
        None
    }
}

/// Waits with `conf`, refreshing through `find` (which returns `None` once the
/// object is gone). A failed wait carries the last reported status reason.
pub async fn wait_for<T, F, Fut>(
    ctx: &Context,
    conf: StateChangeConf,
    mut find: F,
) -> Result<Option<T>, RetryError>
where
    T: Observed,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ApiError>>,
{
    let last_reason: Arc<Mutex<Option<String>>> = Arc::default();

    let result = conf
        .wait_for_state(ctx, || {
            let lookup = find();
            let last_reason = last_reason.clone();
            async move {
                let found = lookup.await?;
                let status = found.as_ref().map(Observed::status).unwrap_or_default();
                if let Some(reason) = found.as_ref().and_then(Observed::status_reason) {
                    if let Ok(mut slot) = last_reason.lock() {
                        *slot = Some(reason);
                    }
                }
                Ok::<_, ApiError>((found, status))
            }
        })
        .await;

    result.map_err(|err| {
        let reason = last_reason.lock().ok().and_then(|mut slot| slot.take());
        match reason {
            Some(reason) if !reason.is_empty() => err.with_last_error(reason),
            _ => err,
        }
    })
}

impl Observed for DomainStatus {
    fn status(&self) -> String {
        self.domain_processing_status.clone().unwrap_or_default()
    }

    fn status_reason(&self) -> Option<String> {
        self.change_progress_message()
    }
}

impl Observed for UpgradeStatus {
    fn status(&self) -> String {
        self.effective_status()
    }
}

impl Observed for VpcEndpoint {
    fn status(&self) -> String {
        self.status.clone().unwrap_or_default()
    }
}

macro_rules! kendra_observed {
    ($($ty:ty),*) => {
        $(
            impl Observed for $ty {
                fn status(&self) -> String {
                    self.status.clone().unwrap_or_default()
                }

                fn status_reason(&self) -> Option<String> {
                    self.error_message.clone()
                }
            }
        )*
    };
}

kendra_observed!(Index, Faq, Thesaurus, Experience, QuerySuggestionsBlockList, DataSource);

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn faq(status: &str, error: Option<&str>) -> Faq {
        Faq {
            id: "faq".to_string(),
            index_id: "idx".to_string(),
            name: "faq".to_string(),
            status: Some(status.to_string()),
            error_message: error.map(str::to_string),
            ..Default::default()
        }
    }

    fn conf(pending: &[&str], target: &[&str]) -> StateChangeConf {
        StateChangeConf::new(pending, target, Duration::from_secs(5))
            .poll_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn returns_object_on_target() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = wait_for(&Context::new(), conf(&["CREATING"], &["ACTIVE"]), || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(faq(if n < 2 { "CREATING" } else { "ACTIVE" }, None)))
            }
        })
        .await
        .unwrap();

        assert_eq!(result.unwrap().status.as_deref(), Some("ACTIVE"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failure_carries_error_message() {
        let err = wait_for(&Context::new(), conf(&["CREATING"], &["ACTIVE"]), || async {
            Ok(Some(faq("FAILED", Some("S3 object not found"))))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, RetryError::UnexpectedState { .. }));
        assert!(err.to_string().contains("S3 object not found"));
    }

    #[tokio::test]
    async fn missing_object_completes_deletion() {
        let result = wait_for::<Faq, _, _>(&Context::new(), conf(&["DELETING"], &[]), || async {
            Ok(None)
        })
        .await
        .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn api_errors_stop_the_wait() {
        let err = wait_for::<Faq, _, _>(&Context::new(), conf(&["CREATING"], &["ACTIVE"]), || async {
            Err(ApiError::from_service(400, "AccessDeniedException", "denied".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Refresh(_)));
    }
}
