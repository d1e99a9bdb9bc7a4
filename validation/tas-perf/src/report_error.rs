//! Fire-and-forget failure notifications to the local helper.

use tas_protocol::endpoints;
use tas_protocol::Component;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Posts `report-error?component=...` without ever blocking the caller.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    client: reqwest::Client,
    endpoint: String,
}

impl ErrorReporter {
    pub fn new(client: reqwest::Client, helper_url: &str) -> Self {
        Self {
            client,
            endpoint: endpoints::join(helper_url, endpoints::HELPER_REPORT_ERROR),
        }
    }

    /// Dispatch a report on a detached task.
    ///
    /// The returned handle may be dropped; the report is still delivered. Its
    /// outcome is only logged.
    pub fn report(&self, component: Component) -> JoinHandle<()> {
        let request = self
            .client
            .post(&self.endpoint)
            .query(&[("component", component.as_str())]);

        tokio::spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(component = %component, "Error report delivered");
                }
                Ok(response) => {
                    warn!(
                        component = %component,
                        status = response.status().as_u16(),
                        "Error report rejected"
                    );
                }
                Err(e) => {
                    warn!(component = %component, error = %e, "Error report failed");
                }
            }
        })
    }
}
