//! Webhook notifier
//!
//! POSTs the [`JobEvent`] as JSON to a configured URL. Sent once per event;
//! a failed delivery is reported to the caller, which logs and drops it.

use async_trait::async_trait;
use cdnbulk_core::JobNotifier;
use cdnbulk_domain::{BulkError, JobEvent, Result};
use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use crate::errors::InfraError;
use crate::http::HttpClient;

pub struct WebhookNotifier {
    http_client: HttpClient,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(http_client: HttpClient, url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|err| BulkError::from(InfraError::from(err)))?;
        Ok(Self { http_client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl JobNotifier for WebhookNotifier {
    #[instrument(skip(self, event), fields(job_id = %event.job_id))]
    async fn notify(&self, event: &JobEvent) -> Result<()> {
        let request = self.http_client.request(Method::POST, self.url.clone()).json(event);
        let response = self.http_client.send_once(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BulkError::Remote(format!(
                "webhook {} answered with status {status}",
                self.url
            )));
        }
        debug!(%status, "Webhook delivered");
        Ok(())
    }
}
