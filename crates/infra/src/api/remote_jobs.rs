//! HTTP adapter for the control-plane bulk job endpoints
//!
//! | Call | Request |
//! |---|---|
//! | submit | `POST /bulk/{kind}` |
//! | status | `GET /bulk/{kind}/{jobId}` |
//! | cancel | `DELETE /bulk/{kind}/{jobId}` |

use std::sync::Arc;

use async_trait::async_trait;
use cdnbulk_core::RemoteJobService;
use cdnbulk_domain::{
    BulkError, BulkOperationConfig, BulkOperationItem, BulkOperationRequest, CancelAck, ItemState,
    JobId, OperationType, RemoteItemStatus, RemoteJobStatus, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::client::ApiClient;

/// Path segment for each operation type
pub fn bulk_kind(operation_type: OperationType) -> &'static str {
    match operation_type {
        OperationType::Activation => "activations",
        OperationType::VersionCreation => "property-version-creations",
        OperationType::RulesPatch => "rules-patch-requests",
        OperationType::RulesSearch => "rules-search-requests",
    }
}

/// Map a remote item state label onto the four local states.
///
/// Returns `None` for labels this adapter does not know.
pub fn map_item_state(raw: &str) -> Option<ItemState> {
    match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
        "SUBMITTED" | "PENDING" | "QUEUED" => Some(ItemState::Submitted),
        "IN_PROGRESS" | "RUNNING" | "ACTIVATING" => Some(ItemState::InProgress),
        "COMPLETED" | "SUCCEEDED" | "ACTIVE" | "DONE" => Some(ItemState::Completed),
        "FAILED" | "ERROR" | "ABORTED" | "CANCELLED" => Some(ItemState::Failed),
        _ => None,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    items: &'a [BulkOperationItem],
    #[serde(flatten)]
    config: &'a BulkOperationConfig,
}

/// Job ids arrive as strings or integers depending on the endpoint
#[derive(Deserialize)]
#[serde(untagged)]
enum WireJobId {
    Text(String),
    Number(u64),
}

impl From<WireJobId> for JobId {
    fn from(value: WireJobId) -> Self {
        match value {
            WireJobId::Text(id) => JobId::new(id),
            WireJobId::Number(id) => JobId::from(id),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    #[serde(alias = "id")]
    job_id: WireJobId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default, alias = "status")]
    overall: Option<String>,
    #[serde(default)]
    items: Vec<WireItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    item_id: String,
    #[serde(alias = "status")]
    state: String,
    #[serde(default, alias = "errorMessage")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct CancelResponse {
    accepted: bool,
}

/// [`RemoteJobService`] over the control-plane REST API
pub struct HttpRemoteJobService {
    client: Arc<ApiClient>,
}

impl HttpRemoteJobService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    fn job_path(operation_type: OperationType, job_id: &JobId) -> String {
        format!("/bulk/{}/{}", bulk_kind(operation_type), job_id)
    }
}

#[async_trait]
impl RemoteJobService for HttpRemoteJobService {
    async fn submit_batch(&self, request: &BulkOperationRequest) -> Result<JobId> {
        let path = format!("/bulk/{}", bulk_kind(request.operation_type()));
        let body = SubmitBody { items: request.items(), config: request.config() };

        let response: SubmitResponse = self
            .client
            .post(&path, &body)
            .await
            .map_err(|err| BulkError::RemoteRejected(err.to_string()))?;

        let job_id = JobId::from(response.job_id);
        if job_id.as_str().is_empty() {
            return Err(BulkError::RemoteRejected("control-plane returned an empty job id".into()));
        }
        Ok(job_id)
    }

    async fn get_job_status(
        &self,
        operation_type: OperationType,
        job_id: &JobId,
    ) -> Result<RemoteJobStatus> {
        let response: StatusResponse =
            self.client.get(&Self::job_path(operation_type, job_id)).await?;

        let mut items = Vec::with_capacity(response.items.len());
        for item in response.items {
            match map_item_state(&item.state) {
                Some(state) => items.push(RemoteItemStatus { item_id: item.item_id, state, error: item.error }),
                None => warn!(
                    job_id = %job_id,
                    item_id = %item.item_id,
                    state = %item.state,
                    "Unknown remote item state; ignoring for this poll"
                ),
            }
        }

        Ok(RemoteJobStatus { overall: response.overall, items })
    }

    async fn cancel_job(&self, operation_type: OperationType, job_id: &JobId) -> Result<CancelAck> {
        let response: Option<CancelResponse> =
            self.client.delete(&Self::job_path(operation_type, job_id)).await?;
        // An empty 2xx means the cancellation was taken
        let accepted = response.map_or(true, |body| body.accepted);
        info!(job_id = %job_id, accepted, "Remote cancellation answered");
        Ok(CancelAck { accepted })
    }
}
