//! Shared helpers for infra integration tests

use std::sync::Arc;
use std::time::Duration;

use cdnbulk_core::{BulkOperationService, JobNotifier};
use cdnbulk_infra::api::{ApiClient, ApiClientConfig, HttpRemoteJobService, StaticTokenProvider};
use cdnbulk_infra::scheduling::{RetentionSweeperConfig, StatusPollerConfig};
use cdnbulk_infra::{BulkOperationManager, InMemoryJobRegistry};
use serde_json::{json, Value};

pub const TOKEN: &str = "test-token";

/// API client without retries so failure counts are exact
pub fn api_client(base_url: &str) -> Arc<ApiClient> {
    let config = ApiClientConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(2),
        max_attempts: 1,
        base_backoff: Duration::from_millis(1),
    };
    Arc::new(ApiClient::new(config, Arc::new(StaticTokenProvider::new(TOKEN))).expect("api client"))
}

/// Manager over the mock server with a fast poll interval
pub fn manager(
    base_url: &str,
    max_consecutive_failures: u32,
    notifier: Option<Arc<dyn JobNotifier>>,
) -> BulkOperationManager {
    let remote = Arc::new(HttpRemoteJobService::new(api_client(base_url)));
    let mut service = BulkOperationService::new(remote, Arc::new(InMemoryJobRegistry::new()));
    if let Some(notifier) = notifier {
        service = service.with_notifier(notifier);
    }

    BulkOperationManager::from_parts(
        Arc::new(service),
        StatusPollerConfig { interval: Duration::from_millis(20), max_consecutive_failures },
        RetentionSweeperConfig::default(),
        None,
    )
}

/// Staging activation payload for `prp_{property}` at version 3
pub fn activation(property: u32) -> Value {
    json!({
        "propertyId": format!("prp_{property}"),
        "version": 3,
        "network": "staging",
        "notifyEmails": ["noc@example.com"]
    })
}

pub fn activation_id(property: u32) -> String {
    format!("prp_{property}:v3:STAGING")
}

/// Remote status body with one entry per `(item id, state)`
pub fn status_body(items: &[(String, &str)]) -> Value {
    json!({
        "status": "RUNNING",
        "items": items
            .iter()
            .map(|(id, state)| json!({"itemId": id, "state": state}))
            .collect::<Vec<_>>()
    })
}
