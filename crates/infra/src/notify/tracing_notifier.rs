use async_trait::async_trait;
use cdnbulk_core::JobNotifier;
use cdnbulk_domain::{JobEvent, OverallState, Result};
use tracing::{info, warn};

/// Emits each terminal event as a structured log line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl JobNotifier for TracingNotifier {
    async fn notify(&self, event: &JobEvent) -> Result<()> {
        match event.overall_state {
            OverallState::Completed => info!(
                job_id = %event.job_id,
                operation_type = %event.operation_type,
                overall_state = %event.overall_state,
                summary = %event.summary,
                "Bulk job finished"
            ),
            _ => warn!(
                job_id = %event.job_id,
                operation_type = %event.operation_type,
                overall_state = %event.overall_state,
                summary = %event.summary,
                "Bulk job finished with failures"
            ),
        }
        Ok(())
    }
}
