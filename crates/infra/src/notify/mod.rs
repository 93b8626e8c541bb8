//! Terminal-state notifiers

mod tracing_notifier;
mod webhook;

pub use tracing_notifier::TracingNotifier;
pub use webhook::WebhookNotifier;
