//! Turns outbox events into notifications.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::ServiceError;
use super::metrics;
use super::repository::{NotificationRepository, OutboxRepository, Repositories};
use crate::models::Notification;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub delivered: u64,
    /// Events another dispatcher got to first.
    pub skipped: u64,
    pub failed: u64,
}

/// Failed deliveries after which an event is left in the outbox for inspection.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

pub struct NotificationDispatcher {
    repos: Arc<dyn Repositories>,
    batch_size: i64,
    max_attempts: i32,
}

impl NotificationDispatcher {
    pub fn new(repos: Arc<dyn Repositories>, batch_size: i64) -> Self {
        Self {
            repos,
            batch_size,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delivers up to one batch of pending events. Events that failed fewer
    /// times go first, so a failing event cannot hold back newer ones.
    pub async fn dispatch_pending(&self) -> Result<DispatchReport, ServiceError> {
        let events = self
            .repos
            .pending_events(self.batch_size, self.max_attempts)
            .await?;
        let mut report = DispatchReport::default();

        for event in events {
            let notification = Notification::from_event(&event);
            match self.repos.insert_notification(&notification).await {
                Ok(true) => {
                    report.delivered += 1;
                    metrics::record_notification("delivered");
                    tracing::debug!(
                        event_id = %event.id,
                        event_type = event.event.event_type(),
                        user_id = %notification.user_id,
                        "Notification created"
                    );
                }
                Ok(false) => {
                    report.skipped += 1;
                    metrics::record_notification("skipped");
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::record_notification("failed");
                    let attempts = event.attempts + 1;
                    if attempts >= self.max_attempts {
                        tracing::error!(event_id = %event.id, attempts, error = %e, "Notification delivery abandoned");
                    } else {
                        tracing::warn!(event_id = %event.id, attempts, error = %e, "Notification delivery failed");
                    }
                    self.record_failure(event.id, &e.to_string()).await;
                }
            }
        }

        Ok(report)
    }

    async fn record_failure(&self, event_id: Uuid, error: &str) {
        if let Err(e) = self.repos.record_delivery_failure(event_id, error).await {
            tracing::error!(event_id = %event_id, error = %e, "Failed to record delivery failure");
        }
    }

    /// Polls the outbox every `interval` until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, interval: std::time::Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Notification dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.dispatch_pending().await {
                        Ok(report) if report.delivered > 0 || report.failed > 0 => {
                            tracing::info!(
                                delivered = report.delivered,
                                skipped = report.skipped,
                                failed = report.failed,
                                "Outbox batch dispatched"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Failed to read outbox"),
                    }
                }
            }
        }
    }
}
