//! Periodic escalation of stale assigned complaints.
//!
//! A complaint that has sat in ASSIGNED for at least the threshold is handed
//! to the oldest MANAGER account and marked ESCALATED. The original
//! `assigned_at` is kept so the age of the assignment stays visible. Only
//! ASSIGNED complaints are scanned, so a second run over the same data is a
//! no-op.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use super::error::ServiceError;
use super::metrics;
use super::repository::{ComplaintRepository, Repositories, UserRepository};
use crate::models::{ComplaintStatus, DomainEvent, Role, TransitionKind, User};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    pub scanned: u64,
    pub escalated: u64,
    pub skipped_unassigned: u64,
    pub skipped_no_manager: u64,
    pub not_due: u64,
    pub failed: u64,
}

pub struct EscalationSweep {
    repos: Arc<dyn Repositories>,
    threshold: Duration,
}

impl EscalationSweep {
    /// A threshold too large to represent means nothing is ever due.
    pub fn new(repos: Arc<dyn Repositories>, threshold_days: i64) -> Self {
        Self {
            repos,
            threshold: Duration::try_days(threshold_days).unwrap_or(Duration::MAX),
        }
    }

    pub async fn run_once(&self) -> Result<SweepReport, ServiceError> {
        self.run_once_at(Utc::now()).await
    }

    /// Runs one sweep as if the current time were `now`.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<SweepReport, ServiceError> {
        let started = Instant::now();
        let candidates: Vec<_> = self
            .repos
            .find_complaints_by_status(ComplaintStatus::Assigned)
            .await?
            .into_iter()
            .filter(|c| {
                c.status
                    .can_transition(ComplaintStatus::Escalated, TransitionKind::Sweep)
            })
            .collect();

        let mut report = SweepReport {
            scanned: candidates.len() as u64,
            ..SweepReport::default()
        };

        // Looked up lazily, at most once per sweep.
        let mut manager: Option<Option<User>> = None;

        for mut complaint in candidates {
            let Some(assigned_at) = complaint.assigned_at else {
                report.skipped_unassigned += 1;
                continue;
            };

            if now - assigned_at < self.threshold {
                report.not_due += 1;
                continue;
            }

            if manager.is_none() {
                manager = Some(self.repos.find_first_user_by_role(Role::Manager).await?);
            }
            let Some(Some(target)) = manager.as_ref() else {
                tracing::warn!(complaint_id = %complaint.id, "No manager available for escalation");
                report.skipped_no_manager += 1;
                continue;
            };

            let previous_employee = complaint.employee_id;
            complaint.employee_id = Some(target.id);
            complaint.status = ComplaintStatus::Escalated;
            complaint.updated_at = now;

            let event = DomainEvent::ComplaintAutoEscalated {
                complaint_id: complaint.id,
                manager_id: target.id,
                title: complaint.title.clone(),
            };

            match self.repos.update_complaint(&complaint, &[event]).await {
                Ok(_) => {
                    report.escalated += 1;
                    tracing::info!(
                        complaint_id = %complaint.id,
                        from_employee = ?previous_employee,
                        manager_id = %target.id,
                        "Complaint escalated"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(complaint_id = %complaint.id, error = %e, "Failed to escalate complaint");
                }
            }
        }

        metrics::record_sweep_outcome("escalated", report.escalated);
        metrics::record_sweep_outcome("skipped_unassigned", report.skipped_unassigned);
        metrics::record_sweep_outcome("skipped_no_manager", report.skipped_no_manager);
        metrics::record_sweep_outcome("not_due", report.not_due);
        metrics::record_sweep_outcome("failed", report.failed);
        metrics::record_sweep_duration(started.elapsed().as_secs_f64());

        tracing::info!(
            scanned = report.scanned,
            escalated = report.escalated,
            skipped_unassigned = report.skipped_unassigned,
            skipped_no_manager = report.skipped_no_manager,
            not_due = report.not_due,
            failed = report.failed,
            "Escalation sweep finished"
        );
        Ok(report)
    }

    /// Sweeps every `interval` until `shutdown` is cancelled. The first sweep runs immediately.
    pub async fn run(self: Arc<Self>, interval: std::time::Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(interval_secs = interval.as_secs(), "Escalation sweep scheduled");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Escalation sweep shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "Escalation sweep failed");
                    }
                }
            }
        }
    }
}
