//! Cron-driven pass scheduling and shutdown handling.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use crate::driver::Reconciler;

/// Runs a pass on every tick of a cron schedule.
///
/// The next tick is computed only after a pass completes, so ticks that
/// elapse during a long pass collapse into one.
pub struct Scheduler {
    schedule: Schedule,
    reconciler: Arc<Reconciler>,
}

impl Scheduler {
    #[must_use]
    pub fn new(schedule: Schedule, reconciler: Arc<Reconciler>) -> Self {
        Self {
            schedule,
            reconciler,
        }
    }

    /// Time to wait from `now` until the next tick, if the schedule has one.
    #[must_use]
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.schedule
            .after(&now)
            .next()
            .map(|next| (next - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Run passes until `shutdown` resolves. A pass that has started is
    /// always allowed to finish.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let Some(delay) = self.next_delay(Utc::now()) else {
                warn!("Sync schedule has no upcoming ticks, stopping scheduler");
                return;
            };

            tokio::select! {
                () = &mut shutdown => {
                    info!("Scheduler stopped");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            if let Some(report) = self.reconciler.run_pass().await {
                info!(
                    jobs_registered = report.jobs.registered,
                    jobs_failed = report.jobs.failed,
                    "Scheduled pass finished"
                );
            }
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
