//! Repeats the check-in cycle forever, or until interrupted.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{error, info};

use crate::client::CheckinApi;
use crate::clock::Clock;
use crate::config::ScheduleConfig;
use crate::orchestrator::{CycleOrchestrator, RunSummary};
use crate::report;
use crate::timer::{countdown, Shutdown, WaitOutcome};

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub interval: Duration,
    pub refresh: Duration,
    /// `None` runs until interrupted
    pub max_cycles: Option<u64>,
}

impl ScheduleSettings {
    pub fn from_config(config: &ScheduleConfig, max_cycles: Option<u64>) -> Self {
        Self {
            interval: config.cycle_interval(),
            refresh: config.countdown_refresh(),
            max_cycles,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScheduleReport {
    pub cycles_run: u64,
    pub summaries: Vec<RunSummary>,
    /// Cycles that returned an error or panicked
    pub failed_cycles: u64,
    pub interrupted: bool,
}

pub struct Scheduler<A> {
    orchestrator: Arc<CycleOrchestrator<A>>,
    clock: Arc<dyn Clock>,
    settings: ScheduleSettings,
}

impl<A: CheckinApi + 'static> Scheduler<A> {
    pub fn new(orchestrator: Arc<CycleOrchestrator<A>>, clock: Arc<dyn Clock>, settings: ScheduleSettings) -> Self {
        Self {
            orchestrator,
            clock,
            settings,
        }
    }

    pub async fn run(&self, mut shutdown: Shutdown) -> ScheduleReport {
        let mut report = ScheduleReport::default();

        loop {
            if shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }

            let cycle = report.cycles_run + 1;
            let orchestrator = Arc::clone(&self.orchestrator);
            let mut cycle_shutdown = shutdown.clone();
            // Own task so a panic surfaces as a JoinError instead of unwinding the loop
            let handle = tokio::spawn(async move { orchestrator.run_cycle(cycle, &mut cycle_shutdown).await });
            report.cycles_run = cycle;

            match handle.await {
                Ok(Ok(summary)) => {
                    report::cycle_summary(&summary);
                    if summary.interrupted {
                        report.interrupted = true;
                    }
                    report.summaries.push(summary);
                }
                Ok(Err(e)) => {
                    error!("❌ Error in cycle #{}: {}", cycle, e);
                    report.failed_cycles += 1;
                }
                Err(join_err) if join_err.is_panic() => {
                    error!(
                        "💥 Cycle #{} panicked, continuing with the schedule: {}",
                        cycle,
                        panic_message(join_err)
                    );
                    report.failed_cycles += 1;
                }
                Err(join_err) => {
                    error!("❌ Cycle #{} was cancelled: {}", cycle, join_err);
                    report.failed_cycles += 1;
                }
            }

            if report.interrupted || shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }
            if self.settings.max_cycles.is_some_and(|max| report.cycles_run >= max) {
                info!("Reached {} cycle(s), stopping", report.cycles_run);
                break;
            }

            let next_at = self.clock.now()
                + chrono::Duration::from_std(self.settings.interval).unwrap_or_else(|_| chrono::Duration::days(1));
            report::next_cycle(next_at, self.settings.interval);

            let waited = countdown(self.settings.interval, self.settings.refresh, &mut shutdown, |left| {
                report::countdown_line("Time remaining", left)
            })
            .await;
            if waited == WaitOutcome::Cancelled {
                report::countdown_done("⛔ Countdown cancelled");
                report.interrupted = true;
                break;
            }
            report::countdown_done("🔄 Starting next cycle...");
        }

        report
    }
}

/// Text of a panicked task's payload.
fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => message.to_string(),
                Err(_) => "non-string panic payload".to_string(),
            },
        },
        Err(err) => err.to_string(),
    }
}
