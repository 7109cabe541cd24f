use std::sync::Arc;
use tracing::{info, warn};

use crate::client::HttpCheckinApi;
use crate::clock::{Clock, SystemClock};
use crate::config::BotConfig;
use crate::orchestrator::{CycleOrchestrator, CycleSettings};
use crate::report;
use crate::scheduler::{ScheduleSettings, Scheduler};
use crate::timer::Shutdown;

pub async fn handle_run(mut config: BotConfig, once: bool, no_proxy: bool) {
    if no_proxy {
        config.network.use_proxy = false;
    }

    report::banner();
    if config.network.use_proxy {
        info!("🌐 Proxy mode enabled, reading {}", config.files.proxies);
    } else {
        info!("🔌 Direct mode, proxies disabled");
    }

    let (trigger, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, finishing up...");
                trigger.trigger();
            }
            Err(e) => warn!("Could not listen for Ctrl+C: {}", e),
        }
    });

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let api = HttpCheckinApi::new(config.network.clone());
    let orchestrator = Arc::new(CycleOrchestrator::new(
        api,
        Arc::clone(&clock),
        CycleSettings::from_config(&config),
    ));
    let settings = ScheduleSettings::from_config(&config.schedule, once.then_some(1));

    let outcome = Scheduler::new(orchestrator, clock, settings).run(shutdown).await;

    if outcome.interrupted {
        report::goodbye();
    } else {
        info!(
            "Finished {} cycle(s), {} failed",
            outcome.cycles_run, outcome.failed_cycles
        );
    }
}
