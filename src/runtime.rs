use crate::center::MonitoringCenter;
use crate::config::EngineConfig;
use crate::scheduler::TaskKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// A center shared between operator commands and the periodic tasks.
pub type SharedCenter = Arc<Mutex<MonitoringCenter>>;

pub fn shared(center: MonitoringCenter) -> SharedCenter {
    Arc::new(Mutex::new(center))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeReport {
    pub decay_ticks: u64,
    pub alarm_ticks: u64,
}

/// Drives the battery decay and alarm injection tasks on tokio intervals.
///
/// Each task locks the shared center for the duration of a single tick, so a
/// tick never interleaves with an operator command.
#[derive(Debug)]
pub struct SimulationRuntime {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(TaskKind, JoinHandle<u64>)>,
}

impl SimulationRuntime {
    /// Spawn both periodic tasks. Must be called from within a tokio runtime.
    pub fn start(center: SharedCenter, decay_interval: Duration, alarm_interval: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        let tasks = [
            (TaskKind::BatteryDecay, decay_interval),
            (TaskKind::AlarmInjection, alarm_interval),
        ]
        .into_iter()
        .map(|(kind, period)| {
            let handle = tokio::spawn(run_periodic(
                Arc::clone(&center),
                kind,
                period,
                shutdown_tx.subscribe(),
            ));
            (kind, handle)
        })
        .collect();

        info!(
            "Simulation runtime started (decay every {:?}, alarms every {:?})",
            decay_interval, alarm_interval
        );

        Self { shutdown_tx, tasks }
    }

    pub fn from_config(center: SharedCenter, config: &EngineConfig) -> Self {
        Self::start(
            center,
            Duration::from_millis(config.decay_interval_ms),
            Duration::from_millis(config.alarm_interval_ms),
        )
    }

    pub fn is_running(&self) -> bool {
        !*self.shutdown_tx.borrow() && self.tasks.iter().any(|(_, handle)| !handle.is_finished())
    }

    /// Signal both tasks and wait for them to exit. A tick already holding
    /// the lock completes first.
    pub async fn shutdown(self) -> RuntimeReport {
        let _ = self.shutdown_tx.send(true);
        let mut report = RuntimeReport::default();

        for (kind, handle) in self.tasks {
            let ticks = match handle.await {
                Ok(ticks) => ticks,
                Err(e) => {
                    error!("{:?} task ended abnormally: {}", kind, e);
                    0
                }
            };
            match kind {
                TaskKind::BatteryDecay => report.decay_ticks = ticks,
                TaskKind::AlarmInjection => report.alarm_ticks = ticks,
            }
        }

        info!(
            "Simulation runtime stopped after {} decay ticks and {} alarm ticks",
            report.decay_ticks, report.alarm_ticks
        );
        report
    }
}

async fn run_periodic(
    center: SharedCenter,
    kind: TaskKind,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> u64 {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let mut guard = center.lock().await;
                guard.run_task(kind);
                ticks += 1;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("{:?} task exiting after {} ticks", kind, ticks);
    ticks
}
