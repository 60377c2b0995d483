use crate::alarm::{AlarmScheduler, AlarmStats, RandomSource, StdRandom};
use crate::battery::{BatteryDecaySimulator, DecayReport, DecayStats};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::contract::ContractLifecycleManager;
use crate::custom_status::CustomStatusRegistry;
use crate::error::{ConfigError, EngineError};
use crate::sector::{
    ContractStatus, CustomStatus, EventKind, HistoryEvent, OperationalStatus, Sector, SectorId, SectorSeed,
};
use crate::scheduler::{TaskKind, TickSchedule};
use crate::stats::AggregateStats;
use crate::store::{SectorStore, SortPolicy};
use crate::transition::StatusTransitionEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CenterState {
    pub operations: u64,
    pub failed_operations: u64,
    pub last_error: Option<String>,
}

/// Everything the alert banner and monitoring summary need in one read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSummary {
    pub stats: AggregateStats,
    pub last_emergency_at: Option<u64>,
    pub decay: DecayStats,
    pub alarms: AlarmStats,
    pub custom_statuses: usize,
}

/// Single owner of the sector registry and the only mutation path into it.
///
/// Operator commands and both periodic simulators call through `&mut self`,
/// so sharing a center across tasks means wrapping it in one mutex (see
/// [`crate::runtime`]). That lock is the serialization point for every
/// read-modify-write and for the last-emergency timestamp.
#[derive(Debug)]
pub struct MonitoringCenter {
    store: SectorStore,
    custom_statuses: CustomStatusRegistry,
    transitions: StatusTransitionEngine,
    contracts: ContractLifecycleManager,
    battery: BatteryDecaySimulator,
    alarms: AlarmScheduler,
    schedule: TickSchedule,
    clock: Arc<dyn Clock>,
    last_emergency_at: Option<u64>,
    config: EngineConfig,
    state: CenterState,
}

static_assertions::assert_impl_all!(MonitoringCenter: Send);

impl MonitoringCenter {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>, rng: Box<dyn RandomSource>) -> Result<Self, ConfigError> {
        config.validate()?;

        let transitions = StatusTransitionEngine::new(config.low_battery_threshold);
        let mut alarms = AlarmScheduler::new(rng, transitions.clone());
        alarms.set_enabled(config.alarm_injection_enabled);

        let start_ms = clock.now_ms();
        let mut schedule = TickSchedule::new();
        schedule
            .register(TaskKind::BatteryDecay, config.decay_interval_ms, start_ms)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        schedule
            .register(TaskKind::AlarmInjection, config.alarm_interval_ms, start_ms)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut center = Self {
            store: SectorStore::new(),
            custom_statuses: CustomStatusRegistry::new(),
            battery: BatteryDecaySimulator::new(config.decay_step_percent, transitions.clone()),
            transitions,
            contracts: ContractLifecycleManager::new(),
            alarms,
            schedule,
            clock,
            last_emergency_at: None,
            config,
            state: CenterState::default(),
        };

        let seeds = center.config.seed_sectors.clone();
        if !seeds.is_empty() {
            center.seed_sectors(seeds);
        }

        Ok(center)
    }

    /// Wall clock, with a seeded random source when the config names a seed.
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        let rng: Box<dyn RandomSource> = match config.rng_seed {
            Some(seed) => Box::new(StdRandom::seeded(seed)),
            None => Box::new(StdRandom::from_entropy()),
        };
        Self::new(config, Arc::new(SystemClock), rng)
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn track<T>(&mut self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        self.state.operations += 1;
        if let Err(e) = &result {
            self.state.failed_operations += 1;
            self.state.last_error = Some(e.to_string());
            warn!("Operation rejected: {}", e);
        }
        result
    }

    // ─── Registry ────────────────────────────────────────────────────

    pub fn create_sector(&mut self, address: impl Into<String>, number: impl Into<String>) -> Sector {
        let now = self.now();
        let sector = self.store.create(address, number, now);
        self.state.operations += 1;
        info!("Sector {} created ({} at {})", sector.id, sector.number, sector.address);
        sector
    }

    /// Bulk initialization. Seeds that start at or below the low-battery
    /// threshold are reclassified immediately.
    pub fn seed_sectors(&mut self, seeds: Vec<SectorSeed>) -> Vec<SectorId> {
        let now = self.now();
        let ids = self.store.seed(seeds, now);
        for &id in &ids {
            if let Err(e) = self.transitions.reclassify(&mut self.store, id, now) {
                warn!("Seeded sector {} not reclassified: {}", id, e);
            }
        }
        info!("Seeded {} sectors", ids.len());
        ids
    }

    pub fn get_sector(&self, id: SectorId) -> Result<Sector, EngineError> {
        self.store.get(id).cloned()
    }

    pub fn list_sectors(&self, policy: SortPolicy) -> Vec<Sector> {
        self.store.list(policy)
    }

    /// Alarm and Emergency sectors in priority order, at most `limit`.
    pub fn incident_sectors(&self, limit: usize) -> Vec<Sector> {
        self.store
            .list(SortPolicy::Priority)
            .into_iter()
            .filter(|s| s.status.is_incident())
            .take(limit)
            .collect()
    }

    pub fn sector_count(&self) -> usize {
        self.store.len()
    }

    // ─── Status ──────────────────────────────────────────────────────

    pub fn set_status(&mut self, id: SectorId, status: OperationalStatus) -> Result<Sector, EngineError> {
        let now = self.now();
        let result = self.transitions.set_status(&mut self.store, id, status, now);

        if let Ok(sector) = &result {
            if status == OperationalStatus::Emergency {
                let at = sector.history.last().map_or(now, |e| e.timestamp);
                self.last_emergency_at = Some(at);
                warn!("🆘 Emergency declared on sector {} at {}", id, at);
            }
        }

        self.track(result)
    }

    pub fn toggle_protection(&mut self, id: SectorId) -> Result<Sector, EngineError> {
        let now = self.now();
        let result = self.transitions.toggle_protection(&mut self.store, id, now);
        self.track(result)
    }

    pub fn trigger_emergency(&mut self, id: SectorId) -> Result<Sector, EngineError> {
        self.set_status(id, OperationalStatus::Emergency)
    }

    /// Independent per-sector updates. A failure on one id does not roll back
    /// the ones already applied.
    pub fn bulk_set_status(&mut self, ids: &[SectorId], status: OperationalStatus) -> Vec<Result<Sector, EngineError>> {
        ids.iter().map(|&id| self.set_status(id, status)).collect()
    }

    pub fn last_emergency_at(&self) -> Option<u64> {
        self.last_emergency_at
    }

    // ─── Battery & contract ──────────────────────────────────────────

    pub fn set_battery(&mut self, id: SectorId, charge: bool) -> Result<Sector, EngineError> {
        let now = self.now();
        let result = self.battery.set_battery(&mut self.store, id, charge, now);
        self.track(result)
    }

    pub fn set_contract_status(&mut self, id: SectorId, contract: ContractStatus) -> Result<Sector, EngineError> {
        let now = self.now();
        let result = self.contracts.set_contract_status(&mut self.store, id, contract, now);
        self.track(result)
    }

    // ─── Custom statuses ─────────────────────────────────────────────

    pub fn add_custom_status(&mut self, name: impl Into<String>, color: impl Into<String>) -> CustomStatus {
        let status = self.custom_statuses.add(name, color);
        self.state.operations += 1;
        info!("Custom status {} '{}' registered", status.id, status.name);
        status
    }

    pub fn list_custom_statuses(&self) -> Vec<CustomStatus> {
        self.custom_statuses.list()
    }

    pub fn assign_custom_status(&mut self, id: SectorId, custom_status_id: u32) -> Result<Sector, EngineError> {
        let now = self.now();
        let result = self.custom_statuses.get(custom_status_id).cloned().and_then(|label| {
            self.store.update(id, |sector| {
                sector.history.append(
                    now,
                    format!("Custom status set: {} ({})", label.name, label.color),
                    EventKind::Protection,
                );
                sector.custom_status = Some(label);
                Ok(sector.clone())
            })
        });
        self.track(result)
    }

    pub fn clear_custom_status(&mut self, id: SectorId) -> Result<Sector, EngineError> {
        let now = self.now();
        let result = self.store.update(id, |sector| {
            if let Some(previous) = sector.custom_status.take() {
                sector
                    .history
                    .append(now, format!("Custom status cleared: {}", previous.name), EventKind::Protection);
            }
            Ok(sector.clone())
        });
        self.track(result)
    }

    // ─── Reads ───────────────────────────────────────────────────────

    pub fn aggregate_stats(&self) -> AggregateStats {
        AggregateStats::compute(&self.store)
    }

    pub fn recent_history(&self, id: SectorId, n: usize) -> Result<Vec<HistoryEvent>, EngineError> {
        Ok(self.store.get(id)?.history.recent(n))
    }

    pub fn summary(&self) -> MonitoringSummary {
        MonitoringSummary {
            stats: self.aggregate_stats(),
            last_emergency_at: self.last_emergency_at,
            decay: self.battery.get_stats().clone(),
            alarms: self.alarms.get_stats().clone(),
            custom_statuses: self.custom_statuses.len(),
        }
    }

    // ─── Periodic tasks ──────────────────────────────────────────────

    pub fn run_battery_tick(&mut self) -> DecayReport {
        let now = self.now();
        self.battery.tick(&mut self.store, now)
    }

    pub fn run_alarm_tick(&mut self) -> Option<SectorId> {
        let now = self.now();
        self.alarms.tick(&mut self.store, now)
    }

    pub fn run_task(&mut self, kind: TaskKind) {
        match kind {
            TaskKind::BatteryDecay => {
                self.run_battery_tick();
            }
            TaskKind::AlarmInjection => {
                self.run_alarm_tick();
            }
        }
    }

    /// Run every periodic task that came due up to `now_ms`, stamping each
    /// run with its scheduled time. Returns the number of task runs.
    pub fn advance_to(&mut self, now_ms: u64) -> usize {
        let mut runs = 0;
        loop {
            let due = self.schedule.due_tasks(now_ms);
            if due.is_empty() {
                break;
            }
            for task in &due {
                match task.kind {
                    TaskKind::BatteryDecay => {
                        self.battery.tick(&mut self.store, task.due_ms);
                    }
                    TaskKind::AlarmInjection => {
                        self.alarms.tick(&mut self.store, task.due_ms);
                    }
                }
                runs += 1;
            }
        }
        runs
    }

    pub fn set_alarm_injection_enabled(&mut self, enabled: bool) {
        self.alarms.set_enabled(enabled);
        info!("Alarm injection {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn get_state(&self) -> &CenterState {
        &self.state
    }

    pub fn get_schedule(&self) -> &TickSchedule {
        &self.schedule
    }
}
