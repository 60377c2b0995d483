use crate::error::EngineError;
use crate::sector::{EventKind, OperationalStatus, Sector, SectorId, EMPTY_CHARGE_PERCENT, FULL_CHARGE_PERCENT};
use crate::store::SectorStore;
use crate::transition::{battery_rule, StatusTransitionEngine, Transition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_DECAY_STEP_PERCENT: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DecayStats {
    pub total_ticks: u64,
    pub total_drain_steps: u64,
    pub low_battery_flips: u32,
    pub recoveries: u32,
    pub charge_commands: u32,
    pub discharge_commands: u32,
}

/// Outcome of one decay tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecayReport {
    pub drained: u32,
    pub transitions: Vec<(SectorId, Transition)>,
}

/// Autonomous battery drain.
///
/// Every tick drains each sector with an Active contract by `step_percent`,
/// floored at zero, then re-runs the low-battery rule. Plain drain ticks are
/// not logged; a tick that flips status appends one `Battery` event.
#[derive(Debug, Clone)]
pub struct BatteryDecaySimulator {
    step_percent: u8,
    engine: StatusTransitionEngine,
    stats: DecayStats,
}

impl BatteryDecaySimulator {
    pub fn new(step_percent: u8, engine: StatusTransitionEngine) -> Self {
        Self {
            step_percent,
            engine,
            stats: DecayStats::default(),
        }
    }

    pub fn tick(&mut self, store: &mut SectorStore, timestamp: u64) -> DecayReport {
        self.stats.total_ticks += 1;
        let mut report = DecayReport::default();

        for id in store.ids() {
            let step = self.step_percent;
            let engine = &self.engine;

            let outcome = store.update(id, |sector| {
                if !sector.contract.is_active() {
                    return Ok(None);
                }

                let before = sector.battery_percent;
                sector.battery_percent = before.saturating_sub(step);
                let drained = sector.battery_percent != before;

                let transition = engine.plan_battery(sector);
                if let Some(t) = &transition {
                    t.apply(sector, timestamp);
                }

                debug_assert!(sector.battery_percent <= FULL_CHARGE_PERCENT);
                Ok(Some((drained, transition)))
            });

            // Ids come from the same store snapshot, so the update cannot miss.
            if let Ok(Some((drained, transition))) = outcome {
                if drained {
                    report.drained += 1;
                    self.stats.total_drain_steps += 1;
                }
                if let Some(t) = transition {
                    self.record_flip(t.to);
                    info!("Sector {} battery flip {} -> {}", id, t.from, t.to);
                    report.transitions.push((id, t));
                }
            }
        }

        debug!(
            "Battery decay tick: {} drained, {} status flips",
            report.drained,
            report.transitions.len()
        );
        report
    }

    /// Operator charge (`true`, to 100%) or discharge (`false`, to 0%).
    ///
    /// Appends exactly one `Battery` event. Reclassification only applies to
    /// Active contracts and never clears Alarm or Emergency.
    pub fn set_battery(
        &mut self,
        store: &mut SectorStore,
        id: SectorId,
        charge: bool,
        timestamp: u64,
    ) -> Result<Sector, EngineError> {
        let threshold = self.engine.low_battery_threshold();

        let (sector, flipped) = store.update(id, |sector| {
            let level = if charge { FULL_CHARGE_PERCENT } else { EMPTY_CHARGE_PERCENT };
            sector.battery_percent = level;

            let verb = if charge { "charged" } else { "discharged" };
            let mut action = format!("Battery {verb} to {level}%");

            let flipped = battery_rule(sector, threshold).map(|to| (sector.status, to));
            if let Some((from, to)) = flipped {
                sector.status = to;
                action.push_str(&format!(" (status {from} -> {to})"));
            }

            sector.history.append(timestamp, action, EventKind::Battery);
            Ok((sector.clone(), flipped))
        })?;

        if charge {
            self.stats.charge_commands += 1;
        } else {
            self.stats.discharge_commands += 1;
        }
        if let Some((from, to)) = flipped {
            self.record_flip(to);
            info!("Sector {} battery command flip {} -> {}", id, from, to);
        }

        Ok(sector)
    }

    fn record_flip(&mut self, to: OperationalStatus) {
        if to == OperationalStatus::LowBattery {
            self.stats.low_battery_flips += 1;
        } else {
            self.stats.recoveries += 1;
        }
    }

    pub fn get_stats(&self) -> &DecayStats {
        &self.stats
    }

    pub fn step_percent(&self) -> u8 {
        self.step_percent
    }
}

impl Default for BatteryDecaySimulator {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY_STEP_PERCENT, StatusTransitionEngine::default())
    }
}
