//! Operational status transitions.
//!
//! Every path that changes a sector's operational status outside of the
//! contract lifecycle is planned here as a [`Transition`] and then applied,
//! which appends exactly one history event.
//!
//! ```text
//!                 arm/disarm
//!   Unprotected <────────────> Protected ──(alarm injection)──> Alarm
//!        ^  \
//!        |   (charge <= threshold)
//!  (charge > threshold)  \
//!        |                v
//!        +──────────── LowBattery        any ──(operator)──> Emergency
//! ```
//!
//! Alarm and Emergency are never overwritten by battery reclassification.
//! Operator moves to Unprotected or Protected at or below the threshold land
//! on LowBattery instead.

use crate::error::EngineError;
use crate::sector::{EventKind, OperationalStatus, Sector, SectorId};
use crate::store::SectorStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_LOW_BATTERY_THRESHOLD: u8 = 20;

/// Battery band relative to the low-battery threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryBand {
    /// Charge at or below the threshold.
    Low,
    Normal,
}

impl BatteryBand {
    pub fn of(level: u8, threshold: u8) -> Self {
        if level <= threshold {
            BatteryBand::Low
        } else {
            BatteryBand::Normal
        }
    }
}

/// A planned status change with its forced history side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: OperationalStatus,
    pub to: OperationalStatus,
    pub kind: EventKind,
    pub action: String,
}

impl Transition {
    pub fn apply(&self, sector: &mut Sector, timestamp: u64) {
        debug_assert_eq!(sector.status, self.from, "Transition planned against stale status");
        sector.status = self.to;
        sector.history.append(timestamp, self.action.clone(), self.kind);
    }
}

/// Battery reclassification rule.
///
/// Returns the status a sector must move to, or `None` when the rule leaves it
/// alone. Only sectors with an Active contract are reclassified.
pub fn battery_rule(sector: &Sector, threshold: u8) -> Option<OperationalStatus> {
    if !sector.contract.is_active() {
        return None;
    }

    match (BatteryBand::of(sector.battery_percent, threshold), sector.status) {
        (BatteryBand::Low, OperationalStatus::Unprotected | OperationalStatus::Protected) => {
            Some(OperationalStatus::LowBattery)
        }
        (BatteryBand::Normal, OperationalStatus::LowBattery) => Some(OperationalStatus::Unprotected),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct StatusTransitionEngine {
    low_battery_threshold: u8,
}

impl StatusTransitionEngine {
    pub fn new(low_battery_threshold: u8) -> Self {
        Self { low_battery_threshold }
    }

    pub fn low_battery_threshold(&self) -> u8 {
        self.low_battery_threshold
    }

    fn require_active(sector: &Sector) -> Result<(), EngineError> {
        if sector.contract.is_active() {
            Ok(())
        } else {
            Err(EngineError::ContractNotActive {
                id: sector.id,
                contract: sector.contract,
            })
        }
    }

    /// Battery-adjusted target for an operator move. Caller has checked
    /// the contract is Active.
    fn settle(&self, sector: &Sector, target: OperationalStatus) -> OperationalStatus {
        let low = BatteryBand::of(sector.battery_percent, self.low_battery_threshold) == BatteryBand::Low;
        if low && matches!(target, OperationalStatus::Unprotected | OperationalStatus::Protected) {
            OperationalStatus::LowBattery
        } else {
            target
        }
    }

    /// Plan an operator status request.
    pub fn plan_request(&self, sector: &Sector, requested: OperationalStatus) -> Result<Transition, EngineError> {
        Self::require_active(sector)?;

        if requested.is_engine_owned() {
            return Err(EngineError::ReservedStatus(requested));
        }

        let kind = if requested == OperationalStatus::Emergency {
            EventKind::Emergency
        } else {
            EventKind::Protection
        };

        let to = self.settle(sector, requested);
        let action = if to == requested {
            format!("Status changed: {} -> {}", sector.status, to)
        } else {
            format!(
                "Status change to {} held at {}: battery at {}%",
                requested, to, sector.battery_percent
            )
        };

        Ok(Transition {
            from: sector.status,
            to,
            kind,
            action,
        })
    }

    /// Plan an arm/disarm flip. Disarming applies to Protected and to
    /// acknowledged incidents; everything else is armed.
    pub fn plan_toggle(&self, sector: &Sector) -> Result<Transition, EngineError> {
        Self::require_active(sector)?;

        let (target, action) = match sector.status {
            OperationalStatus::Protected | OperationalStatus::Alarm | OperationalStatus::Emergency => {
                (OperationalStatus::Unprotected, "Sector disarmed")
            }
            OperationalStatus::Unprotected
            | OperationalStatus::LowBattery
            | OperationalStatus::ContractSuspended
            | OperationalStatus::ContractTerminated => (OperationalStatus::Protected, "Sector armed"),
        };

        let to = self.settle(sector, target);
        let action = if to == target {
            action.to_string()
        } else {
            format!("{} (battery at {}%, status {})", action, sector.battery_percent, to)
        };

        Ok(Transition {
            from: sector.status,
            to,
            kind: EventKind::Protection,
            action,
        })
    }

    /// Plan the battery reclassification of a sector, if any.
    pub fn plan_battery(&self, sector: &Sector) -> Option<Transition> {
        battery_rule(sector, self.low_battery_threshold).map(|to| Transition {
            from: sector.status,
            to,
            kind: EventKind::Battery,
            action: format!(
                "Battery at {}%: {} -> {}",
                sector.battery_percent, sector.status, to
            ),
        })
    }

    /// Plan an injected alarm. Only Protected sectors can be alarmed.
    pub fn plan_alarm(&self, sector: &Sector) -> Option<Transition> {
        (sector.contract.is_active() && sector.status == OperationalStatus::Protected).then(|| Transition {
            from: sector.status,
            to: OperationalStatus::Alarm,
            kind: EventKind::Alarm,
            action: "Alarm triggered".to_string(),
        })
    }

    pub fn set_status(
        &self,
        store: &mut SectorStore,
        id: SectorId,
        requested: OperationalStatus,
        timestamp: u64,
    ) -> Result<Sector, EngineError> {
        store.update(id, |sector| {
            let transition = self.plan_request(sector, requested)?;
            transition.apply(sector, timestamp);
            info!("Sector {} status {} -> {}", id, transition.from, transition.to);
            Ok(sector.clone())
        })
    }

    pub fn toggle_protection(&self, store: &mut SectorStore, id: SectorId, timestamp: u64) -> Result<Sector, EngineError> {
        store.update(id, |sector| {
            let transition = self.plan_toggle(sector)?;
            transition.apply(sector, timestamp);
            info!("Sector {} {}", id, transition.action.to_lowercase());
            Ok(sector.clone())
        })
    }

    /// Re-run the battery rule on one sector. Returns the applied transition.
    pub fn reclassify(&self, store: &mut SectorStore, id: SectorId, timestamp: u64) -> Result<Option<Transition>, EngineError> {
        store.update(id, |sector| {
            let planned = self.plan_battery(sector);
            if let Some(transition) = &planned {
                transition.apply(sector, timestamp);
                debug!("Sector {} reclassified {} -> {}", id, transition.from, transition.to);
            }
            Ok(planned)
        })
    }
}

impl Default for StatusTransitionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_BATTERY_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sector::ContractStatus;

    fn sector(status: OperationalStatus, battery: u8) -> Sector {
        let mut s = Sector::new(1, "addr".into(), "1".into());
        s.status = status;
        s.battery_percent = battery;
        s
    }

    #[test]
    fn test_battery_rule_sets_low_battery() {
        assert_eq!(
            battery_rule(&sector(OperationalStatus::Protected, 20), 20),
            Some(OperationalStatus::LowBattery)
        );
        assert_eq!(
            battery_rule(&sector(OperationalStatus::Unprotected, 0), 20),
            Some(OperationalStatus::LowBattery)
        );
        assert_eq!(battery_rule(&sector(OperationalStatus::Protected, 21), 20), None);
    }

    #[test]
    fn test_battery_rule_respects_incidents() {
        assert_eq!(battery_rule(&sector(OperationalStatus::Alarm, 5), 20), None);
        assert_eq!(battery_rule(&sector(OperationalStatus::Emergency, 5), 20), None);
        assert_eq!(battery_rule(&sector(OperationalStatus::LowBattery, 5), 20), None);
    }

    #[test]
    fn test_battery_rule_clears_low_battery() {
        assert_eq!(
            battery_rule(&sector(OperationalStatus::LowBattery, 21), 20),
            Some(OperationalStatus::Unprotected)
        );
    }

    #[test]
    fn test_battery_rule_ignores_impaired_contract() {
        let mut s = sector(OperationalStatus::ContractSuspended, 3);
        s.contract = ContractStatus::Suspended;
        assert_eq!(battery_rule(&s, 20), None);
    }

    #[test]
    fn test_plan_request_event_kinds() {
        let engine = StatusTransitionEngine::default();
        let s = sector(OperationalStatus::Unprotected, 100);

        let emergency = engine.plan_request(&s, OperationalStatus::Emergency).unwrap();
        assert_eq!(emergency.kind, EventKind::Emergency);

        let protect = engine.plan_request(&s, OperationalStatus::Protected).unwrap();
        assert_eq!(protect.kind, EventKind::Protection);
    }

    #[test]
    fn test_plan_request_rejects_reserved_status() {
        let engine = StatusTransitionEngine::default();
        let s = sector(OperationalStatus::Unprotected, 100);
        assert_eq!(
            engine.plan_request(&s, OperationalStatus::ContractTerminated),
            Err(EngineError::ReservedStatus(OperationalStatus::ContractTerminated))
        );
    }

    #[test]
    fn test_plan_request_rejects_inactive_contract() {
        let engine = StatusTransitionEngine::default();
        let mut s = sector(OperationalStatus::ContractTerminated, 100);
        s.contract = ContractStatus::Terminated;
        let err = engine.plan_request(&s, OperationalStatus::Protected).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Conflict);
    }

    #[test]
    fn test_toggle_flips_protection() {
        let engine = StatusTransitionEngine::default();
        let armed = engine.plan_toggle(&sector(OperationalStatus::Unprotected, 100)).unwrap();
        assert_eq!(armed.to, OperationalStatus::Protected);
        let disarmed = engine.plan_toggle(&sector(OperationalStatus::Protected, 100)).unwrap();
        assert_eq!(disarmed.to, OperationalStatus::Unprotected);
    }

    #[test]
    fn test_toggle_holds_low_battery() {
        let engine = StatusTransitionEngine::default();

        let arm = engine.plan_toggle(&sector(OperationalStatus::LowBattery, 0)).unwrap();
        assert_eq!(arm.to, OperationalStatus::LowBattery);
        assert_eq!(arm.kind, EventKind::Protection);

        let reactivated = engine.plan_toggle(&sector(OperationalStatus::Unprotected, 12)).unwrap();
        assert_eq!(reactivated.to, OperationalStatus::LowBattery);

        let disarm = engine.plan_toggle(&sector(OperationalStatus::Alarm, 20)).unwrap();
        assert_eq!(disarm.to, OperationalStatus::LowBattery);

        let normal = engine.plan_toggle(&sector(OperationalStatus::Unprotected, 21)).unwrap();
        assert_eq!(normal.to, OperationalStatus::Protected);
    }

    #[test]
    fn test_plan_request_low_battery() {
        let engine = StatusTransitionEngine::default();
        assert_eq!(
            engine.plan_request(&sector(OperationalStatus::Unprotected, 100), OperationalStatus::LowBattery),
            Err(EngineError::ReservedStatus(OperationalStatus::LowBattery))
        );

        let held = engine
            .plan_request(&sector(OperationalStatus::Emergency, 5), OperationalStatus::Protected)
            .unwrap();
        assert_eq!(held.to, OperationalStatus::LowBattery);

        let incident = engine
            .plan_request(&sector(OperationalStatus::LowBattery, 5), OperationalStatus::Alarm)
            .unwrap();
        assert_eq!(incident.to, OperationalStatus::Alarm);
    }

    #[test]
    fn test_alarm_only_for_protected() {
        let engine = StatusTransitionEngine::default();
        assert!(engine.plan_alarm(&sector(OperationalStatus::Protected, 100)).is_some());
        assert!(engine.plan_alarm(&sector(OperationalStatus::Unprotected, 100)).is_none());
        assert!(engine.plan_alarm(&sector(OperationalStatus::LowBattery, 10)).is_none());
    }
}
