//! Contract lifecycle.
//!
//! ```text
//! Active ──▶ Suspended ──▶ Terminated
//!   ▲  │         │              │
//!   │  └─────────┼──────────────┘ (Active ──▶ Terminated)
//!   └────────────┴── reactivation / renewal
//! ```
//!
//! While a contract is not Active the contract owns the operational status.
//! Reactivation always lands on Unprotected; the prior status is not restored.

use crate::error::EngineError;
use crate::sector::{ContractStatus, EventKind, OperationalStatus, Sector, SectorId};
use crate::store::SectorStore;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractRule {
    pub from: ContractStatus,
    pub to: ContractStatus,
    pub forced_status: OperationalStatus,
    pub action: &'static str,
}

pub const CONTRACT_TRANSITIONS: &[ContractRule] = &[
    ContractRule {
        from: ContractStatus::Active,
        to: ContractStatus::Suspended,
        forced_status: OperationalStatus::ContractSuspended,
        action: "Contract suspended",
    },
    ContractRule {
        from: ContractStatus::Active,
        to: ContractStatus::Terminated,
        forced_status: OperationalStatus::ContractTerminated,
        action: "Contract terminated",
    },
    ContractRule {
        from: ContractStatus::Suspended,
        to: ContractStatus::Active,
        forced_status: OperationalStatus::Unprotected,
        action: "Contract reactivated",
    },
    ContractRule {
        from: ContractStatus::Suspended,
        to: ContractStatus::Terminated,
        forced_status: OperationalStatus::ContractTerminated,
        action: "Contract terminated",
    },
    ContractRule {
        from: ContractStatus::Terminated,
        to: ContractStatus::Active,
        forced_status: OperationalStatus::Unprotected,
        action: "Contract renewed",
    },
];

pub fn find_rule(from: ContractStatus, to: ContractStatus) -> Option<&'static ContractRule> {
    CONTRACT_TRANSITIONS.iter().find(|rule| rule.from == from && rule.to == to)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContractLifecycleManager;

impl ContractLifecycleManager {
    pub fn new() -> Self {
        Self
    }

    /// Apply a contract transition to a sector in place.
    ///
    /// Requesting the current contract state is a no-op and appends nothing.
    /// Returns whether the sector changed.
    pub fn apply(&self, sector: &mut Sector, to: ContractStatus, timestamp: u64) -> Result<bool, EngineError> {
        if sector.contract == to {
            return Ok(false);
        }

        let rule = find_rule(sector.contract, to).ok_or(EngineError::ContractTransition {
            from: sector.contract,
            to,
        })?;

        let previous_status = sector.status;
        sector.contract = rule.to;
        sector.status = rule.forced_status;
        sector.history.append(
            timestamp,
            format!("{} (status {} -> {})", rule.action, previous_status, rule.forced_status),
            EventKind::Contract,
        );

        Ok(true)
    }

    pub fn set_contract_status(
        &self,
        store: &mut SectorStore,
        id: SectorId,
        to: ContractStatus,
        timestamp: u64,
    ) -> Result<Sector, EngineError> {
        store.update(id, |sector| {
            let from = sector.contract;
            if self.apply(sector, to, timestamp)? {
                info!("Sector {} contract {} -> {}", id, from, to);
            }
            Ok(sector.clone())
        })
    }
}
