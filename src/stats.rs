use crate::sector::{OperationalStatus, Sector};
use crate::store::SectorStore;
use serde::{Deserialize, Serialize};

/// Counts derived from one registry snapshot. Never cached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub total: usize,
    pub protected: usize,
    pub unprotected: usize,
    pub emergency: usize,
    pub alarm: usize,
    pub low_battery: usize,
    pub contract_impaired: usize,
}

impl AggregateStats {
    pub fn from_sectors<'a, I>(sectors: I) -> Self
    where
        I: IntoIterator<Item = &'a Sector>,
    {
        let mut stats = Self::default();

        for sector in sectors {
            stats.total += 1;

            if sector.is_contract_impaired() {
                stats.contract_impaired += 1;
                continue;
            }

            match sector.status {
                OperationalStatus::Protected => stats.protected += 1,
                OperationalStatus::Unprotected => stats.unprotected += 1,
                OperationalStatus::Emergency => stats.emergency += 1,
                OperationalStatus::Alarm => stats.alarm += 1,
                OperationalStatus::LowBattery => stats.low_battery += 1,
                // Unreachable while the contract invariant holds; count as impaired
                // so the partition still sums to the total.
                OperationalStatus::ContractSuspended | OperationalStatus::ContractTerminated => {
                    stats.contract_impaired += 1;
                }
            }
        }

        stats
    }

    /// Requires `&SectorStore`, so no writer can be mid-mutation.
    pub fn compute(store: &SectorStore) -> Self {
        Self::from_sectors(store.iter())
    }

    /// The operational buckets partition the registry.
    pub fn is_partition(&self) -> bool {
        self.protected + self.unprotected + self.emergency + self.alarm + self.low_battery + self.contract_impaired
            == self.total
    }

    pub fn incidents(&self) -> usize {
        self.emergency + self.alarm
    }
}
