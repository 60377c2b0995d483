use crate::error::EngineError;
use crate::sector::{EventKind, OperationalStatus, Sector, SectorId, SectorSeed, FULL_CHARGE_PERCENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display ordering for sector listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortPolicy {
    /// Ascending id.
    ById,
    /// Emergency, then LowBattery, then Alarm, then everything else. Ties by id.
    #[default]
    Priority,
}

impl SortPolicy {
    fn rank(self, status: OperationalStatus) -> u8 {
        match self {
            SortPolicy::ById => 0,
            SortPolicy::Priority => match status {
                OperationalStatus::Emergency => 0,
                OperationalStatus::LowBattery => 1,
                OperationalStatus::Alarm => 2,
                _ => 3,
            },
        }
    }
}

/// Owner of the sector collection.
///
/// Every write goes through [`SectorStore::update`], which runs the mutator
/// against a working copy and commits only if it succeeds. A failed mutation
/// leaves the sector and its history untouched.
#[derive(Debug, Default)]
pub struct SectorStore {
    sectors: BTreeMap<SectorId, Sector>,
}

impl SectorStore {
    pub fn new() -> Self {
        Self {
            sectors: BTreeMap::new(),
        }
    }

    fn next_id(&self) -> SectorId {
        self.sectors.keys().next_back().map_or(1, |max| max + 1)
    }

    /// Create a sector as Unprotected with a full battery and one "created" event.
    pub fn create(&mut self, address: impl Into<String>, number: impl Into<String>, timestamp: u64) -> Sector {
        let id = self.next_id();
        let mut sector = Sector::new(id, address.into(), number.into());
        sector.history.append(
            timestamp,
            format!("Sector {} created at {}", sector.number, sector.address),
            EventKind::Protection,
        );

        self.sectors.insert(id, sector.clone());
        sector
    }

    /// Bulk initialization. On an empty store the ids form the dense range `1..=n`.
    pub fn seed<I>(&mut self, seeds: I, timestamp: u64) -> Vec<SectorId>
    where
        I: IntoIterator<Item = SectorSeed>,
    {
        seeds
            .into_iter()
            .map(|seed| {
                let id = self.create(seed.address, seed.number, timestamp).id;
                if let Some(level) = seed.battery_percent {
                    if let Some(sector) = self.sectors.get_mut(&id) {
                        sector.battery_percent = level.min(FULL_CHARGE_PERCENT);
                    }
                }
                id
            })
            .collect()
    }

    pub fn get(&self, id: SectorId) -> Result<&Sector, EngineError> {
        self.sectors.get(&id).ok_or(EngineError::SectorNotFound(id))
    }

    pub fn contains(&self, id: SectorId) -> bool {
        self.sectors.contains_key(&id)
    }

    /// Atomic read-modify-write of one sector.
    pub fn update<T, F>(&mut self, id: SectorId, mutator: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Sector) -> Result<T, EngineError>,
    {
        let current = self.sectors.get(&id).ok_or(EngineError::SectorNotFound(id))?;
        let mut working = current.clone();

        let output = mutator(&mut working)?;

        debug_assert_eq!(working.id, id, "Mutator must not change sector identity");
        debug_assert!(
            working.history.len() >= current.history.len(),
            "History must never shrink"
        );

        self.sectors.insert(id, working);
        Ok(output)
    }

    /// Read-only snapshot ordered by `policy`.
    pub fn list(&self, policy: SortPolicy) -> Vec<Sector> {
        let mut sectors: Vec<Sector> = self.sectors.values().cloned().collect();
        // BTreeMap iteration is already id-ordered, so a stable sort keeps ties by id.
        sectors.sort_by_key(|s| policy.rank(s.status));
        sectors
    }

    pub fn ids(&self) -> Vec<SectorId> {
        self.sectors.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.values()
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_monotonic_ids() {
        let mut store = SectorStore::new();
        let a = store.create("1 Main St", "001", 1000);
        let b = store.create("2 Main St", "002", 1000);
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.history.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_seed_dense_range() {
        let mut store = SectorStore::new();
        let ids = store.seed(
            vec![
                SectorSeed::new("a", "1"),
                SectorSeed::new("b", "2"),
                SectorSeed {
                    address: "c".into(),
                    number: "3".into(),
                    battery_percent: Some(250),
                },
            ],
            0,
        );
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.get(3).unwrap().battery_percent, 100);
    }

    #[test]
    fn test_get_missing_sector() {
        let store = SectorStore::new();
        assert_eq!(store.get(42).unwrap_err(), EngineError::SectorNotFound(42));
    }

    #[test]
    fn test_failed_update_is_not_committed() {
        let mut store = SectorStore::new();
        let sector = store.create("addr", "1", 0);

        let result: Result<(), EngineError> = store.update(sector.id, |s| {
            s.battery_percent = 0;
            s.history.append(10, "drained", EventKind::Battery);
            Err(EngineError::SectorNotFound(99))
        });

        assert!(result.is_err());
        let stored = store.get(sector.id).unwrap();
        assert_eq!(stored.battery_percent, 100);
        assert_eq!(stored.history.len(), 1);
    }

    #[test]
    fn test_priority_sort() {
        let mut store = SectorStore::new();
        for n in 1..=5 {
            store.create(format!("addr {n}"), n.to_string(), 0);
        }
        let set = |store: &mut SectorStore, id, status| {
            store
                .update(id, |s| {
                    s.status = status;
                    Ok(())
                })
                .unwrap();
        };
        set(&mut store, 2, OperationalStatus::Alarm);
        set(&mut store, 3, OperationalStatus::LowBattery);
        set(&mut store, 4, OperationalStatus::Emergency);
        set(&mut store, 5, OperationalStatus::Emergency);

        let order: Vec<SectorId> = store.list(SortPolicy::Priority).iter().map(|s| s.id).collect();
        assert_eq!(order, vec![4, 5, 3, 2, 1]);

        let by_id: Vec<SectorId> = store.list(SortPolicy::ById).iter().map(|s| s.id).collect();
        assert_eq!(by_id, vec![1, 2, 3, 4, 5]);
    }
}
