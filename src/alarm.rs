use crate::sector::SectorId;
use crate::store::SectorStore;
use crate::transition::StatusTransitionEngine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Source of uniform indices for alarm injection.
pub trait RandomSource: Send + core::fmt::Debug {
    /// Uniform index in `0..len`. `len` is never zero.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// `StdRng` backed source; seeded for reproducible runs.
#[derive(Debug)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for StdRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed sequence of picks, wrapping each into range. Once the
/// script is exhausted it keeps returning index 0.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRandom {
    picks: VecDeque<usize>,
}

impl ScriptedRandom {
    pub fn new<I: IntoIterator<Item = usize>>(picks: I) -> Self {
        Self {
            picks: picks.into_iter().collect(),
        }
    }

    pub fn push(&mut self, pick: usize) {
        self.picks.push_back(pick);
    }
}

impl RandomSource for ScriptedRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        self.picks.pop_front().unwrap_or(0) % len
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AlarmStats {
    pub total_ticks: u64,
    pub alarms_injected: u32,
    pub missed_selections: u32,
    pub skipped_ticks: u32,
}

/// Randomized alarm injection.
///
/// Each tick picks one sector uniformly from the whole registry. Only a
/// Protected sector is moved to Alarm; any other pick makes the tick a no-op.
#[derive(Debug)]
pub struct AlarmScheduler {
    enabled: bool,
    rng: Box<dyn RandomSource>,
    engine: StatusTransitionEngine,
    stats: AlarmStats,
}

impl AlarmScheduler {
    pub fn new(rng: Box<dyn RandomSource>, engine: StatusTransitionEngine) -> Self {
        Self {
            enabled: true,
            rng,
            engine,
            stats: AlarmStats::default(),
        }
    }

    /// Returns the sector that was alarmed, if any.
    pub fn tick(&mut self, store: &mut SectorStore, timestamp: u64) -> Option<SectorId> {
        self.stats.total_ticks += 1;

        if !self.enabled || store.is_empty() {
            self.stats.skipped_ticks += 1;
            return None;
        }

        let ids = store.ids();
        let id = ids[self.rng.pick_index(ids.len())];
        let engine = &self.engine;

        let alarmed = store
            .update(id, |sector| {
                let transition = engine.plan_alarm(sector);
                if let Some(t) = &transition {
                    t.apply(sector, timestamp);
                }
                Ok(transition.is_some())
            })
            .unwrap_or(false);

        if alarmed {
            self.stats.alarms_injected += 1;
            warn!("🚨 Alarm injected on sector {}", id);
            Some(id)
        } else {
            self.stats.missed_selections += 1;
            debug!("Alarm tick selected sector {} which is not protected", id);
            None
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn replace_random_source(&mut self, rng: Box<dyn RandomSource>) {
        self.rng = rng;
    }

    pub fn get_stats(&self) -> &AlarmStats {
        &self.stats
    }
}
