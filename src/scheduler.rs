use heapless::Vec;
use serde::{Deserialize, Serialize};

const MAX_PERIODIC_TASKS: usize = 4;
const MAX_DUE_PER_POLL: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    BatteryDecay,
    AlarmInjection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicTask {
    pub kind: TaskKind,
    pub period_ms: u64,
    pub next_due_ms: u64,
    pub runs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTask {
    pub kind: TaskKind,
    pub due_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScheduleStats {
    pub total_polls: u64,
    pub total_dispatched: u64,
    pub deferred_polls: u32,
}

/// Virtual-time schedule for the periodic simulators.
///
/// Nothing here sleeps: callers feed the current time and get back the tasks
/// that came due, oldest first. Missed periods are caught up one by one.
#[derive(Debug)]
pub struct TickSchedule {
    tasks: Vec<PeriodicTask, MAX_PERIODIC_TASKS>,
    stats: ScheduleStats,
}

impl TickSchedule {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            stats: ScheduleStats::default(),
        }
    }

    /// Register a task whose first run is one period after `start_ms`.
    pub fn register(&mut self, kind: TaskKind, period_ms: u64, start_ms: u64) -> Result<(), &'static str> {
        if period_ms == 0 {
            return Err("Task period must be non-zero");
        }
        if self.tasks.iter().any(|t| t.kind == kind) {
            return Err("Task already registered");
        }

        self.tasks
            .push(PeriodicTask {
                kind,
                period_ms,
                next_due_ms: start_ms.saturating_add(period_ms),
                runs: 0,
            })
            .map_err(|_| "Schedule full")
    }

    /// Tasks due at or before `now_ms`, in chronological order. Ties keep
    /// registration order. At most `MAX_DUE_PER_POLL` are returned; the rest
    /// stay due for the next poll.
    pub fn due_tasks(&mut self, now_ms: u64) -> Vec<DueTask, MAX_DUE_PER_POLL> {
        self.stats.total_polls += 1;
        let mut due: Vec<DueTask, MAX_DUE_PER_POLL> = Vec::new();

        while !due.is_full() {
            let next = self
                .tasks
                .iter_mut()
                .filter(|t| t.next_due_ms <= now_ms)
                .min_by_key(|t| t.next_due_ms);

            let Some(task) = next else { break };

            let _ = due.push(DueTask {
                kind: task.kind,
                due_ms: task.next_due_ms,
            });
            task.next_due_ms = task.next_due_ms.saturating_add(task.period_ms);
            task.runs += 1;
        }

        if due.is_full() && self.tasks.iter().any(|t| t.next_due_ms <= now_ms) {
            self.stats.deferred_polls += 1;
        }
        self.stats.total_dispatched += due.len() as u64;

        due
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.tasks.iter().map(|t| t.next_due_ms).min()
    }

    pub fn get_tasks(&self) -> &[PeriodicTask] {
        &self.tasks
    }

    pub fn get_stats(&self) -> &ScheduleStats {
        &self.stats
    }
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::new()
    }
}
