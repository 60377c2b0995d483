//! # Sectorwatch
//!
//! Status and event engine for a security monitoring center. Tracks a
//! registry of protected sectors, each with an operational status, a battery
//! level, a contract state and an append-only event history.
//!
//! ## Features
//!
//! - **Status state machine**: Protection, alarm, emergency and low-battery transitions
//! - **Contract precedence**: Suspended and terminated contracts override every other status
//! - **Battery simulation**: Periodic decay with threshold-driven reclassification
//! - **Alarm injection**: Random alarms on armed sectors, with an injectable random source
//! - **Aggregate statistics**: Counts derived fresh from the registry on every read
//! - **Console protocol**: JSON-line commands and responses for operator tooling
//!
//! ## Quick Start
//!
//! ```rust
//! use sectorwatch::{EngineConfig, MonitoringCenter, OperationalStatus};
//!
//! let mut center = MonitoringCenter::from_config(EngineConfig::default()).unwrap();
//! let sector = center.create_sector("12 Harbour Rd", "101");
//!
//! let armed = center.toggle_protection(sector.id).unwrap();
//! assert_eq!(armed.status, OperationalStatus::Protected);
//!
//! let stats = center.aggregate_stats();
//! assert_eq!(stats.protected, 1);
//! ```
//!
//! ## Architecture
//!
//! - [`center`] - Main facade and the only mutation path into the registry
//! - [`store`] - Sector registry with atomic per-sector updates
//! - [`transition`] - Operational status state machine
//! - [`contract`] - Contract lifecycle and its status overrides
//! - [`battery`] - Battery decay simulation
//! - [`alarm`] - Random alarm injection
//! - [`stats`] - Aggregate status counts
//! - [`scheduler`] - Virtual-time schedule for the periodic tasks
//! - [`runtime`] - Tokio driver for the periodic tasks
//! - [`protocol`] - Console command/response handling

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod alarm;
pub mod battery;
pub mod center;
pub mod clock;
pub mod config;
pub mod contract;
pub mod custom_status;
pub mod error;
pub mod history;
pub mod protocol;
pub mod runtime;
pub mod scheduler;
pub mod sector;
pub mod stats;
pub mod store;
pub mod transition;

// Re-export main public types for convenience
pub use alarm::{AlarmScheduler, RandomSource, ScriptedRandom, StdRandom};
pub use battery::BatteryDecaySimulator;
pub use center::{MonitoringCenter, MonitoringSummary};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use contract::ContractLifecycleManager;
pub use error::{ConfigError, EngineError, ErrorKind};
pub use history::HistoryLog;
pub use protocol::{Command, CommandResponse, CommandType, ProtocolHandler, ResponseStatus};
pub use runtime::{SharedCenter, SimulationRuntime};
pub use sector::{ContractStatus, CustomStatus, EventKind, HistoryEvent, OperationalStatus, Sector, SectorId, SectorSeed};
pub use stats::AggregateStats;
pub use store::{SectorStore, SortPolicy};
pub use transition::StatusTransitionEngine;
