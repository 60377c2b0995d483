use crate::history::HistoryLog;
use serde::{Deserialize, Serialize};

pub const FULL_CHARGE_PERCENT: u8 = 100;
pub const EMPTY_CHARGE_PERCENT: u8 = 0;

pub type SectorId = u32;

/// Operational status of a sector.
///
/// The two `Contract*` variants are owned by the contract lifecycle and
/// `LowBattery` by battery re-evaluation. None of them can be requested
/// directly by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationalStatus {
    Unprotected,
    Protected,
    Alarm,
    Emergency,
    LowBattery,
    ContractSuspended,
    ContractTerminated,
}

impl OperationalStatus {
    pub fn is_contract_override(self) -> bool {
        matches!(self, Self::ContractSuspended | Self::ContractTerminated)
    }

    /// Statuses only the engine assigns.
    pub fn is_engine_owned(self) -> bool {
        self.is_contract_override() || self == Self::LowBattery
    }

    /// Alarm and Emergency win over low-battery reclassification.
    pub fn is_incident(self) -> bool {
        matches!(self, Self::Alarm | Self::Emergency)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unprotected => "unprotected",
            Self::Protected => "protected",
            Self::Alarm => "alarm",
            Self::Emergency => "emergency",
            Self::LowBattery => "low battery",
            Self::ContractSuspended => "contract suspended",
            Self::ContractTerminated => "contract terminated",
        }
    }
}

impl core::fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    Active,
    Suspended,
    Terminated,
}

impl ContractStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl core::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Protection,
    Emergency,
    Alarm,
    Battery,
    Contract,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub timestamp: u64,
    pub action: String,
    pub kind: EventKind,
}

/// Presentational label from the custom status registry. Carries no
/// operational meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomStatus {
    pub id: u32,
    pub name: String,
    pub color: String,
}

/// Bulk initialization entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorSeed {
    pub address: String,
    pub number: String,
    #[serde(default)]
    pub battery_percent: Option<u8>,
}

impl SectorSeed {
    pub fn new(address: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            number: number.into(),
            battery_percent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub address: String,
    pub number: String,
    pub status: OperationalStatus,
    pub battery_percent: u8,
    pub custom_status: Option<CustomStatus>,
    pub contract: ContractStatus,
    pub history: HistoryLog,
}

impl Sector {
    pub fn new(id: SectorId, address: String, number: String) -> Self {
        Self {
            id,
            address,
            number,
            status: OperationalStatus::Unprotected,
            battery_percent: FULL_CHARGE_PERCENT,
            custom_status: None,
            contract: ContractStatus::Active,
            history: HistoryLog::new(),
        }
    }

    pub fn is_low_battery(&self, threshold: u8) -> bool {
        self.battery_percent <= threshold
    }

    pub fn is_contract_impaired(&self) -> bool {
        !self.contract.is_active()
    }
}
