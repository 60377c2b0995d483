use crate::sector::{ContractStatus, OperationalStatus, SectorId};
use thiserror::Error;

/// The two error kinds surfaced to callers of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Sector {0} not found")]
    SectorNotFound(SectorId),

    #[error("Custom status {0} not found")]
    CustomStatusNotFound(u32),

    #[error("Sector {id} contract is {contract}, status is owned by the contract")]
    ContractNotActive { id: SectorId, contract: ContractStatus },

    #[error("Status '{0}' is assigned by the engine and cannot be requested")]
    ReservedStatus(OperationalStatus),

    #[error("Contract transition {from} -> {to} is not permitted")]
    ContractTransition { from: ContractStatus, to: ContractStatus },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::SectorNotFound(_) | EngineError::CustomStatusNotFound(_) => ErrorKind::NotFound,
            EngineError::ContractNotActive { .. }
            | EngineError::ReservedStatus(_)
            | EngineError::ContractTransition { .. } => ErrorKind::Conflict,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(EngineError::SectorNotFound(3).kind(), ErrorKind::NotFound);
        assert_eq!(EngineError::CustomStatusNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(
            EngineError::ContractNotActive { id: 3, contract: ContractStatus::Suspended }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EngineError::ReservedStatus(OperationalStatus::ContractTerminated).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::ContractTransition {
            from: ContractStatus::Terminated,
            to: ContractStatus::Suspended,
        };
        assert_eq!(err.to_string(), "Contract transition terminated -> suspended is not permitted");
    }
}
