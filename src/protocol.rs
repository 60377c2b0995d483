//! Operator console commands.
//!
//! The console binary reads one JSON [`Command`] per line and writes one JSON
//! [`CommandResponse`] per line. This is a presentation concern layered on
//! top of [`MonitoringCenter`]; the engine itself has no wire format.

use crate::center::MonitoringCenter;
use crate::error::{EngineError, ErrorKind};
use crate::sector::{ContractStatus, OperationalStatus, SectorId};
use crate::store::SortPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_COMMAND_SIZE: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: u32,
    pub command_type: CommandType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommandType {
    CreateSector { address: String, number: String },
    GetSector { sector: SectorId },
    SetStatus { sector: SectorId, status: OperationalStatus },
    ToggleProtection { sector: SectorId },
    TriggerEmergency { sector: SectorId },
    BulkSetStatus { sectors: Vec<SectorId>, status: OperationalStatus },
    SetBattery { sector: SectorId, charge: bool },
    SetContractStatus { sector: SectorId, contract: ContractStatus },
    AddCustomStatus { name: String, color: String },
    AssignCustomStatus { sector: SectorId, custom_status: u32 },
    ClearCustomStatus { sector: SectorId },
    ListCustomStatuses,
    ListSectors { sort: Option<SortPolicy> },
    GetAggregateStats,
    GetSummary,
    RecentHistory { sector: SectorId, limit: Option<usize> },
    SetAlarmInjection { enabled: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Success,
    NotFound,
    Conflict,
    InvalidCommand,
}

impl From<ErrorKind> for ResponseStatus {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ResponseStatus::NotFound,
            ErrorKind::Conflict => ResponseStatus::Conflict,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub id: u32,
    pub status: ResponseStatus,
    pub message: Option<String>,
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON format")]
    InvalidJson,
    #[error("Message exceeds buffer size")]
    MessageTooLarge,
    #[error("Serialization failed")]
    SerializationError,
}

#[derive(Debug)]
pub struct ProtocolHandler {
    commands_handled: u64,
    history_display_limit: usize,
}

impl ProtocolHandler {
    pub fn new(history_display_limit: usize) -> Self {
        Self {
            commands_handled: 0,
            history_display_limit,
        }
    }

    pub fn parse_command(&self, line: &str) -> Result<Command, ProtocolError> {
        if line.len() > MAX_COMMAND_SIZE {
            return Err(ProtocolError::MessageTooLarge);
        }
        serde_json::from_str::<Command>(line).map_err(|_| ProtocolError::InvalidJson)
    }

    pub fn serialize_response(&self, response: &CommandResponse) -> Result<String, ProtocolError> {
        serde_json::to_string(response).map_err(|_| ProtocolError::SerializationError)
    }

    pub fn create_response(&self, id: u32, status: ResponseStatus, message: Option<&str>, payload: Option<Value>) -> CommandResponse {
        CommandResponse {
            id,
            status,
            message: message.map(ToString::to_string),
            payload,
        }
    }

    pub fn create_error_response(&self, id: u32, reason: &str) -> CommandResponse {
        self.create_response(id, ResponseStatus::InvalidCommand, Some(reason), None)
    }

    /// Execute one command against the center and build its response.
    pub fn execute(&mut self, center: &mut MonitoringCenter, command: Command) -> CommandResponse {
        self.commands_handled += 1;
        let id = command.id;

        let outcome: Result<Value, EngineError> = match command.command_type {
            CommandType::CreateSector { address, number } => Ok(to_payload(&center.create_sector(address, number))),
            CommandType::GetSector { sector } => center.get_sector(sector).map(|s| to_payload(&s)),
            CommandType::SetStatus { sector, status } => center.set_status(sector, status).map(|s| to_payload(&s)),
            CommandType::ToggleProtection { sector } => center.toggle_protection(sector).map(|s| to_payload(&s)),
            CommandType::TriggerEmergency { sector } => center.trigger_emergency(sector).map(|s| to_payload(&s)),
            CommandType::BulkSetStatus { sectors, status } => {
                let results: Vec<Value> = sectors
                    .iter()
                    .zip(center.bulk_set_status(&sectors, status))
                    .map(|(sector, result)| match result {
                        Ok(_) => serde_json::json!({ "sector": sector, "status": ResponseStatus::Success }),
                        Err(e) => serde_json::json!({
                            "sector": sector,
                            "status": ResponseStatus::from(e.kind()),
                            "message": e.to_string(),
                        }),
                    })
                    .collect();
                Ok(Value::Array(results))
            }
            CommandType::SetBattery { sector, charge } => center.set_battery(sector, charge).map(|s| to_payload(&s)),
            CommandType::SetContractStatus { sector, contract } => {
                center.set_contract_status(sector, contract).map(|s| to_payload(&s))
            }
            CommandType::AddCustomStatus { name, color } => Ok(to_payload(&center.add_custom_status(name, color))),
            CommandType::AssignCustomStatus { sector, custom_status } => {
                center.assign_custom_status(sector, custom_status).map(|s| to_payload(&s))
            }
            CommandType::ClearCustomStatus { sector } => center.clear_custom_status(sector).map(|s| to_payload(&s)),
            CommandType::ListCustomStatuses => Ok(to_payload(&center.list_custom_statuses())),
            CommandType::ListSectors { sort } => Ok(to_payload(&center.list_sectors(sort.unwrap_or_default()))),
            CommandType::GetAggregateStats => Ok(to_payload(&center.aggregate_stats())),
            CommandType::GetSummary => Ok(to_payload(&center.summary())),
            CommandType::RecentHistory { sector, limit } => center
                .recent_history(sector, limit.unwrap_or(self.history_display_limit))
                .map(|events| to_payload(&events)),
            CommandType::SetAlarmInjection { enabled } => {
                center.set_alarm_injection_enabled(enabled);
                Ok(Value::Bool(enabled))
            }
        };

        match outcome {
            Ok(payload) => self.create_response(id, ResponseStatus::Success, None, Some(payload)),
            Err(e) => self.create_response(id, e.kind().into(), Some(&e.to_string()), None),
        }
    }

    pub fn commands_handled(&self) -> u64 {
        self.commands_handled
    }
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new(10)
    }
}

fn to_payload<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let handler = ProtocolHandler::new(10);
        let command = handler
            .parse_command(r#"{"id": 4, "command_type": {"SetBattery": {"sector": 2, "charge": false}}}"#)
            .unwrap();
        assert_eq!(command.id, 4);
        assert!(matches!(command.command_type, CommandType::SetBattery { sector: 2, charge: false }));
    }

    #[test]
    fn test_parse_unit_variant() {
        let handler = ProtocolHandler::new(10);
        let command = handler.parse_command(r#"{"id": 1, "command_type": "GetAggregateStats"}"#).unwrap();
        assert!(matches!(command.command_type, CommandType::GetAggregateStats));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let handler = ProtocolHandler::new(10);
        assert_eq!(handler.parse_command("not json").unwrap_err(), ProtocolError::InvalidJson);
        let huge = "x".repeat(MAX_COMMAND_SIZE + 1);
        assert_eq!(handler.parse_command(&huge).unwrap_err(), ProtocolError::MessageTooLarge);
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(ResponseStatus::from(ErrorKind::NotFound), ResponseStatus::NotFound);
        assert_eq!(ResponseStatus::from(ErrorKind::Conflict), ResponseStatus::Conflict);
    }
}
