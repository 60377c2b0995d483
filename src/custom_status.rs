use crate::error::EngineError;
use crate::sector::CustomStatus;
use std::collections::BTreeMap;

/// Registry of presentational sector labels.
#[derive(Debug, Default)]
pub struct CustomStatusRegistry {
    entries: BTreeMap<u32, CustomStatus>,
    next_id: u32,
}

impl CustomStatusRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, name: impl Into<String>, color: impl Into<String>) -> CustomStatus {
        let id = self.next_id.max(1);
        self.next_id = id.wrapping_add(1);

        let status = CustomStatus {
            id,
            name: name.into(),
            color: color.into(),
        };
        self.entries.insert(id, status.clone());
        status
    }

    pub fn get(&self, id: u32) -> Result<&CustomStatus, EngineError> {
        self.entries.get(&id).ok_or(EngineError::CustomStatusNotFound(id))
    }

    pub fn list(&self) -> Vec<CustomStatus> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
