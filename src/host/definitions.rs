//! Event definitions registry: saved [`EventConfig`]s keyed by event name.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::event::config::{ConfigError, EventConfig};

/// Registry CRUD and persistence errors.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("An event with the name {0} already exists")]
    AlreadyExists(String),

    #[error("Unable to find an event with the name {0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(#[from] ConfigError),

    #[error("Event definitions I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event definitions: {0}")]
    Json(#[from] serde_json::Error),
}

/// Saved event definitions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventDefinitions {
    events: BTreeMap<String, EventConfig>,
}

impl EventDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&EventConfig> {
        self.events.get(name)
    }

    /// Saved names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.events.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventConfig> {
        self.events.values()
    }

    /// Save a new definition.
    pub fn create(&mut self, config: EventConfig) -> Result<(), DefinitionError> {
        if self.events.contains_key(&config.event_name) {
            return Err(DefinitionError::AlreadyExists(config.event_name));
        }
        info!(event = %config.event_name, mode = %config.mode_type, "Event definition created");
        self.events.insert(config.event_name.clone(), config);
        Ok(())
    }

    /// Replace an existing definition.
    pub fn update(&mut self, config: EventConfig) -> Result<(), DefinitionError> {
        match self.events.get_mut(&config.event_name) {
            Some(existing) => {
                info!(event = %config.event_name, "Event definition updated");
                *existing = config;
                Ok(())
            }
            None => Err(DefinitionError::NotFound(config.event_name)),
        }
    }

    pub fn delete(&mut self, name: &str) -> Result<EventConfig, DefinitionError> {
        let removed = self
            .events
            .remove(name)
            .ok_or_else(|| DefinitionError::NotFound(name.to_string()))?;
        info!(event = name, "Event definition deleted");
        Ok(removed)
    }

    // ===== Persistence =====

    pub fn to_json(&self) -> Result<String, DefinitionError> {
        Ok(serde_json::to_string_pretty(&self.events)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        Ok(Self { events: serde_json::from_str(json)? })
    }

    /// Load from disk. A missing file yields an empty registry.
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DefinitionError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> EventConfig {
        EventConfig {
            event_name: name.to_string(),
            mode_type: "deathmatch".to_string(),
            maximum_players: 8,
            ..EventConfig::default()
        }
    }

    #[test]
    fn test_crud() {
        let mut defs = EventDefinitions::new();
        defs.create(config("arena")).unwrap();
        assert!(matches!(defs.create(config("arena")), Err(DefinitionError::AlreadyExists(_))));

        let mut edited = config("arena");
        edited.maximum_players = 16;
        defs.update(edited).unwrap();
        assert_eq!(defs.get("arena").unwrap().maximum_players, 16);

        assert!(matches!(defs.update(config("other")), Err(DefinitionError::NotFound(_))));

        defs.delete("arena").unwrap();
        assert!(defs.is_empty());
        assert!(defs.delete("arena").is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_names() {
        let mut defs = EventDefinitions::new();
        defs.create(config("b")).unwrap();
        defs.create(config("a")).unwrap();

        let loaded = EventDefinitions::from_json(&defs.to_json().unwrap()).unwrap();
        assert_eq!(loaded.names(), vec!["a", "b"]);
        assert_eq!(loaded, defs);
    }
}
