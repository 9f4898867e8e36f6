//! Event configuration and the mode parameter schema.
//!
//! An [`EventConfig`] is built by an admin, validated once against the mode's
//! declared parameters and the world's reference data, then persisted by
//! name. After validation the parameter bag holds only values whose type
//! matches the declared schema, so the typed getters never coerce.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use super::policy::{ModePolicy, ModeRegistry};
use super::participant::Team;
use crate::host::world::ReferenceLookup;

/// Default team A colour.
pub const DEFAULT_TEAM_A_COLOR: &str = "#EA3232";

/// Default team B colour.
pub const DEFAULT_TEAM_B_COLOR: &str = "#3232EA";

// =============================================================================
// ERRORS
// =============================================================================

/// Configuration errors, reported as the reason string at save time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Mode not registered
    #[error("Event mode {0} is not currently loaded")]
    UnknownMode(String),

    /// No team A kit and no class selector
    #[error("You must set atleast 1 kit")]
    NoKits,

    /// Team mode without team B kits
    #[error("You must set atleast 1 kit for Team B")]
    NoTeamBKits,

    #[error("You must set the minimum players")]
    MissingMinimumPlayers,

    #[error("You must set the maximum players")]
    MissingMaximumPlayers,

    /// Maximum below minimum
    #[error("Maximum players ({max}) must not be below minimum players ({min})")]
    InvalidPlayerRange { min: usize, max: usize },

    #[error("You must set a time limit")]
    MissingTimeLimit,

    #[error("You must set a score limit")]
    MissingScoreLimit,

    #[error("Invalid kit: {0}")]
    InvalidKit(String),

    #[error("Invalid spawn file: {0}")]
    InvalidSpawnSet(String),

    #[error("Invalid second spawn file: {0}")]
    InvalidSecondSpawnSet(String),

    #[error("Invalid zone ID: {0}")]
    InvalidZone(String),

    /// Required declared parameter absent
    #[error("Missing event parameter: ({data_type}){field}")]
    MissingParameter { field: String, data_type: ParamType },

    /// Value does not match the declared type
    #[error("Parameter {field} must be of type {expected}")]
    ParameterType { field: String, expected: ParamType },

    /// Parameter not declared by the mode
    #[error("Unknown event parameter: {0}")]
    UnknownParameter(String),

    /// Pick-list value not offered by its source
    #[error("Invalid value for {field}: {value}")]
    NotInPickList { field: String, value: String },

    /// Rejected by the mode's own check
    #[error("{0}")]
    InvalidParameter(String),
}

// =============================================================================
// PARAMETER SCHEMA
// =============================================================================

/// Declared parameter type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
    StringList,
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::StringList => "string list",
        };
        f.write_str(name)
    }
}

/// How an admin enters the value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    /// Typed in
    FreeText,
    /// On/off
    Toggle,
    /// Chosen from a named lookup source
    PickList {
        /// Lookup source name
        source: String,
        /// Several values may be picked
        multiple: bool,
    },
}

/// A typed parameter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    StringList(Vec<String>),
}

impl ParamValue {
    /// Does the value satisfy the declared type?
    ///
    /// Integers are accepted for float parameters.
    pub fn matches(&self, ty: ParamType) -> bool {
        matches!(
            (self, ty),
            (ParamValue::Bool(_), ParamType::Bool)
                | (ParamValue::Int(_), ParamType::Int)
                | (ParamValue::Int(_), ParamType::Float)
                | (ParamValue::Float(_), ParamType::Float)
                | (ParamValue::String(_), ParamType::String)
                | (ParamValue::StringList(_), ParamType::StringList)
        )
    }
}

/// One mode-specific parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Label shown to admins
    pub name: String,

    /// Key in the parameter bag
    pub field: String,

    /// Value type
    pub data_type: ParamType,

    /// Entry method
    pub input: InputKind,

    /// Must be present to save
    pub required: bool,

    /// Value used when the config is created
    pub default: Option<ParamValue>,
}

impl ParameterSpec {
    /// Free-text parameter.
    pub fn new(name: &str, field: &str, data_type: ParamType) -> Self {
        let input = if data_type == ParamType::Bool { InputKind::Toggle } else { InputKind::FreeText };
        Self {
            name: name.to_string(),
            field: field.to_string(),
            data_type,
            input,
            required: false,
            default: None,
        }
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, value: ParamValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Pick the value from a named lookup source.
    pub fn pick_list(mut self, source: &str, multiple: bool) -> Self {
        self.input = InputKind::PickList { source: source.to_string(), multiple };
        self
    }
}

// =============================================================================
// EVENT CONFIG
// =============================================================================

/// Per-team settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Spawn set name
    pub spawn_set: String,

    /// Loadouts available to the team
    pub kits: Vec<String>,

    /// Clothing kit worn over the loadout (team modes)
    pub clothing: String,

    /// Hex colour, with or without `#`
    pub color: String,
}

/// Event definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Unique event name
    pub event_name: String,

    /// Mode type identifier
    pub mode_type: String,

    /// Arena zone
    pub zone_id: String,

    /// Time limit in seconds (0 = none)
    pub time_limit: u32,

    /// Score limit (0 = none)
    pub score_limit: u32,

    pub minimum_players: usize,
    pub maximum_players: usize,

    /// Players may pick their own loadout
    pub allow_class_selection: bool,

    pub team_a: TeamConfig,
    pub team_b: TeamConfig,

    /// Mode-specific parameters
    pub params: BTreeMap<String, ParamValue>,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            event_name: String::new(),
            mode_type: String::new(),
            zone_id: String::new(),
            time_limit: 0,
            score_limit: 0,
            minimum_players: 2,
            maximum_players: 0,
            allow_class_selection: false,
            team_a: TeamConfig::default(),
            team_b: TeamConfig::default(),
            params: BTreeMap::new(),
        }
    }
}

impl EventConfig {
    /// New config for a mode, parameter defaults filled in.
    pub fn new(event_name: &str, mode_type: &str, policy: &dyn ModePolicy) -> Self {
        let mut config = Self {
            event_name: event_name.to_string(),
            mode_type: mode_type.to_string(),
            ..Self::default()
        };

        for spec in policy.declared_parameters() {
            match spec.default {
                Some(value) => {
                    config.params.insert(spec.field, value);
                }
                None if spec.data_type == ParamType::StringList => {
                    config.params.insert(spec.field, ParamValue::StringList(Vec::new()));
                }
                None => {}
            }
        }
        config
    }

    /// Settings for one team. `None` reads team A.
    pub fn team(&self, team: Team) -> &TeamConfig {
        match team {
            Team::B => &self.team_b,
            _ => &self.team_a,
        }
    }

    /// Set a declared parameter, checking its type.
    pub fn set_param(
        &mut self,
        policy: &dyn ModePolicy,
        field: &str,
        value: ParamValue,
    ) -> Result<(), ConfigError> {
        let spec = policy
            .declared_parameters()
            .into_iter()
            .find(|s| s.field == field)
            .ok_or_else(|| ConfigError::UnknownParameter(field.to_string()))?;

        if !value.matches(spec.data_type) {
            return Err(ConfigError::ParameterType {
                field: field.to_string(),
                expected: spec.data_type,
            });
        }

        self.params.insert(field.to_string(), value);
        Ok(())
    }

    pub fn param_str(&self, field: &str) -> Option<&str> {
        match self.params.get(field) {
            Some(ParamValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn param_int(&self, field: &str) -> Option<i64> {
        match self.params.get(field) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn param_float(&self, field: &str) -> Option<f64> {
        match self.params.get(field) {
            Some(ParamValue::Float(v)) => Some(*v),
            Some(ParamValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn param_bool(&self, field: &str) -> Option<bool> {
        match self.params.get(field) {
            Some(ParamValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn param_list(&self, field: &str) -> Option<&[String]> {
        match self.params.get(field) {
            Some(ParamValue::StringList(v)) => Some(v),
            _ => None,
        }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate a definition before it is saved or opened.
pub fn validate_event_config<L>(
    config: &EventConfig,
    registry: &ModeRegistry,
    lookup: &L,
) -> Result<(), ConfigError>
where
    L: ReferenceLookup + ?Sized,
{
    let policy = registry
        .create(&config.mode_type)
        .ok_or_else(|| ConfigError::UnknownMode(config.mode_type.clone()))?;

    if !policy.can_use_class_selector() && config.team_a.kits.is_empty() {
        return Err(ConfigError::NoKits);
    }

    if config.minimum_players == 0 {
        return Err(ConfigError::MissingMinimumPlayers);
    }
    if config.maximum_players == 0 {
        return Err(ConfigError::MissingMaximumPlayers);
    }
    if config.maximum_players < config.minimum_players {
        return Err(ConfigError::InvalidPlayerRange {
            min: config.minimum_players,
            max: config.maximum_players,
        });
    }

    if policy.requires_time_limit() && config.time_limit == 0 {
        return Err(ConfigError::MissingTimeLimit);
    }
    if policy.requires_score_limit() && config.score_limit == 0 {
        return Err(ConfigError::MissingScoreLimit);
    }

    for kit in &config.team_a.kits {
        if !lookup.kit_exists(kit) {
            return Err(ConfigError::InvalidKit(kit.clone()));
        }
    }

    if lookup.spawn_points(&config.team_a.spawn_set).map_or(true, |p| p.is_empty()) {
        return Err(ConfigError::InvalidSpawnSet(config.team_a.spawn_set.clone()));
    }

    if policy.is_team_mode() {
        if lookup.spawn_points(&config.team_b.spawn_set).map_or(true, |p| p.is_empty()) {
            return Err(ConfigError::InvalidSecondSpawnSet(config.team_b.spawn_set.clone()));
        }

        if config.team_b.kits.is_empty() {
            return Err(ConfigError::NoTeamBKits);
        }

        for kit in &config.team_b.kits {
            if !lookup.kit_exists(kit) {
                return Err(ConfigError::InvalidKit(kit.clone()));
            }
        }
    }

    if config.zone_id.trim().is_empty() || !lookup.zone_exists(&config.zone_id) {
        return Err(ConfigError::InvalidZone(config.zone_id.clone()));
    }

    for spec in policy.declared_parameters() {
        let value = match config.params.get(&spec.field) {
            Some(value) => value,
            None if spec.required => {
                return Err(ConfigError::MissingParameter {
                    field: spec.field.clone(),
                    data_type: spec.data_type,
                });
            }
            None => continue,
        };

        if !value.matches(spec.data_type) {
            return Err(ConfigError::ParameterType {
                field: spec.field.clone(),
                expected: spec.data_type,
            });
        }

        if let InputKind::PickList { source, .. } = &spec.input {
            let options = lookup.pick_list(source);
            let picked: Vec<&String> = match value {
                ParamValue::String(s) => vec![s],
                ParamValue::StringList(list) => list.iter().collect(),
                _ => Vec::new(),
            };
            if let Some(bad) = picked.into_iter().find(|v| !options.contains(v)) {
                return Err(ConfigError::NotInPickList {
                    field: spec.field.clone(),
                    value: bad.clone(),
                });
            }
        }

        policy
            .validate_parameter(&spec.field, value)
            .map_err(ConfigError::InvalidParameter)?;
    }

    Ok(())
}

/// Is this a 6-digit hex colour (with or without `#`)?
pub fn is_valid_color(color: &str) -> bool {
    let hex = color.strip_prefix('#').unwrap_or(color);
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Resolve a team colour: valid values get a `#` prefix, anything else
/// falls back to the team default.
pub fn resolve_team_color(color: &str, team: Team) -> String {
    if is_valid_color(color) {
        let hex = color.strip_prefix('#').unwrap_or(color);
        format!("#{}", hex)
    } else if team == Team::B {
        DEFAULT_TEAM_B_COLOR.to_string()
    } else {
        DEFAULT_TEAM_A_COLOR.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::world::testing::RecordingWorld;
    use crate::modes::{register_builtin_modes, team_deathmatch::TeamDeathmatch};

    fn registry() -> ModeRegistry {
        let mut registry = ModeRegistry::new();
        register_builtin_modes(&mut registry);
        registry
    }

    fn tdm_config() -> EventConfig {
        let mut config = EventConfig::new("arena", "team-deathmatch", &TeamDeathmatch::default());
        config.zone_id = "arena-zone".into();
        config.maximum_players = 10;
        config.score_limit = 10;
        config.team_a = TeamConfig {
            spawn_set: "red".into(),
            kits: vec!["rifle".into()],
            ..TeamConfig::default()
        };
        config.team_b = TeamConfig {
            spawn_set: "blue".into(),
            kits: vec!["rifle".into()],
            ..TeamConfig::default()
        };
        config
    }

    #[test]
    fn test_valid_config() {
        let world = RecordingWorld::with_arena();
        assert_eq!(validate_event_config(&tdm_config(), &registry(), &world), Ok(()));
    }

    #[test]
    fn test_unknown_mode() {
        let world = RecordingWorld::with_arena();
        let mut config = tdm_config();
        config.mode_type = "gungame".into();
        let err = validate_event_config(&config, &registry(), &world).unwrap_err();
        assert_eq!(err.to_string(), "Event mode gungame is not currently loaded");
    }

    #[test]
    fn test_missing_team_b_kits() {
        let world = RecordingWorld::with_arena();
        let mut config = tdm_config();
        config.team_b.kits.clear();
        assert_eq!(
            validate_event_config(&config, &registry(), &world),
            Err(ConfigError::NoTeamBKits)
        );
    }

    #[test]
    fn test_invalid_references() {
        let world = RecordingWorld::with_arena();

        let mut config = tdm_config();
        config.team_a.kits.push("railgun".into());
        assert_eq!(
            validate_event_config(&config, &registry(), &world),
            Err(ConfigError::InvalidKit("railgun".into()))
        );

        let mut config = tdm_config();
        config.team_b.spawn_set = "nowhere".into();
        assert_eq!(
            validate_event_config(&config, &registry(), &world),
            Err(ConfigError::InvalidSecondSpawnSet("nowhere".into()))
        );

        let mut config = tdm_config();
        config.zone_id = String::new();
        assert!(matches!(
            validate_event_config(&config, &registry(), &world),
            Err(ConfigError::InvalidZone(_))
        ));
    }

    #[test]
    fn test_score_limit_required() {
        let world = RecordingWorld::with_arena();
        let mut config = tdm_config();
        config.score_limit = 0;
        assert_eq!(
            validate_event_config(&config, &registry(), &world),
            Err(ConfigError::MissingScoreLimit)
        );
    }

    #[test]
    fn test_player_counts() {
        let world = RecordingWorld::with_arena();
        let mut config = tdm_config();
        config.minimum_players = 0;
        assert_eq!(
            validate_event_config(&config, &registry(), &world),
            Err(ConfigError::MissingMinimumPlayers)
        );

        let mut config = tdm_config();
        config.maximum_players = 1;
        assert!(matches!(
            validate_event_config(&config, &registry(), &world),
            Err(ConfigError::InvalidPlayerRange { .. })
        ));
    }

    #[test]
    fn test_parameter_checks() {
        let world = RecordingWorld::with_arena();
        let policy = TeamDeathmatch::default();

        let mut config = tdm_config();
        assert!(matches!(
            config.set_param(&policy, "respawnTime", ParamValue::String("soon".into())),
            Err(ConfigError::ParameterType { .. })
        ));
        assert!(matches!(
            config.set_param(&policy, "nope", ParamValue::Int(1)),
            Err(ConfigError::UnknownParameter(_))
        ));

        config.set_param(&policy, "respawnTime", ParamValue::Int(600)).unwrap();
        assert!(matches!(
            validate_event_config(&config, &registry(), &world),
            Err(ConfigError::InvalidParameter(_))
        ));

        config.set_param(&policy, "respawnTime", ParamValue::Int(8)).unwrap();
        assert_eq!(config.param_int("respawnTime"), Some(8));
        assert_eq!(config.param_float("respawnTime"), Some(8.0));
    }

    #[test]
    fn test_new_fills_defaults() {
        let config = EventConfig::new("arena", "team-deathmatch", &TeamDeathmatch::default());
        assert_eq!(config.param_int("respawnTime"), Some(5));
        assert_eq!(config.minimum_players, 2);
    }

    #[test]
    fn test_param_value_json() {
        let values: Vec<ParamValue> = serde_json::from_str(r#"[true, 3, 2.5, "x", ["a","b"]]"#).unwrap();
        assert_eq!(values[0], ParamValue::Bool(true));
        assert_eq!(values[1], ParamValue::Int(3));
        assert_eq!(values[2], ParamValue::Float(2.5));
        assert_eq!(values[3], ParamValue::String("x".into()));
        assert_eq!(values[4], ParamValue::StringList(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_team_colors() {
        assert!(is_valid_color("#FF00aa"));
        assert!(is_valid_color("00FF00"));
        assert!(!is_valid_color("#FFF"));
        assert!(!is_valid_color("zzzzzz"));

        assert_eq!(resolve_team_color("00FF00", Team::A), "#00FF00");
        assert_eq!(resolve_team_color("", Team::A), DEFAULT_TEAM_A_COLOR);
        assert_eq!(resolve_team_color("bad", Team::B), DEFAULT_TEAM_B_COLOR);
    }
}
