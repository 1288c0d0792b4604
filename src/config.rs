use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::doors::BlockRules;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub doors: DoorConfig,
    pub floor: FloorConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Warehouse door constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorConfig {
    /// Door list used when none is supplied, in display order.
    pub default_doors: Vec<u32>,
    /// Fill order applied when the active door list equals `default_doors`.
    pub priority_doors: Vec<u32>,
    /// Doors preferred for the third distinct wave.
    pub wave3_doors: Vec<u32>,
    pub block_rules: BlockRules,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            default_doors: (83..=99).rev().collect(),
            priority_doors: vec![
                99, 98, 97, 96, 95, 94, 93, 89, 88, 87, 86, 85, 84, 83, 92, 91, 90,
            ],
            wave3_doors: vec![90, 91, 92],
            block_rules: BlockRules::default(),
        }
    }
}

impl DoorConfig {
    /// Priority order for `doors`: the configured fill order when `doors` is the
    /// default list, otherwise `doors` as given.
    pub fn priority_for(&self, doors: &[u32]) -> Vec<u32> {
        if doors == self.default_doors.as_slice() {
            self.priority_doors
                .iter()
                .copied()
                .filter(|door| doors.contains(door))
                .collect()
        } else {
            doors.to_vec()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorConfig {
    pub width: u32,
    pub height: u32,
    /// Column of the first door region.
    pub door_left_margin: i32,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            width: 54,
            height: 16,
            door_left_margin: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub name: String,
    pub dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "doors-store".to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DoorConfigFile {
    default_doors: Option<Vec<u32>>,
    priority_doors: Option<Vec<u32>>,
    #[serde(alias = "wave3")]
    wave3_doors: Option<Vec<u32>>,
    block_rules: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloorConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    door_left_margin: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreConfigFile {
    name: Option<String>,
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoggingConfigFile {
    level: Option<String>,
    with_target: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    doors: Option<DoorConfigFile>,
    floor: Option<FloorConfigFile>,
    store: Option<StoreConfigFile>,
    logging: Option<LoggingConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parsing config {}", path.display()))
}

/// Merges a partial config document over the defaults. Plain JSON is tried
/// first, then JSON5 for hand-edited files.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .map_err(|json5_err| anyhow::anyhow!("{json_err}; json5: {json5_err}"))?,
    };

    let mut config = Config::default();

    if let Some(doors) = parsed.doors {
        if let Some(v) = doors.default_doors.filter(|v| !v.is_empty()) {
            config.doors.default_doors = v;
        }
        if let Some(v) = doors.priority_doors {
            config.doors.priority_doors = v;
        }
        if let Some(v) = doors.wave3_doors {
            config.doors.wave3_doors = v;
        }
        if let Some(v) = doors.block_rules {
            config.doors.block_rules = BlockRules::from_json(&v);
        }
    }

    if let Some(floor) = parsed.floor {
        if let Some(v) = floor.width {
            config.floor.width = v;
        }
        if let Some(v) = floor.height {
            config.floor.height = v;
        }
        if let Some(v) = floor.door_left_margin {
            config.floor.door_left_margin = v;
        }
    }

    if let Some(store) = parsed.store {
        if let Some(v) = store.name {
            config.store.name = v;
        }
        if store.dir.is_some() {
            config.store.dir = store.dir;
        }
    }

    if let Some(logging) = parsed.logging {
        if let Some(v) = logging.level {
            config.logging.level = v;
        }
        if let Some(v) = logging.with_target {
            config.logging.with_target = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_warehouse() {
        let config = Config::default();
        assert_eq!(config.doors.default_doors.first(), Some(&99));
        assert_eq!(config.doors.default_doors.last(), Some(&83));
        assert_eq!(config.doors.default_doors.len(), 17);
        assert_eq!(config.store.name, "doors-store");
        assert_eq!((config.floor.width, config.floor.height), (54, 16));
    }

    #[test]
    fn priority_applies_only_to_default_list() {
        let doors = DoorConfig::default();
        let priority = doors.priority_for(&doors.default_doors.clone());
        assert_eq!(&priority[..3], &[99, 98, 97]);
        assert_eq!(&priority[14..], &[92, 91, 90]);
        assert_eq!(doors.priority_for(&[90, 99]), vec![90, 99]);
    }

    #[test]
    fn partial_json5_overrides_defaults() {
        let config = parse_config(
            r#"{
                // hand edited
                doors: { wave3Doors: [10, 11], blockRules: { CP: [10] } },
                logging: { level: "debug" },
            }"#,
        )
        .unwrap();
        assert_eq!(config.doors.wave3_doors, vec![10, 11]);
        assert!(config.doors.block_rules.blocked("CP", 10));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.floor.width, 54);
        assert_eq!(config.doors.default_doors.len(), 17);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_config("{ doors: ").is_err());
    }

    #[test]
    fn missing_path_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.doors.wave3_doors, vec![90, 91, 92]);
    }
}
