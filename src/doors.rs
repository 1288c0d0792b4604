use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::route::{Route, VehicleClass, route_prefix};

/// Operating state of a dock door.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DoorMode {
    #[default]
    #[serde(alias = "all")]
    Open,
    TruckOnly,
    Closed,
}

impl DoorMode {
    /// Open -> TruckOnly -> Closed -> Open.
    pub fn next(self) -> Self {
        match self {
            Self::Open => Self::TruckOnly,
            Self::TruckOnly => Self::Closed,
            Self::Closed => Self::Open,
        }
    }

    pub fn admits(self, vehicle: VehicleClass) -> bool {
        match self {
            Self::Open => true,
            Self::TruckOnly => vehicle != VehicleClass::Van,
            Self::Closed => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::TruckOnly => "truck-only",
            Self::Closed => "closed",
        }
    }
}

/// Doors without an entry are open.
pub type DoorModeMap = BTreeMap<u32, DoorMode>;

pub fn door_mode(modes: &DoorModeMap, door: u32) -> DoorMode {
    modes.get(&door).copied().unwrap_or_default()
}

/// Route prefix -> doors that prefix may never use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockRules(BTreeMap<String, BTreeSet<u32>>);

impl BlockRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule<I>(mut self, prefix: &str, doors: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.0
            .entry(prefix.to_ascii_uppercase())
            .or_default()
            .extend(doors);
        self
    }

    /// Reads `{ "CP": [90, "91"], ... }`. Numeric strings are accepted and any
    /// other entry is dropped; a non-object yields no rules.
    pub fn from_json(value: &Value) -> Self {
        let mut rules = Self::new();
        let Some(map) = value.as_object() else {
            return rules;
        };
        for (prefix, doors) in map {
            let doors = doors
                .as_array()
                .map(|items| items.iter().filter_map(door_from_value).collect::<BTreeSet<_>>())
                .unwrap_or_default();
            rules
                .0
                .entry(prefix.trim().to_ascii_uppercase())
                .or_default()
                .extend(doors);
        }
        rules
    }

    pub fn blocked(&self, prefix: &str, door: u32) -> bool {
        self.0
            .get(prefix)
            .is_some_and(|doors| doors.contains(&door))
    }

    /// `doors` minus the ones blocked for `prefix`, order preserved.
    pub fn allowed_doors(&self, prefix: &str, doors: &[u32]) -> Vec<u32> {
        doors
            .iter()
            .copied()
            .filter(|door| !self.blocked(prefix, *door))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<u32>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn door_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Whether `route` may occupy `door` under the current modes and block rules.
pub fn fits(door: u32, route: &Route, modes: &DoorModeMap, rules: &BlockRules) -> bool {
    if rules.blocked(&route_prefix(&route.route_code), door) {
        return false;
    }
    door_mode(modes, door).admits(route.vehicle)
}
