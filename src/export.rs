use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assign::{DoorOverrides, SlotOverrides};
use crate::doors::{DoorMode, DoorModeMap};
use crate::route::RouteKey;
use crate::store::BoardState;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid override export: {0}")]
    Json(#[from] serde_json::Error),
}

/// One manual placement. Door moves carry `fromDoor`/`toDoor`, slot moves
/// carry `fromSlotId`/`toSlotId`; `from*` is absent when the route had no
/// automatic placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideMove {
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_door: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_door: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_slot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_slot_id: Option<String>,
}

/// Human-auditable dump of every manual override plus the door setup they
/// were made against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideExport {
    #[serde(default)]
    pub moves: Vec<OverrideMove>,
    #[serde(default)]
    pub door_numbers: Vec<u32>,
    #[serde(default)]
    pub door_mode: DoorModeMap,
}

impl OverrideExport {
    pub fn from_state(state: &BoardState) -> Self {
        let mut moves = Vec::new();

        for (route, door) in &state.door_overrides {
            let from_door = RouteKey::from_composite(route).and_then(|key| state.auto_doors.door_of(&key));
            moves.push(OverrideMove {
                route: route.clone(),
                from_door,
                to_door: Some(*door),
                ..OverrideMove::default()
            });
        }

        for (route, slot) in &state.slot_overrides {
            let from_slot_id = state
                .auto_floor
                .iter()
                .find(|(_, placed)| placed.key.as_str() == route)
                .map(|(slot, _)| slot.clone());
            moves.push(OverrideMove {
                route: route.clone(),
                from_slot_id,
                to_slot_id: Some(slot.clone()),
                ..OverrideMove::default()
            });
        }

        moves.sort_by(|a, b| {
            a.route
                .cmp(&b.route)
                .then_with(|| a.to_slot_id.is_some().cmp(&b.to_slot_id.is_some()))
        });

        let door_mode = state
            .door_mode
            .iter()
            .filter(|(_, mode)| **mode != DoorMode::Open)
            .map(|(door, mode)| (*door, *mode))
            .collect();

        Self {
            moves,
            door_numbers: state.door_numbers.clone(),
            door_mode,
        }
    }

    pub fn parse(input: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn door_overrides(&self) -> DoorOverrides {
        self.moves
            .iter()
            .filter_map(|mv| Some((mv.route.clone(), mv.to_door?)))
            .collect()
    }

    pub fn slot_overrides(&self) -> SlotOverrides {
        self.moves
            .iter()
            .filter_map(|mv| Some((mv.route.clone(), mv.to_slot_id.clone()?)))
            .collect()
    }
}
