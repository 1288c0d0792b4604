use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::{DoorBoard, FloorAssignment, PlacedRoute};
use crate::doors::{BlockRules, DoorModeMap, fits};
use crate::layout::FloorPlan;
use crate::route::{ROUTE_KEY_SEPARATOR, Route, RouteKey, legacy_route_key, normalize_code};

/// Route key (canonical, legacy `DSP|ROUTE`, or bare route code) -> door.
pub type DoorOverrides = BTreeMap<String, u32>;

/// Route key (canonical, legacy `DSP|ROUTE`, or bare route code) -> slot id.
pub type SlotOverrides = BTreeMap<String, String>;

/// Lookup of live routes by canonical key, legacy key and bare route code.
#[derive(Debug, Default)]
pub struct RouteIndex {
    by_key: HashMap<RouteKey, Route>,
    by_legacy: HashMap<String, Vec<RouteKey>>,
    by_code: HashMap<String, Vec<RouteKey>>,
}

impl RouteIndex {
    pub fn new(routes: &[Route]) -> Self {
        let mut index = Self::default();
        for route in routes {
            let Some(key) = route.key() else {
                continue;
            };
            if index.by_key.contains_key(&key) {
                continue;
            }
            let normalized = route.normalized();
            index
                .by_code
                .entry(normalized.route_code.clone())
                .or_default()
                .push(key.clone());
            if let Some(legacy) = normalized.legacy_key() {
                index.by_legacy.entry(legacy).or_default().push(key.clone());
            }
            index.by_key.insert(key, normalized);
        }
        index
    }

    pub fn get(&self, key: &RouteKey) -> Option<&Route> {
        self.by_key.get(key)
    }

    /// Resolves an override key to a live route. Legacy and bare keys only
    /// resolve when exactly one live route matches.
    pub fn resolve(&self, raw: &str) -> Option<RouteKey> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let parts = raw.split(ROUTE_KEY_SEPARATOR).collect::<Vec<_>>();
        match parts.len() {
            1 => unique(self.by_code.get(&normalize_code(raw))),
            2 => {
                let legacy = legacy_route_key(parts[1], parts[0])?;
                unique(self.by_legacy.get(&legacy))
            }
            _ => RouteKey::from_composite(raw).filter(|key| self.by_key.contains_key(key)),
        }
    }

    pub fn placed(&self, key: &RouteKey) -> Option<PlacedRoute> {
        self.get(key).map(|route| PlacedRoute {
            key: key.clone(),
            route: route.clone(),
        })
    }
}

fn unique(matches: Option<&Vec<RouteKey>>) -> Option<RouteKey> {
    match matches.map(Vec::as_slice) {
        Some([only]) => Some(only.clone()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDoors {
    pub board: DoorBoard,
    /// Canonical key -> door for every route not on its automatic door.
    pub overrides: DoorOverrides,
}

/// Applies door overrides on top of the automatic board.
///
/// An override moves the route to the end of the target door; doors hold any
/// number of routes, so nothing is displaced. Entries that do not resolve,
/// target a door outside `doors`, are already satisfied, or fail [`fits`] are
/// dropped.
pub fn resolve_door_overrides(
    routes: &[Route],
    baseline: &DoorBoard,
    overrides: &DoorOverrides,
    doors: &[u32],
    modes: &DoorModeMap,
    rules: &BlockRules,
) -> ResolvedDoors {
    let index = RouteIndex::new(routes);
    let mut board = baseline.clone();

    for (raw, target) in overrides {
        let Some(key) = index.resolve(raw) else {
            debug!(key = %raw, "dropping door override for unknown route");
            continue;
        };
        if !doors.contains(target) {
            debug!(route = %key, door = target, "dropping door override for missing door");
            continue;
        }
        if board.door_of(&key) == Some(*target) {
            continue;
        }
        let Some(route) = index.get(&key) else {
            continue;
        };
        if !fits(*target, route, modes, rules) {
            debug!(route = %key, door = target, "dropping door override the door cannot take");
            continue;
        }

        let placed = board.remove(&key).or_else(|| index.placed(&key));
        if let Some(placed) = placed {
            board.push(*target, placed);
        }
    }

    board.dedupe();
    board.collect_unplaced(routes);
    board.sort_doors();

    let overrides = board
        .placed()
        .filter(|(door, placed)| baseline.door_of(&placed.key) != Some(*door))
        .map(|(door, placed)| (placed.key.to_string(), door))
        .collect();

    ResolvedDoors { board, overrides }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSlots {
    pub assignment: FloorAssignment,
    /// Canonical key -> slot for every route not in its automatic slot.
    pub overrides: SlotOverrides,
}

/// Applies slot overrides on top of the automatic floor assignment.
///
/// Every mover is lifted off the board before any is placed, so the result
/// does not depend on the order entries are visited in. A route sitting in a
/// mover's target takes the slot the mover vacated; when the mover had no
/// automatic slot, or that slot is itself a target, the occupant is left
/// unplaced. Later entries win when two of them name the same route or slot.
pub fn resolve_slot_overrides(
    routes: &[Route],
    plan: &FloorPlan,
    baseline: &FloorAssignment,
    overrides: &SlotOverrides,
) -> ResolvedSlots {
    let index = RouteIndex::new(routes);

    let mut auto_route: BTreeMap<String, RouteKey> = BTreeMap::new();
    let mut auto_slot: HashMap<RouteKey, String> = HashMap::new();
    for (slot, placed) in baseline {
        if auto_slot.contains_key(&placed.key) {
            continue;
        }
        auto_route.insert(slot.clone(), placed.key.clone());
        auto_slot.insert(placed.key.clone(), slot.clone());
    }

    // `claims` and `wanted` stay inverse maps of each other.
    let mut claims: BTreeMap<String, RouteKey> = BTreeMap::new();
    let mut wanted: HashMap<RouteKey, String> = HashMap::new();
    for (raw, target) in overrides {
        let Some(key) = index.resolve(raw) else {
            debug!(key = %raw, "dropping slot override for unknown route");
            continue;
        };
        let target = target.trim();
        if !plan.is_lane(target) {
            debug!(route = %key, slot = target, "dropping slot override for missing slot");
            continue;
        }
        if let Some(previous) = wanted.insert(key.clone(), target.to_string()) {
            claims.remove(&previous);
        }
        if let Some(evicted) = claims.insert(target.to_string(), key.clone()) {
            if evicted != key {
                wanted.remove(&evicted);
            }
        }
    }

    let mut slot_to_route = auto_route;
    for key in wanted.keys() {
        if let Some(home) = auto_slot.get(key) {
            slot_to_route.remove(home);
        }
    }

    let mut displaced = Vec::new();
    for (slot, key) in &claims {
        if let Some(occupant) = slot_to_route.insert(slot.clone(), key.clone()) {
            displaced.push((occupant, key));
        }
    }

    for (occupant, mover) in displaced {
        match auto_slot.get(mover) {
            Some(vacated) if !claims.contains_key(vacated) => {
                slot_to_route.insert(vacated.clone(), occupant);
            }
            _ => debug!(route = %occupant, "slot override left route without a slot"),
        }
    }

    let overrides = slot_to_route
        .iter()
        .filter(|(slot, key)| auto_slot.get(*key) != Some(*slot))
        .map(|(slot, key)| (key.to_string(), slot.clone()))
        .collect();

    let assignment = slot_to_route
        .into_iter()
        .filter_map(|(slot, key)| {
            let placed = index
                .placed(&key)
                .or_else(|| baseline.values().find(|placed| placed.key == key).cloned())?;
            Some((slot, placed))
        })
        .collect();

    ResolvedSlots {
        assignment,
        overrides,
    }
}
