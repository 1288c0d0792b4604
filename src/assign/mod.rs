pub mod doors;
pub mod floor;
pub mod overrides;

pub use doors::{assign_doors, plan_doors};
pub use floor::assign_floor;
pub use overrides::{
    DoorOverrides, ResolvedDoors, ResolvedSlots, RouteIndex, SlotOverrides, resolve_door_overrides,
    resolve_slot_overrides,
};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::route::{Route, RouteKey};
use crate::staging::{compare_staging_codes, stage_number};
use crate::wave::{normalize_wave_time, wave_sort_minutes};

/// A route as it sits in an assignment: its key plus a normalized copy of the
/// route fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedRoute {
    pub key: RouteKey,
    #[serde(flatten)]
    pub route: Route,
}

impl PlacedRoute {
    pub fn from_route(route: &Route) -> Option<Self> {
        let key = route.key()?;
        Some(Self {
            key,
            route: route.normalized(),
        })
    }
}

/// Slot id -> route.
pub type FloorAssignment = BTreeMap<String, PlacedRoute>;

/// Door -> ordered routes, plus the routes no door could take.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorBoard {
    pub doors: BTreeMap<u32, Vec<PlacedRoute>>,
    #[serde(default)]
    pub unplaced: Vec<PlacedRoute>,
}

impl DoorBoard {
    pub fn with_doors(doors: &[u32]) -> Self {
        Self {
            doors: doors.iter().map(|door| (*door, Vec::new())).collect(),
            unplaced: Vec::new(),
        }
    }

    pub fn load(&self, door: u32) -> usize {
        self.doors.get(&door).map_or(0, Vec::len)
    }

    pub fn routes_at(&self, door: u32) -> &[PlacedRoute] {
        self.doors.get(&door).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn door_of(&self, key: &RouteKey) -> Option<u32> {
        self.doors
            .iter()
            .find(|(_, routes)| routes.iter().any(|placed| &placed.key == key))
            .map(|(door, _)| *door)
    }

    pub fn push(&mut self, door: u32, placed: PlacedRoute) {
        self.doors.entry(door).or_default().push(placed);
    }

    /// Removes `key` from every door and from the unplaced list.
    pub fn remove(&mut self, key: &RouteKey) -> Option<PlacedRoute> {
        let mut removed = None;
        for routes in self.doors.values_mut() {
            if let Some(pos) = routes.iter().position(|placed| &placed.key == key) {
                let placed = routes.remove(pos);
                removed.get_or_insert(placed);
            }
        }
        if let Some(pos) = self.unplaced.iter().position(|placed| &placed.key == key) {
            let placed = self.unplaced.remove(pos);
            removed.get_or_insert(placed);
        }
        removed
    }

    /// First door (in `order`) with the smallest load among those accepted by
    /// `eligible`.
    pub fn least_loaded<F>(&self, order: &[u32], mut eligible: F) -> Option<u32>
    where
        F: FnMut(u32) -> bool,
    {
        let mut best: Option<(u32, usize)> = None;
        for door in order.iter().copied() {
            if !eligible(door) {
                continue;
            }
            let load = self.load(door);
            if best.is_none_or(|(_, best_load)| load < best_load) {
                best = Some((door, load));
            }
        }
        best.map(|(door, _)| door)
    }

    pub fn placed_count(&self) -> usize {
        self.doors.values().map(Vec::len).sum()
    }

    pub fn placed(&self) -> impl Iterator<Item = (u32, &PlacedRoute)> {
        self.doors
            .iter()
            .flat_map(|(door, routes)| routes.iter().map(move |placed| (*door, placed)))
    }

    /// Keeps the first occurrence of every key, scanning doors in ascending order.
    pub fn dedupe(&mut self) {
        let mut seen = HashSet::new();
        for routes in self.doors.values_mut() {
            routes.retain(|placed| seen.insert(placed.key.clone()));
        }
        self.unplaced.retain(|placed| seen.insert(placed.key.clone()));
    }

    pub fn sort_doors(&mut self) {
        for routes in self.doors.values_mut() {
            routes.sort_by(|a, b| compare_board_routes(&a.route, &b.route));
        }
        self.unplaced
            .sort_by(|a, b| compare_board_routes(&a.route, &b.route));
    }

    /// Every keyed route of `routes` that is on no door goes to `unplaced`.
    pub fn collect_unplaced(&mut self, routes: &[Route]) {
        let mut placed = self
            .placed()
            .map(|(_, placed)| placed.key.clone())
            .collect::<HashSet<_>>();
        self.unplaced = routes
            .iter()
            .filter_map(PlacedRoute::from_route)
            .filter(|placed_route| placed.insert(placed_route.key.clone()))
            .collect();
    }
}

/// Per-door display order: wave, then staging code, then input order.
pub fn compare_board_routes(a: &Route, b: &Route) -> Ordering {
    a.wave_minutes()
        .cmp(&b.wave_minutes())
        .then_with(|| compare_staging_codes(&a.staging_code, &b.staging_code))
        .then_with(|| a.id.cmp(&b.id))
}

/// Fill order used by the greedy passes: wave, stage number (missing last),
/// input order.
pub(crate) fn wave_stage_key(route: &Route) -> (u32, u32, usize) {
    (
        route.wave_minutes(),
        stage_number(&route.staging_code).unwrap_or(u32::MAX),
        route.id,
    )
}

/// Distinct canonical wave times in ascending order; unparseable waves sort
/// last.
pub fn wave_order(routes: &[Route]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut waves = routes
        .iter()
        .map(|route| normalize_wave_time(&route.wave_time))
        .filter(|wave| !wave.is_empty())
        .filter(|wave| seen.insert(wave.clone()))
        .collect::<Vec<_>>();
    waves.sort_by_key(|wave| wave_sort_minutes(wave));
    waves
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(id: usize, code: &str, staging: &str, wave: &str) -> PlacedRoute {
        PlacedRoute::from_route(&Route::new(id, code, "MTG", staging, wave, None)).unwrap()
    }

    #[test]
    fn least_loaded_prefers_first_on_ties() {
        let mut board = DoorBoard::with_doors(&[99, 98, 97]);
        assert_eq!(board.least_loaded(&[98, 99], |_| true), Some(98));
        board.push(98, placed(0, "XL1", "C.1", "08:00"));
        assert_eq!(board.least_loaded(&[98, 99], |_| true), Some(99));
        assert_eq!(board.least_loaded(&[98, 99], |door| door == 98), Some(98));
        assert_eq!(board.least_loaded(&[], |_| true), None);
    }

    #[test]
    fn dedupe_keeps_lowest_door() {
        let mut board = DoorBoard::with_doors(&[90, 99]);
        board.push(99, placed(0, "XL1", "C.1", "08:00"));
        board.push(90, placed(0, "XL1", "C.1", "08:00"));
        board.dedupe();
        assert_eq!(board.load(90), 1);
        assert_eq!(board.load(99), 0);
    }

    #[test]
    fn remove_takes_route_off_every_door() {
        let mut board = DoorBoard::with_doors(&[90, 99]);
        let route = placed(0, "XL1", "C.1", "08:00");
        board.push(99, route.clone());
        assert_eq!(board.door_of(&route.key), Some(99));
        assert_eq!(board.remove(&route.key), Some(route.clone()));
        assert_eq!(board.door_of(&route.key), None);
        assert_eq!(board.remove(&route.key), None);
    }

    #[test]
    fn sorts_f_lane_before_i_lane_within_a_wave() {
        let mut board = DoorBoard::with_doors(&[99]);
        board.push(99, placed(0, "XL2", "I.1", "08:00"));
        board.push(99, placed(1, "XL1", "F.10", "08:00"));
        board.push(99, placed(2, "XL0", "C.1", "07:00"));
        board.sort_doors();
        let order = board
            .routes_at(99)
            .iter()
            .map(|placed| placed.route.staging_code.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["C.1", "F.10", "I.1"]);
    }

    #[test]
    fn wave_order_is_chronological() {
        let routes = vec![
            Route::new(0, "XL1", "", "F.1", "10:00", None),
            Route::new(1, "XL2", "", "F.1", "bogus", None),
            Route::new(2, "XL3", "", "F.1", "8:00 AM", None),
            Route::new(3, "XL4", "", "F.1", "10:00", None),
            Route::new(4, "XL5", "", "F.1", "08:00\u{200B}", None),
        ];
        assert_eq!(wave_order(&routes), vec!["08:00", "10:00", "BOGUS"]);
    }
}
