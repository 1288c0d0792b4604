use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use super::{DoorBoard, PlacedRoute, wave_stage_key};
use crate::config::DoorConfig;
use crate::doors::{BlockRules, DoorModeMap, fits};
use crate::route::{Route, RouteKey, VAN_PREFIX, route_prefix};
use crate::staging::{stage_index, staging_lane};

/// Greedy door assignment, ignoring door modes.
///
/// Routes are grouped by staging lane: I, F, C and G lanes first (CP-prefix
/// routes only take part in the F lane), then CP, then every remaining prefix.
/// Block rules only constrain the CP and prefix passes; the result is meant to
/// go through [`plan_doors`] before use.
pub fn assign_doors(
    routes: &[Route],
    doors: &[u32],
    rules: &BlockRules,
    config: &DoorConfig,
) -> DoorBoard {
    let mut pass = DoorPass::new(routes, doors, config);

    let lane_of = |route: &Route| staging_lane(&route.staging_code);
    let is_van_prefix = |route: &Route| route_prefix(&route.route_code) == VAN_PREFIX;
    let lane_group = |lane: &str| -> Vec<&Route> {
        routes
            .iter()
            .filter(|route| lane_of(route) == lane && !is_van_prefix(route))
            .collect()
    };

    let i_lane = lane_group("I");
    let f_lane = routes
        .iter()
        .filter(|route| lane_of(route) == "F")
        .collect::<Vec<_>>();
    let c_lane = lane_group("C");
    let g_lane = lane_group("G");

    pass.fill_wave_block(&i_lane);
    pass.fill_by_stage(&f_lane);
    pass.fill_wave_block(&c_lane);
    pass.fill_wave_block(&g_lane);

    let cp_group = routes
        .iter()
        .filter(|route| lane_of(route) == VAN_PREFIX)
        .chain(routes.iter().filter(|route| is_van_prefix(route)))
        .collect::<Vec<_>>();
    let cp_allowed = config.priority_for(&rules.allowed_doors(VAN_PREFIX, doors));
    pass.fill_restricted(&cp_group, &cp_allowed);

    let mut prefixes: Vec<String> = Vec::new();
    let mut by_prefix: HashMap<String, Vec<&Route>> = HashMap::new();
    for route in routes.iter().filter(|route| {
        !matches!(lane_of(route).as_str(), "F" | "I" | "C" | "G") && !is_van_prefix(route)
    }) {
        let prefix = route_prefix(&route.route_code);
        if !by_prefix.contains_key(&prefix) {
            prefixes.push(prefix.clone());
        }
        by_prefix.entry(prefix).or_default().push(route);
    }
    for prefix in prefixes {
        let mut group = by_prefix.remove(&prefix).unwrap_or_default();
        group.sort_by_key(|route| wave_stage_key(route));
        let allowed = config.priority_for(&rules.allowed_doors(&prefix, doors));
        pass.fill_restricted(&group, &allowed);
    }

    let mut board = pass.board;
    board.dedupe();
    board.collect_unplaced(routes);
    board.sort_doors();
    board
}

/// Door assignment with door modes enforced: every placement that fails
/// [`fits`] is pulled and requeued onto the least-loaded door that accepts it,
/// in door-list order. Routes no door accepts end up unplaced.
pub fn plan_doors(
    routes: &[Route],
    doors: &[u32],
    modes: &DoorModeMap,
    rules: &BlockRules,
    config: &DoorConfig,
) -> DoorBoard {
    let baseline = assign_doors(routes, doors, rules, config);

    let mut board = DoorBoard::with_doors(doors);
    let mut requeue = Vec::new();
    for door in doors {
        for placed in baseline.routes_at(*door) {
            if fits(*door, &placed.route, modes, rules) {
                board.push(*door, placed.clone());
            } else {
                requeue.push(placed.clone());
            }
        }
    }

    for placed in requeue {
        match board.least_loaded(doors, |door| fits(door, &placed.route, modes, rules)) {
            Some(door) => board.push(door, placed),
            None => debug!(route = %placed.key, "no open door accepts route"),
        }
    }

    board.dedupe();
    board.collect_unplaced(routes);
    board.sort_doors();
    board
}

struct DoorPass {
    board: DoorBoard,
    priority: Vec<u32>,
    staging_doors: Vec<u32>,
    wave3_doors: Vec<u32>,
    wave3_minutes: Option<u32>,
    placed: HashSet<RouteKey>,
    f_waves: HashMap<u32, Vec<u32>>,
}

impl DoorPass {
    fn new(routes: &[Route], doors: &[u32], config: &DoorConfig) -> Self {
        let mut staging_doors = doors.to_vec();
        staging_doors.sort_unstable_by(|a, b| b.cmp(a));
        let wave3_doors = config
            .wave3_doors
            .iter()
            .copied()
            .filter(|door| doors.contains(door))
            .collect();
        let waves = routes
            .iter()
            .map(Route::wave_minutes)
            .collect::<BTreeSet<_>>();
        Self {
            board: DoorBoard::with_doors(doors),
            priority: config.priority_for(doors),
            staging_doors,
            wave3_doors,
            wave3_minutes: waves.iter().nth(2).copied(),
            placed: HashSet::new(),
            f_waves: HashMap::new(),
        }
    }

    fn is_wave3(&self, route: &Route) -> bool {
        self.wave3_minutes == Some(route.wave_minutes())
    }

    fn place(&mut self, door: u32, route: &Route) -> bool {
        let Some(placed) = PlacedRoute::from_route(route) else {
            return false;
        };
        if !self.placed.insert(placed.key.clone()) {
            return false;
        }
        self.board.push(door, placed);
        true
    }

    fn place_least_loaded(&mut self, route: &Route, candidates: &[u32]) -> Option<u32> {
        let door = self.board.least_loaded(candidates, |_| true)?;
        self.place(door, route).then_some(door)
    }

    fn is_placed(&self, route: &Route) -> bool {
        route.key().is_none_or(|key| self.placed.contains(&key))
    }

    /// Wave-3 routes first (onto the wave-3 doors when any exist), then the
    /// rest onto the priority list.
    fn fill_wave_block(&mut self, lane: &[&Route]) {
        let (mut wave3, mut rest): (Vec<&Route>, Vec<&Route>) =
            lane.iter().copied().partition(|route| self.is_wave3(route));
        wave3.sort_by_key(|route| wave_stage_key(route));
        rest.sort_by_key(|route| wave_stage_key(route));

        let wave3_candidates = if self.wave3_doors.is_empty() {
            self.priority.clone()
        } else {
            self.wave3_doors.clone()
        };
        let priority = self.priority.clone();
        for route in wave3 {
            self.place_least_loaded(route, &wave3_candidates);
        }
        for route in rest {
            self.place_least_loaded(route, &priority);
        }
    }

    /// `F.<n>` goes to the n-th door counting down from the highest number.
    fn fill_by_stage(&mut self, lane: &[&Route]) {
        let mut sorted = lane.to_vec();
        sorted.sort_by_key(|route| wave_stage_key(route));
        let staging_doors = self.staging_doors.clone();

        for route in sorted {
            let wave = route.wave_minutes();
            let target = stage_index(&route.staging_code)
                .and_then(|idx| staging_doors.get(idx).copied())
                .filter(|door| {
                    !self
                        .f_waves
                        .get(door)
                        .is_some_and(|waves| waves.contains(&wave))
                });
            let door = match target {
                Some(door) => self.place(door, route).then_some(door),
                None => self.place_least_loaded(route, &staging_doors),
            };
            if let Some(door) = door {
                self.f_waves.entry(door).or_default().push(wave);
            }
        }
    }

    /// CP and prefix passes: only doors not blocked for the prefix, wave-3
    /// routes preferring the allowed wave-3 doors. Already placed routes are
    /// skipped.
    fn fill_restricted(&mut self, group: &[&Route], allowed: &[u32]) {
        let wave3_allowed = self
            .wave3_doors
            .iter()
            .copied()
            .filter(|door| allowed.contains(door))
            .collect::<Vec<_>>();
        for route in group {
            if self.is_placed(route) {
                continue;
            }
            let candidates: &[u32] = if self.is_wave3(route) && !wave3_allowed.is_empty() {
                &wave3_allowed
            } else {
                allowed
            };
            if self.place_least_loaded(route, candidates).is_none() {
                debug!(route = %route.route_code, "no allowed door for route");
            }
        }
    }
}
