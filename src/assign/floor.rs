use std::collections::HashSet;
use tracing::debug;

use super::{FloorAssignment, PlacedRoute, compare_board_routes};
use crate::layout::{FloorPlan, Region, one_by_six_slots, two_by_three_rows, two_by_three_slots};
use crate::route::{Route, VAN_PREFIX, dedupe_routes};
use crate::staging::stage_index;

/// DSP whose CP routes are staged like trucks.
const TRUCK_STAGED_DSP: &str = "MTG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RowGroup {
    F,
    I,
    Other,
}

/// Places routes onto the lane slots of `plan`.
///
/// CP routes (except those staged `F.*` or run by MTG) take the 1x6 slots in
/// wave order. Everything else fills 2x3 rows: F, I and the remaining lanes
/// each get one row, earliest wave nearest the doors, with F and I placed by
/// stage number where possible. Routes that do not fit their row spill into
/// any free 2x3 slot.
pub fn assign_floor(routes: &[Route], plan: &FloorPlan) -> FloorAssignment {
    let routes = dedupe_routes(routes)
        .iter()
        .map(Route::normalized)
        .collect::<Vec<_>>();

    let (narrow, wide): (Vec<&Route>, Vec<&Route>) =
        routes.iter().partition(|route| takes_one_by_six(route));

    let mut fill = SlotFill::default();

    let narrow_slots = one_by_six_slots(plan);
    let leftover = fill.sequential(narrow, &narrow_slots);
    if !leftover.is_empty() {
        debug!(count = leftover.len(), "1x6 slots exhausted");
    }

    let mut groups = [RowGroup::F, RowGroup::I, RowGroup::Other]
        .into_iter()
        .map(|group| {
            let members = wide
                .iter()
                .copied()
                .filter(|route| row_group(route) == group)
                .collect::<Vec<_>>();
            (group, members)
        })
        .filter(|(_, members)| !members.is_empty())
        .collect::<Vec<_>>();
    groups.sort_by_key(|(group, members)| {
        let earliest = members.iter().map(|route| route.wave_minutes()).min();
        (earliest, *group)
    });

    let rows = two_by_three_rows(plan);
    let mut overflow = Vec::new();
    for (idx, (group, members)) in groups.into_iter().enumerate() {
        let row = rows.get(idx).map(Vec::as_slice).unwrap_or(&[]);
        let rest = match group {
            RowGroup::F | RowGroup::I => fill.by_stage(members, row),
            RowGroup::Other => fill.sequential(members, row),
        };
        overflow.extend(rest);
    }

    let free = two_by_three_slots(plan)
        .into_iter()
        .filter(|slot| !fill.used.contains(&slot.id))
        .collect::<Vec<_>>();
    let leftover = fill.sequential(overflow, &free);
    if !leftover.is_empty() {
        debug!(count = leftover.len(), "2x3 slots exhausted");
    }

    fill.assignment
}

fn takes_one_by_six(route: &Route) -> bool {
    route.prefix == VAN_PREFIX
        && !route.staging_code.starts_with("F.")
        && route.dsp_code != TRUCK_STAGED_DSP
}

fn row_group(route: &Route) -> RowGroup {
    if route.staging_code.starts_with("F.") {
        RowGroup::F
    } else if route.staging_code.starts_with("I.") {
        RowGroup::I
    } else {
        RowGroup::Other
    }
}

#[derive(Default)]
struct SlotFill {
    assignment: FloorAssignment,
    used: HashSet<String>,
}

impl SlotFill {
    fn put(&mut self, slot: &Region, route: &Route) -> bool {
        let Some(placed) = PlacedRoute::from_route(route) else {
            return false;
        };
        self.used.insert(slot.id.clone());
        self.assignment.insert(slot.id.clone(), placed);
        true
    }

    /// Wave/staging order into the free slots of `slots`, left to right.
    /// Returns the routes that did not fit.
    fn sequential<'r>(&mut self, mut routes: Vec<&'r Route>, slots: &[&Region]) -> Vec<&'r Route> {
        routes.sort_by(|a, b| compare_board_routes(a, b));
        let free = slots
            .iter()
            .copied()
            .filter(|slot| !self.used.contains(&slot.id))
            .collect::<Vec<_>>();

        let mut rest = Vec::new();
        let mut free = free.into_iter();
        for route in routes {
            match free.next() {
                Some(slot) => {
                    self.put(slot, route);
                }
                None => rest.push(route),
            }
        }
        rest
    }

    /// `X.<n>` takes the n-th slot of the row when it is free; the rest go in
    /// sequentially.
    fn by_stage<'r>(&mut self, mut routes: Vec<&'r Route>, row: &[&Region]) -> Vec<&'r Route> {
        routes.sort_by_key(|route| {
            (
                stage_index(&route.staging_code).unwrap_or(usize::MAX),
                route.wave_minutes(),
                route.id,
            )
        });

        let mut unassigned = Vec::new();
        for route in routes {
            let target = stage_index(&route.staging_code)
                .and_then(|idx| row.get(idx))
                .filter(|slot| !self.used.contains(&slot.id));
            match target {
                Some(slot) => {
                    self.put(slot, route);
                }
                None => unassigned.push(route),
            }
        }
        self.sequential(unassigned, row)
    }
}
