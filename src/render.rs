use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::assign::{FloorAssignment, PlacedRoute};
use crate::doors::DoorMode;
use crate::store::BoardState;
use crate::wave::normalize_wave_time;

/// `XL19 F.1 08:00`
fn route_label(placed: &PlacedRoute) -> String {
    let route = &placed.route;
    let mut label = route.route_code.clone();
    for part in [
        route.staging_code.clone(),
        normalize_wave_time(&route.wave_time),
    ] {
        if !part.is_empty() {
            label.push(' ');
            label.push_str(&part);
        }
    }
    label
}

fn join_labels(routes: &[PlacedRoute]) -> String {
    if routes.is_empty() {
        return "-".to_string();
    }
    routes.iter().map(route_label).collect::<Vec<_>>().join(", ")
}

/// One line per door in door-list order, followed by the routes no door took.
pub fn render_door_board(state: &BoardState) -> String {
    let mut out = String::new();
    let width = state
        .door_numbers
        .iter()
        .map(|door| door.to_string().len())
        .max()
        .unwrap_or(0);
    for door in &state.door_numbers {
        let mode = state.mode_of(*door);
        let _ = writeln!(
            out,
            "door {door:>width$} [{mode}] {routes}",
            mode = mode.as_str(),
            routes = join_labels(state.doors.routes_at(*door)),
        );
    }
    if !state.doors.unplaced.is_empty() {
        let _ = writeln!(out, "unplaced: {}", join_labels(&state.doors.unplaced));
    }
    out
}

/// Slot id -> route, in slot id order.
pub fn render_floor(state: &BoardState) -> String {
    let mut out = String::new();
    for (slot, placed) in &state.floor {
        let _ = writeln!(out, "{slot}: {}", route_label(placed));
    }
    let placed = state.floor.len();
    let total = state.routes.len();
    if placed < total {
        let _ = writeln!(out, "({} of {total} routes without a slot)", total - placed);
    }
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BoardView<'a> {
    door_numbers: &'a [u32],
    door_mode: BTreeMap<u32, DoorMode>,
    doors: &'a BTreeMap<u32, Vec<PlacedRoute>>,
    unplaced: &'a [PlacedRoute],
    floor: &'a FloorAssignment,
    wave_order: &'a [String],
}

/// The final board as pretty JSON.
pub fn board_json(state: &BoardState) -> Result<String, serde_json::Error> {
    let view = BoardView {
        door_numbers: &state.door_numbers,
        door_mode: state
            .door_numbers
            .iter()
            .map(|door| (*door, state.mode_of(*door)))
            .collect(),
        doors: &state.doors.doors,
        unplaced: &state.doors.unplaced,
        floor: &state.floor,
        wave_order: &state.wave_order,
    };
    serde_json::to_string_pretty(&view)
}

pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}
