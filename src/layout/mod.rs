mod error;
mod grid;
mod types;

pub use error::LayoutError;
pub use grid::{FloorMatrix, MAX_GRID_CELLS};
pub use types::*;

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::FloorConfig;

const DOOR_COLOR: &str = "#6b7280";
const LANE_COLOR: &str = "#93c5fd";
const AISLE_COLOR: &str = "#cbd5e1";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FloorPlanDocument {
    Plan {
        width: Option<u32>,
        height: Option<u32>,
        #[serde(default)]
        regions: Vec<Value>,
    },
    Regions(Vec<Value>),
}

/// Reads a floor plan from JSON: either `{ width?, height?, regions }` or a bare
/// region array. Regions that do not deserialize are skipped; the geometry is
/// not checked here (see [`FloorPlan::validate`]).
pub fn parse_floor_plan(input: &str, defaults: &FloorConfig) -> Result<FloorPlan, LayoutError> {
    let document: FloorPlanDocument = serde_json::from_str(input)?;
    let (width, height, raw_regions) = match document {
        FloorPlanDocument::Plan {
            width,
            height,
            regions,
        } => (width, height, regions),
        FloorPlanDocument::Regions(regions) => (None, None, regions),
    };

    let regions = raw_regions
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value::<Region>(value) {
            Ok(region) => Some(region),
            Err(err) => {
                debug!(index = idx, %err, "skipping floor region");
                None
            }
        })
        .collect();

    Ok(FloorPlan {
        width: width.unwrap_or(defaults.width),
        height: height.unwrap_or(defaults.height),
        regions,
    })
}

/// One 2-wide door region per door on row 1, three columns apart.
pub fn doors_to_regions(doors: &[u32], left_margin: i32) -> Vec<Region> {
    doors
        .iter()
        .enumerate()
        .map(|(idx, door)| {
            let start_x = left_margin + idx as i32 * 3;
            Region::new(format!("door_{door}"), RegionKind::Door, (start_x, 1), (start_x + 1, 1))
                .with_label(door.to_string())
                .with_color(DOOR_COLOR)
        })
        .collect()
}

/// Generated floor used until a plan is imported: the door row, two rows of
/// 2x3 slots under it, an aisle, and a row of 1x6 slots.
pub fn default_floor_plan(doors: &[u32], config: &FloorConfig) -> FloorPlan {
    let width = config.width as i32;
    let height = config.height as i32;
    let margin = config.door_left_margin;
    let mut regions = doors_to_regions(doors, margin)
        .into_iter()
        .filter(|region| region.end_x < width && height > 1)
        .collect::<Vec<_>>();

    let mut two_by_three = 0;
    for row_y in [2, 5] {
        let mut x = margin + 2;
        while x + 1 < width && row_y + 2 < height {
            two_by_three += 1;
            regions.push(
                Region::new(
                    format!("slot_2x3_{two_by_three}"),
                    RegionKind::Lane,
                    (x, row_y),
                    (x + 1, row_y + 2),
                )
                .with_color(LANE_COLOR),
            );
            x += 3;
        }
    }

    if width > 0 && height > 8 {
        regions.push(
            Region::new("aisle", RegionKind::Aisle, (0, 8), (width - 1, 8)).with_color(AISLE_COLOR),
        );
    }

    let mut one_by_six = 0;
    let mut x = margin;
    while x < width && 9 + 5 < height {
        one_by_six += 1;
        regions.push(
            Region::new(format!("slot_1x6_{one_by_six}"), RegionKind::Lane, (x, 9), (x, 14))
                .with_color(LANE_COLOR),
        );
        x += 3;
    }

    FloorPlan {
        width: config.width,
        height: config.height,
        regions,
    }
}

fn row_major(a: &&Region, b: &&Region) -> std::cmp::Ordering {
    a.start_y.cmp(&b.start_y).then(a.start_x.cmp(&b.start_x))
}

/// 1x6 lane slots, row-major.
pub fn one_by_six_slots(plan: &FloorPlan) -> Vec<&Region> {
    slots_of(plan, SlotShape::OneBySix)
}

/// 2x3 lane slots, row-major.
pub fn two_by_three_slots(plan: &FloorPlan) -> Vec<&Region> {
    slots_of(plan, SlotShape::TwoByThree)
}

/// 2x3 slots grouped by top edge, rows top to bottom.
pub fn two_by_three_rows(plan: &FloorPlan) -> Vec<Vec<&Region>> {
    let mut rows: BTreeMap<i32, Vec<&Region>> = BTreeMap::new();
    for slot in two_by_three_slots(plan) {
        rows.entry(slot.start_y).or_default().push(slot);
    }
    rows.into_values().collect()
}

fn slots_of(plan: &FloorPlan, shape: SlotShape) -> Vec<&Region> {
    let mut slots = plan
        .regions
        .iter()
        .filter(|region| SlotShape::of(region) == Some(shape))
        .collect::<Vec<_>>();
    slots.sort_by(row_major);
    slots
}
