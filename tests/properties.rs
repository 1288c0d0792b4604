use std::collections::{BTreeMap, HashSet};

use dock_planner::assign::{
    DoorOverrides, SlotOverrides, assign_floor, plan_doors, resolve_door_overrides,
    resolve_slot_overrides,
};
use dock_planner::config::{Config, FloorConfig};
use dock_planner::doors::{BlockRules, DoorMode, DoorModeMap, fits};
use dock_planner::layout::{SlotShape, default_floor_plan};
use dock_planner::parser::parse_route_line;
use dock_planner::route::{Route, VehicleClass, dedupe_routes};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

const DOORS: [u32; 8] = [99, 98, 97, 96, 95, 92, 91, 90];

fn route_strategy() -> impl Strategy<Value = (String, u32, String, String, u32, String, Option<VehicleClass>)> {
    (
        prop::sample::select(vec!["XL", "CP", "DX"]).prop_map(str::to_string),
        1_u32..30,
        prop::sample::select(vec!["MTG", "JUTL", "GALX", ""]).prop_map(str::to_string),
        prop::sample::select(vec!["F", "I", "C", "G"]).prop_map(str::to_string),
        1_u32..8,
        prop::sample::select(vec!["8:00AM", "08:45", "9:10 am", "10:00", "bogus"]).prop_map(str::to_string),
        prop::option::of(prop::sample::select(vec![VehicleClass::Truck, VehicleClass::Van])),
    )
}

fn routes_strategy() -> impl Strategy<Value = Vec<Route>> {
    prop::collection::vec(route_strategy(), 0..40).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(id, (prefix, num, dsp, lane, stage, wave, vehicle))| {
                Route::new(
                    id,
                    &format!("{prefix}{num}"),
                    &dsp,
                    &format!("{lane}.{stage}"),
                    &wave,
                    vehicle,
                )
            })
            .collect()
    })
}

fn modes_strategy() -> impl Strategy<Value = DoorModeMap> {
    prop::collection::vec(0_u8..3, DOORS.len()).prop_map(|picks| {
        DOORS
            .iter()
            .zip(picks)
            .filter_map(|(door, pick)| match pick {
                1 => Some((*door, DoorMode::TruckOnly)),
                2 => Some((*door, DoorMode::Closed)),
                _ => None,
            })
            .collect()
    })
}

fn block_rules() -> BlockRules {
    BlockRules::new().with_rule("DX", [99, 98])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn route_keys_survive_paste_noise(
        dsp in "[A-Z]{2,4}",
        code in "[A-Z]{1,3}[0-9]{1,3}",
        stage in 1_u32..12,
        hour in 1_u32..13,
        minute in 0_u32..60,
    ) {
        let clean = format!("{dsp} {code} F.{stage} {hour}:{minute:02}AM");
        let noisy = format!(
            "  {}\u{200B} {}\u{00A0}\u{FEFF} f.{stage}   {hour}:{minute:02} am  ",
            dsp.to_lowercase(),
            code.to_lowercase(),
        );
        let clean = parse_route_line(0, &clean).unwrap();
        let noisy = parse_route_line(7, &noisy).unwrap();
        prop_assert_eq!(clean.key(), noisy.key());
        prop_assert!(clean.key().is_some());
    }

    #[test]
    fn normalization_is_idempotent(routes in routes_strategy()) {
        for route in &routes {
            let once = route.normalized();
            prop_assert_eq!(once.normalized(), once.clone());
            prop_assert_eq!(once.key(), route.key());
        }
    }

    #[test]
    fn door_board_places_each_route_once_and_eligibly(
        routes in routes_strategy(),
        modes in modes_strategy(),
    ) {
        let config = Config::default();
        let rules = block_rules();
        let board = plan_doors(&routes, &DOORS, &modes, &rules, &config.doors);

        let mut seen = HashSet::new();
        for (door, placed) in board.placed() {
            prop_assert!(seen.insert(placed.key.clone()), "{} placed twice", placed.key);
            prop_assert!(fits(door, &placed.route, &modes, &rules));
        }
        for placed in &board.unplaced {
            prop_assert!(seen.insert(placed.key.clone()), "{} placed twice", placed.key);
        }
        let expected = dedupe_routes(&routes)
            .iter()
            .filter_map(Route::key)
            .collect::<HashSet<_>>();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn floor_assignment_has_no_duplicates(routes in routes_strategy()) {
        let plan = default_floor_plan(&DOORS, &FloorConfig::default());
        let assignment = assign_floor(&routes, &plan);

        let mut seen = HashSet::new();
        for (slot, placed) in &assignment {
            prop_assert!(seen.insert(placed.key.clone()));
            let region = plan.region(slot).unwrap();
            let shape = SlotShape::of(region).unwrap();
            let narrow = placed.route.prefix == "CP"
                && !placed.route.staging_code.starts_with("F.")
                && placed.route.dsp_code != "MTG";
            if narrow {
                prop_assert_eq!(shape, SlotShape::OneBySix);
            } else {
                prop_assert_eq!(shape, SlotShape::TwoByThree);
            }
        }
    }

    #[test]
    fn door_overrides_are_idempotent(
        routes in routes_strategy(),
        modes in modes_strategy(),
        picks in prop::collection::vec((0_usize..40, 0_usize..DOORS.len()), 0..10),
    ) {
        let config = Config::default();
        let rules = block_rules();
        let baseline = plan_doors(&routes, &DOORS, &modes, &rules, &config.doors);
        let keyed = dedupe_routes(&routes);
        let overrides: DoorOverrides = picks
            .into_iter()
            .filter_map(|(route, door)| {
                let key = keyed.get(route)?.key()?;
                Some((key.to_string(), DOORS[door]))
            })
            .collect::<BTreeMap<_, _>>();

        let first = resolve_door_overrides(&routes, &baseline, &overrides, &DOORS, &modes, &rules);
        let second =
            resolve_door_overrides(&routes, &baseline, &first.overrides, &DOORS, &modes, &rules);
        prop_assert_eq!(&second.board, &first.board);
        prop_assert_eq!(&second.overrides, &first.overrides);

        for (door, placed) in first.board.placed() {
            prop_assert!(fits(door, &placed.route, &modes, &rules));
        }
    }

    #[test]
    fn slot_overrides_are_idempotent(
        routes in routes_strategy(),
        picks in prop::collection::vec((0_usize..40, 0_usize..64), 0..12),
    ) {
        let plan = default_floor_plan(&DOORS, &FloorConfig::default());
        let lanes = plan.lane_ids().map(str::to_string).collect::<Vec<_>>();
        let baseline = assign_floor(&routes, &plan);
        let keyed = dedupe_routes(&routes);
        let overrides: SlotOverrides = picks
            .into_iter()
            .filter_map(|(route, slot)| {
                let key = keyed.get(route)?.key()?;
                Some((key.to_string(), lanes.get(slot % lanes.len().max(1))?.clone()))
            })
            .collect::<BTreeMap<_, _>>();

        let first = resolve_slot_overrides(&routes, &plan, &baseline, &overrides);
        let second = resolve_slot_overrides(&routes, &plan, &baseline, &first.overrides);
        prop_assert_eq!(&second.assignment, &first.assignment);
        prop_assert_eq!(&second.overrides, &first.overrides);

        let mut seen = HashSet::new();
        for (slot, placed) in &first.assignment {
            prop_assert!(seen.insert(placed.key.clone()), "{} placed twice", placed.key);
            prop_assert!(plan.is_lane(slot));
        }
        for (key, slot) in &first.overrides {
            let placed = first.assignment.get(slot);
            prop_assert_eq!(placed.map(|placed| placed.key.to_string()), Some(key.clone()));
        }
    }
}
