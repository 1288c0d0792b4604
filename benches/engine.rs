use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dock_planner::assign::{assign_floor, plan_doors};
use dock_planner::config::Config;
use dock_planner::doors::{BlockRules, DoorMode, DoorModeMap};
use dock_planner::layout::default_floor_plan;
use dock_planner::parser::parse_routes;
use dock_planner::store::{BoardState, Command, apply};
use std::hint::black_box;

const DSPS: [&str; 4] = ["MTG", "JUTL", "GALX", "RWAY"];
const LANES: [&str; 4] = ["F", "I", "C", "G"];
const WAVES: [&str; 5] = ["8:00AM", "8:45 AM", "09:10", "9:35am", "10:00"];

fn route_paste(routes: usize) -> String {
    let mut out = String::new();
    for i in 0..routes {
        let prefix = if i % 5 == 0 { "CP" } else { "XL" };
        let dsp = DSPS[i % DSPS.len()];
        let lane = LANES[(i / 3) % LANES.len()];
        let stage = i % 12 + 1;
        let wave = WAVES[(i / 7) % WAVES.len()];
        if i % 2 == 0 {
            out.push_str(&format!("{dsp} {prefix}{i} {lane}.{stage} {wave}\n"));
        } else {
            out.push_str(&format!("{prefix}{i} {lane}.{stage} {wave} {dsp}\n"));
        }
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for size in [20, 80, 240] {
        let input = route_paste(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, data| {
            b.iter(|| {
                let routes = parse_routes(black_box(data));
                black_box(routes.len());
            });
        });
    }
    group.finish();
}

fn bench_doors(c: &mut Criterion) {
    let mut group = c.benchmark_group("doors");
    let config = Config::default();
    let doors = config.doors.default_doors.clone();
    let modes: DoorModeMap = [(90, DoorMode::TruckOnly), (95, DoorMode::Closed)].into();
    let rules = BlockRules::new().with_rule("CP", [99, 98]);
    for size in [20, 80, 240] {
        let routes = parse_routes(&route_paste(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &routes, |b, routes| {
            b.iter(|| {
                let board = plan_doors(black_box(routes), &doors, &modes, &rules, &config.doors);
                black_box(board.placed_count());
            });
        });
    }
    group.finish();
}

fn bench_floor(c: &mut Criterion) {
    let mut group = c.benchmark_group("floor");
    let config = Config::default();
    let plan = default_floor_plan(&config.doors.default_doors, &config.floor);
    for size in [20, 80, 240] {
        let routes = parse_routes(&route_paste(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &routes, |b, routes| {
            b.iter(|| {
                let assignment = assign_floor(black_box(routes), &plan);
                black_box(assignment.len());
            });
        });
    }
    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    let config = Config::default();
    let state = apply(
        &BoardState::new(&config),
        Command::Regenerate {
            text: route_paste(120),
        },
        &config,
    );
    group.bench_function("toggle_door", |b| {
        b.iter(|| {
            let next = apply(black_box(&state), Command::ToggleDoorMode { door: 99 }, &config);
            black_box(next.doors.placed_count());
        });
    });
    group.bench_function("move_route", |b| {
        b.iter(|| {
            let next = apply(
                black_box(&state),
                Command::MoveRouteToDoor {
                    route: "XL1".to_string(),
                    door: 83,
                },
                &config,
            );
            black_box(next.door_overrides.len());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_doors, bench_floor, bench_store);
criterion_main!(benches);
