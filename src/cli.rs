use crate::config::{Config, load_config};
use crate::doors::BlockRules;
use crate::export::OverrideExport;
use crate::layout::parse_floor_plan;
use crate::logging::init_logging;
use crate::parser::parse_door_numbers;
use crate::render::{board_json, render_door_board, render_floor, write_output};
use crate::store::{AssignmentStore, Command, FileBackend, MemoryBackend, StateBackend};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dockp", version, about = "Assign inbound routes to dock doors and floor slots")]
pub struct Args {
    /// Route paste (one route per line) or '-' for stdin
    #[arg(short = 'i', long = "routes")]
    pub routes: Option<PathBuf>,

    /// Door numbers, separated by commas or whitespace
    #[arg(short = 'd', long = "doors")]
    pub doors: Option<String>,

    /// Floor plan JSON
    #[arg(short = 'f', long = "floor")]
    pub floor: Option<PathBuf>,

    /// Block rules JSON ({ "PREFIX": [doors] })
    #[arg(long = "block-rules")]
    pub block_rules: Option<PathBuf>,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted board. Without it nothing is saved.
    #[arg(short = 's', long = "state-dir")]
    pub state_dir: Option<PathBuf>,

    /// Cycle a door through open / truck-only / closed
    #[arg(long = "toggle-door", value_name = "DOOR")]
    pub toggle_door: Vec<u32>,

    /// Pin a route to a door
    #[arg(long = "move-door", value_name = "ROUTE=DOOR", value_parser = parse_door_move)]
    pub move_door: Vec<(String, u32)>,

    /// Pin a route to a floor slot
    #[arg(long = "move-slot", value_name = "ROUTE=SLOT", value_parser = parse_slot_move)]
    pub move_slot: Vec<(String, String)>,

    /// Apply an override export
    #[arg(long = "import-overrides")]
    pub import_overrides: Option<PathBuf>,

    /// Write the current overrides to a file
    #[arg(long = "export-overrides")]
    pub export_overrides: Option<PathBuf>,

    /// Drop every manual override before applying new ones
    #[arg(long = "clear-overrides")]
    pub clear_overrides: bool,

    /// Output format
    #[arg(short = 'e', long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if args.state_dir.is_some() {
        config.store.dir = args.state_dir.clone();
    }
    init_logging(&config.logging);

    match config.store.dir.clone() {
        Some(dir) => {
            let store = AssignmentStore::open(FileBackend::new(dir), config)
                .context("failed to open board store")?;
            drive(store, &args)
        }
        None => {
            let store = AssignmentStore::open(MemoryBackend::new(), config)
                .context("failed to open board store")?;
            drive(store, &args)
        }
    }
}

fn drive<B: StateBackend>(mut store: AssignmentStore<B>, args: &Args) -> Result<()> {
    for command in commands(args, store.config())? {
        store.dispatch(command);
    }

    let state = store.state();
    info!(
        routes = state.routes.len(),
        placed = state.doors.placed_count(),
        unplaced = state.doors.unplaced.len(),
        slots = state.floor.len(),
        "board ready"
    );

    if let Some(path) = args.export_overrides.as_deref() {
        let export = OverrideExport::from_state(state).to_json_pretty()?;
        std::fs::write(path, export)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let rendered = match args.format {
        OutputFormat::Text => format!("{}\n{}", render_door_board(state), render_floor(state)),
        OutputFormat::Json => board_json(state)?,
    };
    write_output(&rendered, args.output.as_deref())
}

/// Commands implied by the flags, in the order they are applied: door setup,
/// floor plan, routes, then overrides.
fn commands(args: &Args, config: &Config) -> Result<Vec<Command>> {
    let mut commands = Vec::new();

    if let Some(doors) = args.doors.as_deref() {
        commands.push(Command::SetDoorNumbers {
            doors: parse_door_numbers(doors, &config.doors.default_doors),
        });
    }

    if let Some(path) = args.block_rules.as_deref() {
        let text = read_text(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("invalid block rules in {}", path.display()))?;
        commands.push(Command::SetBlockRules {
            rules: BlockRules::from_json(&value),
        });
    }

    if let Some(path) = args.floor.as_deref() {
        let text = read_text(path)?;
        let plan = parse_floor_plan(&text, &config.floor)
            .with_context(|| format!("invalid floor plan in {}", path.display()))?;
        plan.validate()
            .with_context(|| format!("invalid floor plan in {}", path.display()))?;
        commands.push(Command::SetFloorPlan { plan });
    }

    if let Some(path) = args.routes.as_deref() {
        commands.push(Command::Regenerate {
            text: read_input(path)?,
        });
    }

    if args.clear_overrides {
        commands.push(Command::ClearOverrides);
    }

    if let Some(path) = args.import_overrides.as_deref() {
        let text = read_text(path)?;
        let export = OverrideExport::parse(&text)
            .with_context(|| format!("failed to import {}", path.display()))?;
        commands.push(Command::ImportOverrides { export });
    }

    for door in &args.toggle_door {
        commands.push(Command::ToggleDoorMode { door: *door });
    }
    for (route, door) in &args.move_door {
        commands.push(Command::MoveRouteToDoor {
            route: route.clone(),
            door: *door,
        });
    }
    for (route, slot) in &args.move_slot {
        commands.push(Command::MoveRouteToSlot {
            route: route.clone(),
            slot: slot.clone(),
        });
    }

    Ok(commands)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    read_text(path)
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn split_assignment(raw: &str) -> Result<(String, &str), String> {
    let (route, target) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected ROUTE=TARGET, got {raw:?}"))?;
    let route = route.trim();
    let target = target.trim();
    if route.is_empty() || target.is_empty() {
        return Err(format!("expected ROUTE=TARGET, got {raw:?}"));
    }
    Ok((route.to_string(), target))
}

fn parse_door_move(raw: &str) -> Result<(String, u32), String> {
    let (route, door) = split_assignment(raw)?;
    let door = door
        .parse::<u32>()
        .map_err(|_| format!("invalid door number {door:?}"))?;
    Ok((route, door))
}

fn parse_slot_move(raw: &str) -> Result<(String, String), String> {
    let (route, slot) = split_assignment(raw)?;
    Ok((route, slot.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_move_flags() {
        assert_eq!(parse_door_move("JUTL|XL19=97"), Ok(("JUTL|XL19".to_string(), 97)));
        assert_eq!(
            parse_slot_move(" XL1 = slot_2x3_99 "),
            Ok(("XL1".to_string(), "slot_2x3_99".to_string()))
        );
        assert!(parse_door_move("XL19").is_err());
        assert!(parse_door_move("XL19=ninety").is_err());
        assert!(parse_slot_move("=slot_a").is_err());
    }

    #[test]
    fn flags_map_to_commands_in_order() {
        let args = Args::parse_from([
            "dockp",
            "--doors",
            "99, 98",
            "--toggle-door",
            "98",
            "--move-door",
            "XL19=98",
            "--clear-overrides",
        ]);
        let commands = commands(&args, &Config::default()).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::SetDoorNumbers { doors: vec![99, 98] },
                Command::ClearOverrides,
                Command::ToggleDoorMode { door: 98 },
                Command::MoveRouteToDoor {
                    route: "XL19".to_string(),
                    door: 98
                },
            ]
        );
    }
}
