use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assign::{
    DoorBoard, DoorOverrides, FloorAssignment, RouteIndex, SlotOverrides, assign_floor, plan_doors,
    resolve_door_overrides, resolve_slot_overrides, wave_order,
};
use crate::config::Config;
use crate::doors::{BlockRules, DoorMode, DoorModeMap, fits};
use crate::export::OverrideExport;
use crate::layout::{FloorPlan, default_floor_plan};
use crate::parser::parse_routes;
use crate::route::{Route, VehicleClass, dedupe_routes};

/// Current persisted schema.
///
/// - 1: override maps keyed by bare route code; `route`/`staging`/`dsp` field names.
/// - 2: override maps keyed by `DSP|ROUTE`.
/// - 3: override maps keyed by the canonical route key.
///
/// Snapshots hold inputs only. The door board and floor assignment are not
/// written; they are recomputed from the inputs whenever a snapshot loads.
pub const STORE_VERSION: u32 = 3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid snapshot for store {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store {name} has schema version {found}, newer than supported version {supported}")]
    UnsupportedVersion {
        name: String,
        found: u32,
        supported: u32,
    },
    #[error("in-memory store {name} is unusable after a panic while it was locked")]
    Poisoned { name: String },
}

/// A single cell of the door board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorCell {
    pub door: u32,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    Regenerate { text: String },
    ToggleDoorMode { door: u32 },
    SetDoorNumbers { doors: Vec<u32> },
    SetBlockRules { rules: BlockRules },
    MoveRouteToDoor { route: String, door: u32 },
    SwapDoorCells { source: DoorCell, target: DoorCell },
    MoveRouteToSlot { route: String, slot: String },
    SwapSlots { source: String, target: String },
    SetFloorPlan { plan: FloorPlan },
    ClearOverrides,
    ImportOverrides { export: OverrideExport },
}

/// Everything the planner shows: inputs, overrides, and the assignments
/// derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub routes: Vec<Route>,
    pub door_numbers: Vec<u32>,
    pub door_mode: DoorModeMap,
    pub block_rules: BlockRules,
    /// Imported floor plan; the generated default is used when absent.
    pub floor_plan: Option<FloorPlan>,
    pub door_overrides: DoorOverrides,
    pub slot_overrides: SlotOverrides,
    pub auto_doors: DoorBoard,
    pub doors: DoorBoard,
    pub auto_floor: FloorAssignment,
    pub floor: FloorAssignment,
    pub wave_order: Vec<String>,
}

impl BoardState {
    pub fn new(config: &Config) -> Self {
        let mut state = Self {
            routes: Vec::new(),
            door_numbers: config.doors.default_doors.clone(),
            door_mode: DoorModeMap::new(),
            block_rules: config.doors.block_rules.clone(),
            floor_plan: None,
            door_overrides: DoorOverrides::new(),
            slot_overrides: SlotOverrides::new(),
            auto_doors: DoorBoard::default(),
            doors: DoorBoard::default(),
            auto_floor: FloorAssignment::new(),
            floor: FloorAssignment::new(),
            wave_order: Vec::new(),
        };
        state.recompute(config);
        state
    }

    pub fn active_floor_plan(&self, config: &Config) -> FloorPlan {
        self.floor_plan
            .clone()
            .unwrap_or_else(|| default_floor_plan(&self.door_numbers, &config.floor))
    }

    pub fn mode_of(&self, door: u32) -> DoorMode {
        crate::doors::door_mode(&self.door_mode, door)
    }

    /// Rebuilds both assignments and replaces the override maps with their
    /// cleaned form.
    fn recompute(&mut self, config: &Config) {
        self.auto_doors = plan_doors(
            &self.routes,
            &self.door_numbers,
            &self.door_mode,
            &self.block_rules,
            &config.doors,
        );
        let doors = resolve_door_overrides(
            &self.routes,
            &self.auto_doors,
            &self.door_overrides,
            &self.door_numbers,
            &self.door_mode,
            &self.block_rules,
        );
        self.doors = doors.board;
        self.door_overrides = doors.overrides;

        let plan = self.active_floor_plan(config);
        self.auto_floor = assign_floor(&self.routes, &plan);
        let slots = resolve_slot_overrides(&self.routes, &plan, &self.auto_floor, &self.slot_overrides);
        self.floor = slots.assignment;
        self.slot_overrides = slots.overrides;

        self.wave_order = wave_order(&self.routes);
    }

    fn set_door_numbers(&mut self, doors: &[u32], config: &Config) {
        let mut cleaned = Vec::new();
        for door in doors {
            if !cleaned.contains(door) {
                cleaned.push(*door);
            }
        }
        if cleaned.is_empty() {
            cleaned = config.doors.default_doors.clone();
        }
        self.door_mode.retain(|door, _| cleaned.contains(door));
        self.door_numbers = cleaned;
    }

    fn route_key(&self, route: &str) -> Option<String> {
        let key = RouteIndex::new(&self.routes).resolve(route);
        if key.is_none() {
            debug!(route, "no unique route matches");
        }
        key.map(|key| key.to_string())
    }
}

/// Applies one command and recomputes every derived field.
pub fn apply(state: &BoardState, command: Command, config: &Config) -> BoardState {
    let mut next = state.clone();
    match command {
        Command::Regenerate { text } => {
            next.routes = dedupe_routes(&parse_routes(&text))
                .iter()
                .map(Route::normalized)
                .collect();
        }
        Command::ToggleDoorMode { door } => {
            let mode = next.mode_of(door).next();
            if mode == DoorMode::Open {
                next.door_mode.remove(&door);
            } else {
                next.door_mode.insert(door, mode);
            }
        }
        Command::SetDoorNumbers { doors } => next.set_door_numbers(&doors, config),
        Command::SetBlockRules { rules } => next.block_rules = rules,
        Command::MoveRouteToDoor { route, door } => {
            if let Some(key) = next.route_key(&route) {
                next.door_overrides.insert(key, door);
            }
        }
        Command::SwapDoorCells { source, target } => {
            let source_route = state.doors.routes_at(source.door).get(source.row);
            let target_route = state.doors.routes_at(target.door).get(target.row);
            let eligible = |placed: Option<&crate::assign::PlacedRoute>, door: u32| {
                placed.is_none_or(|placed| fits(door, &placed.route, &state.door_mode, &state.block_rules))
            };
            if !eligible(source_route, target.door) || !eligible(target_route, source.door) {
                debug!(?source, ?target, "door swap rejected");
                return state.clone();
            }
            if let Some(placed) = source_route {
                next.door_overrides.insert(placed.key.to_string(), target.door);
            }
            if let Some(placed) = target_route {
                next.door_overrides.insert(placed.key.to_string(), source.door);
            }
        }
        Command::MoveRouteToSlot { route, slot } => {
            if let Some(key) = next.route_key(&route) {
                next.slot_overrides.insert(key, slot);
            }
        }
        Command::SwapSlots { source, target } => {
            if let Some(placed) = state.floor.get(&source) {
                next.slot_overrides.insert(placed.key.to_string(), target.clone());
            }
            if let Some(placed) = state.floor.get(&target) {
                next.slot_overrides.insert(placed.key.to_string(), source);
            }
        }
        Command::SetFloorPlan { plan } => {
            if let Err(err) = plan.validate() {
                warn!(%err, "rejecting floor plan");
                return state.clone();
            }
            next.floor_plan = Some(plan);
        }
        Command::ClearOverrides => {
            next.door_overrides.clear();
            next.slot_overrides.clear();
        }
        Command::ImportOverrides { export } => {
            if !export.door_numbers.is_empty() {
                next.set_door_numbers(&export.door_numbers, config);
                next.door_mode = export
                    .door_mode
                    .iter()
                    .filter(|(door, mode)| next.door_numbers.contains(*door) && **mode != DoorMode::Open)
                    .map(|(door, mode)| (*door, *mode))
                    .collect();
            }
            next.door_overrides.extend(export.door_overrides());
            next.slot_overrides.extend(export.slot_overrides());
        }
    }
    next.recompute(config);
    next
}

/// Persisted envelope: schema version plus the durable part of the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub version: u32,
    pub state: Value,
}

/// Route as persisted. Older schemas used `route`/`dsp`/`staging` and had no
/// vehicle field; a missing vehicle falls back to the prefix default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRoute {
    id: usize,
    #[serde(alias = "route")]
    route_code: String,
    #[serde(default, alias = "dsp")]
    dsp_code: String,
    #[serde(default, alias = "staging")]
    staging_code: String,
    #[serde(default)]
    wave_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vehicle: Option<VehicleClass>,
}

impl StoredRoute {
    fn from_route(route: &Route) -> Self {
        Self {
            id: route.id,
            route_code: route.route_code.clone(),
            dsp_code: route.dsp_code.clone(),
            staging_code: route.staging_code.clone(),
            wave_time: route.wave_time.clone(),
            vehicle: Some(route.vehicle),
        }
    }

    fn to_route(&self) -> Route {
        Route::new(
            self.id,
            &self.route_code,
            &self.dsp_code,
            &self.staging_code,
            &self.wave_time,
            self.vehicle,
        )
    }
}

/// Inputs that survive a restart; everything else is recomputed on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedBoard {
    #[serde(default)]
    routes: Vec<StoredRoute>,
    #[serde(default)]
    door_numbers: Vec<u32>,
    #[serde(default)]
    door_mode: DoorModeMap,
    #[serde(default)]
    block_rules: Option<BlockRules>,
    #[serde(default)]
    floor_plan: Option<FloorPlan>,
    #[serde(default, alias = "overrides")]
    door_overrides: DoorOverrides,
    #[serde(default, alias = "floorRouteOverrides")]
    slot_overrides: SlotOverrides,
}

impl PersistedBoard {
    fn from_state(state: &BoardState) -> Self {
        Self {
            routes: state.routes.iter().map(StoredRoute::from_route).collect(),
            door_numbers: state.door_numbers.clone(),
            door_mode: state.door_mode.clone(),
            block_rules: Some(state.block_rules.clone()),
            floor_plan: state.floor_plan.clone(),
            door_overrides: state.door_overrides.clone(),
            slot_overrides: state.slot_overrides.clone(),
        }
    }
}

/// Durable fields after migration, ready to become a [`BoardState`].
struct LoadedBoard {
    routes: Vec<Route>,
    door_numbers: Vec<u32>,
    door_mode: DoorModeMap,
    block_rules: Option<BlockRules>,
    floor_plan: Option<FloorPlan>,
    door_overrides: DoorOverrides,
    slot_overrides: SlotOverrides,
}

impl LoadedBoard {
    fn into_state(self, config: &Config) -> BoardState {
        let mut state = BoardState::new(config);
        state.routes = self.routes;
        state.set_door_numbers(&self.door_numbers, config);
        state.door_mode = self
            .door_mode
            .into_iter()
            .filter(|(door, mode)| state.door_numbers.contains(door) && *mode != DoorMode::Open)
            .collect();
        if let Some(rules) = self.block_rules {
            state.block_rules = rules;
        }
        state.floor_plan = self.floor_plan.filter(|plan| plan.validate().is_ok());
        state.door_overrides = self.door_overrides;
        state.slot_overrides = self.slot_overrides;
        state.recompute(config);
        state
    }
}

/// Brings a snapshot up to [`STORE_VERSION`]. Routes are always re-derived
/// (prefix, vehicle default, normalization, dedupe); for older schemas the
/// override keys are also rewritten to canonical route keys, dropping keys
/// that do not match exactly one route.
fn migrate(board: PersistedBoard, from_version: u32) -> LoadedBoard {
    let rederived = board
        .routes
        .iter()
        .map(StoredRoute::to_route)
        .collect::<Vec<_>>();
    let routes = dedupe_routes(&rederived)
        .iter()
        .map(Route::normalized)
        .collect::<Vec<_>>();

    let (door_overrides, slot_overrides) = if from_version < STORE_VERSION {
        let index = RouteIndex::new(&routes);
        (
            rekey(&index, board.door_overrides),
            rekey(&index, board.slot_overrides),
        )
    } else {
        (board.door_overrides, board.slot_overrides)
    };

    LoadedBoard {
        routes,
        door_numbers: board.door_numbers,
        door_mode: board.door_mode,
        block_rules: board.block_rules,
        floor_plan: board.floor_plan,
        door_overrides,
        slot_overrides,
    }
}

fn rekey<T>(index: &RouteIndex, overrides: BTreeMap<String, T>) -> BTreeMap<String, T> {
    overrides
        .into_iter()
        .filter_map(|(raw, target)| match index.resolve(&raw) {
            Some(key) => Some((key.to_string(), target)),
            None => {
                debug!(key = %raw, "dropping override during migration");
                None
            }
        })
        .collect()
}

/// Key/value persistence for board snapshots.
pub trait StateBackend {
    fn load(&self, name: &str) -> Result<Option<StoredSnapshot>, StoreError>;
    fn save(&self, name: &str, snapshot: &StoredSnapshot) -> Result<(), StoreError>;
}

/// One `<name>.json` file per store inside `dir`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl StateBackend for FileBackend {
    fn load(&self, name: &str) -> Result<Option<StoredSnapshot>, StoreError> {
        let path = self.path_for(name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Json {
                name: name.to_string(),
                source,
            })
    }

    fn save(&self, name: &str, snapshot: &StoredSnapshot) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let contents = serde_json::to_vec_pretty(snapshot).map_err(|source| StoreError::Json {
            name: name.to_string(),
            source,
        })?;
        let path = self.path_for(name);
        let tmp = self.dir.join(format!(".{name}.json.tmp"));
        fs::write(&tmp, contents).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        rename_overwrite(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }
}

#[cfg(windows)]
fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if to.exists() => {
            fs::remove_file(to).map_err(|_| err)?;
            fs::rename(from, to)
        }
        Err(err) => Err(err),
    }
}

#[cfg(not(windows))]
fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

/// In-process backend; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<BTreeMap<String, StoredSnapshot>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, snapshot: StoredSnapshot) -> Result<(), StoreError> {
        self.entries(name)?.insert(name.to_string(), snapshot);
        Ok(())
    }

    fn entries(
        &self,
        name: &str,
    ) -> Result<MutexGuard<'_, BTreeMap<String, StoredSnapshot>>, StoreError> {
        self.entries.lock().map_err(|_| StoreError::Poisoned {
            name: name.to_string(),
        })
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self, name: &str) -> Result<Option<StoredSnapshot>, StoreError> {
        Ok(self.entries(name)?.get(name).cloned())
    }

    fn save(&self, name: &str, snapshot: &StoredSnapshot) -> Result<(), StoreError> {
        self.insert(name, snapshot.clone())
    }
}

/// The board state plus the backend it is persisted to.
pub struct AssignmentStore<B: StateBackend> {
    state: BoardState,
    config: Config,
    backend: B,
}

impl<B: StateBackend> AssignmentStore<B> {
    /// Loads the saved snapshot (migrating older schemas) or starts empty.
    pub fn open(backend: B, config: Config) -> Result<Self, StoreError> {
        let name = config.store.name.clone();
        let state = match backend.load(&name)? {
            None => BoardState::new(&config),
            Some(snapshot) => {
                if snapshot.version > STORE_VERSION {
                    return Err(StoreError::UnsupportedVersion {
                        name,
                        found: snapshot.version,
                        supported: STORE_VERSION,
                    });
                }
                let board: PersistedBoard =
                    serde_json::from_value(snapshot.state).map_err(|source| StoreError::Json {
                        name: name.clone(),
                        source,
                    })?;
                if snapshot.version < STORE_VERSION {
                    info!(store = %name, from = snapshot.version, to = STORE_VERSION, "migrating snapshot");
                }
                migrate(board, snapshot.version).into_state(&config)
            }
        };
        info!(store = %name, routes = state.routes.len(), "opened store");
        Ok(Self {
            state,
            config,
            backend,
        })
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Applies `command` and persists the result. Persistence failures are
    /// logged and do not undo the command.
    pub fn dispatch(&mut self, command: Command) -> &BoardState {
        self.state = apply(&self.state, command, &self.config);
        if let Err(err) = self.save() {
            warn!(store = %self.config.store.name, %err, "failed to persist board");
        }
        &self.state
    }

    pub fn snapshot(&self) -> Result<StoredSnapshot, StoreError> {
        let state = serde_json::to_value(PersistedBoard::from_state(&self.state)).map_err(|source| {
            StoreError::Json {
                name: self.config.store.name.clone(),
                source,
            }
        })?;
        Ok(StoredSnapshot {
            version: STORE_VERSION,
            state,
        })
    }

    fn save(&self) -> Result<(), StoreError> {
        self.backend.save(&self.config.store.name, &self.snapshot()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with_doors(doors: &[u32]) -> Config {
        let mut config = Config::default();
        config.doors.default_doors = doors.to_vec();
        config
    }

    fn door_of(state: &BoardState, code: &str) -> Option<u32> {
        state
            .doors
            .placed()
            .find(|(_, placed)| placed.route.route_code == code)
            .map(|(door, _)| door)
    }

    fn regenerate(state: &BoardState, text: &str, config: &Config) -> BoardState {
        apply(
            state,
            Command::Regenerate {
                text: text.to_string(),
            },
            config,
        )
    }

    #[test]
    fn closing_a_door_moves_its_routes() {
        let config = config_with_doors(&[99, 98]);
        let state = regenerate(&BoardState::new(&config), "JUTL XL19 F.1 8:00AM\nJUTL XL20 F.2 8:00AM", &config);
        assert_eq!(door_of(&state, "XL19"), Some(99));

        let state = apply(&state, Command::ToggleDoorMode { door: 99 }, &config);
        assert_eq!(state.mode_of(99), DoorMode::TruckOnly);
        let state = apply(&state, Command::ToggleDoorMode { door: 99 }, &config);
        assert_eq!(state.mode_of(99), DoorMode::Closed);
        assert!(state.doors.routes_at(99).is_empty());
        assert_eq!(door_of(&state, "XL19"), Some(98));

        let state = apply(&state, Command::ToggleDoorMode { door: 99 }, &config);
        assert!(state.door_mode.is_empty());
    }

    #[test]
    fn overrides_to_closed_doors_are_dropped() {
        let config = config_with_doors(&[99, 98]);
        let state = regenerate(&BoardState::new(&config), "JUTL XL20 F.2 8:00AM", &config);
        let state = apply(
            &state,
            Command::MoveRouteToDoor {
                route: "XL20".to_string(),
                door: 99,
            },
            &config,
        );
        assert_eq!(state.door_overrides.len(), 1);
        assert_eq!(door_of(&state, "XL20"), Some(99));

        let state = apply(&state, Command::ToggleDoorMode { door: 99 }, &config);
        let state = apply(&state, Command::ToggleDoorMode { door: 99 }, &config);
        assert_eq!(door_of(&state, "XL20"), Some(98));
        assert!(state.door_overrides.is_empty());
    }

    #[test]
    fn vans_move_off_truck_only_doors() {
        let config = Config::default();
        let state = apply(
            &BoardState::new(&config),
            Command::SetDoorNumbers {
                doors: vec![90, 91],
            },
            &config,
        );
        let state = regenerate(&state, "MTG CP01 C.1 8:00AM", &config);
        assert_eq!(door_of(&state, "CP01"), Some(90));

        let state = apply(&state, Command::ToggleDoorMode { door: 90 }, &config);
        assert_eq!(state.mode_of(90), DoorMode::TruckOnly);
        assert!(state.doors.routes_at(90).is_empty());
        assert_eq!(door_of(&state, "CP01"), Some(91));
    }

    #[test]
    fn overrides_survive_regeneration() {
        let config = config_with_doors(&[99, 98, 97]);
        let text = "JUTL XL19 F.1 8:00AM\nJUTL XL20 F.2 8:00AM";
        let state = regenerate(&BoardState::new(&config), text, &config);
        let state = apply(
            &state,
            Command::MoveRouteToDoor {
                route: "JUTL|XL19".to_string(),
                door: 97,
            },
            &config,
        );
        assert_eq!(door_of(&state, "XL19"), Some(97));

        let state = regenerate(&state, "XL20 F.2 08:00 JUTL\n\u{200B}XL19 f.1 8:00 am jutl", &config);
        assert_eq!(door_of(&state, "XL19"), Some(97));
        assert_eq!(state.door_overrides.len(), 1);
    }

    #[test]
    fn rejected_door_swap_is_a_no_op() {
        let config = config_with_doors(&[90, 91]);
        let state = regenerate(&BoardState::new(&config), "MTG CP01 C.1 8:00AM\nXL1 C.2 08:00 MTG", &config);
        let state = apply(&state, Command::ToggleDoorMode { door: 91 }, &config);
        assert_eq!(door_of(&state, "CP01"), Some(90));
        let row = state
            .doors
            .routes_at(90)
            .iter()
            .position(|placed| placed.route.route_code == "CP01")
            .unwrap();

        let swapped = apply(
            &state,
            Command::SwapDoorCells {
                source: DoorCell { door: 90, row },
                target: DoorCell { door: 91, row: 0 },
            },
            &config,
        );
        assert_eq!(swapped, state);
    }

    #[test]
    fn set_door_numbers_drops_stale_modes() {
        let config = Config::default();
        let state = apply(&BoardState::new(&config), Command::ToggleDoorMode { door: 99 }, &config);
        let state = apply(&state, Command::ToggleDoorMode { door: 98 }, &config);
        let state = apply(&state, Command::SetDoorNumbers { doors: vec![98, 97, 98] }, &config);
        assert_eq!(state.door_numbers, vec![98, 97]);
        assert_eq!(state.door_mode.keys().copied().collect::<Vec<_>>(), vec![98]);

        let state = apply(&state, Command::SetDoorNumbers { doors: vec![] }, &config);
        assert_eq!(state.door_numbers, config.doors.default_doors);
    }

    #[test]
    fn invalid_floor_plan_is_rejected() {
        let config = Config::default();
        let state = BoardState::new(&config);
        let plan = FloorPlan {
            width: 4,
            height: 4,
            regions: vec![crate::layout::Region::new(
                "huge",
                crate::layout::RegionKind::Lane,
                (0, 0),
                (9, 9),
            )],
        };
        let next = apply(&state, Command::SetFloorPlan { plan }, &config);
        assert_eq!(next, state);
    }

    #[test]
    fn dispatch_persists_and_reopens() {
        let backend = MemoryBackend::new();
        let config = config_with_doors(&[99, 98]);
        let mut store = AssignmentStore::open(backend.clone(), config.clone()).unwrap();
        store.dispatch(Command::Regenerate {
            text: "JUTL XL19 F.1 8:00AM".to_string(),
        });
        store.dispatch(Command::MoveRouteToDoor {
            route: "XL19".to_string(),
            door: 98,
        });

        let reopened = AssignmentStore::open(backend, config).unwrap();
        assert_eq!(reopened.state(), store.state());
        assert_eq!(door_of(reopened.state(), "XL19"), Some(98));
    }

    #[test]
    fn migrates_version_one_snapshots() {
        let backend = MemoryBackend::new();
        backend.insert(
            "doors-store",
            StoredSnapshot {
                version: 1,
                state: json!({
                    "routes": [
                        { "id": 0, "route": "xl19\u{200B}", "staging": "F.1", "waveTime": "8:00AM", "dsp": "jutl" },
                        { "id": 1, "route": "XL20", "staging": "F.2", "waveTime": "8:00AM", "dsp": "JUTL" },
                        { "id": 2, "route": "XL20", "staging": "F.2", "waveTime": "08:00", "dsp": "jutl" }
                    ],
                    "doorNumbers": [99, 98, 97],
                    "doorMode": { "98": "all", "97": "truck-only" },
                    "doorOverrides": { "XL19": 97, "XL404": 99 }
                }),
            },
        )
        .unwrap();
        let store = AssignmentStore::open(backend, Config::default()).unwrap();
        let state = store.state();
        assert_eq!(state.routes.len(), 2);
        assert_eq!(state.routes[0].route_code, "XL19");
        assert_eq!(state.routes[0].prefix, "XL");
        assert_eq!(state.mode_of(97), DoorMode::TruckOnly);
        assert_eq!(state.mode_of(98), DoorMode::Open);
        assert_eq!(
            state.door_overrides.keys().collect::<Vec<_>>(),
            vec!["JUTL|XL19|F.1|08:00"]
        );
        assert_eq!(door_of(state, "XL19"), Some(97));
    }

    #[test]
    fn refuses_future_versions() {
        let backend = MemoryBackend::new();
        backend.insert(
            "doors-store",
            StoredSnapshot {
                version: STORE_VERSION + 1,
                state: json!({}),
            },
        )
        .unwrap();
        match AssignmentStore::open(backend, Config::default()) {
            Err(StoreError::UnsupportedVersion { found, .. }) => assert_eq!(found, STORE_VERSION + 1),
            other => panic!("expected version error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn poisoned_memory_backend_is_an_error() {
        let backend = MemoryBackend::new();
        let shared = backend.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.entries.lock().unwrap();
            panic!("panic while holding the store lock");
        })
        .join();

        assert!(matches!(
            backend.load("doors-store"),
            Err(StoreError::Poisoned { .. })
        ));
        let err = AssignmentStore::open(backend, Config::default()).err().unwrap();
        assert!(err.to_string().contains("doors-store"));
    }
}
