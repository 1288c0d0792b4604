use dock_planner::config::{Config, parse_config};
use dock_planner::render::board_json;
use dock_planner::store::{BoardState, Command, apply};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanOptions {
    door_numbers: Option<Vec<u32>>,
    config: Option<serde_json::Value>,
}

fn to_js(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn build_config(raw: Option<&serde_json::Value>) -> Result<Config, String> {
    match raw {
        Some(value) => parse_config(&value.to_string()).map_err(|error| format!("{error:#}")),
        None => Ok(Config::default()),
    }
}

fn plan(routes: &str, options: PlanOptions) -> Result<BoardState, String> {
    let config = build_config(options.config.as_ref())?;
    let mut state = BoardState::new(&config);
    if let Some(doors) = options.door_numbers {
        state = apply(&state, Command::SetDoorNumbers { doors }, &config);
    }
    Ok(apply(
        &state,
        Command::Regenerate {
            text: routes.to_string(),
        },
        &config,
    ))
}

/// Parses a route paste and returns the full board state as JSON.
#[wasm_bindgen]
pub fn plan_board(routes: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<PlanOptions>(&raw).map_err(to_js)?,
        None => PlanOptions::default(),
    };
    let state = plan(routes, options).map_err(to_js)?;
    serde_json::to_string(&state).map_err(to_js)
}

/// Applies one command to a board state previously returned by this module.
#[wasm_bindgen]
pub fn apply_command(
    state_json: &str,
    command_json: &str,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    let state: BoardState = serde_json::from_str(state_json).map_err(to_js)?;
    let command: Command = serde_json::from_str(command_json).map_err(to_js)?;
    let config = match config_json {
        Some(raw) => parse_config(&raw).map_err(|error| to_js(format!("{error:#}")))?,
        None => Config::default(),
    };
    let next = apply(&state, command, &config);
    serde_json::to_string(&next).map_err(to_js)
}

/// Final board view (doors, unplaced, floor, wave order) for a state.
#[wasm_bindgen]
pub fn board_view(state_json: &str) -> Result<String, JsValue> {
    let state: BoardState = serde_json::from_str(state_json).map_err(to_js)?;
    board_json(&state).map_err(to_js)
}
