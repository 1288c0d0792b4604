use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::route::{Route, VehicleClass};
use crate::wave::{is_invisible, wave_to_minutes};

static STAGING_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+\.\d+$").unwrap());
static MERIDIEM_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[ap]\.?m\.?$").unwrap());
static MERIDIEM_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[ap]\.?m\.?$").unwrap());
static DOOR_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s,;]+").unwrap());

/// Parses a dispatcher paste, one route per line.
///
/// Route ids are the 0-based line index, so blank or malformed lines still
/// consume an id.
pub fn parse_routes(input: &str) -> Vec<Route> {
    input
        .lines()
        .enumerate()
        .filter_map(|(id, line)| {
            let route = parse_route_line(id, line);
            if route.is_none() && !line.trim().is_empty() {
                debug!(line = id, "skipping unparseable route line");
            }
            route
        })
        .collect()
}

pub fn parse_route_line(id: usize, line: &str) -> Option<Route> {
    let cleaned = line
        .chars()
        .filter(|ch| !is_invisible(*ch))
        .map(|ch| if ch == '\u{00A0}' { ' ' } else { ch })
        .collect::<String>();
    let tokens = cleaned.split_whitespace().collect::<Vec<_>>();
    if tokens.len() < 3 {
        return None;
    }

    if is_leading_dsp(&tokens) {
        let (wave, rest) = take_wave(tokens[3], &tokens[4..]);
        let vehicle = rest.iter().find_map(|token| VehicleClass::from_token(token));
        return Some(Route::new(id, tokens[1], tokens[0], tokens[2], &wave, vehicle));
    }

    let (wave, rest) = take_wave(tokens[2], &tokens[3..]);
    let mut vehicle = None;
    let mut dsp = None;
    for token in rest {
        match VehicleClass::from_token(token) {
            Some(found) => {
                if vehicle.is_none() {
                    vehicle = Some(found);
                }
            }
            None => {
                if dsp.is_none() {
                    dsp = Some(*token);
                }
            }
        }
    }
    Some(Route::new(
        id,
        tokens[0],
        dsp.unwrap_or_default(),
        tokens[1],
        &wave,
        vehicle,
    ))
}

fn is_leading_dsp(tokens: &[&str]) -> bool {
    if tokens.len() < 4 {
        return false;
    }
    let shifted = looks_like_staging(tokens[2]) && looks_like_time(tokens[3]);
    let standard = looks_like_staging(tokens[1]) && looks_like_time(tokens[2]);
    shifted && !standard
}

/// Folds a separate `AM`/`PM` token into the wave text and returns the
/// remaining trailing tokens.
fn take_wave<'a>(wave: &str, rest: &'a [&'a str]) -> (String, &'a [&'a str]) {
    match rest.first() {
        Some(next) if MERIDIEM_TOKEN_RE.is_match(next) => {
            let wave = if MERIDIEM_SUFFIX_RE.is_match(wave) {
                wave.to_string()
            } else {
                format!("{wave} {next}")
            };
            (wave, &rest[1..])
        }
        _ => (wave.to_string(), rest),
    }
}

fn looks_like_staging(token: &str) -> bool {
    STAGING_TOKEN_RE.is_match(token)
}

fn looks_like_time(token: &str) -> bool {
    wave_to_minutes(token).is_some()
}

/// Door numbers separated by commas, semicolons or whitespace.
///
/// Invalid tokens are ignored and duplicates keep their first position. Falls
/// back to `defaults` when nothing usable remains.
pub fn parse_door_numbers(input: &str, defaults: &[u32]) -> Vec<u32> {
    let mut doors = Vec::new();
    for token in DOOR_SPLIT_RE.split(input.trim()) {
        if token.is_empty() {
            continue;
        }
        match token.parse::<u32>() {
            Ok(door) if !doors.contains(&door) => doors.push(door),
            Ok(_) => {}
            Err(_) => debug!(token, "ignoring invalid door number"),
        }
    }
    if doors.is_empty() {
        defaults.to_vec()
    } else {
        doors
    }
}
