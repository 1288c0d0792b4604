use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::staging::normalize_staging_code;
use crate::wave::{normalize_wave_time, strip_invisible, wave_sort_minutes};

pub const ROUTE_KEY_SEPARATOR: char = '|';

/// Route prefix that is treated as van-class by default.
pub const VAN_PREFIX: &str = "CP";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    #[default]
    Truck,
    Van,
}

impl VehicleClass {
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("van") {
            Some(Self::Van)
        } else if token.eq_ignore_ascii_case("truck") {
            Some(Self::Truck)
        } else {
            None
        }
    }

    pub fn default_for_prefix(prefix: &str) -> Self {
        if prefix == VAN_PREFIX {
            Self::Van
        } else {
            Self::Truck
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Truck => "truck",
            Self::Van => "van",
        }
    }
}

/// One inbound delivery parsed from a dispatcher paste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: usize,
    pub route_code: String,
    #[serde(default)]
    pub dsp_code: String,
    #[serde(default)]
    pub staging_code: String,
    #[serde(default)]
    pub wave_time: String,
    #[serde(default)]
    pub vehicle: VehicleClass,
    #[serde(default)]
    pub prefix: String,
}

impl Route {
    pub fn new(
        id: usize,
        route_code: &str,
        dsp_code: &str,
        staging_code: &str,
        wave_time: &str,
        vehicle: Option<VehicleClass>,
    ) -> Self {
        let prefix = route_prefix(route_code);
        let vehicle = vehicle.unwrap_or_else(|| VehicleClass::default_for_prefix(&prefix));
        Self {
            id,
            route_code: route_code.to_string(),
            dsp_code: dsp_code.to_string(),
            staging_code: staging_code.to_string(),
            wave_time: wave_time.to_string(),
            vehicle,
            prefix,
        }
    }

    pub fn key(&self) -> Option<RouteKey> {
        RouteKey::new(
            &self.route_code,
            &self.dsp_code,
            &self.staging_code,
            &self.wave_time,
        )
    }

    /// `DSP|ROUTE`, or the bare route code when there is no DSP.
    pub fn legacy_key(&self) -> Option<String> {
        legacy_route_key(&self.route_code, &self.dsp_code)
    }

    pub fn wave_minutes(&self) -> u32 {
        wave_sort_minutes(&self.wave_time)
    }

    /// Copy with every code field in canonical form; the wave keeps its text but
    /// loses invisible characters and surrounding whitespace.
    pub fn normalized(&self) -> Self {
        let route_code = normalize_code(&self.route_code);
        Self {
            id: self.id,
            prefix: route_prefix(&route_code),
            route_code,
            dsp_code: normalize_code(&self.dsp_code),
            staging_code: normalize_staging_code(&self.staging_code),
            wave_time: strip_invisible(&self.wave_time).trim().to_string(),
            vehicle: self.vehicle,
        }
    }

    pub fn is_van_prefix(&self) -> bool {
        route_prefix(&self.route_code) == VAN_PREFIX
    }
}

/// Canonical, normalization-stable identity of a route:
/// `DSP|ROUTE|STAGING|WAVE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteKey(String);

impl RouteKey {
    pub fn new(route_code: &str, dsp_code: &str, staging_code: &str, wave_time: &str) -> Option<Self> {
        let route = normalize_code(route_code);
        if route.is_empty() {
            return None;
        }
        let parts = [
            normalize_code(dsp_code),
            route,
            normalize_staging_code(staging_code),
            normalize_wave_time(wave_time),
        ];
        Some(Self(parts.join(&ROUTE_KEY_SEPARATOR.to_string())))
    }

    /// Re-normalizes a full composite key (`dsp|route|staging|wave...`).
    pub fn from_composite(raw: &str) -> Option<Self> {
        let parts = raw.split(ROUTE_KEY_SEPARATOR).map(str::trim).collect::<Vec<_>>();
        if parts.len() < 3 {
            return None;
        }
        let wave = parts[3..].join(&ROUTE_KEY_SEPARATOR.to_string());
        Self::new(parts[1], parts[0], parts[2], &wave)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn route_code(&self) -> &str {
        self.0.split(ROUTE_KEY_SEPARATOR).nth(1).unwrap_or_default()
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RouteKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Route and DSP codes: ASCII letters, digits and dots only, upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '.')
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Leading letters of the normalized route code (`"xl19"` -> `"XL"`).
pub fn route_prefix(route_code: &str) -> String {
    normalize_code(route_code)
        .chars()
        .take_while(|ch| ch.is_ascii_alphabetic())
        .collect()
}

pub fn legacy_route_key(route_code: &str, dsp_code: &str) -> Option<String> {
    let route = normalize_code(route_code);
    if route.is_empty() {
        return None;
    }
    let dsp = normalize_code(dsp_code);
    if dsp.is_empty() {
        Some(route)
    } else {
        Some(format!("{dsp}{ROUTE_KEY_SEPARATOR}{route}"))
    }
}

pub fn is_composite_key(raw: &str) -> bool {
    raw.contains(ROUTE_KEY_SEPARATOR)
}

/// Drops routes without a key and every later occurrence of an already seen key.
pub fn dedupe_routes(routes: &[Route]) -> Vec<Route> {
    let mut seen = HashSet::new();
    routes
        .iter()
        .filter(|route| match route.key() {
            Some(key) => seen.insert(key),
            None => false,
        })
        .cloned()
        .collect()
}
