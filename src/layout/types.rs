use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Door,
    Lane,
    Aisle,
    Staging,
    Forbidden,
}

/// Inclusive rectangle of floor cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: RegionKind,
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Region {
    pub fn new(id: impl Into<String>, kind: RegionKind, start: (i32, i32), end: (i32, i32)) -> Self {
        Self {
            id: id.into(),
            label: None,
            kind,
            start_x: start.0,
            start_y: start.1,
            end_x: end.0,
            end_y: end.1,
            color: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn width(&self) -> i32 {
        self.end_x - self.start_x + 1
    }

    pub fn height(&self) -> i32 {
        self.end_y - self.start_y + 1
    }

    pub fn is_lane(&self) -> bool {
        self.kind == RegionKind::Lane
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorPlan {
    pub width: u32,
    pub height: u32,
    pub regions: Vec<Region>,
}

impl FloorPlan {
    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.id == id)
    }

    /// Ids that can receive a route: every lane region.
    pub fn lane_ids(&self) -> impl Iterator<Item = &str> {
        self.regions
            .iter()
            .filter(|region| region.is_lane())
            .map(|region| region.id.as_str())
    }

    pub fn is_lane(&self, id: &str) -> bool {
        self.region(id).is_some_and(Region::is_lane)
    }
}

/// Lane footprints that count as floor slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotShape {
    OneBySix,
    TwoByThree,
}

impl SlotShape {
    pub fn of(region: &Region) -> Option<Self> {
        if !region.is_lane() {
            return None;
        }
        match (region.width(), region.height()) {
            (1, 6) => Some(Self::OneBySix),
            (2, 3) => Some(Self::TwoByThree),
            _ => None,
        }
    }
}
