use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

static STAGING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z]+)(?:\.?(\d+))?").unwrap());

/// Keeps ASCII letters, digits and dots; upper-cased.
pub fn normalize_staging_code(staging: &str) -> String {
    staging
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '.')
        .collect::<String>()
        .to_ascii_uppercase()
}

/// A staging code split into its lane letters and 1-based stage number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingCode {
    pub lane: String,
    pub stage: Option<u32>,
    pub normalized: String,
}

impl StagingCode {
    pub fn parse(staging: &str) -> Self {
        let normalized = normalize_staging_code(staging);
        let (lane, stage) = match STAGING_RE.captures(&normalized) {
            Some(caps) => {
                let lane = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
                let stage = caps
                    .get(2)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .filter(|stage| *stage >= 1);
                (lane, stage)
            }
            None => (String::new(), None),
        };
        Self {
            lane,
            stage,
            normalized,
        }
    }

    fn lane_rank(&self) -> u8 {
        match self.lane.as_str() {
            "F" => 0,
            "I" => 2,
            _ => 1,
        }
    }
}

/// Display order for staging codes: lane F first, lane I last, everything else in
/// between; then lane name, numeric stage, and finally the normalized text.
pub fn compare_staging_codes(a: &str, b: &str) -> Ordering {
    let a = StagingCode::parse(a);
    let b = StagingCode::parse(b);
    a.lane_rank()
        .cmp(&b.lane_rank())
        .then_with(|| a.lane.cmp(&b.lane))
        .then_with(|| match (a.stage, b.stage) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.normalized.cmp(&b.normalized))
}

/// Lane family: the upper-cased text before the first dot (`"f.3"` -> `"F"`).
pub fn staging_lane(staging: &str) -> String {
    normalize_staging_code(staging)
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Number after the first dot, if it is a positive integer (`"F.3"` -> `Some(3)`).
pub fn stage_number(staging: &str) -> Option<u32> {
    normalize_staging_code(staging)
        .split('.')
        .nth(1)
        .and_then(|part| part.parse::<u32>().ok())
        .filter(|stage| *stage >= 1)
}

/// Zero-based slot index for `X.<n>`.
pub fn stage_index(staging: &str) -> Option<usize> {
    stage_number(staging).map(|stage| stage as usize - 1)
}
