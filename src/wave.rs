use once_cell::sync::Lazy;
use regex::Regex;

static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?:\s*(am|pm))?$").unwrap());
static COMPACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{3,4})(?:\s*(am|pm))?$").unwrap());

/// Sort value used for routes whose wave time does not parse.
pub const UNPARSED_WAVE: u32 = u32::MAX;

/// Zero-width and bidi-control characters that sneak in through copy/paste.
pub fn is_invisible(ch: char) -> bool {
    matches!(
        ch,
        '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}' | '\u{FEFF}'
    )
}

pub fn strip_invisible(input: &str) -> String {
    input.chars().filter(|ch| !is_invisible(*ch)).collect()
}

/// Minutes since midnight for a wave time such as `08:00`, `8:00 AM`, `815pm`.
///
/// Returns `None` for anything that is not a recognizable time of day.
pub fn wave_to_minutes(wave_time: &str) -> Option<u32> {
    let normalized = strip_invisible(wave_time)
        .trim()
        .to_ascii_lowercase()
        .replace('.', "");
    if normalized.is_empty() {
        return None;
    }

    let (hours, minutes, suffix) = if let Some(caps) = CLOCK_RE.captures(&normalized) {
        let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minutes: u32 = caps.get(2)?.as_str().parse().ok()?;
        (hours, minutes, caps.get(3).map(|m| m.as_str().to_string()))
    } else if let Some(caps) = COMPACT_RE.captures(&normalized) {
        let digits = caps.get(1)?.as_str();
        let digits = if digits.len() == 3 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let hours: u32 = digits[..2].parse().ok()?;
        let minutes: u32 = digits[2..].parse().ok()?;
        (hours, minutes, caps.get(2).map(|m| m.as_str().to_string()))
    } else {
        return None;
    };

    if minutes > 59 {
        return None;
    }

    let hours = match suffix.as_deref() {
        Some(suffix) => {
            if !(1..=12).contains(&hours) {
                return None;
            }
            match (suffix, hours) {
                ("am", 12) => 0,
                ("pm", h) if h < 12 => h + 12,
                (_, h) => h,
            }
        }
        None => {
            if hours > 23 {
                return None;
            }
            hours
        }
    };

    Some(hours * 60 + minutes)
}

/// Ordering value for a wave time; unparseable times sort after every real time.
pub fn wave_sort_minutes(wave_time: &str) -> u32 {
    wave_to_minutes(wave_time).unwrap_or(UNPARSED_WAVE)
}

/// Canonical wave text: invisible characters removed, whitespace collapsed,
/// upper-cased, and rewritten as 24-hour `HH:MM` when it parses.
pub fn normalize_wave_time(wave_time: &str) -> String {
    let stripped = strip_invisible(wave_time);
    let cleaned = stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    if cleaned.is_empty() {
        return cleaned;
    }
    match wave_to_minutes(&cleaned) {
        Some(minutes) => format_minutes(minutes),
        None => cleaned,
    }
}

pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
