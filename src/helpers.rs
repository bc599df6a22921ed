use chrono::{DateTime, Utc};

use crate::models::views::ValueSlot;

const DEFAULT_BACKGROUND: &str = "white";

pub fn updated_label(t: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let t = match t {
        Some(t) => t,
        None => return "never".to_string(),
    };

    let secs = (now - t).num_seconds();
    if secs < 5 {
        "just now".to_string()
    } else if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        t.format("%H:%M:%S").to_string()
    }
}

/// Page background taken from the color slot; anything but a plain color falls back to white.
pub fn background_color(slot: Option<&ValueSlot>) -> String {
    match slot {
        Some(s) if !s.error && is_plain_color(&s.value) => s.value.clone(),
        _ => DEFAULT_BACKGROUND.to_string(),
    }
}

/// `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or a bare keyword such as `teal`.
fn is_plain_color(v: &str) -> bool {
    match v.strip_prefix('#') {
        Some(hex) => {
            matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => !v.is_empty() && v.len() <= 32 && v.chars().all(|c| c.is_ascii_alphabetic()),
    }
}
