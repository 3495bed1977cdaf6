use crate::models::{hardcoded_badges, Badge, BadgeSet, UpcomingBadge, PLACEHOLDER_ICON};
use serde_json::Value;
use tracing::debug;

const LEETCODE_HOST: &str = "https://leetcode.com";
const RELATIVE_ICON_PREFIX: &str = "/static";

/// Normalize any badges-API payload for display. Unrecognized shapes yield
/// the hardcoded list alone; a recognized payload with no badges keeps its
/// upcoming/active badges but shows the hardcoded list.
pub fn format_badges(raw: &Value) -> BadgeSet {
    match parse_badge_payload(raw) {
        Some(mut set) => {
            if set.badges.is_empty() {
                debug!("Badge payload had no badges, using hardcoded list");
                set.badges = hardcoded_badges();
            }
            set
        }
        None => {
            debug!("Could not determine badge format, using hardcoded list");
            BadgeSet::hardcoded()
        }
    }
}

/// Like [`format_badges`] but reports "nothing useful" as `None` so the
/// caller can fall back to other sources.
pub fn parse_live_badges(raw: &Value) -> Option<BadgeSet> {
    parse_badge_payload(raw).filter(|set| !set.badges.is_empty())
}

pub fn normalize_icon(icon: Option<&str>) -> String {
    match icon {
        None | Some("") => PLACEHOLDER_ICON.to_string(),
        Some(path) if path.starts_with(RELATIVE_ICON_PREFIX) => {
            format!("{}{}", LEETCODE_HOST, path)
        }
        Some(url) => url.to_string(),
    }
}

fn parse_badge_payload(raw: &Value) -> Option<BadgeSet> {
    let object = raw.as_object()?;
    let badges_field = object.get("badges").and_then(Value::as_array);
    if badges_field.is_none() && !object.contains_key("badgesCount") {
        return None;
    }

    let badges = badges_field
        .map(|items| items.iter().map(|b| format_badge(b, "Badge")).collect())
        .unwrap_or_default();

    let upcoming_badges = object
        .get("upcomingBadges")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(format_upcoming).collect())
        .unwrap_or_default();

    let active_badge = object
        .get("activeBadge")
        .filter(|v| is_truthy(v))
        .map(|b| format_badge(b, "Active Badge"));

    Some(BadgeSet {
        badges,
        upcoming_badges,
        active_badge,
    })
}

fn format_badge(raw: &Value, default_display_name: &str) -> Badge {
    let name = text_field(raw, "name");
    let display_name = text_field(raw, "displayName")
        .or_else(|| name.clone())
        .unwrap_or_else(|| default_display_name.to_string());

    Badge {
        id: text_field(raw, "id").unwrap_or_default(),
        name: name.unwrap_or_default(),
        display_name,
        icon: normalize_icon(text_field(raw, "icon").as_deref()),
        creation_date: text_field(raw, "creationDate"),
    }
}

fn format_upcoming(raw: &Value) -> UpcomingBadge {
    UpcomingBadge {
        name: text_field(raw, "name").unwrap_or_else(|| "Upcoming Badge".to_string()),
        icon: normalize_icon(text_field(raw, "icon").as_deref()),
    }
}

/// Non-empty string or number field, rendered as text.
fn text_field(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::Array(_) | Value::Object(_) => true,
    }
}
