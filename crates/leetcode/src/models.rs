use crate::activity::ActivitySummary;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const PLACEHOLDER_ICON: &str = "https://via.placeholder.com/56";

const HARDCODED_BADGES: [(&str, &str, &str, &str); 3] = [
    (
        "4519258",
        "100 Days Badge 2024",
        "https://assets.leetcode.com/static_assets/marketing/2024-100-lg.png",
        "2024-07-26",
    ),
    (
        "3964197",
        "50 Days Badge 2024",
        "https://assets.leetcode.com/static_assets/marketing/2024-50-lg.png",
        "2024-05-23",
    ),
    (
        "4029373",
        "May LeetCoding Challenge",
        "https://leetcode.com/static/images/badges/dcc-2024-5.png",
        "2024-06-01",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub display_name: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingBadge {
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeSet {
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub upcoming_badges: Vec<UpcomingBadge>,
    #[serde(default)]
    pub active_badge: Option<Badge>,
}

impl BadgeSet {
    pub fn hardcoded() -> Self {
        Self {
            badges: hardcoded_badges(),
            upcoming_badges: Vec::new(),
            active_badge: None,
        }
    }
}

pub fn hardcoded_badges() -> Vec<Badge> {
    HARDCODED_BADGES
        .iter()
        .map(|(id, display_name, icon, date)| Badge {
            id: id.to_string(),
            name: String::new(),
            display_name: display_name.to_string(),
            icon: icon.to_string(),
            creation_date: Some(date.to_string()),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileStats {
    pub total_solved: u32,
    pub total_questions: u32,
    pub easy_solved: u32,
    pub total_easy: u32,
    pub medium_solved: u32,
    pub total_medium: u32,
    pub hard_solved: u32,
    pub total_hard: u32,
    pub ranking: u64,
    pub contribution_points: u32,
    pub reputation: u32,
    pub total_submissions: u32,
    pub total_active_days: u32,
    pub max_streak: u32,
    pub current_streak: u32,
    pub acceptance_rate: f64,
    pub submission_calendar: BTreeMap<String, u32>,
}

impl Default for ProfileStats {
    fn default() -> Self {
        Self {
            total_solved: 0,
            total_questions: 0,
            easy_solved: 0,
            total_easy: 0,
            medium_solved: 0,
            total_medium: 0,
            hard_solved: 0,
            total_hard: 0,
            ranking: 0,
            contribution_points: 0,
            reputation: 0,
            total_submissions: 0,
            total_active_days: 0,
            max_streak: 0,
            current_streak: 0,
            acceptance_rate: 0.0,
            submission_calendar: BTreeMap::new(),
        }
    }
}

impl ProfileStats {
    /// Numbers shown when neither the API nor the cache has anything.
    pub fn hardcoded() -> Self {
        Self {
            total_solved: 294,
            total_questions: 3482,
            easy_solved: 119,
            total_easy: 864,
            medium_solved: 151,
            total_medium: 1810,
            hard_solved: 24,
            total_hard: 808,
            ranking: 10_000,
            contribution_points: 100,
            reputation: 0,
            total_submissions: 500,
            total_active_days: 150,
            max_streak: 30,
            current_streak: 5,
            acceptance_rate: 65.4,
            submission_calendar: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[serde(flatten)]
    pub stats: ProfileStats,
    #[serde(flatten)]
    pub badges: BadgeSet,
    pub last_updated: i64,
}

impl StatsSnapshot {
    pub fn new(stats: ProfileStats, badges: BadgeSet, last_updated: i64) -> Self {
        Self {
            stats,
            badges,
            last_updated,
        }
    }

    pub fn hardcoded(now_millis: i64) -> Self {
        Self::new(ProfileStats::hardcoded(), BadgeSet::hardcoded(), now_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestRating {
    pub rating: f64,
    pub global_ranking: u64,
    pub total_participants: u64,
    pub top_percentage: f64,
}

/// Raw body of the stats endpoint. The API has served both numbers and
/// strings for `ranking` and `acceptanceRate` over time.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsPayload {
    pub status: Option<String>,
    pub message: Option<String>,
    pub total_solved: u32,
    pub total_questions: u32,
    pub easy_solved: u32,
    pub total_easy: u32,
    pub medium_solved: u32,
    pub total_medium: u32,
    pub hard_solved: u32,
    pub total_hard: u32,
    #[serde(deserialize_with = "loose_u64")]
    pub ranking: u64,
    pub contribution_points: u32,
    pub reputation: u32,
    #[serde(deserialize_with = "loose_f64")]
    pub acceptance_rate: f64,
    #[serde(deserialize_with = "loose_calendar")]
    pub submission_calendar: BTreeMap<String, u32>,
    pub total_submissions: Option<u32>,
    pub total_active_days: Option<u32>,
    pub max_streak: Option<u32>,
    pub current_streak: Option<u32>,
}

impl StatsPayload {
    pub fn is_error(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("error"))
            .unwrap_or(false)
    }

    /// Activity counters the API leaves out are derived from the calendar.
    pub fn into_profile_stats(self, today: i64) -> ProfileStats {
        let activity = ActivitySummary::from_calendar(&self.submission_calendar, today);
        ProfileStats {
            total_solved: self.total_solved,
            total_questions: self.total_questions,
            easy_solved: self.easy_solved,
            total_easy: self.total_easy,
            medium_solved: self.medium_solved,
            total_medium: self.total_medium,
            hard_solved: self.hard_solved,
            total_hard: self.total_hard,
            ranking: self.ranking,
            contribution_points: self.contribution_points,
            reputation: self.reputation,
            total_submissions: self.total_submissions.unwrap_or(activity.total_submissions),
            total_active_days: self.total_active_days.unwrap_or(activity.active_days),
            max_streak: self.max_streak.unwrap_or(activity.max_streak),
            current_streak: self.current_streak.unwrap_or(activity.current_streak),
            acceptance_rate: self.acceptance_rate,
            submission_calendar: self.submission_calendar,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
}

impl Loose {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Loose::Number(n) => Some(*n),
            Loose::Text(s) => s.trim().replace(',', "").parse().ok(),
        }
    }
}

fn loose_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_f64())
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64)
        .unwrap_or(0))
}

fn loose_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).unwrap_or(0.0))
}

/// Accepts a map of counts, a map of numeric strings, or the whole map
/// encoded as a JSON string.
fn loose_calendar<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, u32>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let map = match value {
        Some(serde_json::Value::Object(map)) => map,
        Some(serde_json::Value::String(text)) => {
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(serde_json::Value::Object(map)) => map,
                _ => return Ok(BTreeMap::new()),
            }
        }
        _ => return Ok(BTreeMap::new()),
    };

    Ok(map
        .into_iter()
        .filter_map(|(day, count)| {
            let count = match count {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            Some((day, u32::try_from(count).unwrap_or(u32::MAX)))
        })
        .collect())
}
