use crate::contest::ContestStatus;
use crate::controller::{DataSource, WidgetState};
use crate::models::{Badge, StatsSnapshot};
use std::fmt::Write;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub fn format_timestamp(epoch_millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(epoch_millis as i128 * 1_000_000)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{}ms since epoch", epoch_millis))
}

fn percentage(solved: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(solved) / f64::from(total) * 100.0
}

/// Banner shown above the stats whenever the state carries an error.
pub fn notice(state: &WidgetState) -> Option<String> {
    let detail = state.error.as_ref()?;
    let kind = match state.source {
        DataSource::Cached => "cached",
        _ => "fallback",
    };
    let mut banner = format!("> **Notice:** Using {} data. {}", kind, detail);
    if state.source == DataSource::Cached {
        let _ = write!(
            banner,
            "\n>\n> Showing data from {}",
            format_timestamp(state.snapshot.last_updated)
        );
    }
    Some(banner)
}

pub fn render_markdown(state: &WidgetState, contest: Option<&ContestStatus>) -> String {
    let snapshot = &state.snapshot;
    let mut out = String::new();

    let _ = writeln!(out, "# LeetCode Stats\n");
    let _ = writeln!(out, "_Last updated: {}_\n", format_timestamp(snapshot.last_updated));
    if let Some(banner) = notice(state) {
        let _ = writeln!(out, "{}\n", banner);
    }

    render_stats(&mut out, snapshot);
    render_badges(&mut out, snapshot);
    if let Some(contest) = contest {
        render_contest(&mut out, contest);
    }

    out.trim_end().to_string()
}

fn render_stats(out: &mut String, snapshot: &StatsSnapshot) {
    let s = &snapshot.stats;
    let _ = writeln!(
        out,
        "**Solved**: {} / {} ({:.1}%)\n",
        s.total_solved,
        s.total_questions,
        percentage(s.total_solved, s.total_questions)
    );

    let _ = writeln!(out, "| Difficulty | Solved | Total | % |");
    let _ = writeln!(out, "|---|---|---|---|");
    for (label, solved, total) in [
        ("Easy", s.easy_solved, s.total_easy),
        ("Medium", s.medium_solved, s.total_medium),
        ("Hard", s.hard_solved, s.total_hard),
    ] {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.1}% |",
            label,
            solved,
            total,
            percentage(solved, total)
        );
    }
    out.push('\n');

    let _ = writeln!(out, "- **Ranking**: {}", s.ranking);
    let _ = writeln!(out, "- **Acceptance rate**: {:.1}%", s.acceptance_rate);
    let _ = writeln!(out, "- **Submissions**: {}", s.total_submissions);
    let _ = writeln!(out, "- **Active days**: {}", s.total_active_days);
    let _ = writeln!(out, "- **Max streak**: {}", s.max_streak);
    let _ = writeln!(out, "- **Current streak**: {}", s.current_streak);
    let _ = writeln!(out, "- **Contribution points**: {}\n", s.contribution_points);
}

fn badge_line(badge: &Badge) -> String {
    match &badge.creation_date {
        Some(date) => format!("- ![{0}]({1}) {0} ({2})", badge.display_name, badge.icon, date),
        None => format!("- ![{0}]({1}) {0}", badge.display_name, badge.icon),
    }
}

fn render_badges(out: &mut String, snapshot: &StatsSnapshot) {
    let set = &snapshot.badges;
    let _ = writeln!(out, "## Badges ({})\n", set.badges.len());

    if let Some(active) = &set.active_badge {
        let _ = writeln!(out, "**Active**: {}\n", badge_line(active).trim_start_matches("- "));
    }
    for badge in &set.badges {
        let _ = writeln!(out, "{}", badge_line(badge));
    }
    out.push('\n');

    if !set.upcoming_badges.is_empty() {
        let _ = writeln!(out, "### Upcoming\n");
        for upcoming in &set.upcoming_badges {
            let _ = writeln!(out, "- ![{0}]({1}) {0}", upcoming.name, upcoming.icon);
        }
        out.push('\n');
    }
}

fn render_contest(out: &mut String, contest: &ContestStatus) {
    let _ = writeln!(out, "## Contest Rating\n");
    match contest {
        ContestStatus::Rated(rating) => {
            let _ = writeln!(out, "- **Rating**: {:.0}", rating.rating);
            let _ = writeln!(
                out,
                "- **Global ranking**: {} / {}",
                rating.global_ranking, rating.total_participants
            );
            let _ = writeln!(out, "- **Top**: {:.2}%", rating.top_percentage);
        }
        ContestStatus::NoRatedContests => {
            let _ = writeln!(out, "Contest rating not available.");
        }
        status => {
            let _ = writeln!(
                out,
                "> {}",
                status.error_message().unwrap_or("Contest rating not available.")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::RATE_LIMIT_MESSAGE;
    use crate::models::ContestRating;

    const NOW: i64 = 1_720_000_000_000;

    fn state(source: DataSource, error: Option<&str>) -> WidgetState {
        WidgetState {
            snapshot: StatsSnapshot::hardcoded(NOW),
            source,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_format_timestamp_rfc3339() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(86_400_000), "1970-01-02T00:00:00Z");
    }

    #[test]
    fn test_no_notice_without_error() {
        assert!(notice(&state(DataSource::Live, None)).is_none());
        let md = render_markdown(&state(DataSource::Live, None), None);
        assert!(!md.contains("Notice"));
        assert!(!md.contains("Contest Rating"));
    }

    #[test]
    fn test_cached_notice_names_snapshot_time() {
        let banner = notice(&state(DataSource::Cached, Some("stats unavailable"))).unwrap();
        assert!(banner.contains("Using cached data. stats unavailable"));
        assert!(banner.contains("Showing data from 2024-07-03T09:46:40Z"));
    }

    #[test]
    fn test_fallback_notice() {
        let banner = notice(&state(DataSource::Fallback, Some("badges unavailable"))).unwrap();
        assert!(banner.contains("Using fallback data."));
        assert!(!banner.contains("Showing data from"));
    }

    #[test]
    fn test_stats_and_badges_sections() {
        let md = render_markdown(&state(DataSource::Live, None), None);
        assert!(md.starts_with("# LeetCode Stats"));
        assert!(md.contains("**Solved**: 294 / 3482 (8.4%)"));
        assert!(md.contains("| Easy | 119 | 864 | 13.8% |"));
        assert!(md.contains("## Badges (3)"));
        assert!(md.contains("- **Current streak**: 5"));
    }

    #[test]
    fn test_contest_sections() {
        let rated = ContestStatus::Rated(ContestRating {
            rating: 1712.4,
            global_ranking: 3021,
            total_participants: 30000,
            top_percentage: 9.8,
        });
        let md = render_markdown(&state(DataSource::Live, None), Some(&rated));
        assert!(md.contains("- **Rating**: 1712"));
        assert!(md.contains("- **Global ranking**: 3021 / 30000"));

        let md = render_markdown(&state(DataSource::Live, None), Some(&ContestStatus::RateLimited));
        assert!(md.contains(RATE_LIMIT_MESSAGE));

        let md = render_markdown(
            &state(DataSource::Live, None),
            Some(&ContestStatus::NoRatedContests),
        );
        assert!(md.ends_with("Contest rating not available."));
    }

    #[test]
    fn test_zero_totals_do_not_divide_by_zero() {
        assert_eq!(percentage(0, 0), 0.0);
    }
}
