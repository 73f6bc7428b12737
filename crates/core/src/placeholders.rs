//! Placeholder resolution for text templates
//!
//! Per player:
//!
//! | query | answer |
//! |---|---|
//! | `status_<id>` | `completed` / `incomplete` |
//! | `is_completed_<id>` | `true` / `false` |
//! | `current_<id>` | current count, 0 without a record |
//! | `max_<id>` | counter max, 1 for other kinds, 0 for unknown ids |
//! | `percent_<id>` | 100 when completed, else floor(current * 100 / max) |
//!
//! Global, read from the leaderboard snapshot:
//!
//! | query | answer |
//! |---|---|
//! | `top_<window>_<name\|score>_<rank>` | 1-based rank, `---` / `0` when empty |
//! | `<weekly\|monthly>_top_percent_names_<p>` | comma-separated names |

use std::sync::Arc;

use leaderboard::{LeaderboardCache, LeaderboardWindow};
use shared::PlayerId;

use crate::service::MilestoneService;

pub struct Placeholders {
    service: Arc<MilestoneService>,
    leaderboard: Arc<LeaderboardCache>,
}

impl Placeholders {
    pub fn new(service: Arc<MilestoneService>, leaderboard: Arc<LeaderboardCache>) -> Self {
        Self { service, leaderboard }
    }

    /// Answer `query`; `None` when it is not a known placeholder
    pub fn resolve(&self, player: Option<PlayerId>, query: &str) -> Option<String> {
        if let Some(rest) = query.strip_prefix("top_") {
            return self.ranked(rest);
        }
        if let Some((window, percent)) = query.split_once("_top_percent_names_") {
            return self.top_percent(window, percent);
        }
        self.personal(player?, query)
    }

    /// `<window>_<name|score>_<rank>`
    fn ranked(&self, query: &str) -> Option<String> {
        let mut parts = query.splitn(3, '_');
        let window = LeaderboardWindow::parse(parts.next()?)?;
        let field = parts.next()?;
        let rank: usize = parts.next()?.parse().ok()?;

        let snapshot = self.leaderboard.snapshot();
        match field {
            "name" => Some(snapshot.name_at(window, rank).to_string()),
            "score" => Some(snapshot.score_at(window, rank).to_string()),
            _ => None,
        }
    }

    fn top_percent(&self, window: &str, percent: &str) -> Option<String> {
        let window = match window {
            "weekly" => LeaderboardWindow::Weekly,
            "monthly" => LeaderboardWindow::Monthly,
            _ => return None,
        };
        let percent: i64 = percent.parse().ok()?;
        let Ok(percent) = u32::try_from(percent) else {
            return Some(String::new());
        };
        Some(self.leaderboard.snapshot().top_percent_names(window, percent).join(", "))
    }

    fn personal(&self, player: PlayerId, query: &str) -> Option<String> {
        if let Some(id) = query.strip_prefix("is_completed_") {
            return Some(self.is_completed(player, id).to_string());
        }
        if let Some(id) = query.strip_prefix("status_") {
            let status = if self.is_completed(player, id) { "completed" } else { "incomplete" };
            return Some(status.to_string());
        }
        if let Some(id) = query.strip_prefix("current_") {
            let current = self.service.get_progress(player, id).map(|p| p.current_count).unwrap_or(0);
            return Some(current.to_string());
        }
        if let Some(id) = query.strip_prefix("max_") {
            let max = self.service.get_milestone(id).map(|m| m.max_value()).unwrap_or(0);
            return Some(max.to_string());
        }
        if let Some(id) = query.strip_prefix("percent_") {
            return Some(self.percent(player, id).to_string());
        }
        None
    }

    fn is_completed(&self, player: PlayerId, id: &str) -> bool {
        self.service.get_progress(player, id).is_some_and(|p| p.completed)
    }

    fn percent(&self, player: PlayerId, id: &str) -> u32 {
        let Some(milestone) = self.service.get_milestone(id) else {
            return 0;
        };
        match self.service.get_progress(player, id) {
            Some(progress) => progress.percent(milestone.max_value()),
            None => 0,
        }
    }
}
