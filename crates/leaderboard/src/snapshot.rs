//! Leaderboard snapshot - one complete, immutable refresh result

use chrono::{DateTime, Utc};

use storage::LeaderboardEntry;

use crate::window::LeaderboardWindow;

/// Name shown for an empty rank
pub const NO_NAME: &str = "---";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardSnapshot {
    pub weekly: Vec<LeaderboardEntry>,
    pub monthly: Vec<LeaderboardEntry>,
    pub total: Vec<LeaderboardEntry>,
    /// Distinct players with a completion this week
    pub weekly_players: u64,
    /// Distinct players with a completion this month
    pub monthly_players: u64,
    /// `None` until the first successful refresh
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl LeaderboardSnapshot {
    pub fn ranking(&self, window: LeaderboardWindow) -> &[LeaderboardEntry] {
        match window {
            LeaderboardWindow::Weekly => &self.weekly,
            LeaderboardWindow::Monthly => &self.monthly,
            LeaderboardWindow::Total => &self.total,
        }
    }

    /// Distinct players in the window; not tracked for all-time
    pub fn player_count(&self, window: LeaderboardWindow) -> Option<u64> {
        match window {
            LeaderboardWindow::Weekly => Some(self.weekly_players),
            LeaderboardWindow::Monthly => Some(self.monthly_players),
            LeaderboardWindow::Total => None,
        }
    }

    /// Entry at a 1-based rank
    pub fn entry_at(&self, window: LeaderboardWindow, rank: usize) -> Option<&LeaderboardEntry> {
        rank.checked_sub(1).and_then(|i| self.ranking(window).get(i))
    }

    /// Player name at a 1-based rank, [`NO_NAME`] when out of range
    pub fn name_at(&self, window: LeaderboardWindow, rank: usize) -> &str {
        self.entry_at(window, rank)
            .map(|e| e.player_name.as_str())
            .unwrap_or(NO_NAME)
    }

    /// Completion count at a 1-based rank, 0 when out of range
    pub fn score_at(&self, window: LeaderboardWindow, rank: usize) -> u64 {
        self.entry_at(window, rank).map(|e| e.completions).unwrap_or(0)
    }

    /// Names of the top `percent`% of the window's active players
    ///
    /// The cut is `ceil(players * percent / 100)`, capped by the cached
    /// list length. Empty for a percent outside 1..=100, for a window
    /// with no players, and for the all-time window.
    pub fn top_percent_names(&self, window: LeaderboardWindow, percent: u32) -> Vec<&str> {
        if percent == 0 || percent > 100 {
            return Vec::new();
        }
        let players = match self.player_count(window) {
            Some(n) if n > 0 => n,
            _ => return Vec::new(),
        };
        let cut = (players * u64::from(percent)).div_ceil(100);
        let cut = usize::try_from(cut).unwrap_or(usize::MAX);
        self.ranking(window)
            .iter()
            .take(cut)
            .map(|e| e.player_name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> LeaderboardSnapshot {
        LeaderboardSnapshot {
            weekly: vec![
                LeaderboardEntry::new("Alex", 9),
                LeaderboardEntry::new("Steve", 4),
                LeaderboardEntry::new("Notch", 1),
            ],
            monthly: vec![LeaderboardEntry::new("Alex", 12)],
            total: Vec::new(),
            weekly_players: 10,
            monthly_players: 0,
            refreshed_at: None,
        }
    }

    #[test]
    fn test_rank_lookup() {
        let snap = snapshot();
        assert_eq!(snap.name_at(LeaderboardWindow::Weekly, 1), "Alex");
        assert_eq!(snap.score_at(LeaderboardWindow::Weekly, 2), 4);
        assert_eq!(snap.name_at(LeaderboardWindow::Monthly, 1), "Alex");
    }

    #[test]
    fn test_rank_out_of_range() {
        let snap = snapshot();
        assert_eq!(snap.name_at(LeaderboardWindow::Weekly, 0), NO_NAME);
        assert_eq!(snap.name_at(LeaderboardWindow::Weekly, 4), NO_NAME);
        assert_eq!(snap.score_at(LeaderboardWindow::Total, 1), 0);
    }

    #[test]
    fn test_top_percent_rounds_up_and_caps() {
        let snap = snapshot();
        // ceil(10 * 15 / 100) = 2
        assert_eq!(snap.top_percent_names(LeaderboardWindow::Weekly, 15), vec!["Alex", "Steve"]);
        // 10 players, only 3 cached
        assert_eq!(snap.top_percent_names(LeaderboardWindow::Weekly, 100).len(), 3);
        assert_eq!(snap.top_percent_names(LeaderboardWindow::Weekly, 1), vec!["Alex"]);
    }

    #[test]
    fn test_top_percent_empty_cases() {
        let snap = snapshot();
        assert!(snap.top_percent_names(LeaderboardWindow::Weekly, 0).is_empty());
        assert!(snap.top_percent_names(LeaderboardWindow::Weekly, 101).is_empty());
        assert!(snap.top_percent_names(LeaderboardWindow::Monthly, 50).is_empty());
        assert!(snap.top_percent_names(LeaderboardWindow::Total, 50).is_empty());
    }
}
