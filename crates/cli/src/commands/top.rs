//! milestone top command

use clap::Args;
use console::style;
use std::sync::Arc;

use leaderboard::{LeaderboardCache, LeaderboardSnapshot, LeaderboardWindow};

use super::Context;

fn parse_window(raw: &str) -> Result<LeaderboardWindow, String> {
    LeaderboardWindow::parse(raw).ok_or_else(|| format!("unknown window '{}' (weekly, monthly, total)", raw))
}

#[derive(Debug, Args)]
pub struct TopCommand {
    /// Ranking window
    #[arg(long, default_value = "weekly", value_parser = parse_window)]
    pub window: LeaderboardWindow,

    /// Number of entries; defaults to the configured cache size
    #[arg(long)]
    pub limit: Option<u32>,
}

impl TopCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let snapshot = self.snapshot(ctx).await?;
        let ranking = snapshot.ranking(self.window);

        println!("{} ({})", style("Top players").bold(), self.window);
        if ranking.is_empty() {
            println!("  {}", style("no completions yet").dim());
        }
        for (i, entry) in ranking.iter().enumerate() {
            println!("  {:>3}. {:<16} {}", i + 1, entry.player_name, entry.completions);
        }
        if let Some(players) = snapshot.player_count(self.window) {
            println!("{} players with completions", players);
        }
        Ok(())
    }

    /// One refresh against the configured repository
    pub async fn snapshot(&self, ctx: &Context) -> anyhow::Result<Arc<LeaderboardSnapshot>> {
        let settings = ctx.settings()?;
        let repository = ctx.repository(&settings).await?;
        let limit = self.limit.unwrap_or(settings.leaderboard.cache_size);

        let cache = LeaderboardCache::new(Arc::clone(&repository), limit);
        let refreshed = cache.refresh().await;
        repository.shutdown().await;
        refreshed?;
        Ok(cache.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use chrono::Utc;
    use shared::{MilestoneId, Progress};
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn seed(ctx: &Context) {
        let settings = ctx.settings().unwrap();
        let repository = ctx.repository(&settings).await.unwrap();
        for (name, completions) in [("Alex", 2), ("Steve", 1), ("Notch", 3)] {
            let player = Uuid::new_v4();
            for i in 0..completions {
                let mut p = Progress::new(player, name, MilestoneId::new(format!("m{}", i)));
                p.complete(1, Utc::now());
                repository.save_player_progress(&p).await.unwrap();
            }
        }
        repository.shutdown().await;
    }

    #[tokio::test]
    async fn test_total_ranking() {
        let dir = TempDir::new().unwrap();
        fixtures::write_data_dir(dir.path());
        let ctx = Context::new(dir.path());
        seed(&ctx).await;

        let command = TopCommand {
            window: LeaderboardWindow::Total,
            limit: None,
        };
        let snapshot = command.snapshot(&ctx).await.unwrap();
        let names: Vec<&str> = snapshot
            .ranking(LeaderboardWindow::Total)
            .iter()
            .map(|e| e.player_name.as_str())
            .collect();
        assert_eq!(names, vec!["Notch", "Alex", "Steve"]);
        command.run(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_limit_overrides_cache_size() {
        let dir = TempDir::new().unwrap();
        fixtures::write_data_dir(dir.path());
        let ctx = Context::new(dir.path());
        seed(&ctx).await;

        let snapshot = TopCommand {
            window: LeaderboardWindow::Weekly,
            limit: Some(1),
        }
        .snapshot(&ctx)
        .await
        .unwrap();
        assert_eq!(snapshot.ranking(LeaderboardWindow::Weekly).len(), 1);
        assert_eq!(snapshot.name_at(LeaderboardWindow::Weekly, 1), "Notch");
        assert_eq!(snapshot.player_count(LeaderboardWindow::Weekly), Some(3));
    }

    #[test]
    fn test_parse_window() {
        assert_eq!(parse_window("monthly"), Ok(LeaderboardWindow::Monthly));
        assert_eq!(parse_window("all"), Ok(LeaderboardWindow::Total));
        assert!(parse_window("daily").is_err());
    }
}
