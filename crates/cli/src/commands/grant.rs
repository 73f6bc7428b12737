//! milestone grant / revoke commands
//!
//! Both go through the service so the stored record matches what a live
//! server would write, then shut down to flush it.

use clap::Args;
use console::style;
use uuid::Uuid;

use milestone_core::MilestoneRuntime;

use super::Context;

#[derive(Debug, Args)]
pub struct GrantCommand {
    /// Player UUID
    pub player: Uuid,

    /// Milestone id
    pub milestone: String,

    /// Player name for newly created records
    #[arg(long)]
    pub name: Option<String>,
}

impl GrantCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let runtime = open_session(ctx, self.player, self.name.as_deref(), &self.milestone).await?;
        let changed = runtime.service().grant(self.player, &self.milestone);
        runtime.shutdown().await;

        if changed {
            println!("{} Granted {} to {}", style("✓").green(), self.milestone, self.player);
        } else {
            println!("{} {} was already completed", style("-").dim(), self.milestone);
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct RevokeCommand {
    /// Player UUID
    pub player: Uuid,

    /// Milestone id
    pub milestone: String,

    /// Player name for newly created records
    #[arg(long)]
    pub name: Option<String>,
}

impl RevokeCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let runtime = open_session(ctx, self.player, self.name.as_deref(), &self.milestone).await?;
        runtime.service().revoke(self.player, &self.milestone);
        runtime.shutdown().await;

        println!("{} Revoked {} from {}", style("✓").green(), self.milestone, self.player);
        Ok(())
    }
}

/// Build the runtime and load the player, failing early for unknown ids
async fn open_session(
    ctx: &Context,
    player: Uuid,
    name: Option<&str>,
    milestone: &str,
) -> anyhow::Result<MilestoneRuntime> {
    let runtime = ctx.runtime().await?;
    if let Err(e) = runtime.service().require_milestone(milestone) {
        runtime.shutdown().await;
        return Err(e.into());
    }

    let name = name.map(str::to_string).unwrap_or_else(|| player.to_string());
    runtime.service().load_player_data(player, &name).await?;
    Ok(runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{fixtures, ProgressCommand};
    use milestone_core::ServiceError;
    use tempfile::TempDir;

    fn grant(player: Uuid, milestone: &str) -> GrantCommand {
        GrantCommand {
            player,
            milestone: milestone.to_string(),
            name: Some("Alex".to_string()),
        }
    }

    #[tokio::test]
    async fn test_grant_then_revoke_is_persisted() {
        let dir = TempDir::new().unwrap();
        fixtures::write_data_dir(dir.path());
        let ctx = Context::new(dir.path());
        let player = Uuid::new_v4();

        grant(player, "miner").run(&ctx).await.unwrap();
        let records = ProgressCommand { player }.records(&ctx).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].completed);
        assert_eq!(records[0].current_count, 3);
        assert_eq!(records[0].player_name, "Alex");

        RevokeCommand {
            player,
            milestone: "miner".to_string(),
            name: None,
        }
        .run(&ctx)
        .await
        .unwrap();
        let records = ProgressCommand { player }.records(&ctx).await.unwrap();
        assert!(!records[0].completed);
        assert_eq!(records[0].current_count, 0);
        assert!(records[0].completed_time.is_none());
    }

    #[tokio::test]
    async fn test_grant_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        fixtures::write_data_dir(dir.path());
        let ctx = Context::new(dir.path());
        let player = Uuid::new_v4();

        grant(player, "first_login").run(&ctx).await.unwrap();
        let first = ProgressCommand { player }.records(&ctx).await.unwrap();
        grant(player, "first_login").run(&ctx).await.unwrap();
        let second = ProgressCommand { player }.records(&ctx).await.unwrap();

        assert_eq!(first, second);
    }

    mod red_team {
        use super::*;

        #[tokio::test]
        async fn test_unknown_milestone_is_rejected() {
            let dir = TempDir::new().unwrap();
            fixtures::write_data_dir(dir.path());
            let ctx = Context::new(dir.path());
            let player = Uuid::new_v4();

            let err = grant(player, "nope").run(&ctx).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ServiceError>(),
                Some(ServiceError::UnknownMilestone(_))
            ));
            assert!(ProgressCommand { player }.records(&ctx).await.unwrap().is_empty());
        }
    }
}
