//! milestone progress command

use clap::Args;
use console::style;
use std::collections::HashMap;
use uuid::Uuid;

use shared::{MilestoneId, Progress};

use super::Context;

#[derive(Debug, Args)]
pub struct ProgressCommand {
    /// Player UUID
    pub player: Uuid,
}

impl ProgressCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let settings = ctx.settings()?;
        let maxima: HashMap<MilestoneId, u32> = ctx
            .definitions(&settings)?
            .into_iter()
            .map(|m| (m.id.clone(), m.max_value()))
            .collect();
        let records = self.records(ctx).await?;

        if records.is_empty() {
            println!("No progress stored for {}", self.player);
            return Ok(());
        }

        println!("{} {} ({})", style("Progress of").bold(), records[0].player_name, self.player);
        for record in &records {
            let max = maxima
                .get(&record.milestone_id)
                .map(u32::to_string)
                .unwrap_or_else(|| "?".to_string());
            let status = match record.completed_time {
                Some(at) if record.completed => style(format!("completed {}", at.format("%Y-%m-%d %H:%M"))).green(),
                _ if record.completed => style("completed".to_string()).green(),
                _ => style("in progress".to_string()).dim(),
            };
            println!(
                "  {}  {}/{}  {}",
                style(record.milestone_id.as_str()).cyan(),
                record.current_count,
                max,
                status
            );
        }
        Ok(())
    }

    /// Stored records for the player, ordered by milestone id
    pub async fn records(&self, ctx: &Context) -> anyhow::Result<Vec<Progress>> {
        let settings = ctx.settings()?;
        let repository = ctx.repository(&settings).await?;
        let loaded = repository.load_player_progress(self.player).await;
        repository.shutdown().await;

        let mut records: Vec<Progress> = loaded?.into_values().collect();
        records.sort_by(|a, b| a.milestone_id.cmp(&b.milestone_id));
        Ok(records)
    }
}
